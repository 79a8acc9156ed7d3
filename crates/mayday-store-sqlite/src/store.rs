//! [`SqliteStore`] — the SQLite implementation of [`ContactStore`] and
//! [`AlertEventStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mayday_core::{
  alert::{AlertEvent, DeliveryOutcome, OverallStatus},
  contact::EmergencyContactSet,
  status,
  store::{
    AlertEventStore, AlertPage, AlertQuery, ContactStore, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT,
  },
};

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, RawAlertEvent, RawContactSet, decode_deliveries,
    decode_status, encode_contacts, encode_deliveries, encode_dt,
    encode_status, encode_uuid, event_from_row,
  },
  schema::SCHEMA,
};

// ─── Error plumbing ──────────────────────────────────────────────────────────

/// Wrap a domain error so it can cross the `tokio_rusqlite` closure
/// boundary.
fn domain(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// Recover a wrapped domain error on the way back out.
fn unwrap_domain(e: tokio_rusqlite::Error) -> Error {
  match e {
    tokio_rusqlite::Error::Other(inner) => match inner.downcast::<Error>() {
      Ok(own) => *own,
      Err(other) => Error::Database(tokio_rusqlite::Error::Other(other)),
    },
    other => Error::Database(other),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mayday store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// run on the connection's dedicated thread; a read-modify-write executed
/// inside one closure is therefore serialized against every other write to
/// the same (or any other) row.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = Error;

  async fn save_contacts(
    &self,
    set: EmergencyContactSet,
  ) -> Result<EmergencyContactSet> {
    let user_id_str = encode_uuid(set.user_id);
    let contacts_str = encode_contacts(&set.contacts)?;
    let updated_at_str = encode_dt(set.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO emergency_contacts (user_id, contacts_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(user_id) DO UPDATE SET
             contacts_json = excluded.contacts_json,
             updated_at    = excluded.updated_at",
          rusqlite::params![user_id_str, contacts_str, updated_at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(set)
  }

  async fn get_contacts(
    &self,
    user_id: Uuid,
  ) -> Result<Option<EmergencyContactSet>> {
    let user_id_str = encode_uuid(user_id);

    let raw: Option<RawContactSet> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, contacts_json, updated_at
               FROM emergency_contacts WHERE user_id = ?1",
              rusqlite::params![user_id_str],
              |row| {
                Ok(RawContactSet {
                  user_id:       row.get(0)?,
                  contacts_json: row.get(1)?,
                  updated_at:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContactSet::into_set).transpose()
  }
}

// ─── AlertEventStore impl ────────────────────────────────────────────────────

impl AlertEventStore for SqliteStore {
  type Error = Error;

  async fn create_alert(&self, event: AlertEvent) -> Result<AlertEvent> {
    let alert_id_str = encode_uuid(event.alert_id);
    let user_id_str = encode_uuid(event.user_id);
    let latitude = event.latitude;
    let longitude = event.longitude;
    let address = event.address.clone();
    let map_link = event.map_link.clone();
    let triggered_at_str = encode_dt(event.triggered_at);
    let status_str = encode_status(event.status).to_owned();
    let deliveries_str = encode_deliveries(&event.deliveries)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO alert_events (
             alert_id, user_id, latitude, longitude, address, map_link,
             triggered_at, resolved_at, resolved_by, status, deliveries_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8, ?9)",
          rusqlite::params![
            alert_id_str,
            user_id_str,
            latitude,
            longitude,
            address,
            map_link,
            triggered_at_str,
            status_str,
            deliveries_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn get_alert(&self, alert_id: Uuid) -> Result<Option<AlertEvent>> {
    let id_str = encode_uuid(alert_id);

    let raw: Option<RawAlertEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {EVENT_COLUMNS} FROM alert_events WHERE alert_id = ?1"
              ),
              rusqlite::params![id_str],
              event_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlertEvent::into_event).transpose()
  }

  async fn apply_delivery_outcome(
    &self,
    alert_id: Uuid,
    slot: usize,
    outcome: DeliveryOutcome,
  ) -> Result<AlertEvent> {
    if slot >= 2 {
      return Err(Error::DeliverySlot(slot));
    }
    let id_str = encode_uuid(alert_id);

    let raw: RawAlertEvent = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, String)> = tx
          .query_row(
            "SELECT status, deliveries_json FROM alert_events
             WHERE alert_id = ?1",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let (status_str, deliveries_str) =
          row.ok_or_else(|| domain(Error::AlertNotFound(alert_id)))?;

        let current = decode_status(&status_str).map_err(domain)?;
        let mut deliveries =
          decode_deliveries(&deliveries_str).map_err(domain)?;

        deliveries[slot].apply(&outcome);

        // Resolution is terminal: the aggregate never overwrites it.
        let next = if current == OverallStatus::Resolved {
          OverallStatus::Resolved
        } else {
          status::aggregate(&deliveries)
        };

        let deliveries_out =
          encode_deliveries(&deliveries).map_err(domain)?;

        tx.execute(
          "UPDATE alert_events SET deliveries_json = ?2, status = ?3
           WHERE alert_id = ?1",
          rusqlite::params![id_str, deliveries_out, encode_status(next)],
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {EVENT_COLUMNS} FROM alert_events WHERE alert_id = ?1"
          ),
          rusqlite::params![id_str],
          event_from_row,
        )?;

        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(unwrap_domain)?;

    raw.into_event()
  }

  async fn list_alerts(&self, query: &AlertQuery) -> Result<AlertPage> {
    let status_str = query.status.map(encode_status).map(str::to_owned);
    let day_str = query.on_day.map(|d| d.format("%Y-%m-%d").to_string());
    let user_str = query.user_id.map(encode_uuid);
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let offset = i64::from(page - 1) * i64::from(limit);

    let (raws, total): (Vec<RawAlertEvent>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          "SELECT COUNT(*) FROM alert_events
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR substr(triggered_at, 1, 10) = ?2)
             AND (?3 IS NULL OR user_id = ?3)",
          rusqlite::params![
            status_str.as_deref(),
            day_str.as_deref(),
            user_str.as_deref(),
          ],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM alert_events
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR substr(triggered_at, 1, 10) = ?2)
             AND (?3 IS NULL OR user_id = ?3)
           ORDER BY triggered_at DESC
           LIMIT ?4 OFFSET ?5"
        ))?;

        let rows = stmt
          .query_map(
            rusqlite::params![
              status_str.as_deref(),
              day_str.as_deref(),
              user_str.as_deref(),
              i64::from(limit),
              offset,
            ],
            event_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    let events = raws
      .into_iter()
      .map(RawAlertEvent::into_event)
      .collect::<Result<Vec<_>>>()?;

    Ok(AlertPage { events, page, limit, total: total as u64 })
  }

  async fn resolve_alert(
    &self,
    alert_id: Uuid,
    operator_id: Uuid,
  ) -> Result<Option<AlertEvent>> {
    let id_str = encode_uuid(alert_id);
    let operator_str = encode_uuid(operator_id);
    let resolved_at_str = encode_dt(Utc::now());

    let raw: Option<RawAlertEvent> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let updated = tx.execute(
          "UPDATE alert_events
              SET status = 'RESOLVED', resolved_at = ?2, resolved_by = ?3
            WHERE alert_id = ?1",
          rusqlite::params![id_str, resolved_at_str, operator_str],
        )?;

        if updated == 0 {
          return Ok(None);
        }

        let raw = tx.query_row(
          &format!(
            "SELECT {EVENT_COLUMNS} FROM alert_events WHERE alert_id = ?1"
          ),
          rusqlite::params![id_str],
          event_from_row,
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawAlertEvent::into_event).transpose()
  }
}
