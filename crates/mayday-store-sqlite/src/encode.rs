//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. The delivery-record pair and
//! the contact pair are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings. The status column holds the exact wire
//! literals ('SENT', 'PARTIAL_FAILED', 'FAILED', 'RESOLVED').

use chrono::{DateTime, Utc};
use mayday_core::{
  alert::{AlertEvent, ContactDeliveryRecord, OverallStatus},
  contact::{Contact, EmergencyContactSet},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── OverallStatus ───────────────────────────────────────────────────────────

pub fn encode_status(status: OverallStatus) -> &'static str { status.as_str() }

pub fn decode_status(s: &str) -> Result<OverallStatus> {
  Ok(s.parse::<OverallStatus>().map_err(Error::Core)?)
}

// ─── Embedded JSON pairs ─────────────────────────────────────────────────────

pub fn encode_deliveries(records: &[ContactDeliveryRecord; 2]) -> Result<String> {
  Ok(serde_json::to_string(records)?)
}

pub fn decode_deliveries(s: &str) -> Result<[ContactDeliveryRecord; 2]> {
  let records: Vec<ContactDeliveryRecord> = serde_json::from_str(s)?;
  let len = records.len();
  records
    .try_into()
    .map_err(|_| Error::Decode(format!("expected two delivery records, got {len}")))
}

pub fn encode_contacts(contacts: &[Contact; 2]) -> Result<String> {
  Ok(serde_json::to_string(contacts)?)
}

pub fn decode_contacts(s: &str) -> Result<[Contact; 2]> {
  let contacts: Vec<Contact> = serde_json::from_str(s)?;
  let len = contacts.len();
  contacts
    .try_into()
    .map_err(|_| Error::Decode(format!("expected two contacts, got {len}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `alert_events` SELECT; order matches
/// [`event_from_row`].
pub const EVENT_COLUMNS: &str = "alert_id, user_id, latitude, longitude, \
   address, map_link, triggered_at, resolved_at, resolved_by, status, \
   deliveries_json";

/// Raw strings read directly from an `alert_events` row.
pub struct RawAlertEvent {
  pub alert_id:        String,
  pub user_id:         String,
  pub latitude:        f64,
  pub longitude:       f64,
  pub address:         Option<String>,
  pub map_link:        String,
  pub triggered_at:    String,
  pub resolved_at:     Option<String>,
  pub resolved_by:     Option<String>,
  pub status:          String,
  pub deliveries_json: String,
}

/// Row mapper matching [`EVENT_COLUMNS`].
pub fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlertEvent> {
  Ok(RawAlertEvent {
    alert_id:        row.get(0)?,
    user_id:         row.get(1)?,
    latitude:        row.get(2)?,
    longitude:       row.get(3)?,
    address:         row.get(4)?,
    map_link:        row.get(5)?,
    triggered_at:    row.get(6)?,
    resolved_at:     row.get(7)?,
    resolved_by:     row.get(8)?,
    status:          row.get(9)?,
    deliveries_json: row.get(10)?,
  })
}

impl RawAlertEvent {
  pub fn into_event(self) -> Result<AlertEvent> {
    Ok(AlertEvent {
      alert_id:     decode_uuid(&self.alert_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      latitude:     self.latitude,
      longitude:    self.longitude,
      address:      self.address,
      map_link:     self.map_link,
      triggered_at: decode_dt(&self.triggered_at)?,
      resolved_at:  self.resolved_at.as_deref().map(decode_dt).transpose()?,
      resolved_by:  self.resolved_by.as_deref().map(decode_uuid).transpose()?,
      status:       decode_status(&self.status)?,
      deliveries:   decode_deliveries(&self.deliveries_json)?,
    })
  }
}

/// Raw strings read directly from an `emergency_contacts` row.
pub struct RawContactSet {
  pub user_id:       String,
  pub contacts_json: String,
  pub updated_at:    String,
}

impl RawContactSet {
  pub fn into_set(self) -> Result<EmergencyContactSet> {
    Ok(EmergencyContactSet {
      user_id:    decode_uuid(&self.user_id)?,
      contacts:   decode_contacts(&self.contacts_json)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
