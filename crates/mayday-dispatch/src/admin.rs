//! [`AlertAdminService`] — operator-facing reads and the resolve
//! transition. Depends on the event store only.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use mayday_core::{
  alert::AlertEvent,
  store::{AlertEventStore, AlertPage, AlertQuery, DEFAULT_PAGE_LIMIT},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// An error from the operator surface. Listing never produces one — see
/// [`AlertAdminService::list`].
#[derive(Debug, Error)]
pub enum AdminError {
  #[error("alert event not found: {0}")]
  NotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Read/list/resolve operations used by operators.
pub struct AlertAdminService<S> {
  store: Arc<S>,
}

impl<S> AlertAdminService<S>
where
  S: AlertEventStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Filtered, paginated listing, newest first.
  ///
  /// A failing store degrades to an empty, well-formed page: operator
  /// dashboards must never hard-fail on a transient read error.
  pub async fn list(&self, query: &AlertQuery) -> AlertPage {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    match self.store.list_alerts(query).await {
      Ok(result) => result,
      Err(err) => {
        tracing::warn!(
          error = %err,
          "alert listing failed, returning empty page"
        );
        AlertPage::empty(page, limit)
      }
    }
  }

  /// Full record or [`AdminError::NotFound`].
  pub async fn details(
    &self,
    alert_id: Uuid,
  ) -> Result<AlertEvent, AdminError> {
    self
      .store
      .get_alert(alert_id)
      .await
      .map_err(|e| AdminError::Store(Box::new(e)))?
      .ok_or(AdminError::NotFound(alert_id))
  }

  /// Mark the event resolved by `operator_id`. The one write that bypasses
  /// status aggregation; resolution is terminal and survives any
  /// late-arriving delivery outcome.
  pub async fn resolve(
    &self,
    alert_id: Uuid,
    operator_id: Uuid,
  ) -> Result<AlertEvent, AdminError> {
    let resolved = self
      .store
      .resolve_alert(alert_id, operator_id)
      .await
      .map_err(|e| AdminError::Store(Box::new(e)))?
      .ok_or(AdminError::NotFound(alert_id))?;

    tracing::info!(%alert_id, operator = %operator_id, "alert resolved");
    Ok(resolved)
  }
}

// ─── CSV export ──────────────────────────────────────────────────────────────

/// Render events as CSV — a pure read-side serialization of the same
/// listing, one row per event.
pub fn to_csv(events: &[AlertEvent]) -> String {
  let mut out = String::from(
    "alert_id,user_id,latitude,longitude,address,map_link,triggered_at,\
     status,resolved_at,resolved_by,contact1_phone,contact1_state,\
     contact2_phone,contact2_state\n",
  );

  for event in events {
    let fields = [
      event.alert_id.to_string(),
      event.user_id.to_string(),
      event.latitude.to_string(),
      event.longitude.to_string(),
      event.address.clone().unwrap_or_default(),
      event.map_link.clone(),
      event.triggered_at.to_rfc3339(),
      event.status.as_str().to_owned(),
      event
        .resolved_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_default(),
      event
        .resolved_by
        .map(|id| id.to_string())
        .unwrap_or_default(),
      event.deliveries[0].phone_number.clone(),
      event.deliveries[0].state.as_str().to_owned(),
      event.deliveries[1].phone_number.clone(),
      event.deliveries[1].state.as_str().to_owned(),
    ];

    let row: Vec<String> =
      fields.iter().map(|field| csv_field(field)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
  }

  out
}

fn csv_field(value: &str) -> String {
  if value.contains([',', '"', '\n']) {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_owned()
  }
}
