//! The `ContactStore` and `AlertEventStore` traits and supporting query
//! types.
//!
//! The traits are implemented by storage backends (e.g.
//! `mayday-store-sqlite`). Higher layers (`mayday-dispatch`, `mayday-api`)
//! depend on these abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  alert::{AlertEvent, DeliveryOutcome, OverallStatus},
  contact::EmergencyContactSet,
};

/// Page size used when a listing query does not name one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Hard ceiling on a single listing page.
pub const MAX_PAGE_LIMIT: u32 = 100;

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`AlertEventStore::list_alerts`].
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
  pub status:  Option<OverallStatus>,
  /// Restrict to events triggered on this calendar day (UTC).
  pub on_day:  Option<NaiveDate>,
  pub user_id: Option<Uuid>,
  /// 1-based page number; defaults to 1.
  pub page:    Option<u32>,
  pub limit:   Option<u32>,
}

/// One page of [`AlertEventStore::list_alerts`] results, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPage {
  pub events: Vec<AlertEvent>,
  pub page:   u32,
  pub limit:  u32,
  /// Total matching events across all pages.
  pub total:  u64,
}

impl AlertPage {
  /// The well-formed empty page that operator reads degrade to.
  pub fn empty(page: u32, limit: u32) -> Self {
    Self { events: Vec::new(), page, limit, total: 0 }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Persistence for each user's emergency contact pair.
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Replace the stored pair for `set.user_id` wholesale. Idempotent
  /// upsert; the set is validated at construction, so no ill-formed pair
  /// can reach this method.
  fn save_contacts(
    &self,
    set: EmergencyContactSet,
  ) -> impl Future<Output = Result<EmergencyContactSet, Self::Error>> + Send + '_;

  /// The stored pair, or `None` when the user has not configured contacts.
  /// Callers must treat `None` as a distinct, expected state — not an
  /// error.
  fn get_contacts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<EmergencyContactSet>, Self::Error>>
  + Send
  + '_;
}

/// Persistence for alert events and their embedded delivery records.
pub trait AlertEventStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a freshly-triggered event atomically, both delivery records
  /// included.
  fn create_alert(
    &self,
    event: AlertEvent,
  ) -> impl Future<Output = Result<AlertEvent, Self::Error>> + Send + '_;

  /// Retrieve an event by id. Returns `None` if not found.
  fn get_alert(
    &self,
    alert_id: Uuid,
  ) -> impl Future<Output = Result<Option<AlertEvent>, Self::Error>> + Send + '_;

  /// Apply a terminal delivery outcome to the record in `slot` (0 or 1)
  /// and recompute the overall status, as one atomic read-modify-write
  /// scoped to the event row. The status write is skipped when the event
  /// is already resolved. Returns the updated event.
  fn apply_delivery_outcome(
    &self,
    alert_id: Uuid,
    slot: usize,
    outcome: DeliveryOutcome,
  ) -> impl Future<Output = Result<AlertEvent, Self::Error>> + Send + '_;

  /// Filtered, paginated listing, `triggered_at` descending.
  fn list_alerts<'a>(
    &'a self,
    query: &'a AlertQuery,
  ) -> impl Future<Output = Result<AlertPage, Self::Error>> + Send + 'a;

  /// Mark the event resolved by `operator_id`, overwriting whatever
  /// aggregated status was present. Returns `None` when the event does
  /// not exist.
  fn resolve_alert(
    &self,
    alert_id: Uuid,
    operator_id: Uuid,
  ) -> impl Future<Output = Result<Option<AlertEvent>, Self::Error>> + Send + '_;
}
