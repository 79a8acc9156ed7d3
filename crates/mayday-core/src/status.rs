//! The status aggregation rule: two per-contact delivery states fold into
//! one event-level status.

use crate::alert::{ContactDeliveryRecord, DeliveryState, OverallStatus};

/// Fold the fixed record pair into the event-level status.
///
/// Total over every reachable combination. [`OverallStatus::Resolved`] is
/// never produced here — resolution is the one manual transition and is
/// guarded at the store, not recomputed.
pub fn aggregate(records: &[ContactDeliveryRecord; 2]) -> OverallStatus {
  let failed = records
    .iter()
    .filter(|r| r.state == DeliveryState::Failed)
    .count();

  match failed {
    2 => OverallStatus::Failed,
    1 => OverallStatus::PartialFailed,
    // No failures: a fully delivered pair and a pair with deliveries still
    // pending both read as SENT at the event level.
    _ => OverallStatus::Sent,
  }
}
