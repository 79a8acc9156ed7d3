//! Alert events and their embedded per-contact delivery records.
//!
//! An [`AlertEvent`] exclusively owns its two [`ContactDeliveryRecord`]s;
//! they have no identity or lifecycle outside the event. The records
//! snapshot the contact phone numbers at trigger time, so later edits to
//! the contact set never alter past alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, contact::EmergencyContactSet, status};

// ─── Delivery state ──────────────────────────────────────────────────────────

/// Delivery progress for a single contact within one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
  /// The dispatch attempt has been issued; no provider confirmation yet.
  Sent,
  Delivered,
  Failed,
}

impl DeliveryState {
  /// The stable wire literal.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Sent => "SENT",
      Self::Delivered => "DELIVERED",
      Self::Failed => "FAILED",
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Sent) }
}

// ─── Overall status ──────────────────────────────────────────────────────────

/// Event-level aggregate of both contacts' delivery states.
///
/// `SENT` at this level means fully delivered; downstream consumers key off
/// the exact literals, so the overloaded name is a stable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
  Sent,
  PartialFailed,
  Failed,
  Resolved,
}

impl OverallStatus {
  /// The stable wire literal, as persisted and exported.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Sent => "SENT",
      Self::PartialFailed => "PARTIAL_FAILED",
      Self::Failed => "FAILED",
      Self::Resolved => "RESOLVED",
    }
  }
}

impl std::str::FromStr for OverallStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "SENT" => Ok(Self::Sent),
      "PARTIAL_FAILED" => Ok(Self::PartialFailed),
      "FAILED" => Ok(Self::Failed),
      "RESOLVED" => Ok(Self::Resolved),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// A validated trigger location.
#[derive(Debug, Clone)]
pub struct Location {
  pub latitude:  f64,
  pub longitude: f64,
  pub address:   Option<String>,
}

impl Location {
  pub fn new(
    latitude: f64,
    longitude: f64,
    address: Option<String>,
  ) -> Result<Self> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
      return Err(Error::InvalidLatitude(latitude));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
      return Err(Error::InvalidLongitude(longitude));
    }
    let address = address.filter(|a| !a.trim().is_empty());
    Ok(Self { latitude, longitude, address })
  }

  /// Fixed-template map URL embedding the coordinates.
  pub fn map_link(&self) -> String {
    format!("https://maps.google.com/?q={},{}", self.latitude, self.longitude)
  }
}

// ─── Delivery records ────────────────────────────────────────────────────────

/// Delivery state for one contact, embedded in its owning [`AlertEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDeliveryRecord {
  /// Dialable number snapshotted from the contact set at trigger time.
  pub phone_number:      String,
  pub state:             DeliveryState,
  /// Opaque provider payload from the most recent attempt.
  pub provider_response: Option<String>,
  pub sent_at:           DateTime<Utc>,
  pub delivered_at:      Option<DateTime<Utc>>,
  pub failed_at:         Option<DateTime<Utc>>,
}

/// Terminal result of one send attempt, applied to a record by the store.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
  Delivered { provider_response: String, at: DateTime<Utc> },
  Failed { provider_response: String, at: DateTime<Utc> },
}

impl ContactDeliveryRecord {
  /// Apply a terminal outcome. A delivery after a failed first attempt
  /// keeps `failed_at` as a marker of that attempt.
  pub fn apply(&mut self, outcome: &DeliveryOutcome) {
    match outcome {
      DeliveryOutcome::Delivered { provider_response, at } => {
        self.state = DeliveryState::Delivered;
        self.delivered_at = Some(*at);
        self.provider_response = Some(provider_response.clone());
      }
      DeliveryOutcome::Failed { provider_response, at } => {
        self.state = DeliveryState::Failed;
        self.failed_at = Some(*at);
        self.provider_response = Some(provider_response.clone());
      }
    }
  }
}

// ─── AlertEvent ──────────────────────────────────────────────────────────────

/// One SOS trigger and its full delivery/resolution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
  pub alert_id:     Uuid,
  pub user_id:      Uuid,
  pub latitude:     f64,
  pub longitude:    f64,
  pub address:      Option<String>,
  pub map_link:     String,
  pub triggered_at: DateTime<Utc>,
  pub resolved_at:  Option<DateTime<Utc>>,
  pub resolved_by:  Option<Uuid>,
  pub status:       OverallStatus,
  /// Mirrors the contact set at trigger time; order is never reshuffled.
  pub deliveries:   [ContactDeliveryRecord; 2],
}

impl AlertEvent {
  /// Build a fresh event from a validated location and contact snapshot.
  ///
  /// Both delivery records start in [`DeliveryState::Sent`] with
  /// `sent_at = triggered_at`, and the overall status is aggregated from
  /// that initial pair.
  pub fn new(
    user_id: Uuid,
    location: Location,
    contacts: &EmergencyContactSet,
  ) -> Self {
    let now = Utc::now();
    let deliveries = contacts.contacts.clone().map(|c| ContactDeliveryRecord {
      phone_number:      c.dialable_number(),
      state:             DeliveryState::Sent,
      provider_response: None,
      sent_at:           now,
      delivered_at:      None,
      failed_at:         None,
    });
    let status = status::aggregate(&deliveries);

    Self {
      alert_id: Uuid::new_v4(),
      user_id,
      latitude: location.latitude,
      longitude: location.longitude,
      map_link: location.map_link(),
      address: location.address,
      triggered_at: now,
      resolved_at: None,
      resolved_by: None,
      status,
      deliveries,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::contact::Contact;

  fn contact_set(user_id: Uuid) -> EmergencyContactSet {
    EmergencyContactSet::new(
      user_id,
      vec![
        Contact {
          display_name: "Mom".into(),
          phone_number: "9998887777".into(),
          dialing_code: "+91".into(),
        },
        Contact {
          display_name: "Dad".into(),
          phone_number: "9997776666".into(),
          dialing_code: "+91".into(),
        },
      ],
    )
    .unwrap()
  }

  #[test]
  fn coordinate_bounds_are_inclusive() {
    assert!(Location::new(90.0, 180.0, None).is_ok());
    assert!(Location::new(-90.0, -180.0, None).is_ok());

    assert!(matches!(
      Location::new(90.01, 0.0, None).unwrap_err(),
      Error::InvalidLatitude(_)
    ));
    assert!(matches!(
      Location::new(0.0, -180.5, None).unwrap_err(),
      Error::InvalidLongitude(_)
    ));
    assert!(matches!(
      Location::new(f64::NAN, 0.0, None).unwrap_err(),
      Error::InvalidLatitude(_)
    ));
  }

  #[test]
  fn map_link_embeds_coordinates() {
    let location = Location::new(12.34, 56.78, None).unwrap();
    assert_eq!(location.map_link(), "https://maps.google.com/?q=12.34,56.78");
  }

  #[test]
  fn blank_address_is_dropped() {
    let location = Location::new(1.0, 2.0, Some("   ".into())).unwrap();
    assert!(location.address.is_none());

    let location =
      Location::new(1.0, 2.0, Some("12 Hill Road".into())).unwrap();
    assert_eq!(location.address.as_deref(), Some("12 Hill Road"));
  }

  #[test]
  fn new_event_starts_fully_pending() {
    let user = Uuid::new_v4();
    let set = contact_set(user);
    let event =
      AlertEvent::new(user, Location::new(12.34, 56.78, None).unwrap(), &set);

    assert_eq!(event.status, OverallStatus::Sent);
    assert_eq!(event.deliveries[0].phone_number, "+919998887777");
    assert_eq!(event.deliveries[1].phone_number, "+919997776666");
    for record in &event.deliveries {
      assert_eq!(record.state, DeliveryState::Sent);
      assert!(record.provider_response.is_none());
      assert_eq!(record.sent_at, event.triggered_at);
      assert!(record.delivered_at.is_none());
      assert!(record.failed_at.is_none());
    }
  }

  #[test]
  fn delivery_after_failure_keeps_failure_marker() {
    let user = Uuid::new_v4();
    let set = contact_set(user);
    let mut event =
      AlertEvent::new(user, Location::new(0.0, 0.0, None).unwrap(), &set);

    let failed_at = Utc::now();
    event.deliveries[0].apply(&DeliveryOutcome::Failed {
      provider_response: "number unreachable".into(),
      at:                failed_at,
    });
    assert_eq!(event.deliveries[0].state, DeliveryState::Failed);

    let delivered_at = Utc::now();
    event.deliveries[0].apply(&DeliveryOutcome::Delivered {
      provider_response: "queued".into(),
      at:                delivered_at,
    });

    let record = &event.deliveries[0];
    assert_eq!(record.state, DeliveryState::Delivered);
    assert_eq!(record.failed_at, Some(failed_at));
    assert_eq!(record.delivered_at, Some(delivered_at));
    assert_eq!(record.provider_response.as_deref(), Some("queued"));
  }

  #[test]
  fn status_literals_round_trip() {
    for status in [
      OverallStatus::Sent,
      OverallStatus::PartialFailed,
      OverallStatus::Failed,
      OverallStatus::Resolved,
    ] {
      assert_eq!(status.as_str().parse::<OverallStatus>().unwrap(), status);
    }
    assert!("sent".parse::<OverallStatus>().is_err());
  }
}
