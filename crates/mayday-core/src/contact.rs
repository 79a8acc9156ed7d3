//! Emergency contacts — the fixed pair every user registers before an
//! alert can be triggered.
//!
//! The pair is always written as a whole: there is no partial patch of a
//! single contact, and no representation for any count other than two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A single emergency contact as entered by the owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub display_name: String,
  pub phone_number: String,
  pub dialing_code: String,
}

impl Contact {
  /// The phone number with every non-digit character stripped.
  pub fn normalized_number(&self) -> String {
    self.phone_number.chars().filter(char::is_ascii_digit).collect()
  }

  /// Dialing code prefixed to the normalized number, e.g. `+919998887777`.
  /// This is the form snapshotted into alert delivery records.
  pub fn dialable_number(&self) -> String {
    format!("{}{}", self.dialing_code.trim(), self.normalized_number())
  }

  fn validate(&self, index: usize) -> Result<()> {
    if self.display_name.trim().is_empty() {
      return Err(Error::EmptyField { index, field: "display_name" });
    }
    if self.phone_number.trim().is_empty() {
      return Err(Error::EmptyField { index, field: "phone_number" });
    }
    if self.dialing_code.trim().is_empty() {
      return Err(Error::EmptyField { index, field: "dialing_code" });
    }
    let digits = self.normalized_number().len();
    if !(10..=15).contains(&digits) {
      return Err(Error::InvalidPhoneNumber { index, digits });
    }
    Ok(())
  }
}

// ─── EmergencyContactSet ─────────────────────────────────────────────────────

/// The validated contact pair for one user.
///
/// [`EmergencyContactSet::new`] is the boundary every create/update goes
/// through, so a pair with the wrong count, an empty field, or a malformed
/// number never reaches a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContactSet {
  pub user_id:    Uuid,
  /// Stored and returned in the order the user supplied them.
  pub contacts:   [Contact; 2],
  pub updated_at: DateTime<Utc>,
}

impl EmergencyContactSet {
  /// Validate `contacts` and build the set. The first violation found is
  /// the one reported.
  pub fn new(user_id: Uuid, contacts: Vec<Contact>) -> Result<Self> {
    let count = contacts.len();
    let pair: [Contact; 2] =
      contacts.try_into().map_err(|_| Error::ContactCount(count))?;

    for (index, contact) in pair.iter().enumerate() {
      contact.validate(index)?;
    }

    Ok(Self { user_id, contacts: pair, updated_at: Utc::now() })
  }
}
