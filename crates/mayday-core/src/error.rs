//! Error types for `mayday-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("exactly two emergency contacts are required, got {0}")]
  ContactCount(usize),

  #[error("contact {index}: {field} must not be empty")]
  EmptyField { index: usize, field: &'static str },

  #[error(
    "contact {index}: phone number must contain 10-15 digits, got {digits}"
  )]
  InvalidPhoneNumber { index: usize, digits: usize },

  #[error("latitude {0} is outside [-90, 90]")]
  InvalidLatitude(f64),

  #[error("longitude {0} is outside [-180, 180]")]
  InvalidLongitude(f64),

  #[error("unknown status literal: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
