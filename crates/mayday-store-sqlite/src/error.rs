//! Error type for `mayday-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mayday_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column decode error: {0}")]
  Decode(String),

  /// Attempted to record a delivery outcome for an unknown event.
  #[error("alert event not found: {0}")]
  AlertNotFound(uuid::Uuid),

  #[error("no delivery record in slot {0}")]
  DeliverySlot(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
