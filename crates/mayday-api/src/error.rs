//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use mayday_dispatch::{AdminError, TriggerError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The user must configure their contact pair before triggering.
  #[error("{0}")]
  ContactsNotConfigured(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::ContactsNotConfigured(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

impl From<TriggerError> for ApiError {
  fn from(err: TriggerError) -> Self {
    match err {
      TriggerError::InvalidLocation(e) => ApiError::BadRequest(e.to_string()),
      TriggerError::ContactsNotConfigured(_) => {
        ApiError::ContactsNotConfigured(err.to_string())
      }
      TriggerError::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<AdminError> for ApiError {
  fn from(err: AdminError) -> Self {
    match err {
      AdminError::NotFound(_) => ApiError::NotFound(err.to_string()),
      AdminError::Store(e) => ApiError::Store(e),
    }
  }
}
