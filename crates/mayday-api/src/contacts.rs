//! Handlers for `/users/{user_id}/contacts`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/users/:user_id/contacts` | Full-pair replacement |
//! | `GET`  | `/users/:user_id/contacts` | `configured: false` when absent |

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mayday_core::{
  contact::{Contact, EmergencyContactSet},
  store::ContactStore,
};

use crate::{ApiState, error::ApiError};

// ─── Save ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SaveBody {
  pub contacts: Vec<Contact>,
}

/// `PUT /users/:user_id/contacts` — body: `{"contacts": [..two entries..]}`.
///
/// Always a wholesale replacement; validation rejects anything but exactly
/// two well-formed contacts before the store is touched.
pub async fn save<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<SaveBody>,
) -> Result<Json<EmergencyContactSet>, ApiError>
where
  S: ContactStore,
{
  let set = EmergencyContactSet::new(user_id, body.contacts)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let stored = state
    .store
    .save_contacts(set)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(stored))
}

// ─── Get ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ContactsResponse {
  pub configured: bool,
  pub contacts:   Option<EmergencyContactSet>,
}

/// `GET /users/:user_id/contacts` — "not configured" is an expected state,
/// reported in-band rather than as a 404.
pub async fn get_one<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<ContactsResponse>, ApiError>
where
  S: ContactStore,
{
  let contacts = state
    .store
    .get_contacts(user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(ContactsResponse { configured: contacts.is_some(), contacts }))
}
