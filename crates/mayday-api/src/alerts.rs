//! Handler for `POST /users/{user_id}/alerts` — the SOS trigger.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use mayday_core::{
  gateway::MessageGateway,
  store::{AlertEventStore, ContactStore},
};
use mayday_dispatch::TriggerRequest;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TriggerBody {
  pub display_name: String,
  pub latitude:     f64,
  pub longitude:    f64,
  pub address:      Option<String>,
}

/// `POST /users/:user_id/alerts`
///
/// Responds 201 as soon as the event is persisted: the contacts are being
/// notified, not yet notified. Delivery continues in detached tasks.
pub async fn trigger<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<TriggerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContactStore + AlertEventStore + 'static,
  G: MessageGateway + 'static,
{
  let triggered = state
    .dispatcher
    .trigger(TriggerRequest {
      user_id,
      display_name: body.display_name,
      latitude: body.latitude,
      longitude: body.longitude,
      address: body.address,
    })
    .await?;

  Ok((StatusCode::CREATED, Json(triggered.into_event())))
}
