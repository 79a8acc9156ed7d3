//! JSON REST API for Mayday.
//!
//! Exposes an axum [`Router`] backed by any store implementing the core
//! traits. Auth, TLS, and transport concerns are the caller's
//! responsibility: user and operator ids arrive already authenticated.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mayday_api::api_router(state))
//! ```

pub mod admin;
pub mod alerts;
pub mod contacts;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use mayday_core::{
  gateway::MessageGateway,
  store::{AlertEventStore, ContactStore},
};
use mayday_dispatch::{AlertAdminService, AlertDispatcher};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, G> {
  pub store:      Arc<S>,
  pub dispatcher: Arc<AlertDispatcher<S, G>>,
  pub admin:      Arc<AlertAdminService<S>>,
}

impl<S, G> Clone for ApiState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      dispatcher: Arc::clone(&self.dispatcher),
      admin:      Arc::clone(&self.admin),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S, G>(state: ApiState<S, G>) -> Router<()>
where
  S: ContactStore + AlertEventStore + 'static,
  G: MessageGateway + 'static,
{
  Router::new()
    // Contacts
    .route(
      "/users/{user_id}/contacts",
      put(contacts::save::<S, G>).get(contacts::get_one::<S, G>),
    )
    // Alerts
    .route("/users/{user_id}/alerts", post(alerts::trigger::<S, G>))
    // Admin
    .route("/admin/alerts", get(admin::list::<S, G>))
    .route("/admin/alerts/export", get(admin::export::<S, G>))
    .route("/admin/alerts/{id}", get(admin::details::<S, G>))
    .route("/admin/alerts/{id}/resolve", post(admin::resolve::<S, G>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
