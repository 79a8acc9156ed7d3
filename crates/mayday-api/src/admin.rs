//! Handlers for the operator surface under `/admin/alerts`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/alerts` | Filtered, paginated; degrades to empty |
//! | `GET`  | `/admin/alerts/export` | Same query, `text/csv` |
//! | `GET`  | `/admin/alerts/:id` | 404 if unknown |
//! | `POST` | `/admin/alerts/:id/resolve` | Body: `{"operator_id": ...}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use mayday_core::{
  alert::{AlertEvent, OverallStatus},
  store::{AlertEventStore, AlertPage, AlertQuery},
};

use crate::{ApiState, error::ApiError};

// ─── Query parameters ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:  Option<OverallStatus>,
  pub on_day:  Option<NaiveDate>,
  pub user_id: Option<Uuid>,
  pub page:    Option<u32>,
  pub limit:   Option<u32>,
}

impl ListParams {
  fn into_query(self) -> AlertQuery {
    AlertQuery {
      status:  self.status,
      on_day:  self.on_day,
      user_id: self.user_id,
      page:    self.page,
      limit:   self.limit,
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /admin/alerts` — never errors; a failing store yields an empty
/// page.
pub async fn list<S, G>(
  State(state): State<ApiState<S, G>>,
  Query(params): Query<ListParams>,
) -> Json<AlertPage>
where
  S: AlertEventStore,
{
  Json(state.admin.list(&params.into_query()).await)
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// `GET /admin/alerts/export` — the same listing serialised as CSV.
pub async fn export<S, G>(
  State(state): State<ApiState<S, G>>,
  Query(params): Query<ListParams>,
) -> impl IntoResponse
where
  S: AlertEventStore,
{
  let page = state.admin.list(&params.into_query()).await;
  let csv = mayday_dispatch::admin::to_csv(&page.events);
  ([(header::CONTENT_TYPE, "text/csv")], csv)
}

// ─── Details ──────────────────────────────────────────────────────────────────

/// `GET /admin/alerts/:id`
pub async fn details<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AlertEvent>, ApiError>
where
  S: AlertEventStore,
{
  Ok(Json(state.admin.details(id).await?))
}

// ─── Resolve ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub operator_id: Uuid,
}

/// `POST /admin/alerts/:id/resolve`
pub async fn resolve<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ResolveBody>,
) -> Result<Json<AlertEvent>, ApiError>
where
  S: AlertEventStore,
{
  Ok(Json(state.admin.resolve(id, body.operator_id).await?))
}
