//! Batch execution handler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use tessera_core::UserId;

use crate::error::{ApiError, BatchFailure};
use crate::schema::batch::BatchRequest;
use crate::schema::response::BatchResponse;
use crate::state::AppState;

/// Header naming the acting user. Batches without it run as the anonymous
/// user and record no contributor.
pub const USER_HEADER: &str = "x-user-id";

/// Runs a batch of operations against one model.
///
/// `POST /batch`
pub async fn run_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, BatchFailure> {
    let user = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::from);

    // The engine takes blocking locks; keep it off the async workers.
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || engine.execute(req, user))
        .await
        .map_err(|e| BatchFailure::on_commit(ApiError::InternalError(e.to_string())))?
        .map(Json)
}
