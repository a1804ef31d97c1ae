//! Model listing handler.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::schema::response::ModelListResponse;
use crate::state::AppState;

/// Lists the open models.
///
/// `GET /models`
pub async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelListResponse>, ApiError> {
    let engine = state.engine.clone();
    let models = tokio::task::spawn_blocking(move || engine.list_models())
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))??;
    Ok(Json(ModelListResponse { models }))
}
