use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use hearth_db::Store;
use hearth_types::api::HealthResponse;

pub async fn health(State(store): State<Arc<Store>>) -> Result<impl IntoResponse, StatusCode> {
    let stats = store.stats().map_err(|e| {
        error!("Health check failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        counts: stats.counts,
    }))
}
