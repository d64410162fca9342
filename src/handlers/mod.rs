use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use tracing::error;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod events;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    if let Err(e) = state.store.ping().await {
        error!(error = ?e, "Health check failed");
        return Err(AppError::Unavailable("Database unavailable".to_string()));
    }

    Ok(success(HealthPayload {
        status: "ok",
        service: "events-api",
    }))
}
