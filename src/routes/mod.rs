use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode};
use axum::middleware::map_response;
use axum::response::Response;
use axum::routing::{get, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, Config};
use crate::handlers::events::{
    create_event, delete_event, get_events, missing_event_id, update_event,
};
use crate::handlers::health_check;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::error as error_response;

pub const API_BASE_PATH: &str = "/api/v3/app";
pub const UPLOADS_PATH: &str = "/uploads";

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let events = Router::new()
        .route("/events", get(get_events).post(create_event))
        .route("/events/", put(missing_event_id).delete(missing_event_id))
        .route("/events/:id", put(update_event).delete(delete_event));

    let uploads = ServeDir::new(state.uploads.dir());

    Router::new()
        .route("/health", get(health_check))
        .nest(API_BASE_PATH, events)
        .nest_service(UPLOADS_PATH, uploads)
        .fallback(route_not_found)
        .layer(map_response(method_not_allowed_envelope))
        .layer(DefaultBodyLimit::max(config.uploads.max_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(&config.http.cors_allowed_origins))
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Gives 405s from method routing the JSON error body, keeping `Allow`.
async fn method_not_allowed_envelope(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let mut envelope = error_response("Method not allowed", StatusCode::METHOD_NOT_ALLOWED);
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            envelope.headers_mut().append(name.clone(), value.clone());
        }
    }
    envelope
}
