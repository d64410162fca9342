use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: String,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedResponse {
    pub message: String,
    pub modified_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub message: String,
    pub deleted_count: u64,
}

pub fn success<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created(id: impl Into<String>, message: impl Into<String>) -> Response {
    let body = CreatedResponse {
        id: id.into(),
        message: message.into(),
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

pub fn error(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ApiErrorResponse {
        error: message.into(),
    };

    (status, Json(body)).into_response()
}
