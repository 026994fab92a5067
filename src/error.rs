use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid task id: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Store(&'static str, #[source] anyhow::Error),
}

impl ApiError {
    /// Wraps a store failure, keeping `message` as the client-facing text.
    pub fn store(message: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
        move |err| ApiError::Store(message, err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(message, err) => {
                error!(error = %err, "{message}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn parse_task_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::InvalidId(raw.to_string()))
}
