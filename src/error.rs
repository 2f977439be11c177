use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Everything a request handler can fail with. Validation problems map to
/// 4xx, store problems to 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("missing webhook signature")]
    MissingSignature,

    #[error("webhook signature verification failed")]
    InvalidSignature,

    #[error("unsupported event kind `{0}`")]
    UnsupportedEvent(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("event store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingHeader(_)
            | AppError::UnsupportedEvent(_)
            | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::MissingSignature | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store failures are logged in full but not echoed to the caller.
        let message = match &self {
            AppError::Store(err) => {
                error!("event store error: {err}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
