use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use landview_shared::search::InvalidSearch;
use thiserror::Error;

/// Request failures, rendered as `{"error": "..."}` with a 4xx status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid bbox `{0}`; expected west,south,east,north")]
    InvalidBbox(String),
    #[error("invalid limit `{0}`")]
    InvalidLimit(String),
    #[error(transparent)]
    InvalidSearch(#[from] InvalidSearch),
    #[error("parcel `{0}` not found")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(%status, error = %self, "request rejected");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
