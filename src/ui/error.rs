//! JSON error responses for the UI.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{JobError, SpaceOdtError};

/// Handler error rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub SpaceOdtError);

/// Handler result.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

macro_rules! api_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    Self(err.into())
                }
            }
        )*
    };
}

api_error_from!(
    SpaceOdtError,
    crate::error::InputError,
    crate::error::PlanError,
    JobError,
    serde_json::Error,
);

impl ApiError {
    /// HTTP status for the wrapped error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match &self.0 {
            SpaceOdtError::Job(JobError::NotFound { .. } | JobError::ResultNotAvailable { .. }) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(error = %self.0, %status, "UI request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
