//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axiom_core::IngestError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// An invalid query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The kernel refused an input event.
    #[error("input refused: {0}")]
    Refused(#[from] IngestError),

    /// The kernel is not accepting submissions.
    #[error("kernel unavailable: {0}")]
    Unavailable(String),
}

impl ObserverError {
    const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidQuery(_) | Self::Refused(IngestError::OutOfRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Refused(IngestError::Halted) | Self::Unavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Refused(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
