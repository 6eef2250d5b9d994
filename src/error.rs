use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;

/// Application error type. One variant per failure kind the API can
/// surface; `IntoResponse` below is the single place that translates
/// internal failures into the client-visible JSON contract.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authorization header absent or not of the form `Bearer <token>`.
    #[error("Not authorized to access this route. Please provide a valid token.")]
    MissingToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    /// Verification failed for a reason other than a bad or expired token.
    /// The cause is logged at the point of failure and never reaches the client.
    #[error("Server error during token verification")]
    AuthVerification,

    /// One message per invalid request field, in field order.
    #[error("Validation error")]
    Validation(Vec<String>),

    /// Unique-constraint conflict; the payload is the conflicting field name.
    #[error("A user with this {0} already exists")]
    Duplicate(String),

    /// An error that carries its own status code and message.
    #[error("{1}")]
    Status(StatusCode, String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken | ApiError::TokenExpired | ApiError::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AuthVerification | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::Status(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log the raw error before responding so nothing disappears silently.
        if status.is_server_error() {
            tracing::error!(status = %status, error = ?self, "request failed");
        } else {
            tracing::warn!(status = %status, error = ?self, "request rejected");
        }

        let errors = match &self {
            ApiError::Validation(messages) => Some(messages.clone()),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(field) => ApiError::Duplicate(field),
            RepoError::Db(e) => {
                tracing::error!(error = %e, "database error");
                ApiError::Internal
            }
        }
    }
}
