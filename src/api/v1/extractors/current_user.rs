use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

/// The authenticated principal for the current request.
///
/// Created by the bearer-auth middleware after successful verification and
/// stored in request extensions; lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
}

impl CurrentUser {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent means the route was not wired through the gate.
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::MissingToken)
    }
}
