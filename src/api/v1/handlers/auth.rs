use axum::{Json, extract::State, http::StatusCode};

use crate::api::v1::dto::auth::{
    AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UserResponse,
};
use crate::api::v1::extractors::CurrentUser;
use crate::error::ApiError;
use crate::repos::user_repo::{self, NewUser};
use crate::services::auth::password;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    req.validate().map_err(ApiError::Validation)?;

    let password_hash = password::hash(&req.password).await?;

    let row = user_repo::create(
        &state.db,
        NewUser {
            username: req.username.trim(),
            email: req.email.trim(),
            password_hash: &password_hash,
            first_name: req.first_name.as_deref(),
            last_name: req.last_name.as_deref(),
        },
    )
    .await?;

    tracing::info!(user_id = %row.id, "user registered");

    let token = state.tokens.sign(row.id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: UserResponse::from(row),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate().map_err(ApiError::Validation)?;

    // Same response for unknown email and wrong password; do not reveal
    // which one failed.
    let invalid_credentials =
        || ApiError::Status(StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let row = user_repo::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    if !password::verify(&req.password, &row.password_hash).await? {
        return Err(invalid_credentials());
    }

    tracing::info!(user_id = %row.id, "user logged in");

    let token = state.tokens.sign(row.id)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserResponse::from(row),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let row = user_repo::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::Status(StatusCode::NOT_FOUND, "User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: UserResponse::from(row),
    }))
}
