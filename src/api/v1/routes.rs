use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::auth::{login, me, register};
use crate::middleware::bearer_auth;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login));

    // Only /auth/me goes through the bearer gate.
    let protected = bearer_auth::apply(
        Router::new().route("/auth/me", get(me)),
        state.tokens.clone(),
    );

    public.merge(protected).with_state(state)
}
