use std::sync::Arc;

use sqlx::PgPool;

use crate::services::auth::jwt::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(db: PgPool, tokens: Arc<TokenKeys>) -> Self {
        Self { db, tokens }
    }
}
