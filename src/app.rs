use axum::{Json, Router, http::StatusCode, routing::get};
use sqlx::postgres::PgPoolOptions;
use std::{panic, process, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::cors;
use crate::services::auth::jwt::TokenKeys;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,user_auth_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        // (stderr can be hidden depending on how the process is launched.)
        tracing::error!(?info, "panic");

        // In development, fail fast: crash the whole process so we notice immediately.
        // In production, prefer the default behavior (stderr) and let the server keep running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), ApiError> {
    init_tracing();
    let config = Config::from_env().map_err(|e| {
        // Startup-fatal: never run without a signing secret or database.
        tracing::error!(error = %e, "invalid configuration");
        ApiError::from(e)
    })?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|_| ApiError::Internal)?;
    axum::serve(listener, app)
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState, ApiError> {
    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to database");
            ApiError::Internal
        })?;

    // The signing secret is read exactly once; TokenKeys is immutable after this.
    let tokens = Arc::new(TokenKeys::new(
        &config.jwt_secret,
        config.access_token_ttl_seconds,
    ));

    Ok(AppState::new(db, tokens))
}

fn build_router(state: AppState, config: &Config) -> Router {
    async fn banner() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "message": "Authentication API Server",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running",
        }))
    }

    // Produced by the router itself, not the error path; same shape by contract.
    async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "message": "Route not found",
            })),
        )
    }

    let router = Router::new()
        .route("/", get(banner))
        .nest("/api", api::v1::routes(state.clone()))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    cors::apply(router, config)
}
