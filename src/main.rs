mod api;
mod app;
mod config;
mod error;
mod middleware;
mod repos;
mod services;
mod state;

use crate::error::ApiError;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    app::run().await
}
