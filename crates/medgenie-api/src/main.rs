//! MedGenie API Server
//!
//! REST API server for the MedGenie medical question-answering service.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use medgenie_api::{init_tracing, serve};
use medgenie_core::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Seed the environment from .env when present
    dotenv::dotenv().ok();

    let config = AppConfig::load();

    // Log with defaults when the configuration itself is broken
    match &config {
        Ok(config) => init_tracing(&config.logging),
        Err(_) => init_tracing(&LoggingConfig::default()),
    }

    let config = config.map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    });

    serve(config.context("Failed to load configuration")?).await
}
