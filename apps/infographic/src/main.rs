mod config;
mod errors;
mod generation;
mod graph;
mod infographic;
mod layout;
mod models;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::GenerationClient;
use crate::layout::Typesetter;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, S3BlobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Infographic API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize layout generation client
    let generator = GenerationClient::new(
        config.generation_endpoint.clone(),
        config.generation_timeout,
    )?;
    info!(
        "Layout generator at {} (timeout {:?})",
        config.generation_endpoint, config.generation_timeout
    );

    let typesetter = Typesetter::dejavu_sans()?;

    let state = AppState {
        generator,
        store: Arc::new(S3BlobStore::new(s3)),
        typesetter,
        bucket: config.s3_bucket.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
