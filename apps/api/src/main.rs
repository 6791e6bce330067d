mod admin;
mod analysis;
mod analysis_client;
mod cache;
mod config;
mod db;
mod drafts;
mod errors;
mod feedback;
mod models;
mod rate_limit;
mod routes;
mod state;
mod workflow;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis_client::HttpAnalysisEngine;
use crate::cache::RedisStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::rate_limit::RateLimits;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Checker API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize analysis engine client
    let engine = HttpAnalysisEngine::new(
        config.analysis_api_url.clone(),
        Duration::from_secs(config.analysis_api_timeout_secs),
    )?;
    info!(
        "Analysis engine client initialized ({}, timeout {}s)",
        config.analysis_api_url, config.analysis_api_timeout_secs
    );

    let window = Duration::from_millis(config.rate_limit_window_ms);
    let rate_limits = RateLimits::new(window, config.rate_limit_max_requests);
    let housekeeping = rate_limits.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(window.max(Duration::from_secs(1)));
        loop {
            tick.tick().await;
            housekeeping.retain_recent();
        }
    });

    let state = AppState {
        db,
        store: Arc::new(RedisStore::new(redis)),
        s3,
        engine: Arc::new(engine),
        rate_limits,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Permissive when CORS_ORIGINS is unset, otherwise an exact allow-list.
fn build_cors(config: &Config) -> Result<CorsLayer> {
    if config.cors_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    let origins = config
        .cors_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::permissive().allow_origin(origins))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "checker-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
