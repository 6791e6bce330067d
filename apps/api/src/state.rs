use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::analysis_client::AnalysisEngine;
use crate::cache::KeyValueStore;
use crate::config::Config;
use crate::rate_limit::RateLimits;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Analysis status/result cache and drafts. Redis in production.
    pub store: Arc<dyn KeyValueStore>,
    pub s3: S3Client,
    /// Pluggable analysis engine. Default: HttpAnalysisEngine against ANALYSIS_API_URL.
    pub engine: Arc<dyn AnalysisEngine>,
    pub rate_limits: RateLimits,
    pub config: Config,
}
