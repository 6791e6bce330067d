use anyhow::{Context, Result};

use crate::admin::permissions::{parse_permission_list, Permission};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub analysis_api_url: String,
    pub analysis_api_timeout_secs: u64,
    pub admin_api_key: String,
    pub admin_permissions: Vec<Permission>,
    /// Empty means permissive CORS.
    pub cors_origins: Vec<String>,
    pub rate_limit_window_ms: u64,
    /// Per client and window on public writes; uploads get half.
    pub rate_limit_max_requests: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let admin_permissions = match std::env::var("ADMIN_PERMISSIONS") {
            Ok(raw) => parse_permission_list(&raw).context("ADMIN_PERMISSIONS is invalid")?,
            Err(_) => Permission::ALL.to_vec(),
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            analysis_api_url: require_env("ANALYSIS_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            analysis_api_timeout_secs: std::env::var("ANALYSIS_API_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("ANALYSIS_API_TIMEOUT_SECS must be a number of seconds")?,
            admin_api_key: require_env("ADMIN_API_KEY")?,
            admin_permissions,
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or_default(),
            rate_limit_window_ms: std::env::var("RATE_LIMIT_WINDOW_MS")
                .unwrap_or_else(|_| "60000".to_string())
                .parse::<u64>()
                .context("RATE_LIMIT_WINDOW_MS must be a number of milliseconds")?,
            rate_limit_max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse::<u32>()
                .context("RATE_LIMIT_MAX_REQUESTS must be a positive number")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Comma-separated origins, trimmed, trailing slashes removed.
fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
