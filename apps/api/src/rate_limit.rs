//! Per-client request budgets for the public write endpoints.
//!
//! Clients are keyed by peer IP. Uploads get half the general budget.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub const RATE_LIMITED_MESSAGE: &str = "You have exceeded the rate limit. Please try again later.";
pub const UPLOAD_RATE_LIMITED_MESSAGE: &str =
    "You have exceeded the upload rate limit. Please try again later.";

type ClientLimiter = DefaultKeyedRateLimiter<String>;

#[derive(Clone)]
pub struct RateLimits {
    general: Arc<ClientLimiter>,
    upload: Arc<ClientLimiter>,
}

impl RateLimits {
    /// `max_requests` per `window` for general writes; uploads get half (at least one).
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            general: Arc::new(keyed(window, max_requests)),
            upload: Arc::new(keyed(window, max_requests / 2)),
        }
    }

    /// Drops per-client state that has fully replenished.
    pub fn retain_recent(&self) {
        self.general.retain_recent();
        self.upload.retain_recent();
    }
}

/// A burst of `max` that refills evenly across `window`.
fn keyed(window: Duration, max: u32) -> ClientLimiter {
    let burst = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst);
    RateLimiter::keyed(quota)
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn check(limiter: &ClientLimiter, request: &Request, message: &str) -> Result<(), AppError> {
    let client = client_key(request);
    if limiter.check_key(&client).is_err() {
        warn!("Rate limit exceeded for {client} on {}", request.uri().path());
        return Err(AppError::RateLimited(message.to_string()));
    }
    Ok(())
}

/// Route layer for `POST /api/resume/analyze`.
pub async fn limit_uploads(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check(&state.rate_limits.upload, &request, UPLOAD_RATE_LIMITED_MESSAGE)?;
    Ok(next.run(request).await)
}

/// Route layer for the other public writes.
pub async fn limit_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check(&state.rate_limits.general, &request, RATE_LIMITED_MESSAGE)?;
    Ok(next.run(request).await)
}
