//! Global rate limiting using a token bucket

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use subquery_common::config::RateLimitConfig;
use subquery_common::errors::{AppError, Result};

/// Limiter shared by every request
#[derive(Clone)]
pub struct GlobalRateLimiter {
    limiter: Arc<DefaultDirectRateLimiter>,
    requests_per_second: u32,
}

impl GlobalRateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            AppError::Configuration {
                message: "rate_limit.requests_per_second must be greater than zero".to_string(),
            }
        })?;
        let burst = NonZeroU32::new(config.burst).ok_or_else(|| AppError::Configuration {
            message: "rate_limit.burst must be greater than zero".to_string(),
        })?;

        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(
                Quota::per_second(per_second).allow_burst(burst),
            )),
            requests_per_second: config.requests_per_second,
        })
    }

    pub fn check(&self) -> Result<()> {
        self.limiter.check().map_err(|_| AppError::RateLimited {
            limit: self.requests_per_second,
        })
    }
}

/// Reject requests over the configured rate
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            err.into_response()
        }
    }
}
