//! Rate limiting middleware for the REST API
//!
//! Token bucket rate limiting with separate budgets per endpoint category:
//! - General reads (search, prices, risks): general_rate_limit (default 100/s)
//! - Tariff calculations: calculate_rate_limit (default 20/s)
//! - Auth endpoints: auth_rate_limit (default 5/s), kept low to slow
//!   credential stuffing

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limit category for different endpoint types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitType {
    /// Search, price history, forecasts, risks
    General,
    /// Landed cost calculations
    Calculate,
    /// Register, login, logout, password change
    Auth,
}

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (requests) allowed per period
    capacity: u32,
    /// Current available tokens
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_second: u32) -> Self {
        Self {
            capacity: rate_per_second,
            tokens: rate_per_second as f64,
            refill_rate: rate_per_second as f64,
            last_refill: Instant::now(),
        }
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        // Refill tokens based on elapsed time
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let refill_amount = elapsed.as_secs_f64() * self.refill_rate;

        self.tokens = (self.tokens + refill_amount).min(self.capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.refill_rate)
        }
    }
}

/// Shared rate limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    limiters: Mutex<HashMap<RateLimitType, TokenBucket>>,
}

impl RateLimiterState {
    pub fn new(general_rate: u32, calculate_rate: u32, auth_rate: u32) -> Self {
        let mut limiters = HashMap::new();
        limiters.insert(RateLimitType::General, TokenBucket::new(general_rate));
        limiters.insert(RateLimitType::Calculate, TokenBucket::new(calculate_rate));
        limiters.insert(RateLimitType::Auth, TokenBucket::new(auth_rate));

        Self {
            limiters: Mutex::new(limiters),
        }
    }

    /// Try to acquire a token for the given category
    pub fn try_acquire(&self, rate_type: RateLimitType) -> bool {
        let mut limiters = self.limiters.lock();
        match limiters.get_mut(&rate_type) {
            Some(limiter) => limiter.try_acquire(),
            None => true,
        }
    }

    /// Get time until the category allows a request
    pub fn time_until_available(&self, rate_type: RateLimitType) -> Duration {
        let limiters = self.limiters.lock();
        match limiters.get(&rate_type) {
            Some(limiter) => limiter.time_until_available(),
            None => Duration::ZERO,
        }
    }
}

/// Determine the rate limit category from the request path
pub fn get_rate_limit_type(path: &str) -> RateLimitType {
    if path.contains("/auth/") {
        return RateLimitType::Auth;
    }
    if path.contains("/tariffs/calculate") {
        return RateLimitType::Calculate;
    }
    RateLimitType::General
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let rate_type = get_rate_limit_type(&path);

    if !state.try_acquire(rate_type) {
        let wait_time = state.time_until_available(rate_type);
        tracing::warn!(
            "Rate limit exceeded for {:?}, path: {}, retry after {:?}ms",
            rate_type,
            path,
            wait_time.as_millis()
        );
        return rate_limit_response(wait_time, &format!("{:?}", rate_type).to_lowercase());
    }

    next.run(request).await
}

/// Create a rate limit exceeded response
fn rate_limit_response(retry_after: Duration, limit_type: &str) -> Response {
    let retry_seconds = retry_after.as_secs_f64().ceil() as u64;

    let body = Json(json!({
        "code": "RATE_LIMITED",
        "message": format!(
            "Rate limit exceeded for {}. Please retry after {} seconds.",
            limit_type, retry_seconds
        ),
        "retry_after_ms": retry_after.as_millis() as u64,
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();

    if let Ok(value) = retry_seconds.to_string().parse() {
        response.headers_mut().insert("Retry-After", value);
    }
    if let Ok(value) = limit_type.parse() {
        response.headers_mut().insert("X-RateLimit-Type", value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_bucket_basic() {
        let mut bucket = TokenBucket::new(10); // 10 per second

        // Should allow first 10 requests
        for _ in 0..10 {
            assert!(bucket.try_acquire());
        }

        // 11th should fail
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_token_bucket_refill() {
        let mut bucket = TokenBucket::new(100);

        for _ in 0..100 {
            bucket.try_acquire();
        }
        assert!(!bucket.try_acquire());

        // Simulate time passing (force refill)
        bucket.last_refill = Instant::now() - Duration::from_millis(100);

        // Should have ~10 tokens now (100/s * 0.1s)
        for _ in 0..10 {
            assert!(bucket.try_acquire());
        }
    }

    #[test]
    fn test_rate_limit_type_detection() {
        assert_eq!(
            get_rate_limit_type("/api/v1/auth/login"),
            RateLimitType::Auth
        );
        assert_eq!(
            get_rate_limit_type("/api/v1/auth/register"),
            RateLimitType::Auth
        );
        assert_eq!(
            get_rate_limit_type("/api/v1/tariffs/calculate"),
            RateLimitType::Calculate
        );
        assert_eq!(
            get_rate_limit_type("/api/v1/hscodes/search"),
            RateLimitType::General
        );
        assert_eq!(get_rate_limit_type("/health"), RateLimitType::General);
    }

    #[test]
    fn test_categories_have_independent_budgets() {
        let state = RateLimiterState::new(100, 20, 2);

        // Drain the auth budget
        assert!(state.try_acquire(RateLimitType::Auth));
        assert!(state.try_acquire(RateLimitType::Auth));
        assert!(!state.try_acquire(RateLimitType::Auth));

        // General requests still pass
        assert!(state.try_acquire(RateLimitType::General));
        assert!(state.time_until_available(RateLimitType::Auth) > Duration::ZERO);
    }
}
