//! REST API module
//!
//! Provides:
//! - Health check (/health)
//! - Versioned REST API (/api/v1/*): HS code directory, price history and
//!   comparison, forecasts, tariff calculations, risk alerts, auth and
//!   per-user watchlists
//! - Category-based token bucket rate limiting

mod server;
pub mod handlers;
pub mod rate_limiter;
mod types;

pub use server::ApiServer;
pub use types::{
    ChangePasswordRequest, CompareRequest, HealthResponse, LoginRequest, LoginResponse,
    MessageResponse, RegisterRequest, UserResponse, WatchlistResponse,
};
