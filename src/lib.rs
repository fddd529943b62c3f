//! TradeEasy Analytics
//!
//! A commodity trade analytics service over SQLite:
//! - HS code directory with search and popularity tracking
//! - Historical price series with volume overlays and comparisons
//! - Price forecasts with horizon-based confidence decay
//! - U.S. tariff and landed cost calculations (duty, MPF, HMF)
//! - Trade risk alerts with affected codes, regions and mitigations
//! - Live quote feed with a deterministic mock fallback
//!
//! Everything is exposed through a versioned REST API (axum) with bearer
//! token sessions and per-category rate limiting.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod scheduler;
pub mod security;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
