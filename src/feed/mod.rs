//! Live quote feed with mock fallback
//!
//! A quote request races the upstream against a timeout. The first failure
//! trips a one-shot latch and every later request serves mock data until a
//! health probe sees the upstream again, so a dead upstream costs one
//! timeout instead of one per request.

use crate::db::Db;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Live,
    Mock,
}

/// A spot quote for an HS code
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub hs_code: String,
    pub price: f64,
    pub currency: String,
    pub as_of: String,
    pub source: QuoteSource,
}

#[derive(Debug, Deserialize)]
struct UpstreamQuote {
    price: f64,
    #[serde(default)]
    currency: Option<String>,
}

/// Quote feed with upstream client and fallback latch
pub struct PriceFeed {
    db: Arc<Db>,
    client: reqwest::Client,
    feed_url: Option<String>,
    timeout: Duration,
    mock_only: bool,
    /// Set after an upstream failure; cleared by a successful health probe
    degraded: AtomicBool,
}

impl PriceFeed {
    pub fn new(db: Arc<Db>, feed_url: Option<String>, timeout_ms: u64, mock_only: bool) -> Self {
        Self {
            db,
            client: reqwest::Client::new(),
            feed_url,
            timeout: Duration::from_millis(timeout_ms),
            mock_only,
            degraded: AtomicBool::new(false),
        }
    }

    /// True while quotes are served from mock data after an upstream failure
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Latest quote for a code, live when possible, mock otherwise
    pub async fn latest_quote(&self, hs_code: &str) -> Result<Quote> {
        let url = match &self.feed_url {
            Some(url) if !self.mock_only && !self.is_degraded() => url.clone(),
            _ => return self.mock_quote(hs_code),
        };

        match self.fetch_live(&url, hs_code).await {
            Ok(quote) => Ok(quote),
            Err(e) => {
                // One-shot latch: later requests skip the live attempt
                // until a health probe succeeds.
                self.degraded.store(true, Ordering::Relaxed);
                warn!("Quote upstream failed, switching to mock data: {}", e);
                self.mock_quote(hs_code)
            }
        }
    }

    async fn fetch_live(&self, base_url: &str, hs_code: &str) -> Result<Quote> {
        let url = format!("{}/quotes/{}", base_url.trim_end_matches('/'), hs_code);

        let request = self.client.get(&url).send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| AppError::Upstream(format!("Quote request timed out after {:?}", self.timeout)))??;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Quote upstream returned {}",
                response.status()
            )));
        }

        let upstream: UpstreamQuote = response.json().await?;

        Ok(Quote {
            hs_code: hs_code.to_string(),
            price: upstream.price,
            currency: upstream.currency.unwrap_or_else(|| "USD".to_string()),
            as_of: chrono::Utc::now().to_rfc3339(),
            source: QuoteSource::Live,
        })
    }

    /// Deterministic pseudo-random quote derived from the latest stored price.
    /// Seeded by (code, date) so repeated calls on the same day agree.
    fn mock_quote(&self, hs_code: &str) -> Result<Quote> {
        let latest = self
            .db
            .get_latest_price(hs_code)?
            .ok_or_else(|| AppError::NotFound(format!("No price data for HS code {}", hs_code)))?;

        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let jitter = Self::jitter_fraction(hs_code, &today);
        let price = (latest.price * (1.0 + jitter) * 100.0).round() / 100.0;

        Ok(Quote {
            hs_code: hs_code.to_string(),
            price,
            currency: latest.currency,
            as_of: today,
            source: QuoteSource::Mock,
        })
    }

    /// Stable fraction in [-0.02, 0.02] from a seed string
    fn jitter_fraction(hs_code: &str, date: &str) -> f64 {
        let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
        for b in hs_code.bytes().chain(date.bytes()) {
            acc ^= b as u64;
            acc = acc.wrapping_mul(0x0000_0100_0000_01b3);
        }
        ((acc % 401) as f64 - 200.0) / 10_000.0
    }

    /// Probe the upstream health endpoint, clearing the latch on success
    pub async fn health_check(&self) -> bool {
        let url = match &self.feed_url {
            Some(url) if !self.mock_only => format!("{}/health", url.trim_end_matches('/')),
            _ => return false,
        };

        let probe = self.client.get(&url).send();
        let healthy = match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        };

        if healthy && self.is_degraded() {
            info!("Quote upstream recovered, resuming live quotes");
            self.degraded.store(false, Ordering::Relaxed);
        }

        healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{HsCode, PricePoint};

    fn feed_with_price(price: f64) -> PriceFeed {
        let db = Arc::new(Db::open_in_memory().unwrap());
        db.upsert_hs_code(&HsCode {
            code: "120190".to_string(),
            description: "Soybeans".to_string(),
            section: "II".to_string(),
            chapter: "12".to_string(),
            search_count: 0,
        })
        .unwrap();
        db.insert_price(&PricePoint {
            hs_code: "120190".to_string(),
            date: "2025-01-01".to_string(),
            price,
            currency: "USD".to_string(),
            unit: "tonne".to_string(),
            source: None,
            volume: None,
        })
        .unwrap();

        PriceFeed::new(db, None, 100, true)
    }

    #[tokio::test]
    async fn test_mock_quote_is_deterministic() {
        let feed = feed_with_price(500.0);

        let a = feed.latest_quote("120190").await.unwrap();
        let b = feed.latest_quote("120190").await.unwrap();

        assert_eq!(a.source, QuoteSource::Mock);
        assert_eq!(a.price, b.price);
        // Jitter stays within two percent of the stored price
        assert!((a.price - 500.0).abs() <= 10.0 + f64::EPSILON);
    }

    #[tokio::test]
    async fn test_mock_quote_unknown_code() {
        let feed = feed_with_price(500.0);
        let result = feed.latest_quote("999999").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_trips_latch() {
        let db = Arc::new(Db::open_in_memory().unwrap());
        db.upsert_hs_code(&HsCode {
            code: "120190".to_string(),
            description: "Soybeans".to_string(),
            section: "II".to_string(),
            chapter: "12".to_string(),
            search_count: 0,
        })
        .unwrap();
        db.insert_price(&PricePoint {
            hs_code: "120190".to_string(),
            date: "2025-01-01".to_string(),
            price: 500.0,
            currency: "USD".to_string(),
            unit: "tonne".to_string(),
            source: None,
            volume: None,
        })
        .unwrap();

        // Reserved TEST-NET address, nothing listens there
        let feed = PriceFeed::new(db, Some("http://192.0.2.1:9".to_string()), 200, false);

        assert!(!feed.is_degraded());
        let quote = feed.latest_quote("120190").await.unwrap();
        assert_eq!(quote.source, QuoteSource::Mock);
        assert!(feed.is_degraded());
    }

    #[test]
    fn test_jitter_bounds() {
        for code in ["120190", "100199", "090111"] {
            for date in ["2025-01-01", "2025-06-15", "2026-02-28"] {
                let j = PriceFeed::jitter_fraction(code, date);
                assert!((-0.02..=0.02).contains(&j), "jitter {} out of range", j);
            }
        }
    }
}
