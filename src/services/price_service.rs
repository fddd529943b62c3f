//! Price History Service
//!
//! Time-ordered price retrieval, comparative lookups across codes, and
//! volume rescaling for dual-axis charting.

use crate::db::models::{is_valid_hs_code, PricePoint};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::services::round_money;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// A volume observation rescaled into the price range
#[derive(Debug, Clone, Serialize)]
pub struct VolumePoint {
    pub date: String,
    pub volume: f64,
    /// Volume mapped linearly onto [min price, max price] of the series
    pub scaled: f64,
}

/// Price series plus the rescaled volume overlay
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub hs_code: String,
    pub prices: Vec<PricePoint>,
    pub volume: Vec<VolumePoint>,
}

/// Per-code entry in a comparison result
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CompareEntry {
    Data {
        description: String,
        prices: Vec<PricePoint>,
    },
    Error {
        error: String,
    },
}

/// Price history service
pub struct PriceService;

impl PriceService {
    /// Prices for a code within `[start, end]`, date ascending.
    /// An empty range is an empty Vec, not an error.
    pub fn history(
        db: &Db,
        hs_code: &str,
        start: &str,
        end: &str,
        currency: Option<&str>,
    ) -> Result<Vec<PricePoint>> {
        if !is_valid_hs_code(hs_code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                hs_code
            )));
        }

        db.get_prices(hs_code, start, end, currency)
    }

    /// History plus the volume series rescaled into the price range
    pub fn history_with_volume(
        db: &Db,
        hs_code: &str,
        start: &str,
        end: &str,
        currency: Option<&str>,
    ) -> Result<ChartSeries> {
        let prices = Self::history(db, hs_code, start, end, currency)?;
        let volume = Self::rescale_volume(&prices);

        Ok(ChartSeries {
            hs_code: hs_code.to_string(),
            prices,
            volume,
        })
    }

    /// Resolve several codes independently. One code failing (unknown code,
    /// no data in range) records a per-key error without touching the rest.
    pub fn compare(
        db: &Db,
        hs_codes: &[String],
        start: &str,
        end: &str,
        currency: Option<&str>,
    ) -> HashMap<String, CompareEntry> {
        let mut result = HashMap::with_capacity(hs_codes.len());

        for code in hs_codes {
            let entry = Self::resolve_one(db, code, start, end, currency);
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Comparison lookup failed for {}: {}", code, e);
                    CompareEntry::Error {
                        error: e.to_string(),
                    }
                }
            };
            result.insert(code.clone(), entry);
        }

        result
    }

    fn resolve_one(
        db: &Db,
        code: &str,
        start: &str,
        end: &str,
        currency: Option<&str>,
    ) -> Result<CompareEntry> {
        if !is_valid_hs_code(code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                code
            )));
        }

        let entry = db
            .get_hs_code(code)?
            .ok_or_else(|| AppError::NotFound(format!("Unknown HS code {}", code)))?;

        let prices = db.get_prices(code, start, end, currency)?;
        if prices.is_empty() {
            return Err(AppError::NotFound(format!(
                "No price data for HS code {} in range",
                code
            )));
        }

        Ok(CompareEntry::Data {
            description: entry.description,
            prices,
        })
    }

    /// Map volumes linearly onto the price range so both series share one
    /// axis. A flat volume series sits on the price midpoint.
    fn rescale_volume(prices: &[PricePoint]) -> Vec<VolumePoint> {
        let observed: Vec<(&PricePoint, f64)> = prices
            .iter()
            .filter_map(|p| p.volume.map(|v| (p, v)))
            .collect();

        if observed.is_empty() {
            return Vec::new();
        }

        let price_min = prices.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let price_max = prices
            .iter()
            .map(|p| p.price)
            .fold(f64::NEG_INFINITY, f64::max);

        let vol_min = observed.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let vol_max = observed
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::NEG_INFINITY, f64::max);

        observed
            .into_iter()
            .map(|(point, volume)| {
                let scaled = if (vol_max - vol_min).abs() < f64::EPSILON {
                    (price_min + price_max) / 2.0
                } else {
                    price_min + (volume - vol_min) / (vol_max - vol_min) * (price_max - price_min)
                };
                VolumePoint {
                    date: point.date.clone(),
                    volume,
                    scaled: round_money(scaled),
                }
            })
            .collect()
    }
}
