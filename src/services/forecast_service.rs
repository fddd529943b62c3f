//! Forecast Service
//!
//! Serves stored analyst forecasts when present and derives a best-effort
//! point from the latest price otherwise. One canonical confidence decay
//! table applies to both paths.

use crate::db::models::{is_valid_hs_code, Forecast, ForecastFactor, Horizon};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::services::round_money;
use chrono::{Duration, NaiveDate};
use tracing::debug;

/// Confidence before any horizon penalty, for derived forecasts
const BASE_CONFIDENCE: f64 = 85.0;

/// Confidence never drops below this, whatever the horizon
const CONFIDENCE_FLOOR: f64 = 30.0;

/// Annualized drift applied when extrapolating from the latest price
const DRIFT_PER_YEAR: f64 = 0.04;

/// Forecast service
pub struct ForecastService;

impl ForecastService {
    /// Confidence penalty per horizon step
    pub fn horizon_penalty(horizon: Horizon) -> f64 {
        match horizon {
            Horizon::OneDay | Horizon::OneWeek | Horizon::OneMonth => 0.0,
            Horizon::ThreeMonths => 10.0,
            Horizon::SixMonths => 20.0,
            Horizon::OneYear => 30.0,
        }
    }

    /// Forecast for a code at a horizon, anchored at today
    pub fn forecast(db: &Db, hs_code: &str, horizon: Horizon) -> Result<Forecast> {
        Self::forecast_at(db, hs_code, horizon, chrono::Utc::now().date_naive())
    }

    /// Forecast anchored at an explicit date
    pub fn forecast_at(
        db: &Db,
        hs_code: &str,
        horizon: Horizon,
        today: NaiveDate,
    ) -> Result<Forecast> {
        if !is_valid_hs_code(hs_code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                hs_code
            )));
        }

        let penalty = Self::horizon_penalty(horizon);

        // Stored forecasts win; the recorded score is treated as the base
        // confidence and decays by the same table as derived ones.
        if let Some(mut stored) = db.get_latest_forecast(hs_code, horizon)? {
            stored.confidence_score = (stored.confidence_score - penalty).max(CONFIDENCE_FLOOR);
            return Ok(stored);
        }

        debug!(
            "No stored forecast for {} at {}, deriving from latest price",
            hs_code,
            horizon.as_str()
        );

        let latest = db.get_latest_price(hs_code)?.ok_or_else(|| {
            AppError::NotFound(format!("No price basis for HS code {}", hs_code))
        })?;

        let fraction_of_year = horizon.days() as f64 / 365.0;
        let predicted = latest.price * (1.0 + DRIFT_PER_YEAR * fraction_of_year);

        // Bounds widen with the horizon
        let spread = 0.02 + 0.10 * fraction_of_year;

        Ok(Forecast {
            hs_code: hs_code.to_string(),
            date: (today + Duration::days(horizon.days()))
                .format("%Y-%m-%d")
                .to_string(),
            predicted_price: round_money(predicted),
            lower_bound: round_money(predicted * (1.0 - spread)),
            upper_bound: round_money(predicted * (1.0 + spread)),
            confidence_score: (BASE_CONFIDENCE - penalty).max(CONFIDENCE_FLOOR),
            horizon,
            factors: vec![ForecastFactor {
                name: "Trend extrapolation".to_string(),
                impact: round_money(DRIFT_PER_YEAR * fraction_of_year * 100.0),
                description: Some("Annualized drift from the latest observed price".to_string()),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{HsCode, PricePoint};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn setup_db() -> Db {
        let db = Db::open_in_memory().unwrap();
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
            date: "2025-05-20".to_string(),
            price: 500.0,
            currency: "USD".to_string(),
            unit: "tonne".to_string(),
            source: None,
            volume: None,
        })
        .unwrap();
        db
    }

    #[test]
    fn test_decay_table() {
        assert_eq!(ForecastService::horizon_penalty(Horizon::OneDay), 0.0);
        assert_eq!(ForecastService::horizon_penalty(Horizon::OneWeek), 0.0);
        assert_eq!(ForecastService::horizon_penalty(Horizon::OneMonth), 0.0);
        assert_eq!(ForecastService::horizon_penalty(Horizon::ThreeMonths), 10.0);
        assert_eq!(ForecastService::horizon_penalty(Horizon::SixMonths), 20.0);
        assert_eq!(ForecastService::horizon_penalty(Horizon::OneYear), 30.0);
    }

    #[test]
    fn test_one_year_is_thirty_below_one_month() {
        let db = setup_db();

        let month =
            ForecastService::forecast_at(&db, "120190", Horizon::OneMonth, today()).unwrap();
        let year = ForecastService::forecast_at(&db, "120190", Horizon::OneYear, today()).unwrap();

        assert_eq!(month.confidence_score - year.confidence_score, 30.0);
        assert!(year.confidence_score >= 30.0);
    }

    #[test]
    fn test_derived_forecast_shape() {
        let db = setup_db();
        let forecast =
            ForecastService::forecast_at(&db, "120190", Horizon::ThreeMonths, today()).unwrap();

        assert_eq!(forecast.confidence_score, 75.0);
        assert!(forecast.lower_bound < forecast.predicted_price);
        assert!(forecast.predicted_price < forecast.upper_bound);
        assert_eq!(forecast.date, "2025-08-31"); // 91 days out
        assert!(!forecast.factors.is_empty());
    }

    #[test]
    fn test_bounds_widen_with_horizon() {
        let db = setup_db();

        let near = ForecastService::forecast_at(&db, "120190", Horizon::OneWeek, today()).unwrap();
        let far = ForecastService::forecast_at(&db, "120190", Horizon::OneYear, today()).unwrap();

        let near_spread = near.upper_bound - near.lower_bound;
        let far_spread = far.upper_bound - far.lower_bound;
        assert!(far_spread > near_spread);
    }

    #[test]
    fn test_stored_forecast_wins_and_decays() {
        let db = setup_db();
        db.insert_forecast(&Forecast {
            hs_code: "120190".to_string(),
            date: "2026-06-01".to_string(),
            predicted_price: 555.0,
            lower_bound: 500.0,
            upper_bound: 610.0,
            confidence_score: 90.0,
            horizon: Horizon::OneYear,
            factors: Vec::new(),
        })
        .unwrap();

        let forecast =
            ForecastService::forecast_at(&db, "120190", Horizon::OneYear, today()).unwrap();

        assert_eq!(forecast.predicted_price, 555.0);
        // 90 recorded minus the 1y penalty
        assert_eq!(forecast.confidence_score, 60.0);
    }

    #[test]
    fn test_confidence_floor() {
        let db = setup_db();
        db.insert_forecast(&Forecast {
            hs_code: "120190".to_string(),
            date: "2026-06-01".to_string(),
            predicted_price: 555.0,
            lower_bound: 500.0,
            upper_bound: 610.0,
            confidence_score: 40.0,
            horizon: Horizon::OneYear,
            factors: Vec::new(),
        })
        .unwrap();

        let forecast =
            ForecastService::forecast_at(&db, "120190", Horizon::OneYear, today()).unwrap();
        assert_eq!(forecast.confidence_score, 30.0);
    }

    #[test]
    fn test_no_basis_is_not_found() {
        let db = Db::open_in_memory().unwrap();
        let result = ForecastService::forecast_at(&db, "999999", Horizon::OneMonth, today());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
