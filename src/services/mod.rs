//! Business Logic Services
//!
//! Stateless service structs over the database layer. Handlers call these;
//! the services own validation and the domain arithmetic, the db modules
//! own SQL.

pub mod auth_service;
pub mod forecast_service;
pub mod hscode_service;
pub mod price_service;
pub mod risk_service;
pub mod tariff_service;

pub use auth_service::AuthService;
pub use forecast_service::ForecastService;
pub use hscode_service::HsCodeService;
pub use price_service::{ChartSeries, CompareEntry, PriceService, VolumePoint};
pub use risk_service::{CreateRiskRequest, RiskService};
pub use tariff_service::{CalculateRequest, LandedCostResult, ShippingMode, TariffService};

/// Round to cents. All monetary outputs pass through here so that
/// per-line rounding and the landed-cost total agree.
pub(crate) fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(1.006), 1.01);
        assert_eq!(round_money(27.754), 27.75);
        assert_eq!(round_money(1029.0000000001), 1029.0);
        assert_eq!(round_money(0.0), 0.0);
    }
}
