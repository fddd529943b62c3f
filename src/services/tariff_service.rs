//! Tariff Calculator Service
//!
//! Computes duty plus U.S. customs fees (MPF, HMF) and the total landed
//! cost for an import. Pure arithmetic over the tariff line in force;
//! a missing tariff or malformed quantity is a terminal error.

use crate::db::models::{is_valid_hs_code, RateUnit};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::services::round_money;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Merchandise Processing Fee: 0.3464% of value, clamped to a fee band
const MPF_RATE: f64 = 0.003464;
const MPF_MIN: f64 = 27.75;
const MPF_MAX: f64 = 538.40;

/// Harbor Maintenance Fee: 0.125% of value, ocean shipments only
const HMF_RATE: f64 = 0.00125;

/// How the shipment moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMode {
    Ocean,
    Air,
    Land,
}

/// Calculation input
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub hs_code: String,
    pub import_value: f64,
    pub country: String,
    #[serde(default)]
    pub special_program: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub quantity_unit: Option<String>,
    pub shipping_mode: ShippingMode,
}

/// One ancillary fee line
#[derive(Debug, Clone, Serialize)]
pub struct FeeLine {
    pub code: String,
    pub name: String,
    pub amount: f64,
}

/// Full landed cost breakdown
#[derive(Debug, Clone, Serialize)]
pub struct LandedCostResult {
    pub hs_code: String,
    pub country: String,
    pub import_value: f64,
    pub applied_rate: f64,
    pub rate_unit: RateUnit,
    /// Name of the special program applied, when any
    pub program: Option<String>,
    pub duty: f64,
    pub fees: Vec<FeeLine>,
    pub total_duties: f64,
    pub total_fees: f64,
    pub landed_cost: f64,
    /// Total duties as a percentage of import value
    pub effective_duty_rate: f64,
}

/// Tariff calculation service
pub struct TariffService;

impl TariffService {
    /// Calculate landed cost against the tariff in force today
    pub fn calculate(db: &Db, req: &CalculateRequest) -> Result<LandedCostResult> {
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        Self::calculate_at(db, req, &today)
    }

    /// Calculate landed cost against the tariff in force on `date`
    pub fn calculate_at(db: &Db, req: &CalculateRequest, date: &str) -> Result<LandedCostResult> {
        Self::validate(req)?;

        let tariff = db
            .get_current_tariff(&req.hs_code, &req.country, date)?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No current tariff for HS code {} into {}",
                    req.hs_code, req.country
                ))
            })?;

        // A supplied quantity unit has to agree with how the rate is
        // expressed; "lb" against a per-kg line is a caller mistake.
        if let Some(unit) = req.quantity_unit.as_deref() {
            let expected = match tariff.rate_unit {
                RateUnit::PerKg => Some("kg"),
                RateUnit::PerUnit => Some("unit"),
                RateUnit::Percentage => None,
            };
            if let Some(expected) = expected {
                if !unit.eq_ignore_ascii_case(expected) {
                    return Err(AppError::Validation(format!(
                        "Quantity unit '{}' does not match a {} tariff",
                        unit,
                        tariff.rate_unit.as_str()
                    )));
                }
            }
        }

        // Rate selection: a matching special program wins over the base
        // rate. A program code with no match on this line falls back to
        // the base rate rather than failing the calculation.
        let matched = req.special_program.as_deref().and_then(|code| {
            tariff
                .special_programs
                .iter()
                .find(|p| p.code.eq_ignore_ascii_case(code))
        });
        let (applied_rate, program) = match matched {
            Some(program) => (program.rate, Some(program.name.clone())),
            None => (tariff.rate, None),
        };

        let duty = match tariff.rate_unit {
            RateUnit::Percentage => req.import_value * applied_rate / 100.0,
            RateUnit::PerKg | RateUnit::PerUnit => {
                let quantity = req.quantity.ok_or_else(|| {
                    AppError::Validation(format!(
                        "Quantity is required for a {} tariff",
                        tariff.rate_unit.as_str()
                    ))
                })?;

                // Quota splits the quantity across two specific rates.
                // A matched program rate replaces the whole schedule.
                match (&tariff.quota, &program) {
                    (Some(quota), None) => {
                        let within = quantity.min(quota.limit);
                        let over = (quantity - quota.limit).max(0.0);
                        within * quota.within_rate + over * quota.over_rate
                    }
                    _ => quantity * applied_rate,
                }
            }
        };

        let fees = Self::country_fees(&req.country, req.import_value, req.shipping_mode);

        let total_duties = round_money(duty);
        let total_fees = round_money(fees.iter().map(|f| f.amount).sum());
        let landed_cost = round_money(req.import_value + total_duties + total_fees);
        let effective_duty_rate = round_money(total_duties / req.import_value * 100.0);

        info!(
            "Tariff calculation: {} into {} value {:.2} -> landed {:.2}",
            req.hs_code, req.country, req.import_value, landed_cost
        );

        Ok(LandedCostResult {
            hs_code: req.hs_code.clone(),
            country: req.country.clone(),
            import_value: req.import_value,
            applied_rate,
            rate_unit: tariff.rate_unit,
            program,
            duty: total_duties,
            fees,
            total_duties,
            total_fees,
            landed_cost,
            effective_duty_rate,
        })
    }

    fn validate(req: &CalculateRequest) -> Result<()> {
        if !is_valid_hs_code(&req.hs_code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                req.hs_code
            )));
        }
        if !req.import_value.is_finite() || req.import_value <= 0.0 {
            return Err(AppError::Validation(
                "Import value must be a positive amount".to_string(),
            ));
        }
        if let Some(quantity) = req.quantity {
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(AppError::Validation(
                    "Quantity must be positive when supplied".to_string(),
                ));
            }
        }
        if req.country.trim().is_empty() {
            return Err(AppError::Validation("Country is required".to_string()));
        }
        Ok(())
    }

    /// Ancillary customs fees; only the US defines any
    fn country_fees(country: &str, import_value: f64, mode: ShippingMode) -> Vec<FeeLine> {
        if !country.eq_ignore_ascii_case("US") {
            return Vec::new();
        }

        let mpf = (import_value * MPF_RATE).clamp(MPF_MIN, MPF_MAX);
        let mut fees = vec![FeeLine {
            code: "MPF".to_string(),
            name: "Merchandise Processing Fee".to_string(),
            amount: round_money(mpf),
        }];

        if mode == ShippingMode::Ocean {
            fees.push(FeeLine {
                code: "HMF".to_string(),
                name: "Harbor Maintenance Fee".to_string(),
                amount: round_money(import_value * HMF_RATE),
            });
        }

        fees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{HsCode, SpecialProgram, Tariff, TariffQuota};

    const DATE: &str = "2025-06-01";

    fn setup_db() -> Db {
        let db = Db::open_in_memory().unwrap();
        for code in ["120190", "100199", "520100"] {
            db.upsert_hs_code(&HsCode {
                code: code.to_string(),
                description: "Test commodity".to_string(),
                section: "I".to_string(),
                chapter: "01".to_string(),
                search_count: 0,
            })
            .unwrap();
        }

        // Duty-free ad valorem line
        db.insert_tariff(&Tariff {
            id: 0,
            hs_code: "120190".to_string(),
            country: "US".to_string(),
            rate: 0.0,
            rate_unit: RateUnit::Percentage,
            effective_date: "2024-01-01".to_string(),
            expiration_date: None,
            special_programs: Vec::new(),
            quota: None,
        })
        .unwrap();

        // Specific rate with quota and a USMCA program
        db.insert_tariff(&Tariff {
            id: 0,
            hs_code: "100199".to_string(),
            country: "US".to_string(),
            rate: 0.35,
            rate_unit: RateUnit::PerKg,
            effective_date: "2024-01-01".to_string(),
            expiration_date: None,
            special_programs: vec![SpecialProgram {
                code: "USMCA".to_string(),
                name: "United States-Mexico-Canada Agreement".to_string(),
                rate: 0.0,
            }],
            quota: Some(TariffQuota {
                limit: 1_000.0,
                within_rate: 0.35,
                over_rate: 0.77,
            }),
        })
        .unwrap();

        // Plain ad valorem with a GSP program
        db.insert_tariff(&Tariff {
            id: 0,
            hs_code: "520100".to_string(),
            country: "US".to_string(),
            rate: 4.4,
            rate_unit: RateUnit::Percentage,
            effective_date: "2024-01-01".to_string(),
            expiration_date: None,
            special_programs: vec![SpecialProgram {
                code: "GSP".to_string(),
                name: "Generalized System of Preferences".to_string(),
                rate: 0.0,
            }],
            quota: None,
        })
        .unwrap();

        db
    }

    fn request(hs_code: &str, value: f64, mode: ShippingMode) -> CalculateRequest {
        CalculateRequest {
            hs_code: hs_code.to_string(),
            import_value: value,
            country: "US".to_string(),
            special_program: None,
            quantity: None,
            quantity_unit: None,
            shipping_mode: mode,
        }
    }

    #[test]
    fn test_reference_example() {
        // Zero-rate ocean import of 1000: MPF clamps to minimum, HMF applies
        let db = setup_db();
        let result =
            TariffService::calculate_at(&db, &request("120190", 1000.0, ShippingMode::Ocean), DATE)
                .unwrap();

        assert_eq!(result.duty, 0.0);
        assert_eq!(result.fees.len(), 2);
        assert_eq!(result.fees[0].amount, 27.75);
        assert_eq!(result.fees[1].amount, 1.25);
        assert_eq!(result.total_fees, 29.00);
        assert_eq!(result.landed_cost, 1029.00);
        assert_eq!(result.effective_duty_rate, 0.0);
    }

    #[test]
    fn test_ad_valorem_duty() {
        let db = setup_db();
        let result =
            TariffService::calculate_at(&db, &request("520100", 10_000.0, ShippingMode::Air), DATE)
                .unwrap();

        // 4.4% of 10000
        assert_eq!(result.duty, 440.00);
        assert_eq!(result.effective_duty_rate, 4.4);
        // MPF = 34.64, no HMF for air
        assert_eq!(result.fees.len(), 1);
        assert_eq!(result.fees[0].amount, 34.64);
        assert_eq!(result.landed_cost, 10_000.0 + 440.0 + 34.64);
    }

    #[test]
    fn test_landed_cost_identity() {
        let db = setup_db();
        for value in [100.0, 1_000.0, 55_555.55, 500_000.0] {
            let result =
                TariffService::calculate_at(&db, &request("520100", value, ShippingMode::Ocean), DATE)
                    .unwrap();
            let expected = round_money(value + result.total_duties + result.total_fees);
            assert_eq!(result.landed_cost, expected);
        }
    }

    #[test]
    fn test_mpf_clamped_both_ends() {
        let db = setup_db();

        // Tiny shipment: MPF floors at 27.75
        let small =
            TariffService::calculate_at(&db, &request("120190", 100.0, ShippingMode::Air), DATE)
                .unwrap();
        assert_eq!(small.fees[0].amount, 27.75);

        // Huge shipment: 0.3464% would exceed the cap
        let large = TariffService::calculate_at(
            &db,
            &request("120190", 10_000_000.0, ShippingMode::Air),
            DATE,
        )
        .unwrap();
        assert_eq!(large.fees[0].amount, 538.40);
    }

    #[test]
    fn test_hmf_ocean_only() {
        let db = setup_db();

        for (mode, expect_hmf) in [
            (ShippingMode::Ocean, true),
            (ShippingMode::Air, false),
            (ShippingMode::Land, false),
        ] {
            let result =
                TariffService::calculate_at(&db, &request("120190", 20_000.0, mode), DATE).unwrap();
            let hmf = result.fees.iter().find(|f| f.code == "HMF");
            if expect_hmf {
                assert_eq!(hmf.unwrap().amount, 25.00); // 20000 * 0.00125
            } else {
                assert!(hmf.is_none());
            }
        }
    }

    #[test]
    fn test_no_fees_outside_us() {
        let db = setup_db();
        db.insert_tariff(&Tariff {
            id: 0,
            hs_code: "120190".to_string(),
            country: "DE".to_string(),
            rate: 2.0,
            rate_unit: RateUnit::Percentage,
            effective_date: "2024-01-01".to_string(),
            expiration_date: None,
            special_programs: Vec::new(),
            quota: None,
        })
        .unwrap();

        let mut req = request("120190", 1000.0, ShippingMode::Ocean);
        req.country = "DE".to_string();
        let result = TariffService::calculate_at(&db, &req, DATE).unwrap();

        assert!(result.fees.is_empty());
        assert_eq!(result.landed_cost, 1020.00);
    }

    #[test]
    fn test_specific_rate_requires_quantity() {
        let db = setup_db();
        let result =
            TariffService::calculate_at(&db, &request("100199", 5_000.0, ShippingMode::Ocean), DATE);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_specific_rate_with_quota_split() {
        let db = setup_db();
        let mut req = request("100199", 5_000.0, ShippingMode::Air);
        req.quantity = Some(1_500.0);
        req.quantity_unit = Some("kg".to_string());

        let result = TariffService::calculate_at(&db, &req, DATE).unwrap();

        // 1000 kg within quota at 0.35, 500 kg over at 0.77
        assert_eq!(result.duty, 350.0 + 385.0);
    }

    #[test]
    fn test_special_program_rate_applies() {
        let db = setup_db();
        let mut req = request("100199", 5_000.0, ShippingMode::Air);
        req.quantity = Some(1_500.0);
        req.special_program = Some("usmca".to_string());

        let result = TariffService::calculate_at(&db, &req, DATE).unwrap();
        assert_eq!(result.duty, 0.0);
        assert_eq!(
            result.program.as_deref(),
            Some("United States-Mexico-Canada Agreement")
        );
    }

    #[test]
    fn test_unmatched_special_program_falls_back_to_base_rate() {
        // Cotton only carries GSP; asking for CAFTA is not an error,
        // the line's base rate applies with no program label.
        let db = setup_db();
        let mut req = request("520100", 5_000.0, ShippingMode::Air);
        req.special_program = Some("CAFTA".to_string());

        let result = TariffService::calculate_at(&db, &req, DATE).unwrap();
        assert_eq!(result.applied_rate, 4.4);
        assert!(result.program.is_none());
        assert_eq!(result.duty, 220.0);
    }

    #[test]
    fn test_unmatched_program_still_pays_quota_rates() {
        // Falling back to the base schedule includes its quota split
        let db = setup_db();
        let mut req = request("100199", 5_000.0, ShippingMode::Air);
        req.quantity = Some(1_500.0);
        req.special_program = Some("CAFTA".to_string());

        let result = TariffService::calculate_at(&db, &req, DATE).unwrap();
        assert!(result.program.is_none());
        assert_eq!(result.duty, 350.0 + 385.0);
    }

    #[test]
    fn test_quantity_unit_must_match_rate_unit() {
        let db = setup_db();
        let mut req = request("100199", 5_000.0, ShippingMode::Air);
        req.quantity = Some(1_500.0);
        req.quantity_unit = Some("lb".to_string());

        let result = TariffService::calculate_at(&db, &req, DATE);
        assert!(matches!(result, Err(AppError::Validation(_))));

        // Case differences are fine
        req.quantity_unit = Some("KG".to_string());
        assert!(TariffService::calculate_at(&db, &req, DATE).is_ok());

        // Percentage lines ignore the unit entirely
        let mut ad_valorem = request("520100", 5_000.0, ShippingMode::Air);
        ad_valorem.quantity_unit = Some("lb".to_string());
        assert!(TariffService::calculate_at(&db, &ad_valorem, DATE).is_ok());
    }

    #[test]
    fn test_missing_tariff_is_not_found() {
        let db = setup_db();
        let mut req = request("120190", 1000.0, ShippingMode::Ocean);
        req.country = "JP".to_string();

        let result = TariffService::calculate_at(&db, &req, DATE);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let db = setup_db();

        let mut bad_code = request("12a", 1000.0, ShippingMode::Ocean);
        bad_code.hs_code = "12a".to_string();
        assert!(matches!(
            TariffService::calculate_at(&db, &bad_code, DATE),
            Err(AppError::Validation(_))
        ));

        let negative = request("120190", -5.0, ShippingMode::Ocean);
        assert!(matches!(
            TariffService::calculate_at(&db, &negative, DATE),
            Err(AppError::Validation(_))
        ));

        let mut zero_qty = request("100199", 1000.0, ShippingMode::Ocean);
        zero_qty.quantity = Some(0.0);
        assert!(matches!(
            TariffService::calculate_at(&db, &zero_qty, DATE),
            Err(AppError::Validation(_))
        ));
    }
}
