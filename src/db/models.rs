//! Database models

use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub subscription_plan: String,
    pub password_changed_at: String,
    pub created_at: String,
}

/// HS code directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsCode {
    pub code: String,
    pub description: String,
    pub section: String,
    pub chapter: String,
    pub search_count: i64,
}

/// A single historical price observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub hs_code: String,
    pub date: String,
    pub price: f64,
    pub currency: String,
    pub unit: String,
    pub source: Option<String>,
    pub volume: Option<f64>,
}

/// How a tariff rate is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    Percentage,
    PerKg,
    PerUnit,
}

impl RateUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateUnit::Percentage => "percentage",
            RateUnit::PerKg => "per_kg",
            RateUnit::PerUnit => "per_unit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(RateUnit::Percentage),
            "per_kg" => Some(RateUnit::PerKg),
            "per_unit" => Some(RateUnit::PerUnit),
            _ => None,
        }
    }
}

/// Special trade program attached to a tariff (GSP, USMCA, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialProgram {
    pub code: String,
    pub name: String,
    pub rate: f64,
}

/// Quantity quota on a tariff line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffQuota {
    pub limit: f64,
    pub within_rate: f64,
    pub over_rate: f64,
}

/// Tariff schedule entry for (hs_code, country)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub hs_code: String,
    pub country: String,
    pub rate: f64,
    pub rate_unit: RateUnit,
    pub effective_date: String,
    pub expiration_date: Option<String>,
    pub special_programs: Vec<SpecialProgram>,
    pub quota: Option<TariffQuota>,
}

/// Forecast horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl Horizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::OneDay => "1d",
            Horizon::OneWeek => "1w",
            Horizon::OneMonth => "1m",
            Horizon::ThreeMonths => "3m",
            Horizon::SixMonths => "6m",
            Horizon::OneYear => "1y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1d" => Some(Horizon::OneDay),
            "1w" => Some(Horizon::OneWeek),
            "1m" => Some(Horizon::OneMonth),
            "3m" => Some(Horizon::ThreeMonths),
            "6m" => Some(Horizon::SixMonths),
            "1y" => Some(Horizon::OneYear),
            _ => None,
        }
    }

    /// Forward distance in days, used when deriving a forecast date
    pub fn days(&self) -> i64 {
        match self {
            Horizon::OneDay => 1,
            Horizon::OneWeek => 7,
            Horizon::OneMonth => 30,
            Horizon::ThreeMonths => 91,
            Horizon::SixMonths => 182,
            Horizon::OneYear => 365,
        }
    }
}

/// Named driver behind a forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastFactor {
    pub name: String,
    pub impact: f64,
    pub description: Option<String>,
}

/// Stored or derived price forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub hs_code: String,
    pub date: String,
    pub predicted_price: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_score: f64,
    pub horizon: Horizon,
    pub factors: Vec<ForecastFactor>,
}

/// Trade risk alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: i64,
    pub risk_type: String,
    pub severity: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub impact_direction: String,
    pub impact_percentage: f64,
    pub affected_hs_codes: Vec<String>,
    pub affected_regions: Vec<String>,
    pub mitigation_steps: Vec<String>,
}

/// True when `code` is a well-formed HS code (6 to 10 digits)
pub fn is_valid_hs_code(code: &str) -> bool {
    (6..=10).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}
