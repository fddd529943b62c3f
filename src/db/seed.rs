//! Reference data seeder
//!
//! Loads a small HS code dataset with tariff schedules, price history and a
//! few risk alerts so a fresh install serves real-looking responses. Runs
//! only when the hs_codes table is empty.

use crate::db::models::{
    Forecast, Horizon, HsCode, PricePoint, Risk, SpecialProgram, Tariff, TariffQuota,
};
use crate::db::{forecast, hs_code, price, risk, tariff};
use crate::error::Result;
use chrono::{Duration, Utc};
use rusqlite::Connection;

struct SeedEntry {
    code: &'static str,
    description: &'static str,
    section: &'static str,
    chapter: &'static str,
    base_price: f64,
    unit: &'static str,
}

const SEED_CODES: &[SeedEntry] = &[
    SeedEntry {
        code: "120190",
        description: "Soybeans, other than seed",
        section: "II - Vegetable Products",
        chapter: "12 - Oil seeds and oleaginous fruits",
        base_price: 520.0,
        unit: "tonne",
    },
    SeedEntry {
        code: "100199",
        description: "Wheat and meslin, other",
        section: "II - Vegetable Products",
        chapter: "10 - Cereals",
        base_price: 245.0,
        unit: "tonne",
    },
    SeedEntry {
        code: "090111",
        description: "Coffee, not roasted, not decaffeinated",
        section: "II - Vegetable Products",
        chapter: "09 - Coffee, tea, mate and spices",
        base_price: 4.35,
        unit: "kg",
    },
    SeedEntry {
        code: "270900",
        description: "Petroleum oils, crude",
        section: "V - Mineral Products",
        chapter: "27 - Mineral fuels and oils",
        base_price: 78.0,
        unit: "barrel",
    },
    SeedEntry {
        code: "520100",
        description: "Cotton, not carded or combed",
        section: "XI - Textiles",
        chapter: "52 - Cotton",
        base_price: 1.82,
        unit: "kg",
    },
];

/// Seed reference data on first run
pub fn seed_if_empty(conn: &Connection) -> Result<()> {
    if hs_code::count_hs_codes(conn)? > 0 {
        return Ok(());
    }

    tracing::info!("Seeding reference dataset");

    let today = Utc::now().date_naive();

    for entry in SEED_CODES {
        hs_code::upsert_hs_code(
            conn,
            &HsCode {
                code: entry.code.to_string(),
                description: entry.description.to_string(),
                section: entry.section.to_string(),
                chapter: entry.chapter.to_string(),
                search_count: 0,
            },
        )?;

        // Weekly price history for the past year, deterministic wobble
        for week in 0..52i64 {
            let date = today - Duration::weeks(52 - week);
            let wobble = ((week * 37 + entry.code.len() as i64 * 13) % 21 - 10) as f64 / 100.0;
            let trend = week as f64 * 0.001;
            let price_value = entry.base_price * (1.0 + wobble * 0.5 + trend);
            let volume = 1_000.0 + ((week * 53) % 400) as f64 * 10.0;

            price::insert_price(
                conn,
                &PricePoint {
                    hs_code: entry.code.to_string(),
                    date: date.format("%Y-%m-%d").to_string(),
                    price: (price_value * 100.0).round() / 100.0,
                    currency: "USD".to_string(),
                    unit: entry.unit.to_string(),
                    source: Some("seed".to_string()),
                    volume: Some(volume),
                },
            )?;
        }
    }

    // US tariff schedule for the seeded codes
    seed_tariffs(conn)?;

    // Stored analyst forecast for soybeans, one month out
    let latest = price::get_latest_price(conn, "120190")?;
    if let Some(latest) = latest {
        forecast::insert_forecast(
            conn,
            &Forecast {
                hs_code: "120190".to_string(),
                date: (today + Duration::days(30)).format("%Y-%m-%d").to_string(),
                predicted_price: (latest.price * 1.03 * 100.0).round() / 100.0,
                lower_bound: (latest.price * 0.97 * 100.0).round() / 100.0,
                upper_bound: (latest.price * 1.09 * 100.0).round() / 100.0,
                confidence_score: 85.0,
                horizon: Horizon::OneMonth,
                factors: vec![crate::db::models::ForecastFactor {
                    name: "South American harvest outlook".to_string(),
                    impact: 2.5,
                    description: Some("Reduced yields tightening supply".to_string()),
                }],
            },
        )?;
    }

    // A live risk alert touching two of the codes
    risk::insert_risk(
        conn,
        &Risk {
            id: 0,
            risk_type: "logistics".to_string(),
            severity: 3,
            title: "Panama Canal transit restrictions".to_string(),
            description: Some("Draft limits reducing daily transits".to_string()),
            start_date: (today - Duration::days(30)).format("%Y-%m-%d").to_string(),
            end_date: None,
            impact_direction: "increase".to_string(),
            impact_percentage: 4.0,
            affected_hs_codes: vec!["120190".to_string(), "100199".to_string()],
            affected_regions: vec!["Latin America".to_string(), "US Gulf".to_string()],
            mitigation_steps: vec![
                "Book vessel slots further in advance".to_string(),
                "Evaluate US West Coast routing".to_string(),
                "Pass-through surcharge clauses in new contracts".to_string(),
            ],
        },
    )?;

    tracing::info!("Reference dataset seeded: {} HS codes", SEED_CODES.len());

    Ok(())
}

fn seed_tariffs(conn: &Connection) -> Result<()> {
    let effective = "2024-01-01".to_string();

    // Soybeans: duty free into the US
    tariff::insert_tariff(
        conn,
        &Tariff {
            id: 0,
            hs_code: "120190".to_string(),
            country: "US".to_string(),
            rate: 0.0,
            rate_unit: crate::db::models::RateUnit::Percentage,
            effective_date: effective.clone(),
            expiration_date: None,
            special_programs: Vec::new(),
            quota: None,
        },
    )?;

    // Wheat: specific rate per tonne-equivalent with a quota
    tariff::insert_tariff(
        conn,
        &Tariff {
            id: 0,
            hs_code: "100199".to_string(),
            country: "US".to_string(),
            rate: 0.35,
            rate_unit: crate::db::models::RateUnit::PerKg,
            effective_date: effective.clone(),
            expiration_date: None,
            special_programs: vec![SpecialProgram {
                code: "USMCA".to_string(),
                name: "United States-Mexico-Canada Agreement".to_string(),
                rate: 0.0,
            }],
            quota: Some(TariffQuota {
                limit: 50_000.0,
                within_rate: 0.35,
                over_rate: 0.77,
            }),
        },
    )?;

    // Coffee: duty free
    tariff::insert_tariff(
        conn,
        &Tariff {
            id: 0,
            hs_code: "090111".to_string(),
            country: "US".to_string(),
            rate: 0.0,
            rate_unit: crate::db::models::RateUnit::Percentage,
            effective_date: effective.clone(),
            expiration_date: None,
            special_programs: Vec::new(),
            quota: None,
        },
    )?;

    // Crude oil: ad valorem
    tariff::insert_tariff(
        conn,
        &Tariff {
            id: 0,
            hs_code: "270900".to_string(),
            country: "US".to_string(),
            rate: 0.5,
            rate_unit: crate::db::models::RateUnit::Percentage,
            effective_date: effective.clone(),
            expiration_date: None,
            special_programs: Vec::new(),
            quota: None,
        },
    )?;

    // Cotton: ad valorem with a GSP program rate
    tariff::insert_tariff(
        conn,
        &Tariff {
            id: 0,
            hs_code: "520100".to_string(),
            country: "US".to_string(),
            rate: 4.4,
            rate_unit: crate::db::models::RateUnit::Percentage,
            effective_date: effective,
            expiration_date: None,
            special_programs: vec![SpecialProgram {
                code: "GSP".to_string(),
                name: "Generalized System of Preferences".to_string(),
                rate: 0.0,
            }],
            quota: None,
        },
    )?;

    Ok(())
}
