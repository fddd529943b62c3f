//! Forecast storage queries

use crate::db::models::{Forecast, ForecastFactor, Horizon};
use crate::error::Result;
use rusqlite::{params, Connection};

/// Insert a forecast with its factors
pub fn insert_forecast(conn: &Connection, forecast: &Forecast) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO forecasts (hs_code, date, predicted_price, lower_bound, upper_bound,
                               confidence_score, horizon)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            forecast.hs_code,
            forecast.date,
            forecast.predicted_price,
            forecast.lower_bound,
            forecast.upper_bound,
            forecast.confidence_score,
            forecast.horizon.as_str(),
        ],
    )?;

    let id = conn.last_insert_rowid();

    for factor in &forecast.factors {
        conn.execute(
            "INSERT INTO forecast_factors (forecast_id, name, impact, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, factor.name, factor.impact, factor.description],
        )?;
    }

    Ok(id)
}

/// Most recent stored forecast for (hs_code, horizon)
pub fn get_latest_forecast(
    conn: &Connection,
    hs_code: &str,
    horizon: Horizon,
) -> Result<Option<Forecast>> {
    let result = conn.query_row(
        r#"
        SELECT id, hs_code, date, predicted_price, lower_bound, upper_bound,
               confidence_score, horizon
        FROM forecasts
        WHERE hs_code = ?1 AND horizon = ?2
        ORDER BY date DESC
        LIMIT 1
        "#,
        params![hs_code, horizon.as_str()],
        |row| {
            let id: i64 = row.get(0)?;
            let horizon_str: String = row.get(7)?;
            Ok((
                id,
                Forecast {
                    hs_code: row.get(1)?,
                    date: row.get(2)?,
                    predicted_price: row.get(3)?,
                    lower_bound: row.get(4)?,
                    upper_bound: row.get(5)?,
                    confidence_score: row.get(6)?,
                    horizon: Horizon::parse(&horizon_str).unwrap_or(Horizon::OneMonth),
                    factors: Vec::new(),
                },
            ))
        },
    );

    match result {
        Ok((id, mut forecast)) => {
            forecast.factors = get_factors(conn, id)?;
            Ok(Some(forecast))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn get_factors(conn: &Connection, forecast_id: i64) -> Result<Vec<ForecastFactor>> {
    let mut stmt = conn.prepare(
        "SELECT name, impact, description FROM forecast_factors WHERE forecast_id = ?1",
    )?;

    let factors: Vec<ForecastFactor> = stmt
        .query_map(params![forecast_id], |row| {
            Ok(ForecastFactor {
                name: row.get(0)?,
                impact: row.get(1)?,
                description: row.get(2)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(factors)
}
