//! Price series queries
//!
//! Prices are an append-only time series keyed by (hs_code, date, currency).

use crate::db::models::PricePoint;
use crate::error::Result;
use rusqlite::{params, Connection};

/// Insert a price observation, ignoring duplicates for the same key
pub fn insert_price(conn: &Connection, point: &PricePoint) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR IGNORE INTO prices (hs_code, date, price, currency, unit, source, volume)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            point.hs_code,
            point.date,
            point.price,
            point.currency,
            point.unit,
            point.source,
            point.volume
        ],
    )?;
    Ok(())
}

/// Prices for a code within `[start, end]`, date ascending.
/// `currency` narrows the series when given.
pub fn get_prices(
    conn: &Connection,
    hs_code: &str,
    start: &str,
    end: &str,
    currency: Option<&str>,
) -> Result<Vec<PricePoint>> {
    let mut stmt = conn.prepare(
        "SELECT hs_code, date, price, currency, unit, source, volume
         FROM prices
         WHERE hs_code = ?1 AND date >= ?2 AND date <= ?3
           AND (?4 IS NULL OR currency = ?4)
         ORDER BY date ASC",
    )?;

    let points: Vec<PricePoint> = stmt
        .query_map(params![hs_code, start, end, currency], map_row)?
        .filter_map(|r| r.ok())
        .collect();

    Ok(points)
}

/// Most recent price observation for a code, if any
pub fn get_latest_price(conn: &Connection, hs_code: &str) -> Result<Option<PricePoint>> {
    let result = conn.query_row(
        "SELECT hs_code, date, price, currency, unit, source, volume
         FROM prices WHERE hs_code = ?1
         ORDER BY date DESC LIMIT 1",
        params![hs_code],
        map_row,
    );

    match result {
        Ok(point) => Ok(Some(point)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PricePoint> {
    Ok(PricePoint {
        hs_code: row.get(0)?,
        date: row.get(1)?,
        price: row.get(2)?,
        currency: row.get(3)?,
        unit: row.get(4)?,
        source: row.get(5)?,
        volume: row.get(6)?,
    })
}
