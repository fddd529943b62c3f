//! Tariff schedule queries

use crate::db::models::{RateUnit, SpecialProgram, Tariff, TariffQuota};
use crate::error::{AppError, Result};
use rusqlite::{params, Connection};

/// Insert a tariff line with its special programs
pub fn insert_tariff(conn: &Connection, tariff: &Tariff) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO tariffs (hs_code, country, rate, rate_unit, effective_date,
                             expiration_date, quota_limit, quota_within_rate, quota_over_rate)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            tariff.hs_code,
            tariff.country,
            tariff.rate,
            tariff.rate_unit.as_str(),
            tariff.effective_date,
            tariff.expiration_date,
            tariff.quota.as_ref().map(|q| q.limit),
            tariff.quota.as_ref().map(|q| q.within_rate),
            tariff.quota.as_ref().map(|q| q.over_rate),
        ],
    )?;

    let id = conn.last_insert_rowid();

    for program in &tariff.special_programs {
        conn.execute(
            "INSERT INTO tariff_programs (tariff_id, code, name, rate) VALUES (?1, ?2, ?3, ?4)",
            params![id, program.code, program.name, program.rate],
        )?;
    }

    Ok(id)
}

/// The tariff in force for (hs_code, country) on `date`.
///
/// In force means `effective_date <= date` and the expiration, when set, is
/// still in the future. The newest effective date wins when lines overlap.
pub fn get_current_tariff(
    conn: &Connection,
    hs_code: &str,
    country: &str,
    date: &str,
) -> Result<Option<Tariff>> {
    let result = conn.query_row(
        r#"
        SELECT id, hs_code, country, rate, rate_unit, effective_date, expiration_date,
               quota_limit, quota_within_rate, quota_over_rate
        FROM tariffs
        WHERE hs_code = ?1 AND country = ?2
          AND effective_date <= ?3
          AND (expiration_date IS NULL OR expiration_date > ?3)
        ORDER BY effective_date DESC
        LIMIT 1
        "#,
        params![hs_code, country, date],
        map_row,
    );

    match result {
        Ok(mut tariff) => {
            tariff.special_programs = get_programs(conn, tariff.id)?;
            Ok(Some(tariff))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn get_programs(conn: &Connection, tariff_id: i64) -> Result<Vec<SpecialProgram>> {
    let mut stmt = conn.prepare(
        "SELECT code, name, rate FROM tariff_programs WHERE tariff_id = ?1 ORDER BY code",
    )?;

    let programs: Vec<SpecialProgram> = stmt
        .query_map(params![tariff_id], |row| {
            Ok(SpecialProgram {
                code: row.get(0)?,
                name: row.get(1)?,
                rate: row.get(2)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(programs)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tariff> {
    let rate_unit: String = row.get(4)?;
    let quota_limit: Option<f64> = row.get(7)?;
    let quota_within: Option<f64> = row.get(8)?;
    let quota_over: Option<f64> = row.get(9)?;

    let quota = match (quota_limit, quota_within, quota_over) {
        (Some(limit), Some(within_rate), Some(over_rate)) => Some(TariffQuota {
            limit,
            within_rate,
            over_rate,
        }),
        _ => None,
    };

    Ok(Tariff {
        id: row.get(0)?,
        hs_code: row.get(1)?,
        country: row.get(2)?,
        rate: row.get(3)?,
        rate_unit: RateUnit::parse(&rate_unit).unwrap_or(RateUnit::Percentage),
        effective_date: row.get(5)?,
        expiration_date: row.get(6)?,
        special_programs: Vec::new(),
        quota,
    })
}

/// Validate tariff invariants before insert
pub fn validate_tariff(tariff: &Tariff) -> Result<()> {
    if tariff.rate < 0.0 {
        return Err(AppError::Validation("Tariff rate must be non-negative".to_string()));
    }
    if let Some(quota) = &tariff.quota {
        if quota.limit <= 0.0 || quota.within_rate < 0.0 || quota.over_rate < 0.0 {
            return Err(AppError::Validation("Invalid tariff quota".to_string()));
        }
    }
    Ok(())
}
