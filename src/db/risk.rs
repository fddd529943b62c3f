//! Risk alert queries
//!
//! Risks link to HS codes and regions through junction tables; mitigation
//! steps keep their position so they render as an ordered checklist.

use crate::db::models::Risk;
use crate::error::{AppError, Result};
use rusqlite::{params, Connection};

/// Insert a risk with its affected codes, regions and mitigation steps
pub fn insert_risk(conn: &Connection, risk: &Risk) -> Result<i64> {
    validate_risk(risk)?;

    conn.execute(
        r#"
        INSERT INTO risks (risk_type, severity, title, description, start_date,
                           end_date, impact_direction, impact_percentage)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            risk.risk_type,
            risk.severity,
            risk.title,
            risk.description,
            risk.start_date,
            risk.end_date,
            risk.impact_direction,
            risk.impact_percentage,
        ],
    )?;

    let id = conn.last_insert_rowid();

    for code in &risk.affected_hs_codes {
        conn.execute(
            "INSERT OR IGNORE INTO risk_hs_codes (risk_id, hs_code) VALUES (?1, ?2)",
            params![id, code],
        )?;
    }
    for region in &risk.affected_regions {
        conn.execute(
            "INSERT OR IGNORE INTO risk_regions (risk_id, region) VALUES (?1, ?2)",
            params![id, region],
        )?;
    }
    for (position, step) in risk.mitigation_steps.iter().enumerate() {
        conn.execute(
            "INSERT INTO risk_mitigations (risk_id, position, step) VALUES (?1, ?2, ?3)",
            params![id, position as i64, step],
        )?;
    }

    tracing::info!("Created risk '{}' ({})", risk.title, id);

    Ok(id)
}

/// Risks whose window covers `date`, highest severity first
pub fn get_active_risks(conn: &Connection, date: &str) -> Result<Vec<Risk>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, risk_type, severity, title, description, start_date, end_date,
               impact_direction, impact_percentage
        FROM risks
        WHERE start_date <= ?1 AND (end_date IS NULL OR end_date >= ?1)
        ORDER BY severity DESC, start_date DESC
        "#,
    )?;

    let risks: Vec<Risk> = stmt
        .query_map(params![date], map_row)?
        .filter_map(|r| r.ok())
        .collect();

    risks.into_iter().map(|r| attach_links(conn, r)).collect()
}

/// Active risks that name a specific HS code
pub fn get_risks_for_hs_code(conn: &Connection, hs_code: &str, date: &str) -> Result<Vec<Risk>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT r.id, r.risk_type, r.severity, r.title, r.description, r.start_date,
               r.end_date, r.impact_direction, r.impact_percentage
        FROM risks r
        JOIN risk_hs_codes rh ON rh.risk_id = r.id
        WHERE rh.hs_code = ?1
          AND r.start_date <= ?2 AND (r.end_date IS NULL OR r.end_date >= ?2)
        ORDER BY r.severity DESC
        "#,
    )?;

    let risks: Vec<Risk> = stmt
        .query_map(params![hs_code, date], map_row)?
        .filter_map(|r| r.ok())
        .collect();

    risks.into_iter().map(|r| attach_links(conn, r)).collect()
}

fn attach_links(conn: &Connection, mut risk: Risk) -> Result<Risk> {
    let mut stmt =
        conn.prepare("SELECT hs_code FROM risk_hs_codes WHERE risk_id = ?1 ORDER BY hs_code")?;
    risk.affected_hs_codes = stmt
        .query_map(params![risk.id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    let mut stmt =
        conn.prepare("SELECT region FROM risk_regions WHERE risk_id = ?1 ORDER BY region")?;
    risk.affected_regions = stmt
        .query_map(params![risk.id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    let mut stmt =
        conn.prepare("SELECT step FROM risk_mitigations WHERE risk_id = ?1 ORDER BY position")?;
    risk.mitigation_steps = stmt
        .query_map(params![risk.id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(risk)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Risk> {
    Ok(Risk {
        id: row.get(0)?,
        risk_type: row.get(1)?,
        severity: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        impact_direction: row.get(7)?,
        impact_percentage: row.get(8)?,
        affected_hs_codes: Vec::new(),
        affected_regions: Vec::new(),
        mitigation_steps: Vec::new(),
    })
}

/// Validate risk invariants before insert
pub fn validate_risk(risk: &Risk) -> Result<()> {
    if !(1..=5).contains(&risk.severity) {
        return Err(AppError::Validation(format!(
            "Risk severity must be between 1 and 5, got {}",
            risk.severity
        )));
    }
    if risk.impact_percentage < 0.0 {
        return Err(AppError::Validation(
            "Risk impact percentage must be non-negative".to_string(),
        ));
    }
    if risk.title.trim().is_empty() {
        return Err(AppError::Validation("Risk title must not be empty".to_string()));
    }
    Ok(())
}
