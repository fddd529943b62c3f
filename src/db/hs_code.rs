//! HS code directory queries

use crate::db::models::HsCode;
use crate::error::Result;
use rusqlite::{params, Connection};

/// Insert or replace an HS code entry
pub fn upsert_hs_code(conn: &Connection, entry: &HsCode) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO hs_codes (code, description, section, chapter, search_count)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(code) DO UPDATE SET
            description = excluded.description,
            section = excluded.section,
            chapter = excluded.chapter
        "#,
        params![
            entry.code,
            entry.description,
            entry.section,
            entry.chapter,
            entry.search_count
        ],
    )?;
    Ok(())
}

/// Get a single HS code entry
pub fn get_hs_code(conn: &Connection, code: &str) -> Result<Option<HsCode>> {
    let result = conn.query_row(
        "SELECT code, description, section, chapter, search_count
         FROM hs_codes WHERE code = ?1",
        params![code],
        map_row,
    );

    match result {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Search by code prefix or description substring, most-searched first
pub fn search_hs_codes(conn: &Connection, query: &str, limit: u32) -> Result<Vec<HsCode>> {
    let mut stmt = conn.prepare(
        "SELECT code, description, section, chapter, search_count
         FROM hs_codes
         WHERE code LIKE ?1 OR description LIKE ?2
         ORDER BY search_count DESC, code ASC
         LIMIT ?3",
    )?;

    let prefix = format!("{}%", query);
    let substring = format!("%{}%", query);

    let entries: Vec<HsCode> = stmt
        .query_map(params![prefix, substring, limit], map_row)?
        .filter_map(|r| r.ok())
        .collect();

    Ok(entries)
}

/// Increment the lookup counter for a code, returning false for unknown codes
pub fn increment_search_count(conn: &Connection, code: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE hs_codes SET search_count = search_count + 1 WHERE code = ?1",
        params![code],
    )?;
    Ok(rows > 0)
}

/// Count directory entries
pub fn count_hs_codes(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM hs_codes", [], |row| row.get(0))?;
    Ok(count)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HsCode> {
    Ok(HsCode {
        code: row.get(0)?,
        description: row.get(1)?,
        section: row.get(2)?,
        chapter: row.get(3)?,
        search_count: row.get(4)?,
    })
}
