//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Run each migration
    run_migration(conn, "001_users", CREATE_USERS_TABLE)?;
    run_migration(conn, "002_hs_codes", CREATE_HS_CODES_TABLE)?;
    run_migration(conn, "003_prices", CREATE_PRICES_TABLE)?;
    run_migration(conn, "004_tariffs", CREATE_TARIFFS_TABLE)?;
    run_migration(conn, "005_tariff_programs", CREATE_TARIFF_PROGRAMS_TABLE)?;
    run_migration(conn, "006_forecasts", CREATE_FORECASTS_TABLE)?;
    run_migration(conn, "007_forecast_factors", CREATE_FORECAST_FACTORS_TABLE)?;
    run_migration(conn, "008_risks", CREATE_RISKS_TABLE)?;
    run_migration(conn, "009_risk_links", CREATE_RISK_LINK_TABLES)?;
    run_migration(conn, "010_user_saved_hscodes", CREATE_USER_SAVED_HSCODES_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    subscription_plan TEXT NOT NULL DEFAULT 'free',
    password_changed_at TEXT NOT NULL DEFAULT (datetime('now')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_HS_CODES_TABLE: &str = r#"
CREATE TABLE hs_codes (
    code TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    section TEXT NOT NULL,
    chapter TEXT NOT NULL,
    search_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_hs_codes_search_count ON hs_codes(search_count);
"#;

const CREATE_PRICES_TABLE: &str = r#"
CREATE TABLE prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hs_code TEXT NOT NULL REFERENCES hs_codes(code) ON DELETE CASCADE,
    date TEXT NOT NULL,
    price REAL NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    unit TEXT NOT NULL DEFAULT 'kg',
    source TEXT,
    volume REAL,
    UNIQUE(hs_code, date, currency)
);
CREATE INDEX IF NOT EXISTS idx_prices_code_date ON prices(hs_code, date);
"#;

const CREATE_TARIFFS_TABLE: &str = r#"
CREATE TABLE tariffs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hs_code TEXT NOT NULL REFERENCES hs_codes(code) ON DELETE CASCADE,
    country TEXT NOT NULL,
    rate REAL NOT NULL CHECK (rate >= 0),
    rate_unit TEXT NOT NULL DEFAULT 'percentage'
        CHECK (rate_unit IN ('percentage', 'per_kg', 'per_unit')),
    effective_date TEXT NOT NULL,
    expiration_date TEXT,
    quota_limit REAL,
    quota_within_rate REAL,
    quota_over_rate REAL
);
CREATE INDEX IF NOT EXISTS idx_tariffs_code_country ON tariffs(hs_code, country);
"#;

const CREATE_TARIFF_PROGRAMS_TABLE: &str = r#"
CREATE TABLE tariff_programs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tariff_id INTEGER NOT NULL REFERENCES tariffs(id) ON DELETE CASCADE,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    rate REAL NOT NULL CHECK (rate >= 0)
);
"#;

const CREATE_FORECASTS_TABLE: &str = r#"
CREATE TABLE forecasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hs_code TEXT NOT NULL REFERENCES hs_codes(code) ON DELETE CASCADE,
    date TEXT NOT NULL,
    predicted_price REAL NOT NULL,
    lower_bound REAL NOT NULL,
    upper_bound REAL NOT NULL,
    confidence_score REAL NOT NULL CHECK (confidence_score BETWEEN 0 AND 100),
    horizon TEXT NOT NULL CHECK (horizon IN ('1d', '1w', '1m', '3m', '6m', '1y'))
);
CREATE INDEX IF NOT EXISTS idx_forecasts_code_horizon ON forecasts(hs_code, horizon);
"#;

const CREATE_FORECAST_FACTORS_TABLE: &str = r#"
CREATE TABLE forecast_factors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    forecast_id INTEGER NOT NULL REFERENCES forecasts(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    impact REAL NOT NULL,
    description TEXT
);
"#;

const CREATE_RISKS_TABLE: &str = r#"
CREATE TABLE risks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    risk_type TEXT NOT NULL,
    severity INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 5),
    title TEXT NOT NULL,
    description TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT,
    impact_direction TEXT NOT NULL DEFAULT 'increase'
        CHECK (impact_direction IN ('increase', 'decrease')),
    impact_percentage REAL NOT NULL DEFAULT 0 CHECK (impact_percentage >= 0)
);
CREATE INDEX IF NOT EXISTS idx_risks_dates ON risks(start_date, end_date);
"#;

const CREATE_RISK_LINK_TABLES: &str = r#"
CREATE TABLE risk_hs_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    risk_id INTEGER NOT NULL REFERENCES risks(id) ON DELETE CASCADE,
    hs_code TEXT NOT NULL,
    UNIQUE(risk_id, hs_code)
);

CREATE TABLE risk_regions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    risk_id INTEGER NOT NULL REFERENCES risks(id) ON DELETE CASCADE,
    region TEXT NOT NULL,
    UNIQUE(risk_id, region)
);

CREATE TABLE risk_mitigations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    risk_id INTEGER NOT NULL REFERENCES risks(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    step TEXT NOT NULL,
    UNIQUE(risk_id, position)
);
"#;

const CREATE_USER_SAVED_HSCODES_TABLE: &str = r#"
CREATE TABLE user_saved_hscodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    hs_code TEXT NOT NULL REFERENCES hs_codes(code) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, hs_code)
);
"#;
