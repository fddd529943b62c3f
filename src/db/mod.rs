//! SQLite database module

pub mod models;
mod forecast;
mod hs_code;
mod migrations;
mod price;
mod risk;
mod seed;
mod tariff;
mod user;

use crate::error::Result;
use crate::security::SecurityManager;
use models::{Forecast, Horizon, HsCode, PricePoint, Risk, Tariff, User};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open (or create) the database file and run migrations
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    /// Load reference data when the directory is empty
    pub fn seed_if_empty(&self) -> Result<()> {
        let conn = self.conn.lock();
        seed::seed_if_empty(&conn)
    }

    // ========== HS Code Methods ==========

    pub fn upsert_hs_code(&self, entry: &HsCode) -> Result<()> {
        let conn = self.conn.lock();
        hs_code::upsert_hs_code(&conn, entry)
    }

    pub fn get_hs_code(&self, code: &str) -> Result<Option<HsCode>> {
        let conn = self.conn.lock();
        hs_code::get_hs_code(&conn, code)
    }

    pub fn search_hs_codes(&self, query: &str, limit: u32) -> Result<Vec<HsCode>> {
        let conn = self.conn.lock();
        hs_code::search_hs_codes(&conn, query, limit)
    }

    pub fn increment_search_count(&self, code: &str) -> Result<bool> {
        let conn = self.conn.lock();
        hs_code::increment_search_count(&conn, code)
    }

    pub fn count_hs_codes(&self) -> Result<i64> {
        let conn = self.conn.lock();
        hs_code::count_hs_codes(&conn)
    }

    // ========== Price Methods ==========

    pub fn insert_price(&self, point: &PricePoint) -> Result<()> {
        let conn = self.conn.lock();
        price::insert_price(&conn, point)
    }

    pub fn get_prices(
        &self,
        hs_code: &str,
        start: &str,
        end: &str,
        currency: Option<&str>,
    ) -> Result<Vec<PricePoint>> {
        let conn = self.conn.lock();
        price::get_prices(&conn, hs_code, start, end, currency)
    }

    pub fn get_latest_price(&self, hs_code: &str) -> Result<Option<PricePoint>> {
        let conn = self.conn.lock();
        price::get_latest_price(&conn, hs_code)
    }

    // ========== Tariff Methods ==========

    pub fn insert_tariff(&self, entry: &Tariff) -> Result<i64> {
        tariff::validate_tariff(entry)?;
        let conn = self.conn.lock();
        tariff::insert_tariff(&conn, entry)
    }

    pub fn get_current_tariff(
        &self,
        hs_code: &str,
        country: &str,
        date: &str,
    ) -> Result<Option<Tariff>> {
        let conn = self.conn.lock();
        tariff::get_current_tariff(&conn, hs_code, country, date)
    }

    // ========== Forecast Methods ==========

    pub fn insert_forecast(&self, entry: &Forecast) -> Result<i64> {
        let conn = self.conn.lock();
        forecast::insert_forecast(&conn, entry)
    }

    pub fn get_latest_forecast(&self, hs_code: &str, horizon: Horizon) -> Result<Option<Forecast>> {
        let conn = self.conn.lock();
        forecast::get_latest_forecast(&conn, hs_code, horizon)
    }

    // ========== Risk Methods ==========

    pub fn insert_risk(&self, entry: &Risk) -> Result<i64> {
        let conn = self.conn.lock();
        risk::insert_risk(&conn, entry)
    }

    pub fn get_active_risks(&self, date: &str) -> Result<Vec<Risk>> {
        let conn = self.conn.lock();
        risk::get_active_risks(&conn, date)
    }

    pub fn get_risks_for_hs_code(&self, hs_code: &str, date: &str) -> Result<Vec<Risk>> {
        let conn = self.conn.lock();
        risk::get_risks_for_hs_code(&conn, hs_code, date)
    }

    // ========== User Methods ==========

    pub fn create_user(
        &self,
        email: &str,
        password: &str,
        subscription_plan: &str,
        security: &SecurityManager,
    ) -> Result<User> {
        let conn = self.conn.lock();
        user::create_user(&conn, email, password, subscription_plan, security)
    }

    pub fn verify_user(
        &self,
        email: &str,
        password: &str,
        security: &SecurityManager,
    ) -> Result<Option<User>> {
        let conn = self.conn.lock();
        user::verify_user(&conn, email, password, security)
    }

    pub fn change_password(
        &self,
        user_id: i64,
        new_password: &str,
        security: &SecurityManager,
    ) -> Result<()> {
        let conn = self.conn.lock();
        user::change_password(&conn, user_id, new_password, security)
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock();
        user::get_user_by_id(&conn, id)
    }

    pub fn save_hs_code_for_user(&self, user_id: i64, hs_code: &str) -> Result<()> {
        let conn = self.conn.lock();
        user::save_hs_code(&conn, user_id, hs_code)
    }

    pub fn remove_saved_hs_code(&self, user_id: i64, hs_code: &str) -> Result<bool> {
        let conn = self.conn.lock();
        user::remove_saved_hs_code(&conn, user_id, hs_code)
    }

    pub fn get_saved_hs_codes(&self, user_id: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        user::get_saved_hs_codes(&conn, user_id)
    }
}
