//! User account queries

use crate::db::models::User;
use crate::error::{AppError, Result};
use crate::security::SecurityManager;
use rusqlite::{params, Connection};

/// Create a new user with a hashed password
pub fn create_user(
    conn: &Connection,
    email: &str,
    password: &str,
    subscription_plan: &str,
    security: &SecurityManager,
) -> Result<User> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get(0),
    )?;

    if exists {
        return Err(AppError::Validation(format!(
            "User with email '{}' already exists",
            email
        )));
    }

    let password_hash = security.hash_password(password)?;

    conn.execute(
        "INSERT INTO users (email, password_hash, subscription_plan) VALUES (?1, ?2, ?3)",
        params![email, password_hash, subscription_plan],
    )?;

    let id = conn.last_insert_rowid();

    tracing::info!("Created user '{}' with id {}", email, id);

    get_user_by_id(conn, id)?
        .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))
}

/// Verify credentials, returning the user on success
pub fn verify_user(
    conn: &Connection,
    email: &str,
    password: &str,
    security: &SecurityManager,
) -> Result<Option<User>> {
    match get_user_by_email(conn, email)? {
        Some(user) => {
            if security.verify_password(password, &user.password_hash)? {
                Ok(Some(user))
            } else {
                Ok(None)
            }
        }
        None => Ok(None),
    }
}

/// Rehash the password and bump `password_changed_at`.
///
/// Sessions issued before the bump are rejected at auth time.
pub fn change_password(
    conn: &Connection,
    user_id: i64,
    new_password: &str,
    security: &SecurityManager,
) -> Result<()> {
    let password_hash = security.hash_password(new_password)?;

    let rows = conn.execute(
        "UPDATE users SET password_hash = ?1, password_changed_at = datetime('now')
         WHERE id = ?2",
        params![password_hash, user_id],
    )?;

    if rows == 0 {
        return Err(AppError::NotFound(format!("User {}", user_id)));
    }

    Ok(())
}

/// Get a user by email
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, email, password_hash, role, subscription_plan, password_changed_at, created_at
         FROM users WHERE email = ?1",
        params![email],
        map_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get a user by id
pub fn get_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, email, password_hash, role, subscription_plan, password_changed_at, created_at
         FROM users WHERE id = ?1",
        params![id],
        map_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ========== Watchlist ==========

/// Add a code to the user's watchlist (idempotent)
pub fn save_hs_code(conn: &Connection, user_id: i64, hs_code: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_saved_hscodes (user_id, hs_code) VALUES (?1, ?2)",
        params![user_id, hs_code],
    )?;
    Ok(())
}

/// Remove a code from the user's watchlist, returning whether it was present
pub fn remove_saved_hs_code(conn: &Connection, user_id: i64, hs_code: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM user_saved_hscodes WHERE user_id = ?1 AND hs_code = ?2",
        params![user_id, hs_code],
    )?;
    Ok(rows > 0)
}

/// Codes on the user's watchlist, oldest first
pub fn get_saved_hs_codes(conn: &Connection, user_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT hs_code FROM user_saved_hscodes WHERE user_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;

    let codes: Vec<String> = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(codes)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        subscription_plan: row.get(4)?,
        password_changed_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}
