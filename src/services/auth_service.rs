//! Authentication and Watchlist Service
//!
//! Bearer-token sessions over Argon2id password hashes. A password change
//! drops every live session for the user; the `password_changed_at`
//! timestamp also rejects any token issued before it, covering sessions
//! that outlive the in-memory map.

use crate::db::models::{is_valid_hs_code, User};
use crate::error::{AppError, Result};
use crate::state::{AppState, UserSession};
use chrono::{NaiveDateTime, TimeZone, Utc};
use tracing::info;

const MIN_PASSWORD_LEN: usize = 8;

/// Authentication service
pub struct AuthService;

impl AuthService {
    /// Register a new account
    pub fn register(
        state: &AppState,
        email: &str,
        password: &str,
        subscription_plan: Option<&str>,
    ) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') || email.len() < 3 {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        state.db.create_user(
            &email,
            password,
            subscription_plan.unwrap_or("free"),
            &state.security,
        )
    }

    /// Verify credentials and issue a session token
    pub fn login(state: &AppState, email: &str, password: &str) -> Result<(String, User)> {
        let email = email.trim().to_lowercase();

        let user = state
            .db
            .verify_user(&email, password, &state.security)?
            .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        let token = state.security.generate_session_token();
        state.insert_session(
            token.clone(),
            UserSession {
                user_id: user.id,
                email: user.email.clone(),
                role: user.role.clone(),
                issued_at: Utc::now(),
            },
        );

        info!("User {} logged in", user.email);

        Ok((token, user))
    }

    /// Drop a session
    pub fn logout(state: &AppState, token: &str) -> Result<()> {
        if state.remove_session(token) {
            Ok(())
        } else {
            Err(AppError::Auth("Unknown session token".to_string()))
        }
    }

    /// Resolve a bearer token to a live session.
    ///
    /// Tokens issued before the user's last password change are rejected.
    pub fn authenticate(state: &AppState, token: &str) -> Result<UserSession> {
        let session = state
            .get_session(token)
            .ok_or_else(|| AppError::Auth("Invalid or expired session token".to_string()))?;

        let user = state
            .db
            .get_user_by_id(session.user_id)?
            .ok_or_else(|| AppError::Auth("Account no longer exists".to_string()))?;

        if let Some(changed_at) = parse_db_timestamp(&user.password_changed_at) {
            if session.issued_at < changed_at {
                state.remove_session(token);
                return Err(AppError::Auth(
                    "Session invalidated by password change".to_string(),
                ));
            }
        }

        Ok(session)
    }

    /// Change the password, invalidating every existing session
    pub fn change_password(
        state: &AppState,
        session: &UserSession,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let verified = state
            .db
            .verify_user(&session.email, current_password, &state.security)?;
        if verified.is_none() {
            return Err(AppError::Auth("Current password is incorrect".to_string()));
        }

        state
            .db
            .change_password(session.user_id, new_password, &state.security)?;
        state.remove_sessions_for_user(session.user_id);

        info!("User {} changed password", session.email);

        Ok(())
    }

    // ========== Watchlist ==========

    /// Add an HS code to the user's watchlist
    pub fn save_code(state: &AppState, session: &UserSession, hs_code: &str) -> Result<()> {
        if !is_valid_hs_code(hs_code) {
            return Err(AppError::Validation(format!(
                "Invalid HS code '{}': expected 6 to 10 digits",
                hs_code
            )));
        }
        if state.db.get_hs_code(hs_code)?.is_none() {
            return Err(AppError::NotFound(format!("Unknown HS code {}", hs_code)));
        }
        state.db.save_hs_code_for_user(session.user_id, hs_code)
    }

    /// Remove an HS code from the watchlist
    pub fn remove_code(state: &AppState, session: &UserSession, hs_code: &str) -> Result<()> {
        if state.db.remove_saved_hs_code(session.user_id, hs_code)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "HS code {} is not on the watchlist",
                hs_code
            )))
        }
    }

    /// Codes on the user's watchlist
    pub fn saved_codes(state: &AppState, session: &UserSession) -> Result<Vec<String>> {
        state.db.get_saved_hs_codes(session.user_id)
    }
}

/// Parse the SQLite `datetime('now')` format as a UTC instant
fn parse_db_timestamp(value: &str) -> Option<chrono::DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::HsCode;

    fn setup_state() -> AppState {
        let state = AppState::new_for_testing();
        state
            .db
            .upsert_hs_code(&HsCode {
                code: "120190".to_string(),
                description: "Soybeans".to_string(),
                section: "II".to_string(),
                chapter: "12".to_string(),
                search_count: 0,
            })
            .unwrap();
        state
    }

    #[test]
    fn test_register_login_logout() {
        let state = setup_state();

        let user =
            AuthService::register(&state, "Trader@Example.com", "hunter2hunter2", None).unwrap();
        assert_eq!(user.email, "trader@example.com");
        assert_eq!(user.role, "user");

        let (token, _) = AuthService::login(&state, "trader@example.com", "hunter2hunter2").unwrap();
        let session = AuthService::authenticate(&state, &token).unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(!session.is_admin());

        AuthService::logout(&state, &token).unwrap();
        assert!(AuthService::authenticate(&state, &token).is_err());
    }

    #[test]
    fn test_login_failures() {
        let state = setup_state();
        AuthService::register(&state, "a@b.com", "password123", None).unwrap();

        assert!(matches!(
            AuthService::login(&state, "a@b.com", "wrong-password"),
            Err(AppError::Auth(_))
        ));
        assert!(matches!(
            AuthService::login(&state, "nobody@b.com", "password123"),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_register_validation() {
        let state = setup_state();

        assert!(AuthService::register(&state, "not-an-email", "password123", None).is_err());
        assert!(AuthService::register(&state, "a@b.com", "short", None).is_err());

        AuthService::register(&state, "a@b.com", "password123", None).unwrap();
        // Duplicate email
        assert!(AuthService::register(&state, "a@b.com", "password123", None).is_err());
    }

    #[test]
    fn test_password_change_drops_sessions() {
        let state = setup_state();
        AuthService::register(&state, "a@b.com", "password123", None).unwrap();

        let (token, _) = AuthService::login(&state, "a@b.com", "password123").unwrap();
        let session = AuthService::authenticate(&state, &token).unwrap();

        AuthService::change_password(&state, &session, "password123", "newpassword456").unwrap();

        // Old token is gone; old password no longer works
        assert!(AuthService::authenticate(&state, &token).is_err());
        assert!(AuthService::login(&state, "a@b.com", "password123").is_err());
        AuthService::login(&state, "a@b.com", "newpassword456").unwrap();
    }

    #[test]
    fn test_stale_token_rejected_by_timestamp() {
        let state = setup_state();
        let user = AuthService::register(&state, "a@b.com", "password123", None).unwrap();

        // A token minted long before the password change survives only in
        // the map, not past the timestamp check.
        state.insert_session(
            "stale-token".to_string(),
            UserSession {
                user_id: user.id,
                email: user.email.clone(),
                role: user.role.clone(),
                issued_at: Utc::now() - chrono::Duration::hours(2),
            },
        );

        state
            .db
            .change_password(user.id, "newpassword456", &state.security)
            .unwrap();

        assert!(matches!(
            AuthService::authenticate(&state, "stale-token"),
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_watchlist_round_trip() {
        let state = setup_state();
        AuthService::register(&state, "a@b.com", "password123", None).unwrap();
        let (token, _) = AuthService::login(&state, "a@b.com", "password123").unwrap();
        let session = AuthService::authenticate(&state, &token).unwrap();

        AuthService::save_code(&state, &session, "120190").unwrap();
        // Saving twice is idempotent
        AuthService::save_code(&state, &session, "120190").unwrap();
        assert_eq!(
            AuthService::saved_codes(&state, &session).unwrap(),
            vec!["120190".to_string()]
        );

        AuthService::remove_code(&state, &session, "120190").unwrap();
        assert!(AuthService::saved_codes(&state, &session).unwrap().is_empty());
        assert!(AuthService::remove_code(&state, &session, "120190").is_err());
    }

    #[test]
    fn test_watchlist_rejects_unknown_code() {
        let state = setup_state();
        AuthService::register(&state, "a@b.com", "password123", None).unwrap();
        let (token, _) = AuthService::login(&state, "a@b.com", "password123").unwrap();
        let session = AuthService::authenticate(&state, &token).unwrap();

        assert!(matches!(
            AuthService::save_code(&state, &session, "999999"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            AuthService::save_code(&state, &session, "bad"),
            Err(AppError::Validation(_))
        ));
    }
}
