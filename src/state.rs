//! Application state management

use crate::config::ServerConfig;
use crate::db::Db;
use crate::error::Result;
use crate::feed::PriceFeed;
use crate::security::SecurityManager;
use dashmap::DashMap;
use std::sync::Arc;

/// User session tied to a bearer token
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

impl UserSession {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Application state shared across all request handlers
pub struct AppState {
    /// SQLite database
    pub db: Arc<Db>,

    /// Password hashing and token generation
    pub security: Arc<SecurityManager>,

    /// Live quote feed with mock fallback
    pub feed: Arc<PriceFeed>,

    /// Active sessions (token -> session)
    pub sessions: DashMap<String, UserSession>,

    /// Runtime configuration
    pub config: ServerConfig,
}

impl AppState {
    /// Create new application state from configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        tracing::info!("Data directory: {:?}", config.data_dir);

        let db_path = config.data_dir.join("tradeeasy.db");
        let db = Arc::new(Db::new(&db_path)?);
        db.seed_if_empty()?;

        let security = Arc::new(SecurityManager::new(config.data_dir.clone())?);

        let feed = Arc::new(PriceFeed::new(
            db.clone(),
            config.feed_url.clone(),
            config.feed_timeout_ms,
            config.mock_only,
        ));

        Ok(Self {
            db,
            security,
            feed,
            sessions: DashMap::new(),
            config,
        })
    }

    /// In-memory state for tests (no data dir, mock-only feed)
    #[cfg(test)]
    pub fn new_for_testing() -> Self {
        let config = ServerConfig::default();
        let db = Arc::new(Db::open_in_memory().expect("in-memory db"));
        let security = Arc::new(SecurityManager::new_ephemeral());
        let feed = Arc::new(PriceFeed::new(db.clone(), None, 100, true));

        Self {
            db,
            security,
            feed,
            sessions: DashMap::new(),
            config,
        }
    }

    /// Look up the session behind a bearer token
    pub fn get_session(&self, token: &str) -> Option<UserSession> {
        self.sessions.get(token).map(|s| s.clone())
    }

    /// Register a session for a token
    pub fn insert_session(&self, token: String, session: UserSession) {
        self.sessions.insert(token, session);
    }

    /// Drop a session, returning whether it existed
    pub fn remove_session(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every session belonging to a user (after a password change)
    pub fn remove_sessions_for_user(&self, user_id: i64) {
        self.sessions.retain(|_, session| session.user_id != user_id);
    }
}
