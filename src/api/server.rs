//! HTTP server for the REST API
//!
//! Builds the axum router, applies CORS, tracing and rate limiting, and
//! serves until a shutdown signal arrives.

use crate::api::handlers;
use crate::api::rate_limiter::{rate_limit_middleware, RateLimiterState};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// REST API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
        }
    }

    /// Build the full application router
    pub fn router(state: Arc<AppState>) -> Router {
        let rate_limiter = Arc::new(RateLimiterState::new(
            state.config.general_rate_limit,
            state.config.calculate_rate_limit,
            state.config.auth_rate_limit,
        ));

        // Allow all origins for local and embedded use
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let api = Router::new()
            // Auth
            .route("/auth/register", post(handlers::register))
            .route("/auth/login", post(handlers::login))
            .route("/auth/logout", post(handlers::logout))
            .route("/auth/password", post(handlers::change_password))
            // HS code directory
            .route("/hscodes/search", get(handlers::search_hs_codes))
            .route("/hscodes/:code", get(handlers::hs_code_detail))
            .route("/hscodes/:code/prices", get(handlers::price_history))
            .route("/hscodes/:code/quote", get(handlers::latest_quote))
            .route("/hscodes/:code/forecast", get(handlers::forecast))
            .route("/hscodes/:code/risks", get(handlers::risks_for_hs_code))
            // Comparison and tariffs
            .route("/compare", post(handlers::compare))
            .route("/tariffs/calculate", post(handlers::calculate_tariff))
            // Risk alerts
            .route("/risks", get(handlers::active_risks).post(handlers::create_risk))
            // Watchlist
            .route("/watchlist", get(handlers::watchlist))
            .route(
                "/watchlist/:code",
                put(handlers::watchlist_add).delete(handlers::watchlist_remove),
            );

        Router::new()
            .route("/health", get(handlers::health))
            .nest("/api/v1", api)
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                rate_limiter,
                rate_limit_middleware,
            ))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve in a background task
    pub async fn start(&mut self) -> Result<()> {
        let host = self.state.config.host.clone();
        let port = self.state.config.port;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid bind address: {}", e)))?;

        let app = Self::router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("Starting TradeEasy API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        info!("API base URL: http://{}:{}/api/v1", host, port);

        Ok(())
    }

    /// Send the shutdown signal
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
