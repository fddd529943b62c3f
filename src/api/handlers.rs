//! REST API endpoint handlers
//!
//! Thin translation layer: extract inputs, call the matching service,
//! serialize the result. Errors bubble up as `AppError` and map to HTTP
//! statuses in one place.

use crate::api::types::*;
use crate::db::models::{Forecast, Horizon, HsCode, Risk};
use crate::error::{AppError, Result};
use crate::feed::Quote;
use crate::services::{
    AuthService, CalculateRequest, ChartSeries, CompareEntry, CreateRiskRequest, ForecastService,
    HsCodeService, LandedCostResult, PriceService, RiskService, TariffService,
};
use crate::state::{AppState, UserSession};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Pull the bearer token out of the Authorization header
fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))
}

fn require_session(state: &AppState, headers: &HeaderMap) -> Result<UserSession> {
    AuthService::authenticate(state, bearer_token(headers)?)
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<UserSession> {
    let session = require_session(state, headers)?;
    if !session.is_admin() {
        return Err(AppError::Auth("Administrator role required".to_string()));
    }
    Ok(session)
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        feed_degraded: state.feed.is_degraded(),
    })
}

// ============================================================================
// Auth
// ============================================================================

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = AuthService::register(
        &state,
        &req.email,
        &req.password,
        req.subscription_plan.as_deref(),
    )?;
    info!("Registered user {}", user.email);
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (token, user) = AuthService::login(&state, &req.email, &req.password)?;
    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>> {
    AuthService::logout(&state, bearer_token(&headers)?)?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// POST /api/v1/auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let session = require_session(&state, &headers)?;
    AuthService::change_password(&state, &session, &req.current_password, &req.new_password)?;
    Ok(Json(MessageResponse::new(
        "Password changed, all sessions invalidated",
    )))
}

// ============================================================================
// HS code directory
// ============================================================================

/// GET /api/v1/hscodes/search?q=&limit=
pub async fn search_hs_codes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<HsCode>>> {
    Ok(Json(HsCodeService::search(
        &state.db,
        &query.q,
        query.limit,
    )?))
}

/// GET /api/v1/hscodes/{code}
pub async fn hs_code_detail(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<HsCode>> {
    Ok(Json(HsCodeService::detail(&state.db, &code)?))
}

/// GET /api/v1/hscodes/{code}/prices?start=&end=&currency=
///
/// The range defaults to the trailing year ending today.
pub async fn price_history(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<PriceRangeQuery>,
) -> Result<Json<ChartSeries>> {
    let end = query.end.unwrap_or_else(today);
    let start = match query.start {
        Some(start) => start,
        None => default_start(&end)?,
    };

    Ok(Json(PriceService::history_with_volume(
        &state.db,
        &code,
        &start,
        &end,
        query.currency.as_deref(),
    )?))
}

fn default_start(end: &str) -> Result<String> {
    let end_date = chrono::NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}'", end)))?;
    Ok((end_date - Duration::days(365)).format("%Y-%m-%d").to_string())
}

/// GET /api/v1/hscodes/{code}/quote
pub async fn latest_quote(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Quote>> {
    Ok(Json(state.feed.latest_quote(&code).await?))
}

/// GET /api/v1/hscodes/{code}/forecast?horizon=
pub async fn forecast(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Forecast>> {
    let horizon = match query.horizon.as_deref() {
        Some(raw) => Horizon::parse(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid horizon '{}': expected 1d, 1w, 1m, 3m, 6m or 1y",
                raw
            ))
        })?,
        None => Horizon::OneMonth,
    };

    Ok(Json(ForecastService::forecast(&state.db, &code, horizon)?))
}

/// GET /api/v1/hscodes/{code}/risks
pub async fn risks_for_hs_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<RiskQuery>,
) -> Result<Json<Vec<Risk>>> {
    let date = query.date.unwrap_or_else(today);
    Ok(Json(RiskService::for_hs_code(&state.db, &code, &date)?))
}

// ============================================================================
// Comparison and tariffs
// ============================================================================

/// POST /api/v1/compare
///
/// Always 200; codes that cannot be resolved carry a per-key error entry.
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<HashMap<String, CompareEntry>>> {
    if req.hs_codes.is_empty() {
        return Err(AppError::Validation(
            "At least one HS code is required".to_string(),
        ));
    }

    let end = req.end.unwrap_or_else(today);
    let start = match req.start {
        Some(start) => start,
        None => default_start(&end)?,
    };

    Ok(Json(PriceService::compare(
        &state.db,
        &req.hs_codes,
        &start,
        &end,
        req.currency.as_deref(),
    )))
}

/// POST /api/v1/tariffs/calculate
pub async fn calculate_tariff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalculateRequest>,
) -> Result<Json<LandedCostResult>> {
    Ok(Json(TariffService::calculate(&state.db, &req)?))
}

// ============================================================================
// Risks
// ============================================================================

/// GET /api/v1/risks?date=
pub async fn active_risks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RiskQuery>,
) -> Result<Json<Vec<Risk>>> {
    let date = query.date.unwrap_or_else(today);
    Ok(Json(RiskService::active(&state.db, &date)?))
}

/// POST /api/v1/risks (admin)
pub async fn create_risk(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateRiskRequest>,
) -> Result<(StatusCode, Json<Risk>)> {
    require_admin(&state, &headers)?;
    let risk = RiskService::create(&state.db, req)?;
    info!("Created risk alert {} ({})", risk.id, risk.title);
    Ok((StatusCode::CREATED, Json(risk)))
}

// ============================================================================
// Watchlist
// ============================================================================

/// GET /api/v1/watchlist
pub async fn watchlist(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<WatchlistResponse>> {
    let session = require_session(&state, &headers)?;
    Ok(Json(WatchlistResponse {
        hs_codes: AuthService::saved_codes(&state, &session)?,
    }))
}

/// PUT /api/v1/watchlist/{code}
pub async fn watchlist_add(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<MessageResponse>> {
    let session = require_session(&state, &headers)?;
    AuthService::save_code(&state, &session, &code)?;
    Ok(Json(MessageResponse::new(format!(
        "HS code {} added to watchlist",
        code
    ))))
}

/// DELETE /api/v1/watchlist/{code}
pub async fn watchlist_remove(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<MessageResponse>> {
    let session = require_session(&state, &headers)?;
    AuthService::remove_code(&state, &session, &code)?;
    Ok(Json(MessageResponse::new(format!(
        "HS code {} removed from watchlist",
        code
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        let headers = headers_with("Bearer abc123");
        assert_eq!(bearer_token(&headers).unwrap(), "abc123");
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers_with("Basic abc123")).is_err());
        assert!(bearer_token(&headers_with("Bearer ")).is_err());
    }

    #[test]
    fn test_default_start_is_trailing_year() {
        assert_eq!(default_start("2025-06-01").unwrap(), "2024-06-01");
        assert!(default_start("June 2025").is_err());
    }
}
