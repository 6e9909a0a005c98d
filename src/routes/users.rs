//! User API
//!
//! The mini-app's view of a ledger entry: account state with claim
//! eligibility, the claim endpoint (both variants), login-streak
//! evaluation, and referral counting.
//!
//! ## Routes
//!
//! - `GET  /api/user/{userId}` - Account state + claim eligibility
//! - `POST /api/user/{userId}/claim` - Claim points (variant per deployment)
//! - `POST /api/user/{userId}/login` - Evaluate the login streak
//! - `GET  /api/user/{userId}/streak` - Streak summary
//! - `GET  /api/referrals/{userId}` - Referred-account count

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::ClaimMode;
use crate::engine;
use crate::server::AppState;
use crate::types::{Result, VineyardError};

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Parsed API route components
#[derive(Debug, PartialEq, Eq)]
enum ApiRoute<'a> {
    User(&'a str),
    Claim(&'a str),
    Login(&'a str),
    Streak(&'a str),
    Referrals(&'a str),
}

impl<'a> ApiRoute<'a> {
    /// Parse a path under `/api/` into a typed route
    fn parse(path: &'a str) -> Option<Self> {
        let stripped = path.strip_prefix("/api/")?;
        let parts: Vec<&str> = stripped.split('/').filter(|s| !s.is_empty()).collect();

        match parts.as_slice() {
            ["user", id] => Some(Self::User(id)),
            ["user", id, "claim"] => Some(Self::Claim(id)),
            ["user", id, "login"] => Some(Self::Login(id)),
            ["user", id, "streak"] => Some(Self::Streak(id)),
            ["referrals", id] => Some(Self::Referrals(id)),
            _ => None,
        }
    }
}

/// Handle any request under /api/
pub async fn handle_api_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (ApiRoute::parse(&path), method) {
        (Some(ApiRoute::User(id)), Method::GET) => handle_get_user(&state, id).await,
        (Some(ApiRoute::Claim(id)), Method::POST) => {
            let id = id.to_string();
            handle_claim(&state, &id, req).await
        }
        (Some(ApiRoute::Login(id)), Method::POST) => handle_login(&state, id).await,
        (Some(ApiRoute::Streak(id)), Method::GET) => handle_streak(&state, id).await,
        (Some(ApiRoute::Referrals(id)), Method::GET) => handle_referrals(&state, id).await,
        (Some(_), _) => {
            return error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed",
                "METHOD_NOT_ALLOWED",
                None,
            );
        }
        (None, _) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "Unknown API route",
                "INVALID_ROUTE",
                None,
            );
        }
    };

    match result {
        Ok(response) => response,
        Err(e) => error_from(e),
    }
}

// ============================================================================
// Response payloads
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: String,
    first_name: String,
    last_name: String,
    reward_balance: f64,
    pending_farming_points: f64,
    farming_multiplier: f64,
    login_streak_count: i32,
    can_claim: bool,
    time_remaining: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimResponse {
    message: String,
    reward_balance: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    login_streak_count: i32,
    reward_balance: f64,
    farming_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    points_earned: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreakResponse {
    streak_count: i32,
    reward_balance: f64,
    can_claim: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReferralsResponse {
    referred_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ClaimRequest {
    points: Option<f64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/user/{userId}
async fn handle_get_user(state: &AppState, user_id: &str) -> Result<Response<Full<Bytes>>> {
    let account = state.ledger.get(user_id).await?;
    let status = engine::evaluate_claim(&account, state.now(), &state.reward_config);

    debug!(user = user_id, can_claim = status.can_claim, "User lookup");

    json_response(&UserResponse {
        id: account.telegram_id,
        first_name: account.first_name,
        last_name: account.last_name,
        reward_balance: account.reward_balance,
        pending_farming_points: account.pending_farming_points,
        farming_multiplier: account.farming_multiplier,
        login_streak_count: account.login_streak_count,
        can_claim: status.can_claim,
        time_remaining: status.time_remaining_secs,
    })
}

/// POST /api/user/{userId}/claim
///
/// Runs the engine on a scratch copy for validation, then applies the
/// matching store-side atomic update. Concurrent claims on the same
/// account resolve last-write-wins, as the ledger contract allows.
async fn handle_claim(
    state: &AppState,
    user_id: &str,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>> {
    let body: ClaimRequest = parse_json_body_or_default(req).await?;
    let now = state.now();

    let mut account = state.ledger.get(user_id).await?;

    let account = match state.reward_config.claim_mode {
        ClaimMode::Direct => {
            let points = body.points.ok_or_else(|| {
                VineyardError::Validation("points is required".to_string())
            })?;
            engine::claim_points(&mut account, points, now)?;
            state.ledger.claim_points(user_id, points, now).await?
        }
        ClaimMode::Farming => {
            engine::claim_farming(&mut account, now)?;
            state.ledger.claim_farming(user_id, now).await?
        }
    };

    info!(
        user = user_id,
        balance = account.reward_balance,
        "Claim processed"
    );

    json_response(&ClaimResponse {
        message: "Points claimed successfully.".to_string(),
        reward_balance: account.reward_balance,
    })
}

/// POST /api/user/{userId}/login
async fn handle_login(state: &AppState, user_id: &str) -> Result<Response<Full<Bytes>>> {
    let mut account = state.ledger.get(user_id).await?;

    let outcome = engine::evaluate_login(&mut account, state.now(), &state.reward_config);
    if !outcome.already_logged_today {
        state.ledger.save(&account).await?;
    }

    info!(
        user = user_id,
        streak = outcome.streak,
        milestone = outcome.milestone_reached,
        "Login evaluated"
    );

    json_response(&LoginResponse {
        login_streak_count: outcome.streak,
        reward_balance: account.reward_balance,
        farming_multiplier: outcome.farming_multiplier,
        points_earned: (outcome.points_earned > 0.0).then_some(outcome.points_earned),
    })
}

/// GET /api/user/{userId}/streak
async fn handle_streak(state: &AppState, user_id: &str) -> Result<Response<Full<Bytes>>> {
    let account = state.ledger.get(user_id).await?;
    let status = engine::evaluate_claim(&account, state.now(), &state.reward_config);

    json_response(&StreakResponse {
        streak_count: account.login_streak_count,
        reward_balance: account.reward_balance,
        can_claim: status.can_claim,
    })
}

/// GET /api/referrals/{userId}
async fn handle_referrals(state: &AppState, user_id: &str) -> Result<Response<Full<Bytes>>> {
    let referred_count = state.ledger.count_referred_by(user_id).await?;

    json_response(&ReferralsResponse { referred_count })
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a JSON body, treating an empty body as defaults
async fn parse_json_body_or_default<T: for<'de> Deserialize<'de> + Default>(
    req: Request<Incoming>,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| VineyardError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.is_empty() {
        return Ok(T::default());
    }
    if bytes.len() > 10240 {
        return Err(VineyardError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| VineyardError::Http(format!("Invalid JSON: {}", e)))
}

fn json_response<T: Serialize>(body: &T) -> Result<Response<Full<Bytes>>> {
    let data = serde_json::to_vec(body)
        .map_err(|e| VineyardError::Internal(format!("Serialization failed: {}", e)))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(data)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
                .unwrap()
        }))
}

fn error_response(
    status: StatusCode,
    message: &str,
    code: &'static str,
    details: Option<String>,
) -> Response<Full<Bytes>> {
    let error = ApiError {
        error: message.to_string(),
        code,
        details,
    };
    let body = serde_json::to_vec(&error).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
                .unwrap()
        })
}

/// Translate a service error into an HTTP error response
fn error_from(err: VineyardError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    let code = match &err {
        VineyardError::Validation(_) => "VALIDATION",
        VineyardError::NothingToClaim => "NOTHING_TO_CLAIM",
        VineyardError::NotFound(_) => "NOT_FOUND",
        VineyardError::Conflict(_) => "CONFLICT",
        VineyardError::Database(_) => "STORE_UNAVAILABLE",
        VineyardError::Http(_) => "BAD_REQUEST",
        _ => "INTERNAL",
    };

    if status.is_server_error() {
        error!("API request failed: {}", err);
        error_response(
            status,
            "Internal Server Error",
            code,
            Some(err.to_string()),
        )
    } else {
        error_response(status, &err.to_string(), code, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_route() {
        assert_eq!(ApiRoute::parse("/api/user/12345"), Some(ApiRoute::User("12345")));
    }

    #[test]
    fn test_parse_claim_route() {
        assert_eq!(
            ApiRoute::parse("/api/user/12345/claim"),
            Some(ApiRoute::Claim("12345"))
        );
    }

    #[test]
    fn test_parse_login_and_streak_routes() {
        assert_eq!(
            ApiRoute::parse("/api/user/7/login"),
            Some(ApiRoute::Login("7"))
        );
        assert_eq!(
            ApiRoute::parse("/api/user/7/streak"),
            Some(ApiRoute::Streak("7"))
        );
    }

    #[test]
    fn test_parse_referrals_route() {
        assert_eq!(
            ApiRoute::parse("/api/referrals/999"),
            Some(ApiRoute::Referrals("999"))
        );
    }

    #[test]
    fn test_parse_invalid_routes() {
        assert!(ApiRoute::parse("/api/").is_none());
        assert!(ApiRoute::parse("/api/user").is_none());
        assert!(ApiRoute::parse("/api/user/1/unknown").is_none());
        assert!(ApiRoute::parse("/other/path").is_none());
    }

    #[test]
    fn test_error_response_status() {
        let resp = error_response(StatusCode::NOT_FOUND, "User not found", "NOT_FOUND", None);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_from_maps_kinds() {
        let resp = error_from(VineyardError::NothingToClaim);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = error_from(VineyardError::Database("down".into()));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
