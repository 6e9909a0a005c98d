//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (is MongoDB reachable?)
//! - /version - Build metadata for deployment verification
//!
//! The ledger is the single source of truth, so readiness is tied to
//! the store: a gateway that cannot reach MongoDB cannot serve anything.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if the service is running)
    pub healthy: bool,
    /// 'online' or 'degraded' (store unreachable)
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Seconds since process start
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
    /// Active claim variant
    pub claim_mode: &'static str,
    /// Active streak reward mode
    pub streak_reward_mode: &'static str,
    /// Farming sweep cadence in seconds
    pub farming_tick_secs: u64,
}

fn build_health_response(state: &AppState, store_reachable: bool) -> HealthResponse {
    let args = &state.args;

    HealthResponse {
        healthy: true,
        status: if store_reachable { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: args.node_id.to_string(),
        claim_mode: args.claim_mode.as_str(),
        streak_reward_mode: args.streak_reward_mode.as_str(),
        farming_tick_secs: args.farming_tick_secs,
    }
}

fn json(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle liveness probe (/health, /healthz)
///
/// Returns 200 OK whenever the process is serving requests.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state, true);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    json(StatusCode::OK, body)
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 OK only when MongoDB answers a ping; use this for load
/// balancer health checks.
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let store_reachable = state.ledger.ping().await.is_ok();
    let response = build_health_response(&state, store_reachable);

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    let status = if store_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json(status, body)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "vineyard",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    json(StatusCode::OK, body)
}
