//! HTTP server implementation
//!
//! hyper http1 with TokioIo for async handling; one spawned task per
//! connection, routing via a `(Method, path)` match.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::bot::TelegramClient;
use crate::config::{Args, RewardConfig};
use crate::engine::Clock;
use crate::ledger::UserLedger;
use crate::routes;
use crate::types::VineyardError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
///
/// Constructed once in main and injected into the API router, the bot
/// command handlers, and the farming sweeper.
pub struct AppState {
    pub args: Args,
    pub reward_config: RewardConfig,
    /// The authoritative user ledger
    pub ledger: Arc<UserLedger>,
    /// Bot client for replies and referral notifications (absent in
    /// dev mode without a token)
    pub bot: Option<Arc<TelegramClient>>,
    /// Time source injected so handlers are testable off the wall clock
    pub clock: Arc<dyn Clock>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        reward_config: RewardConfig,
        ledger: Arc<UserLedger>,
        bot: Option<Arc<TelegramClient>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            args,
            reward_config,
            ledger,
            bot,
            clock,
            started_at: Instant::now(),
        }
    }

    /// Current time from the injected clock
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Seconds since process start
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), VineyardError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Vineyard listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 if vineyard is running
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        // Readiness probe - returns 200 only if MongoDB is reachable
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)).await)
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight (web.telegram.org mini-app origin)
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // User API
        (_, p) if p.starts_with("/api/") => {
            to_boxed(routes::handle_api_request(Arc::clone(&state), req).await)
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> response into a boxed body
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// 404 response for unknown paths
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = format!(r#"{{"error":"Not found: {}"}}"#, path);

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_has_cors_headers() {
        let resp = preflight_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }

    #[test]
    fn test_not_found_response() {
        let resp = not_found_response("/nope");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
