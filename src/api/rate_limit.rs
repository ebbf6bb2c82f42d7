//! Per-client sliding-window rate limiting

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use dashmap::DashMap;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Paths that are never limited
const EXEMPT_PATHS: [&str; 1] = ["/health"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Request timestamps per client, kept for one window. Clients idle for a
/// whole window are dropped at most once per window.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: DashMap<String, Vec<Instant>>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request from `client` if it is within its allowance.
    pub fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        self.sweep_idle(now);

        let mut times = self.clients.entry(client.to_string()).or_default();
        times.retain(|&t| now.duration_since(t) < self.window);

        if times.len() >= self.max_requests as usize {
            let retry_after = times.first().map_or(self.window, |&oldest| {
                self.window.saturating_sub(now.duration_since(oldest))
            });
            return RateDecision::Limited { retry_after };
        }

        times.push(now);
        let used = u32::try_from(times.len()).unwrap_or(u32::MAX);
        RateDecision::Allowed {
            remaining: self.max_requests.saturating_sub(used),
        }
    }

    // Must not run while an entry guard is held.
    fn sweep_idle(&self, now: Instant) {
        {
            let Ok(mut last) = self.last_sweep.lock() else {
                return;
            };
            if now.duration_since(*last) < self.window {
                return;
            }
            *last = now;
        }

        let before = self.clients.len();
        self.clients.retain(|_, times| {
            times
                .last()
                .is_some_and(|&t| now.duration_since(t) < self.window)
        });
        debug!(removed = before.saturating_sub(self.clients.len()), "Swept idle clients");
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}

/// Middleware for [`axum::middleware::from_fn_with_state`].
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_key(&request);
    let window_secs = limiter.window().as_secs();

    match limiter.check(&client) {
        RateDecision::Limited { retry_after } => {
            warn!(client, "Rate limit exceeded");
            let detail = format!(
                "Rate limit exceeded. Maximum {} requests per {window_secs} seconds.",
                limiter.max_requests()
            );
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "detail": detail }))).into_response();
            let retry_secs = retry_after.as_secs().max(1);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
            response
        }
        RateDecision::Allowed { remaining } => {
            let reset = chrono::Utc::now().timestamp().saturating_add_unsigned(window_secs);
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limiter.max_requests()));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            headers.insert("x-ratelimit-reset", HeaderValue::from(reset));
            response
        }
    }
}
