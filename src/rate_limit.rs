//! Per-client request limiting: a fixed window counter keyed by IP address.

use crate::error::AppError;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, RwLock};

pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

/// Stale windows are swept once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per client within one window.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::seconds(DEFAULT_RATE_LIMIT_WINDOW_SECS as i64),
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    /// ip -> (requests in window, window start)
    windows: RwLock<HashMap<IpAddr, (u32, DateTime<Utc>)>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        self.check_at(ip, Utc::now())
    }

    /// Count one request from `ip` at `now`. A window opens on the first request and resets
    /// once it has fully elapsed.
    pub fn check_at(&self, ip: IpAddr, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut windows = self.windows.write().unwrap_or_else(|e| e.into_inner());
        if windows.len() >= PRUNE_THRESHOLD {
            let window = self.config.window;
            windows.retain(|_, (_, start)| now - *start < window);
        }
        let entry = windows.entry(ip).or_insert((0, now));
        if now - entry.1 >= self.config.window {
            *entry = (0, now);
        }
        if entry.0 >= self.config.max_requests {
            let retry_after = (entry.1 + self.config.window - now).num_seconds().max(1) as u64;
            return Err(AppError::RateLimited { retry_after });
        }
        entry.0 += 1;
        Ok(())
    }
}

/// Client address: the peer socket when the server was started with connect info, else the
/// first `X-Forwarded-For` entry.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    forwarded_for(request.headers()).unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Middleware for `axum::middleware::from_fn_with_state`.
pub async fn limit_by_ip(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let ip = client_ip(&request);
    match limiter.check(ip) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(%ip, "rate limit exceeded");
            let retry_after = match &e {
                AppError::RateLimited { retry_after } => Some(*retry_after),
                _ => None,
            };
            let mut response = e.into_response();
            if let Some(secs) = retry_after {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
            response
        }
    }
}
