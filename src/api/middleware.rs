//! Bearer-token auth and per-client rate limiting for the REST surface.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};

const API_KEY_VAR: &str = "FTL_MCP_API_KEY";
const CORS_ORIGINS_VAR: &str = "FTL_MCP_CORS_ORIGINS";
const RATE_LIMIT_VAR: &str = "FTL_MCP_RATE_LIMIT";
const DEFAULT_RATE_LIMIT: u32 = 100;
/// Idle clients are swept once per this many checks.
const PRUNE_EVERY: u64 = 1024;

/// Security settings for the HTTP router.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Required bearer token. `None` leaves the API open.
    pub api_key: Option<String>,
    /// Allowed CORS origins. `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    /// Read `FTL_MCP_API_KEY`, `FTL_MCP_CORS_ORIGINS` and
    /// `FTL_MCP_RATE_LIMIT`.
    ///
    /// Rate limiting is only switched on together with an API key, since an
    /// open local server has nobody to throttle.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_VAR).ok().filter(|k| !k.is_empty());

        let cors_origins = std::env::var(CORS_ORIGINS_VAR).ok().map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect()
        });

        let per_minute = std::env::var(RATE_LIMIT_VAR)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);

        let rate_limiter = api_key
            .as_ref()
            .map(|_| RateLimiter::new(per_minute, Duration::from_secs(60)));

        Self {
            api_key,
            cors_origins,
            rate_limiter,
        }
    }

    /// No auth, any origin, no throttling.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
            ..Self::default()
        }
    }

    pub fn with_rate_limit(per_minute: u32) -> Self {
        Self {
            rate_limiter: Some(RateLimiter::new(per_minute, Duration::from_secs(60))),
            ..Self::default()
        }
    }

    /// CORS layer for the configured origins. Origins that are not valid
    /// header values are skipped with a warning.
    pub fn cors_layer(&self) -> CorsLayer {
        let Some(origins) = &self.cors_origins else {
            return CorsLayer::permissive();
        };
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| {
                HeaderValue::from_str(o)
                    .inspect_err(|_| tracing::warn!(origin = %o, "Ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Sliding-window request counter keyed by client address.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
    checks: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Arc::new(Mutex::new(HashMap::new())),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Count a request from `ip`. Returns false once the window is full.
    ///
    /// Every [`PRUNE_EVERY`] checks, clients idle for a whole window are
    /// forgotten so spoofed addresses cannot grow the table without bound.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().expect("rate limiter lock poisoned");
        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % PRUNE_EVERY == 0 {
            Self::sweep(&mut hits, now, self.window);
        }
        let recent = hits.entry(ip).or_default();
        recent.retain(|&t| now.duration_since(t) < self.window);

        if recent.len() < self.max_requests as usize {
            recent.push(now);
            true
        } else {
            false
        }
    }

    /// Forget clients with no requests inside the window.
    pub fn prune(&self) {
        let mut hits = self.hits.lock().expect("rate limiter lock poisoned");
        Self::sweep(&mut hits, Instant::now(), self.window);
    }

    fn sweep(hits: &mut HashMap<IpAddr, Vec<Instant>>, now: Instant, window: Duration) {
        hits.retain(|_, recent| {
            recent.retain(|&t| now.duration_since(t) < window);
            !recent.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.hits.lock().expect("rate limiter lock poisoned").len()
    }
}

/// Reject requests without `Authorization: Bearer <api key>` when a key is
/// configured.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = &config.api_key else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match provided.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(token)) if token == expected => Ok(next.run(request).await),
        Some(Some(_)) => {
            tracing::warn!("Rejected request with wrong API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        Some(None) => {
            tracing::warn!("Rejected request with non-bearer Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Rejected request without Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(&request);
    if limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(%ip, "Rate limit exceeded");
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Client address from proxy headers, falling back to loopback.
fn client_ip(request: &Request<Body>) -> IpAddr {
    let header_ip = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    };

    header_ip("X-Forwarded-For")
        .or_else(|| header_ip("X-Real-IP"))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
