//! Rate limiting middleware.
//!
//! Sliding one-minute window per client IP, with separate thresholds for
//! read, write, and admin traffic.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;
use tower::{Layer, Service};

use tessera_registry::Settings;

/// Traffic class a request is limited under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    Read,
    Write,
    Admin,
}

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub read_per_window: usize,
    pub write_per_window: usize,
    pub admin_per_window: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            read_per_window: settings.rate_limit_read,
            write_per_window: settings.rate_limit_write,
            admin_per_window: settings.rate_limit_admin,
            window: Duration::from_secs(60),
        }
    }

    fn limit_for(&self, class: LimitClass) -> usize {
        match class {
            LimitClass::Read => self.read_per_window,
            LimitClass::Write => self.write_per_window,
            LimitClass::Admin => self.admin_per_window,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            read_per_window: 1000,
            write_per_window: 100,
            admin_per_window: 50,
            window: Duration::from_secs(60),
        }
    }
}

/// Classify a request by method and path.
pub fn classify(method: &Method, path: &str) -> LimitClass {
    if method == Method::GET || method == Method::HEAD {
        return LimitClass::Read;
    }
    if path.contains("/api-keys") || path.contains("/webhooks") {
        return LimitClass::Admin;
    }
    LimitClass::Write
}

/// Rate limiter state
struct RateLimiterState {
    requests: HashMap<(IpAddr, LimitClass), Vec<Instant>>,
}

impl RateLimiterState {
    fn new() -> Self {
        Self {
            requests: HashMap::new(),
        }
    }

    fn check_rate_limit(&mut self, ip: IpAddr, class: LimitClass, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let cutoff = now - config.window;

        let requests = self.requests.entry((ip, class)).or_default();
        requests.retain(|&time| time > cutoff);

        if requests.len() < config.limit_for(class) {
            requests.push(now);
            true
        } else {
            false
        }
    }
}

/// Rate limiting layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<Mutex<RateLimiterState>>,
    config: RateLimitConfig,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimiterState::new())),
            config,
        }
    }
}

impl Default for RateLimitLayer {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: self.state.clone(),
            config: self.config.clone(),
        }
    }
}

/// Rate limiting service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<Mutex<RateLimiterState>>,
    config: RateLimitConfig,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let state = self.state.clone();
        let config = self.config.clone();
        let ip = client_ip(&req);
        let class = classify(req.method(), req.uri().path());

        Box::pin(async move {
            let mut state = state.lock().await;
            let allowed = state.check_rate_limit(ip, class, &config);
            drop(state);

            if !allowed {
                return Ok((
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit exceeded. Please try again later.",
                )
                    .into_response());
            }

            inner.call(req).await
        })
    }
}

/// Client address from the forwarding header, falling back to loopback when
/// the service fronts itself.
fn client_ip(req: &Request) -> IpAddr {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(classify(&Method::GET, "/api/v1/assets"), LimitClass::Read);
        assert_eq!(classify(&Method::POST, "/api/v1/assets"), LimitClass::Write);
        assert_eq!(
            classify(&Method::POST, "/api/v1/api-keys"),
            LimitClass::Admin
        );
        assert_eq!(
            classify(&Method::GET, "/api/v1/api-keys"),
            LimitClass::Read
        );
    }

    #[test]
    fn test_sliding_window_enforcement() {
        let config = RateLimitConfig {
            read_per_window: 2,
            write_per_window: 1,
            admin_per_window: 1,
            window: Duration::from_secs(60),
        };
        let mut state = RateLimiterState::new();
        let ip = IpAddr::from([10, 0, 0, 1]);

        assert!(state.check_rate_limit(ip, LimitClass::Read, &config));
        assert!(state.check_rate_limit(ip, LimitClass::Read, &config));
        assert!(!state.check_rate_limit(ip, LimitClass::Read, &config));

        // Write quota is tracked separately.
        assert!(state.check_rate_limit(ip, LimitClass::Write, &config));
        assert!(!state.check_rate_limit(ip, LimitClass::Write, &config));

        // Other clients are unaffected.
        let other = IpAddr::from([10, 0, 0, 2]);
        assert!(state.check_rate_limit(other, LimitClass::Read, &config));
    }
}
