use std::{
    collections::HashMap,
    env,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, MatchedPath, State},
    http::{header::RETRY_AFTER, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::metrics;

const DEFAULT_MAX_REQUESTS: u32 = 100;
const DEFAULT_WINDOW_SECONDS: u64 = 15 * 60;
const MAX_TRACKED_BUCKETS: usize = 10_000;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

const HEADER_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Per-client fixed-window request budget, shared by every route it guards
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<RateLimitConfig>,
    buckets: Arc<Mutex<HashMap<BucketKey, BucketState>>>,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_request<B>(&self, request: &Request<B>) -> RateLimitDecision {
        let key = BucketKey {
            ip: extract_client_ip(request, self.config.trust_proxy),
            endpoint_key: endpoint_key(request),
        };
        let limit = self.config.max_requests;
        let window = self.config.window;
        let now = Instant::now();

        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= MAX_TRACKED_BUCKETS && !buckets.contains_key(&key) {
            evict_buckets(&mut buckets, now, window);
        }

        let bucket = buckets.entry(key).or_insert_with(|| BucketState {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        let remaining_window = window.saturating_sub(now.duration_since(bucket.window_start));
        let reset_seconds = ceil_duration_to_seconds(remaining_window).max(1);

        if bucket.count >= limit {
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_seconds,
            };
        }

        bucket.count += 1;

        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(bucket.count),
            reset_seconds,
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Drops expired buckets, then the oldest half if the map is still full.
///
/// Leaves at most half the cap behind, so the scan runs once per
/// `MAX_TRACKED_BUCKETS / 2` new clients at worst.
fn evict_buckets(buckets: &mut HashMap<BucketKey, BucketState>, now: Instant, window: Duration) {
    buckets.retain(|_, bucket| now.duration_since(bucket.window_start) < window);

    let keep = MAX_TRACKED_BUCKETS / 2;
    if buckets.len() <= keep {
        return;
    }

    let mut by_age: Vec<(Instant, BucketKey)> = buckets
        .iter()
        .map(|(key, bucket)| (bucket.window_start, key.clone()))
        .collect();
    let cut = by_age.len() - keep;
    by_age.select_nth_unstable_by_key(cut, |(start, _)| *start);
    for (_, key) in by_age.drain(..cut) {
        buckets.remove(&key);
    }

    tracing::warn!(
        tracked = buckets.len(),
        "rate limiter bucket cap reached, evicted oldest clients"
    );
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Take the client address from `x-forwarded-for` / `x-real-ip`.
    /// Only safe behind a reverse proxy that overwrites those headers.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_WINDOW_SECONDS),
            trust_proxy: false,
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy: false,
        }
    }

    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn from_env() -> Self {
        let max_requests = env_u32("RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS);
        let window_seconds = env_u64("RATE_LIMIT_WINDOW_SECONDS", DEFAULT_WINDOW_SECONDS);

        tracing::info!(max_requests, window_seconds, "Rate limiter configured");

        Self::new(max_requests, Duration::from_secs(window_seconds))
    }
}

#[derive(Clone, Hash, Eq, PartialEq)]
struct BucketKey {
    ip: String,
    endpoint_key: String,
}

struct BucketState {
    window_start: Instant,
    count: u32,
}

struct RateLimitDecision {
    allowed: bool,
    limit: u32,
    remaining: u32,
    reset_seconds: u64,
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = rate_limiter.check_request(&request);

    if !decision.allowed {
        metrics::RATE_LIMITED_TOTAL.inc();
        tracing::warn!(
            ip = %extract_client_ip(&request, rate_limiter.config.trust_proxy),
            path = %request.uri().path(),
            "rate limit exceeded"
        );

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "TooManyRequests", "message": RATE_LIMIT_MESSAGE })),
        )
            .into_response();
        attach_rate_limit_headers(&mut response, &decision);
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&decision.reset_seconds.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("1")),
        );
        return response;
    }

    let mut response = next.run(request).await;
    attach_rate_limit_headers(&mut response, &decision);
    response
}

fn attach_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_LIMIT,
        HeaderValue::from_str(&decision.limit.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_REMAINING,
        HeaderValue::from_str(&decision.remaining.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    response.headers_mut().insert(
        HEADER_RATE_LIMIT_RESET,
        HeaderValue::from_str(&decision.reset_seconds.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("1")),
    );
}

fn extract_client_ip<B>(request: &Request<B>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_client_ip(request) {
            return ip.to_string();
        }
    }

    if let Some(connect_info) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip().to_string();
    }

    "unknown".to_string()
}

fn forwarded_client_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_x_forwarded_for)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .and_then(parse_ip_addr)
        })
}

fn parse_x_forwarded_for(raw: &str) -> Option<IpAddr> {
    raw.split(',').map(str::trim).find_map(parse_ip_addr)
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn endpoint_key<B>(request: &Request<B>) -> String {
    let method: &Method = request.method();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str())
        .unwrap_or_else(|| request.uri().path());
    format!("{} {}", method.as_str(), path)
}

fn env_u32(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("Invalid value for {key} (`{raw}`), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                tracing::warn!("Invalid value for {key} (`{raw}`), using default {default}");
                default
            }
        },
        Err(_) => default,
    }
}

fn ceil_duration_to_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
