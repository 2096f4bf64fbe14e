use crate::AppState;
use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Buckets tracked before idle (refilled) ones are pruned.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Key used when the peer address is unknown.
pub const GLOBAL_KEY: &str = "global";

#[derive(Debug, Clone, Copy)]
struct Bucket {
    last_update: Instant,
    tokens: f32,
}

/// Token bucket rate limiter, one bucket per client key.
///
/// A check is a single read-modify-write of that key's bucket under the map
/// lock, so concurrent requests from one client can't overspend it.
#[derive(Debug)]
pub struct KeyedRateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate_per_sec: f32,
    burst_size: f32,
}

impl KeyedRateLimiter {
    pub fn new(rate_per_sec: f32, burst_size: f32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rate_per_sec,
            burst_size,
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= MAX_TRACKED_KEYS && !buckets.contains_key(key) {
            self.prune(&mut buckets, now);
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            last_update: now,
            tokens: self.burst_size,
        });

        let elapsed = now.duration_since(bucket.last_update).as_secs_f32();
        let tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst_size);

        // time passage is recorded whether or not the request is admitted
        bucket.last_update = now;
        if tokens >= 1.0 {
            bucket.tokens = tokens - 1.0;
            true
        } else {
            bucket.tokens = tokens;
            false
        }
    }

    /// A bucket that has refilled to the burst size is the same as no bucket.
    fn prune(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        buckets.retain(|_, b| {
            let elapsed = now.duration_since(b.last_update).as_secs_f32();
            b.tokens + elapsed * self.rate_per_sec < self.burst_size
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Middleware to enforce rate limits per peer address.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.config.resilience.rate_limit_enabled {
        let key = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| GLOBAL_KEY.to_string());

        if !state.rate_limiter.check(&key) {
            tracing::warn!(name: "http.rate_limited", client = %key, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }
    }
    Ok(next.run(req).await)
}
