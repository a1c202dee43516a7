use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket shared across all callers of a route group. Capacity and
/// refill rate are both `rps`, so short bursts up to one second's quota
/// pass and sustained traffic is held to the configured rate.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: f64,
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        let rps = rps.max(1) as f64;
        Self {
            rps,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: rps,
                refilled_at: Instant::now(),
            })),
        }
    }

    fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.rps);
        bucket.refilled_at = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.allow() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_up_to_capacity_then_rejects() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = RateLimiter::new(1000);
        for _ in 0..1000 {
            assert!(limiter.allow());
        }
        assert!(!limiter.allow());
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(limiter.allow());
    }
}
