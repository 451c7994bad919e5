use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    config::Config,
    ratelimit::{self, RateLimitDecision, RateLimitPolicy, RedisStore},
    utils::{error_codes, error_to_api_response},
};

#[derive(Clone)]
pub struct RateLimiter {
    store: RedisStore,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(redis: redis::Client, config: &Config) -> Self {
        Self {
            store: RedisStore::new(Arc::new(redis)),
            policy: RateLimitPolicy {
                max_requests: config.rate_limit_requests,
                window: config.rate_limit_window(),
            },
        }
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let remote_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        // proxy headers first, connection address as fallback
        let ip = req
            .headers()
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .or_else(|| {
                req.headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .or_else(|| remote_ip.as_deref())
            .unwrap_or("unknown")
            .trim()
            .to_string();

        let identifier = format!("ip:{}", ip);
        let decision =
            ratelimit::check_and_consume(&self.store, &identifier, &self.policy, Utc::now()).await;

        if !decision.admitted {
            let retry_after_secs =
                ((decision.reset_at - Utc::now().timestamp_millis()).max(0) as u64).div_ceil(1000);

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!("Too many requests, retry in {}s", retry_after_secs),
                ),
            )
                .into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after_secs));
            apply_rate_limit_headers(&mut response, &decision);
            return response;
        }

        let mut response = next.run(req).await;
        apply_rate_limit_headers(&mut response, &decision);
        response
    }
}

fn apply_rate_limit_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(decision.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from(decision.reset_at / 1000),
    );
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
