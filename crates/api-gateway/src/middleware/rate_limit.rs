//! Admission middleware for the public routes.
//!
//! Each route is wrapped in its own `RateLimitLayer` carrying the route's
//! binding key, so the decision is a single lookup plus one binding lock.
//! A denied call never reaches the handler and gets a 429 with
//! `Retry-After`.

use super::metrics::GatewayMetrics;
use crate::domain::config::RateLimitConfig;
use crate::domain::ApiError;
use crate::limiter::{RateLimiter, Verdict};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Rate limit layer bound to one route
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    metrics: Arc<GatewayMetrics>,
    route: &'static str,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>, metrics: Arc<GatewayMetrics>, route: &'static str) -> Self {
        Self {
            limiter,
            metrics,
            route,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
            metrics: Arc::clone(&self.metrics),
            route: self.route,
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    metrics: Arc<GatewayMetrics>,
    route: &'static str,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Decide before the future is created: admission never waits
        let ip = extract_client_ip(&req, self.limiter.config());
        let verdict = self.limiter.decide(self.route, ip);

        match verdict {
            Verdict::Allow => {
                self.metrics.record_allowed();
                // Take the service that was driven to readiness
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(async move { inner.call(req).await })
            }
            Verdict::Deny {
                window,
                retry_after,
            } => {
                self.metrics.record_denied(window);
                warn!(
                    route = self.route,
                    ip = ?ip,
                    window = %window,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limit exceeded"
                );
                let response = ApiError::rate_limited(window.as_str(), retry_after).into_response();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

/// Client IP for admission.
///
/// Forwarded headers count only when the socket peer is a trusted proxy.
/// `X-Forwarded-For` is walked from the right past trusted hops, then
/// `X-Real-IP` is tried, then the peer itself. Untrusted peers are always
/// identified by their socket address.
pub fn extract_client_ip<B>(req: &Request<B>, config: &RateLimitConfig) -> Option<IpAddr> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())?;

    if !config.is_trusted_proxy(peer) {
        if req.headers().contains_key("x-forwarded-for") || req.headers().contains_key("x-real-ip")
        {
            debug!(peer = %peer, "Ignoring forwarded headers from untrusted peer");
        }
        return Some(peer);
    }

    forwarded_client(req, config)
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or(Some(peer))
}

/// Right-most `X-Forwarded-For` hop that is not a trusted proxy.
fn forwarded_client<B>(req: &Request<B>, config: &RateLimitConfig) -> Option<IpAddr> {
    let value = req.headers().get("x-forwarded-for")?.to_str().ok()?;

    let mut client = None;
    for hop in value.rsplit(',') {
        let Ok(ip) = hop.trim().parse::<IpAddr>() else {
            break;
        };
        client = Some(ip);
        if !config.is_trusted_proxy(ip) {
            break;
        }
    }
    client
}
