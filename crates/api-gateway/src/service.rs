//! Gateway service: public server (routes and push endpoints) and admin server.

use crate::adapter::{DtoProjection, EventAdapter, Sanitizer};
use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::domain::routes::{ApiRequest, RouteSpec, Verb, ROUTES};
use crate::hub::{BroadcastHub, Topic};
use crate::limiter::{cleanup_task, RateLimiter};
use crate::middleware::{create_cors_layer, GatewayMetrics, RateLimitLayer, TracingLayer};
use crate::ports::{CurrentBlockSource, RequestHandler};
use crate::ws::{push_router, PushState};
use axum::{
    body::Bytes,
    extract::{Query, RawPathParams},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde_json::json;
use shared_bus::Subscription;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Gateway service state
pub struct GatewayService {
    config: GatewayConfig,
    handler: Arc<dyn RequestHandler>,
    limiter: Arc<RateLimiter>,
    hub: Arc<BroadcastHub>,
    adapter: Arc<EventAdapter>,
    metrics: Arc<GatewayMetrics>,
}

impl GatewayService {
    /// Create a gateway pushing the default public projections
    pub fn new(
        config: GatewayConfig,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self, GatewayError> {
        Self::with_sanitizer(config, handler, Arc::new(DtoProjection))
    }

    /// Create a gateway with a custom push projection
    pub fn with_sanitizer(
        config: GatewayConfig,
        handler: Arc<dyn RequestHandler>,
        sanitizer: Arc<dyn Sanitizer>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        // Every public route shares one strategy instance
        let strategy = limiter.default_strategy();
        for route in ROUTES {
            limiter.register(route.name, Arc::clone(&strategy));
        }

        let hub = Arc::new(BroadcastHub::new());
        let metrics = Arc::new(GatewayMetrics::new());
        let adapter = Arc::new(EventAdapter::new(
            Arc::clone(&hub),
            sanitizer,
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config,
            handler,
            limiter,
            hub,
            adapter,
            metrics,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        Arc::clone(&self.hub)
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    pub fn adapter(&self) -> Arc<EventAdapter> {
        Arc::clone(&self.adapter)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Seed block onboarding from the node's stored chain
    pub async fn prime(&self, source: &dyn CurrentBlockSource) -> bool {
        self.adapter.prime(source).await
    }

    /// Bind every listener, then serve until shutdown.
    ///
    /// Bind failures are returned here; nothing is spawned unless every
    /// listener bound.
    pub async fn start(&self, events: Subscription) -> Result<GatewayHandle, GatewayError> {
        info!("Starting gateway...");

        let mut http_listeners = Vec::new();
        if self.config.http.enabled {
            for addr in self.config.http_addrs() {
                http_listeners.push(bind(addr).await?);
            }
        }
        let admin_listener = if self.config.admin.enabled {
            Some(bind(self.config.admin_addr()).await?)
        } else {
            None
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();
        let mut http_addrs = Vec::new();

        let public = self.public_router(shutdown_rx.clone());
        for listener in http_listeners {
            let addr = listener
                .local_addr()
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            info!(addr = %addr, "Starting HTTP server");
            http_addrs.push(addr);
            tasks.push(spawn_server(listener, public.clone(), shutdown_rx.clone(), "http"));
        }

        let admin_addr = match admin_listener {
            Some(listener) => {
                let addr = listener
                    .local_addr()
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                info!(addr = %addr, "Starting admin server");
                tasks.push(spawn_server(listener, self.admin_router(), shutdown_rx.clone(), "admin"));
                Some(addr)
            }
            None => None,
        };

        let adapter = Arc::clone(&self.adapter);
        let adapter_shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            adapter.run(events, adapter_shutdown).await;
        }));

        let limiter = Arc::clone(&self.limiter);
        let interval = self.config.rate_limit.cleanup_interval;
        let max_age = self.config.rate_limit.idle_binding_ttl;
        let mut cleanup_shutdown = shutdown_rx;
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = cleanup_task(limiter, interval, max_age) => {}
                _ = cleanup_shutdown.changed() => {}
            }
        }));

        info!("Gateway started");
        Ok(GatewayHandle {
            http_addrs,
            admin_addr,
            shutdown: shutdown_tx,
            tasks,
        })
    }

    /// Public router: rate-limited API routes plus the push endpoints
    pub fn public_router(&self, shutdown: watch::Receiver<bool>) -> Router {
        let mut router = Router::new();
        for route in ROUTES {
            router = router.route(route.path, self.route_endpoint(route));
        }

        let push = PushState::new(
            Arc::clone(&self.hub),
            Arc::clone(&self.metrics),
            self.config.websocket.clone(),
            shutdown,
        );
        router = router
            .merge(push_router(push))
            .fallback(|| async { ApiError::not_found("no such route").into_response() });

        if let Some(cors) = create_cors_layer(&self.config.cors) {
            router = router.layer(cors);
        }
        router.layer(TracingLayer::new())
    }

    /// One API route: admission, then the node's handler
    fn route_endpoint(&self, route: &'static RouteSpec) -> MethodRouter {
        let handler = Arc::clone(&self.handler);
        let metrics = Arc::clone(&self.metrics);
        let endpoint = move |params: RawPathParams,
                             Query(query): Query<HashMap<String, String>>,
                             body: Bytes| {
            let handler = Arc::clone(&handler);
            let metrics = Arc::clone(&metrics);
            async move { dispatch(handler, metrics, route, params, query, body).await }
        };

        let method_router = match route.verb {
            Verb::Get => get(endpoint),
            Verb::Post => post(endpoint),
        };
        method_router.layer(RateLimitLayer::new(
            Arc::clone(&self.limiter),
            Arc::clone(&self.metrics),
            route.name,
        ))
    }

    /// Admin router: health and metrics
    pub fn admin_router(&self) -> Router {
        let metrics = Arc::clone(&self.metrics);
        let hub = Arc::clone(&self.hub);
        let limiter = Arc::clone(&self.limiter);

        Router::new()
            .route("/health", get(health_check))
            .route(
                "/metrics",
                get(move || {
                    let metrics = Arc::clone(&metrics);
                    let hub = Arc::clone(&hub);
                    let limiter = Arc::clone(&limiter);
                    async move {
                        let mut body = metrics.to_json();
                        body["hub"] = hub.stats().to_json();
                        body["hub"]["subscribers"] = json!({
                            "block": hub.subscriber_count(Topic::Block),
                            "peer": hub.subscriber_count(Topic::Peer),
                        });
                        body["hub"]["has_snapshot"] = json!(hub.snapshot().is_some());
                        body["limiter"] = json!({
                            "routes": limiter.route_count(),
                            "client_bindings": limiter.client_binding_count(),
                        });
                        Json(body)
                    }
                }),
            )
    }
}

/// Running gateway
pub struct GatewayHandle {
    http_addrs: Vec<SocketAddr>,
    admin_addr: Option<SocketAddr>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayHandle {
    /// Bound public addresses (resolved when port 0 was configured)
    pub fn http_addrs(&self) -> &[SocketAddr] {
        &self.http_addrs
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for every server and background task to finish
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Gateway task failed");
            }
        }
        info!("Gateway stopped");
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, GatewayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))
}

fn spawn_server(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
    name: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        if let Err(e) = result {
            error!(server = name, error = %e, "Server error");
        }
    })
}

async fn dispatch(
    handler: Arc<dyn RequestHandler>,
    metrics: Arc<GatewayMetrics>,
    route: &'static RouteSpec,
    params: RawPathParams,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let mut request = ApiRequest::new(route);
    request.params = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    request.query = query;
    if !body.is_empty() {
        match serde_json::from_slice(&body) {
            Ok(value) => request.body = Some(value),
            Err(e) => return ApiError::from(e).into_response(),
        }
    }

    match handler.handle(request).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            metrics.record_handler_error();
            e.into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
