//! # Admission over HTTP
//!
//! Drives the public server through a real socket: per-route budgets,
//! client scoping through `X-Forwarded-For`, whitelist and the 429 shape.
//!
//! Wall-clock windows make a single burst ambiguous when it straddles a
//! minute boundary, so minute-cap assertions allow one rollover.

#[cfg(test)]
mod tests {
    use super::super::{loopback_config, FixedChain, RunningGateway};
    use api_gateway::domain::error::codes;
    use api_gateway::limiter::LimiterScope;
    use api_gateway::{GatewayConfig, RateLimiter, Strategy};
    use reqwest::StatusCode;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(per_second: u32, per_minute: u32) -> GatewayConfig {
        let mut config = loopback_config();
        config.rate_limit.strategy = Strategy::new(per_second, per_minute);
        config
    }

    async fn get(client: &reqwest::Client, url: &str, ip: Option<&str>) -> reqwest::Response {
        let mut request = client.get(url);
        if let Some(ip) = ip {
            request = request.header("x-forwarded-for", ip);
        }
        request.send().await.unwrap()
    }

    /// Calls `url` until the first denial, at most `limit` times.
    async fn calls_until_denied(
        client: &reqwest::Client,
        url: &str,
        ip: Option<&str>,
        limit: usize,
    ) -> (usize, Option<reqwest::Response>) {
        for allowed in 0..limit {
            let response = get(client, url, ip).await;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                return (allowed, Some(response));
            }
            assert_eq!(response.status(), StatusCode::OK);
        }
        (limit, None)
    }

    #[tokio::test]
    async fn test_minute_cap_denies_with_retry_after() {
        let gateway = RunningGateway::start(config(100, 3), FixedChain(None)).await;
        let client = reqwest::Client::new();

        let (allowed, denied) =
            calls_until_denied(&client, &gateway.url("/node/summary"), None, 8).await;
        // Three per minute, six if the burst crossed a minute boundary
        assert!((3..=6).contains(&allowed), "allowed {allowed}");
        let denied = denied.unwrap();

        let retry_after: u64 = denied
            .headers()
            .get("retry-after")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        let body: Value = denied.json().await.unwrap();
        assert_eq!(body["ucode"], codes::HTTP_LIMITATION);
        assert_eq!(body["data"]["window"], "minute");

        gateway.handle.shutdown();
        gateway.handle.wait().await;
    }

    #[tokio::test]
    async fn test_each_route_has_its_own_budget() {
        let gateway = RunningGateway::start(config(100, 1), FixedChain(None)).await;
        let client = reqwest::Client::new();

        for path in ["/node/summary", "/blockchain/current", "/wot/members"] {
            let response = get(&client, &gateway.url(path), None).await;
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }

        let metrics = gateway.service.metrics().to_json();
        assert_eq!(metrics["requests"]["allowed"], 3);
    }

    #[tokio::test]
    async fn test_client_scope_separates_callers() {
        let mut config = config(100, 1);
        config.rate_limit.scope = LimiterScope::RouteAndClient;
        config.rate_limit.whitelist = vec!["10.0.0.9".parse().unwrap()];
        let gateway = RunningGateway::start(config, FixedChain(None)).await;
        let client = reqwest::Client::new();
        let url = gateway.url("/tx/pending");

        assert_eq!(get(&client, &url, Some("10.0.0.1")).await.status(), StatusCode::OK);
        assert_eq!(get(&client, &url, Some("10.0.0.2")).await.status(), StatusCode::OK);
        let (allowed, denied) = calls_until_denied(&client, &url, Some("10.0.0.1"), 3).await;
        assert!(allowed <= 1);
        assert!(denied.is_some());

        for _ in 0..5 {
            assert_eq!(get(&client, &url, Some("10.0.0.9")).await.status(), StatusCode::OK);
        }
        assert_eq!(gateway.service.limiter().client_binding_count(), 2);
    }

    #[tokio::test]
    async fn test_forwarded_whitelist_ip_ignored_without_trusted_proxy() {
        let mut config = config(100, 1);
        config.rate_limit.scope = LimiterScope::RouteAndClient;
        config.rate_limit.whitelist = vec!["10.0.0.9".parse().unwrap()];
        config.rate_limit.trust_localhost = false;
        let gateway = RunningGateway::start(config, FixedChain(None)).await;
        let client = reqwest::Client::new();
        let url = gateway.url("/tx/pending");

        let (allowed, denied) = calls_until_denied(&client, &url, Some("10.0.0.9"), 5).await;
        assert!((1..=2).contains(&allowed), "allowed {allowed}");
        assert!(denied.is_some());
        assert_eq!(gateway.service.limiter().client_binding_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_limiting_admits_everything() {
        let mut config = config(1, 1);
        config.rate_limit.enabled = false;
        let gateway = RunningGateway::start(config, FixedChain(None)).await;
        let client = reqwest::Client::new();

        for _ in 0..10 {
            let response = get(&client, &gateway.url("/network/peers"), None).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_post_and_unknown_routes() {
        let gateway = RunningGateway::start(config(100, 1000), FixedChain(None)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(gateway.url("/blockchain/block"))
            .json(&serde_json::json!({ "number": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["route"], "blockchain_block_submit");

        let response = get(&client, &gateway.url("/eth/blockNumber"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["ucode"], codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_server_reports_denials() {
        let mut config = config(100, 1);
        config.admin.enabled = true;
        let gateway = RunningGateway::start(config, FixedChain(None)).await;
        let client = reqwest::Client::new();
        let admin = gateway.handle.admin_addr().unwrap();

        calls_until_denied(&client, &gateway.url("/wot/members"), None, 4).await;

        let health: Value = client
            .get(format!("http://{admin}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let metrics: Value = client
            .get(format!("http://{admin}/metrics"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(metrics["requests"]["denied_minute"], 1);
        assert_eq!(metrics["limiter"]["routes"], api_gateway::ROUTES.len());
    }

    /// Many threads hitting one binding at the same instant admit exactly the cap.
    #[test]
    fn test_concurrent_decisions_never_exceed_cap() {
        let limiter = RateLimiter::new(config(50, 1000).rate_limit);
        limiter.register("tx_process", limiter.default_strategy());
        let now = 1_700_000_040_500;
        let allowed = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        if limiter.decide_at("tx_process", None, now).is_allowed() {
                            allowed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(allowed.load(Ordering::Relaxed), 50);
        let counters = limiter.binding("tx_process").unwrap().counters();
        assert_eq!(counters.second_count, 50);
        assert_eq!(counters.minute_count, 50);
    }
}
