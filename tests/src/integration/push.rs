//! # Push Flow
//!
//! Node event bus → event adapter → broadcast hub → WebSocket clients.
//!
//! - a block subscriber sees the latest block first, then live blocks
//! - a peer subscriber sees only peers announced after it joined
//! - each channel only carries its own topic
//! - connections beyond the cap are refused with 503

#[cfg(test)]
mod tests {
    use super::super::{loopback_config, FixedChain, RunningGateway};
    use api_gateway::{GatewayConfig, Topic};
    use futures::StreamExt;
    use gateway_runtime::GatewayRuntime;
    use serde_json::{json, Value};
    use shared_bus::{EventPublisher, NodeEvent};
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const WAIT: Duration = Duration::from_secs(5);

    fn block(number: u64) -> Value {
        json!({
            "number": number,
            "hash": format!("HASH{number}"),
            "joiners": [],
            "fork": false,
        })
    }

    fn peer(pubkey: &str) -> Value {
        json!({
            "pubkey": pubkey,
            "endpoints": ["BASIC_MERKLED_API 127.0.0.1 10901"],
            "status": "UP",
        })
    }

    async fn connect(url: &str) -> Client {
        let (ws, _) = connect_async(url).await.unwrap();
        ws
    }

    /// Next text frame as JSON, skipping control frames
    async fn next_json(ws: &mut Client) -> Value {
        loop {
            let frame = timeout(WAIT, ws.next())
                .await
                .expect("no push frame in time")
                .expect("push stream ended")
                .expect("push socket error");
            match frame {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    async fn assert_silent(ws: &mut Client) {
        let next = timeout(Duration::from_millis(200), ws.next()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }

    async fn wait_for_subscribers(gateway: &RunningGateway, topic: Topic, count: usize) {
        let hub = gateway.service.hub();
        for _ in 0..250 {
            if hub.subscriber_count(topic) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{topic} never reached {count} subscribers");
    }

    async fn publish(gateway: &RunningGateway, document: Value) {
        gateway.bus.publish(NodeEvent::new(document)).await;
    }

    #[tokio::test]
    async fn test_block_subscriber_onboarded_then_live() {
        let gateway = RunningGateway::start(loopback_config(), FixedChain(Some(block(1)))).await;
        let mut ws = connect(&gateway.ws_url("/ws/block")).await;

        let first = next_json(&mut ws).await;
        assert_eq!(first, json!({ "number": 1, "hash": "HASH1", "joiners": [] }));

        publish(&gateway, block(2)).await;
        assert_eq!(next_json(&mut ws).await["number"], 2);
        publish(&gateway, block(3)).await;
        assert_eq!(next_json(&mut ws).await["number"], 3);

        // Late joiner onboards with the latest block, not the primed one
        let mut late = connect(&gateway.ws_url("/ws/block")).await;
        assert_eq!(next_json(&mut late).await["number"], 3);
    }

    #[tokio::test]
    async fn test_empty_chain_onboards_nothing() {
        let gateway = RunningGateway::start(loopback_config(), FixedChain(None)).await;
        let mut ws = connect(&gateway.ws_url("/ws/block")).await;
        wait_for_subscribers(&gateway, Topic::Block, 1).await;
        assert_silent(&mut ws).await;

        publish(&gateway, block(1)).await;
        assert_eq!(next_json(&mut ws).await["number"], 1);
    }

    #[tokio::test]
    async fn test_channels_carry_only_their_topic() {
        let gateway = RunningGateway::start(loopback_config(), FixedChain(Some(block(1)))).await;
        let mut blocks = connect(&gateway.ws_url("/ws/block")).await;
        let mut peers = connect(&gateway.ws_url("/ws/peer")).await;
        assert_eq!(next_json(&mut blocks).await["number"], 1);
        wait_for_subscribers(&gateway, Topic::Peer, 1).await;
        // No snapshot on the peer channel
        assert_silent(&mut peers).await;

        publish(&gateway, peer("HsLS")).await;
        let announced = next_json(&mut peers).await;
        assert_eq!(announced["pubkey"], "HsLS");
        assert!(announced.get("status").is_none());

        publish(&gateway, block(2)).await;
        assert_eq!(next_json(&mut blocks).await["number"], 2);

        // Unrelated documents reach nobody
        publish(&gateway, json!({ "uid": "cat", "pubkey": "X" })).await;
        // A document with both markers reaches both channels
        let both = json!({ "number": 3, "joiners": [], "endpoints": [], "pubkey": "B" });
        publish(&gateway, both).await;

        let on_blocks = next_json(&mut blocks).await;
        assert_eq!(on_blocks["number"], 3);
        assert!(on_blocks.get("endpoints").is_none());
        let on_peers = next_json(&mut peers).await;
        assert_eq!(on_peers["pubkey"], "B");
        assert!(on_peers.get("joiners").is_none());

        assert_silent(&mut blocks).await;
        assert_silent(&mut peers).await;
        let events = gateway.service.metrics().to_json()["events"].clone();
        assert_eq!(events["ignored"], 1);
    }

    #[tokio::test]
    async fn test_gone_subscriber_does_not_affect_others() {
        let gateway = RunningGateway::start(loopback_config(), FixedChain(Some(block(1)))).await;
        let mut alive = connect(&gateway.ws_url("/ws/block")).await;
        let mut gone = connect(&gateway.ws_url("/ws/block")).await;
        next_json(&mut alive).await;
        next_json(&mut gone).await;

        gone.close(None).await.unwrap();
        drop(gone);
        wait_for_subscribers(&gateway, Topic::Block, 1).await;

        for number in 2..=5 {
            publish(&gateway, block(number)).await;
        }
        for number in 2..=5 {
            assert_eq!(next_json(&mut alive).await["number"], number);
        }
    }

    #[tokio::test]
    async fn test_connections_over_cap_refused() {
        let mut config: GatewayConfig = loopback_config();
        config.websocket.max_connections = 1;
        let gateway = RunningGateway::start(config, FixedChain(None)).await;

        let mut first = connect(&gateway.ws_url("/ws/peer")).await;
        match connect_async(gateway.ws_url("/ws/block")).await {
            Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 503),
            other => panic!("expected 503, got {:?}", other.map(|(_, r)| r.status())),
        }
        let metrics = gateway.service.metrics().to_json();
        assert_eq!(metrics["push"]["rejected"], 1);

        // Slot frees once the first connection ends
        first.close(None).await.unwrap();
        drop(first);
        let mut reconnected = None;
        for _ in 0..100 {
            if let Ok((ws, _)) = connect_async(gateway.ws_url("/ws/block")).await {
                reconnected = Some(ws);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(reconnected.is_some());
    }

    #[tokio::test]
    async fn test_shutdown_closes_push_connections() {
        let gateway = RunningGateway::start(loopback_config(), FixedChain(None)).await;
        let mut ws = connect(&gateway.ws_url("/ws/block")).await;
        wait_for_subscribers(&gateway, Topic::Block, 1).await;

        gateway.handle.shutdown();
        let ended = timeout(WAIT, async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(ended.is_ok());
        timeout(WAIT, gateway.handle.wait()).await.unwrap();
    }

    /// Block submitted through the API is pushed to subscribers.
    #[tokio::test]
    async fn test_submitted_block_pushed_through_runtime() {
        let runtime = GatewayRuntime::new(loopback_config()).unwrap();
        let handle = runtime.start().await.unwrap();
        let addr = handle.http_addrs()[0];

        let mut ws = connect(&format!("ws://{addr}/ws/block")).await;
        let hub = runtime.service().hub();
        for _ in 0..250 {
            if hub.subscriber_count(Topic::Block) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/blockchain/block"))
            .json(&block(42))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let pushed = next_json(&mut ws).await;
        assert_eq!(pushed["number"], 42);
        assert!(pushed.get("fork").is_none());

        let current: Value = reqwest::get(format!("http://{addr}/blockchain/current"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(current["number"], 42);

        handle.shutdown();
        handle.wait().await;
    }
}
