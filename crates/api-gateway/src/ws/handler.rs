//! Push channel connections.
//!
//! A connection subscribes a bounded channel to one hub topic and forwards
//! whatever arrives on it to the socket. The channel is push-only: incoming
//! text and binary frames are ignored. The connection ends when:
//! - the client closes or the socket errors,
//! - a frame write exceeds the write timeout,
//! - the hub drops the subscriber (backlog full),
//! - the gateway shuts down.

use super::slots::{ConnectionSlot, ConnectionSlots};
use crate::domain::config::WebSocketConfig;
use crate::domain::ApiError;
use crate::hub::{BroadcastHub, PushMessage, Topic};
use crate::middleware::GatewayMetrics;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// State shared by both push endpoints
#[derive(Clone)]
pub struct PushState {
    pub hub: Arc<BroadcastHub>,
    pub metrics: Arc<GatewayMetrics>,
    pub config: Arc<WebSocketConfig>,
    pub slots: Arc<ConnectionSlots>,
    pub shutdown: watch::Receiver<bool>,
}

impl PushState {
    pub fn new(
        hub: Arc<BroadcastHub>,
        metrics: Arc<GatewayMetrics>,
        config: WebSocketConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let slots = Arc::new(ConnectionSlots::new(config.max_connections));
        Self {
            hub,
            metrics,
            config: Arc::new(config),
            slots,
            shutdown,
        }
    }
}

/// Router with the block and peer push endpoints
pub fn push_router(state: PushState) -> Router {
    let block_path = state.config.block_path.clone();
    let peer_path = state.config.peer_path.clone();
    Router::new()
        .route(
            &block_path,
            get(|ws: WebSocketUpgrade, State(state): State<PushState>| async move {
                upgrade(ws, state, Topic::Block)
            }),
        )
        .route(
            &peer_path,
            get(|ws: WebSocketUpgrade, State(state): State<PushState>| async move {
                upgrade(ws, state, Topic::Peer)
            }),
        )
        .with_state(state)
}

fn upgrade(ws: WebSocketUpgrade, state: PushState, topic: Topic) -> Response {
    let Some(slot) = state.slots.try_acquire() else {
        state.metrics.record_push_rejected();
        warn!(
            topic = %topic,
            max = state.slots.max(),
            "Push connection refused: too many connections"
        );
        return ApiError::unavailable("too many push connections").into_response();
    };

    ws.on_upgrade(move |socket| PushConnection::new(state, topic, slot).serve(socket))
}

type SocketSink = SplitSink<WebSocket, Message>;

/// One open push channel
pub struct PushConnection {
    state: PushState,
    topic: Topic,
    _slot: ConnectionSlot,
}

impl PushConnection {
    fn new(state: PushState, topic: Topic, slot: ConnectionSlot) -> Self {
        Self {
            state,
            topic,
            _slot: slot,
        }
    }

    pub async fn serve(self, socket: WebSocket) {
        let topic = self.topic;
        let config = Arc::clone(&self.state.config);
        let mut shutdown = self.state.shutdown.clone();
        let (mut sender, mut receiver) = socket.split();

        let (tx, mut rx) = mpsc::channel::<PushMessage>(config.subscriber_buffer);
        // Onboarding happens here: the snapshot is already queued on `rx`
        let guard = match self.state.hub.subscribe_guarded(topic, tx) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Push subscription failed");
                let _ = sender.send(Message::Close(None)).await;
                return;
            }
        };

        self.state.metrics.record_push_connect();
        let id = guard.handle().id;
        info!(topic = %topic, id, "Push connection opened");

        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + config.ping_interval,
            config.ping_interval,
        );
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(message) = outgoing else {
                        // Dropped by the hub
                        debug!(topic = %topic, id, "Subscriber removed by hub");
                        break;
                    };
                    if let Err(reason) =
                        write(&mut sender, Message::Text(message.to_string()), config.write_timeout).await
                    {
                        warn!(topic = %topic, id, reason, "Push write failed");
                        break;
                    }
                    self.state.metrics.record_push_frame();
                }
                _ = ping.tick() => {
                    if let Err(reason) = write(&mut sender, Message::Ping(Vec::new()), config.write_timeout).await {
                        debug!(topic = %topic, id, reason, "Ping failed");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_ok() && !*shutdown.borrow() {
                        continue;
                    }
                    let _ = write(&mut sender, Message::Close(None), config.write_timeout).await;
                    debug!(topic = %topic, id, "Push connection closed for shutdown");
                    break;
                }
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        if write(&mut sender, Message::Pong(data), config.write_timeout).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(topic = %topic, id, "Push connection closed by client");
                        break;
                    }
                    Some(Ok(_)) => {
                        trace!(topic = %topic, id, "Ignoring inbound frame");
                    }
                    Some(Err(e)) => {
                        debug!(topic = %topic, id, error = %e, "Push socket error");
                        break;
                    }
                },
            }
        }

        drop(guard);
        self.state.metrics.record_push_disconnect();
        info!(topic = %topic, id, "Push connection closed");
    }
}

/// Write one frame within `limit`
async fn write(sender: &mut SocketSink, message: Message, limit: Duration) -> Result<(), &'static str> {
    match tokio::time::timeout(limit, sender.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err("socket error"),
        Err(_) => Err("write timeout"),
    }
}
