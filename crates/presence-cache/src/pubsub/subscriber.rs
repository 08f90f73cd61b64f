//! Redis Pub/Sub subscriber.
//!
//! One background listener per process holds the pub/sub connection. Callers
//! acquire and release interest in channel names; the listener subscribes on
//! the first acquire, unsubscribes on the last release, and re-subscribes to
//! everything still of interest after a reconnect.

use crate::pubsub::PubSubChannel;
use futures_util::StreamExt;
use parking_lot::Mutex;
use redis::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

/// How long `acquire` waits for the listener to confirm a SUBSCRIBE
const SUBSCRIBE_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Subscriber channel closed")]
    ChannelClosed,
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Received message from Pub/Sub
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Channel the message was received on
    pub channel: PubSubChannel,
    /// Raw channel name
    pub channel_name: String,
    /// Raw payload
    pub payload: String,
}

impl ReceivedMessage {
    fn from_redis(channel_name: String, payload: String) -> Self {
        Self {
            channel: PubSubChannel::parse(&channel_name),
            channel_name,
            payload,
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Channel buffer size for broadcast
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

impl From<&presence_common::AppConfig> for SubscriberConfig {
    fn from(config: &presence_common::AppConfig) -> Self {
        Self {
            redis_url: config.redis.url.clone(),
            reconnect_delay_ms: config.subscriber.reconnect_delay_ms,
            ..Self::default()
        }
    }
}

/// Commands for subscription management
#[derive(Debug)]
enum SubscriberCommand {
    Subscribe(String, Option<oneshot::Sender<()>>),
    Unsubscribe(String),
    Shutdown,
}

type Interest = Arc<Mutex<HashMap<String, usize>>>;

/// Redis Pub/Sub subscriber
pub struct Subscriber {
    /// Reference counts per channel name
    interest: Interest,
    /// Broadcast sender for messages
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    /// Control channel for subscription management
    control_tx: mpsc::UnboundedSender<SubscriberCommand>,
}

impl Subscriber {
    /// Create a new subscriber and start the background listener
    #[must_use]
    pub fn new(config: SubscriberConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let interest: Interest = Arc::default();

        tokio::spawn(Self::listener_loop(
            config,
            interest.clone(),
            broadcast_tx.clone(),
            control_rx,
        ));

        Self {
            interest,
            broadcast_tx,
            control_tx,
        }
    }

    async fn listener_loop(
        config: SubscriberConfig,
        interest: Interest,
        broadcast_tx: broadcast::Sender<ReceivedMessage>,
        mut control_rx: mpsc::UnboundedReceiver<SubscriberCommand>,
    ) {
        loop {
            match Self::run_listener(&config, &interest, &broadcast_tx, &mut control_rx).await {
                Ok(true) => {
                    tracing::info!("Subscriber shutting down");
                    break;
                }
                Ok(false) => {
                    tracing::warn!("Pub/Sub stream ended, reconnecting");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Subscriber error, reconnecting");
                }
            }

            tokio::time::sleep(Duration::from_millis(config.reconnect_delay_ms)).await;
        }
    }

    /// Run the listener until error or shutdown; `Ok(true)` means shutdown
    async fn run_listener(
        config: &SubscriberConfig,
        interest: &Interest,
        broadcast_tx: &broadcast::Sender<ReceivedMessage>,
        control_rx: &mut mpsc::UnboundedReceiver<SubscriberCommand>,
    ) -> SubscriberResult<bool> {
        let client = Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        let channels: Vec<String> = interest.lock().keys().cloned().collect();
        for channel in &channels {
            pubsub.subscribe(channel).await?;
        }

        tracing::info!(channels = channels.len(), "Subscriber connected to Redis");

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Ok(false);
                    };

                    let channel_name = msg.get_channel_name().to_string();
                    let payload: String = msg.get_payload().unwrap_or_default();

                    tracing::trace!(channel = %channel_name, "Received Pub/Sub message");

                    // No receivers is fine: nobody is watching right now
                    let _ = broadcast_tx.send(ReceivedMessage::from_redis(channel_name, payload));
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(SubscriberCommand::Subscribe(channel, ack)) => {
                            drop(stream);
                            pubsub.subscribe(&channel).await?;
                            tracing::debug!(channel = %channel, "Subscribed to channel");
                            if let Some(ack) = ack {
                                let _ = ack.send(());
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Unsubscribe(channel)) => {
                            drop(stream);
                            if interest.lock().contains_key(&channel) {
                                tracing::trace!(channel = %channel, "Channel re-acquired, keeping subscription");
                            } else {
                                pubsub.unsubscribe(&channel).await?;
                                tracing::debug!(channel = %channel, "Unsubscribed from channel");
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Shutdown) | None => return Ok(true),
                    }
                }
            }
        }
    }

    /// Register interest in a channel.
    ///
    /// Waits until the listener has subscribed so that nothing published
    /// afterwards is missed. If the listener is reconnecting the wait is
    /// bounded; the subscription is still made once the connection is back.
    pub async fn acquire(&self, channel: &PubSubChannel) -> SubscriberResult<()> {
        let name = channel.name();
        let first = {
            let mut interest = self.interest.lock();
            let count = interest.entry(name.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };

        if !first {
            return Ok(());
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        self.control_tx
            .send(SubscriberCommand::Subscribe(name.clone(), Some(ack_tx)))
            .map_err(|_| SubscriberError::ChannelClosed)?;

        if tokio::time::timeout(SUBSCRIBE_ACK_TIMEOUT, ack_rx).await.is_err() {
            tracing::warn!(channel = %name, "Subscribe not confirmed yet, continuing");
        }

        Ok(())
    }

    /// Drop one unit of interest in a channel
    pub fn release(&self, channel: &PubSubChannel) {
        let name = channel.name();
        let last = {
            let mut interest = self.interest.lock();
            match interest.get_mut(&name) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    interest.remove(&name);
                    true
                }
                None => false,
            }
        };

        if last && self.control_tx.send(SubscriberCommand::Unsubscribe(name)).is_err() {
            tracing::debug!("Subscriber already stopped");
        }
    }

    /// Get a receiver for broadcast messages
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Channel names with live interest
    #[must_use]
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.interest.lock().keys().cloned().collect()
    }

    /// Shutdown the subscriber
    pub fn shutdown(&self) -> SubscriberResult<()> {
        self.control_tx
            .send(SubscriberCommand::Shutdown)
            .map_err(|_| SubscriberError::ChannelClosed)
    }
}

/// Builder for subscriber
pub struct SubscriberBuilder {
    config: SubscriberConfig,
}

impl SubscriberBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SubscriberConfig::default(),
        }
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn broadcast_buffer(mut self, size: usize) -> Self {
        self.config.broadcast_buffer = size;
        self
    }

    #[must_use]
    pub fn reconnect_delay_ms(mut self, delay: u64) -> Self {
        self.config.reconnect_delay_ms = delay;
        self
    }

    /// Build and start the subscriber (requires a Tokio runtime)
    #[must_use]
    pub fn build(self) -> Subscriber {
        Subscriber::new(self.config)
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}
