//! Coordinator actor task

use std::ops::ControlFlow;
use std::sync::Arc;

use presence_core::{
    ParticipantId, PresenceCallback, PresenceChannel, PresenceState, RoomId, Subscription,
    TypingCallback, TypingMap,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::message::Message;
use crate::options::ParticipantOptions;
use crate::snapshot::ParticipantSnapshot;
use crate::state::{TypingPublish, TypingState};

/// A live subscription and the generation its events are tagged with
struct ActiveStream<T> {
    target: T,
    generation: u64,
    subscription: Subscription,
}

impl<T> ActiveStream<T> {
    fn accepts(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

pub(crate) struct CoordinatorActor {
    channel: Arc<dyn PresenceChannel>,
    inbox: mpsc::UnboundedReceiver<Message>,
    /// Handed to subscription callbacks; also used to requeue settle requests
    outbox: mpsc::UnboundedSender<Message>,
    snapshot: watch::Sender<ParticipantSnapshot>,
    options: ParticipantOptions,
    typing: TypingState,
    peer_stream: Option<ActiveStream<ParticipantId>>,
    room_stream: Option<ActiveStream<RoomId>>,
    generation: u64,
    is_peer_online: bool,
    typing_users: Vec<String>,
}

impl CoordinatorActor {
    pub(crate) fn new(
        channel: Arc<dyn PresenceChannel>,
        inbox: mpsc::UnboundedReceiver<Message>,
        outbox: mpsc::UnboundedSender<Message>,
        snapshot: watch::Sender<ParticipantSnapshot>,
    ) -> Self {
        Self {
            channel,
            inbox,
            outbox,
            snapshot,
            // Attached to nothing until the first update arrives
            options: ParticipantOptions::default().with_enabled(false),
            typing: TypingState::Idle,
            peer_stream: None,
            room_stream: None,
            generation: 0,
            is_peer_online: false,
            typing_users: Vec::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("Participant coordinator started");

        loop {
            let deadline = self.typing.deadline();

            let flow = tokio::select! {
                biased;

                () = idle_elapsed(deadline) => {
                    self.expire_typing().await;
                    ControlFlow::Continue(())
                }

                message = self.inbox.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => {
                        self.teardown().await;
                        ControlFlow::Break(())
                    }
                },
            };

            self.publish_snapshot();

            if flow.is_break() {
                break;
            }
        }

        debug!("Participant coordinator stopped");
    }

    async fn handle(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Update(options) => self.apply(options).await,
            Message::AnnounceTyping(true) => self.start_typing().await,
            Message::AnnounceTyping(false) | Message::ForceResetTyping => {
                self.stop_typing().await;
            }
            Message::Settle(ack) => {
                self.expire_typing().await;
                self.settle(ack);
            }
            Message::PeerPresence { generation, state } => {
                self.on_peer_presence(generation, &state);
            }
            Message::RoomTyping {
                generation,
                payload,
            } => self.on_room_typing(generation, &payload),
            Message::Shutdown(ack) => {
                self.teardown().await;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    /// Move subscriptions to follow new inputs.
    ///
    /// Only streams whose target actually changed are touched. A pending
    /// typing announcement is withdrawn from the old room before the new
    /// room is subscribed.
    async fn apply(&mut self, options: ParticipantOptions) {
        let previous = std::mem::replace(&mut self.options, options);

        if previous.active_room() != self.options.active_room() {
            self.leave_room().await;
            if let Some(room_id) = self.options.active_room().cloned() {
                self.join_room(room_id).await;
            }
        }

        if previous.active_peer() != self.options.active_peer() {
            self.unwatch_peer();
            if let Some(peer_id) = self.options.active_peer().cloned() {
                self.watch_peer(peer_id).await;
            }
        }
    }

    async fn join_room(&mut self, room_id: RoomId) {
        if let Err(e) = self.channel.register_typing_on_disconnect(&room_id).await {
            warn!(room_id = %room_id, error = %e, "Failed to register typing cleanup on disconnect");
        }

        let generation = self.next_generation();
        let outbox = self.outbox.clone();
        let callback: TypingCallback = Arc::new(move |payload| {
            let _ = outbox.send(Message::RoomTyping {
                generation,
                payload,
            });
        });

        match self.channel.subscribe_to_typing(&room_id, callback).await {
            Ok(subscription) => {
                debug!(room_id = %room_id, generation, "Subscribed to room typing");
                self.room_stream = Some(ActiveStream {
                    target: room_id,
                    generation,
                    subscription,
                });
            }
            Err(e) => warn!(room_id = %room_id, error = %e, "Failed to subscribe to room typing"),
        }
    }

    async fn leave_room(&mut self) {
        self.stop_typing().await;

        if let Some(stream) = self.room_stream.take() {
            debug!(room_id = %stream.target, "Releasing room typing subscription");
            stream.subscription.close();
        }
        self.typing_users.clear();
    }

    async fn watch_peer(&mut self, peer_id: ParticipantId) {
        let generation = self.next_generation();
        let outbox = self.outbox.clone();
        let callback: PresenceCallback = Arc::new(move |state| {
            let _ = outbox.send(Message::PeerPresence { generation, state });
        });

        match self
            .channel
            .subscribe_to_user_presence(&peer_id, callback)
            .await
        {
            Ok(subscription) => {
                debug!(peer_id = %peer_id, generation, "Subscribed to peer presence");
                self.peer_stream = Some(ActiveStream {
                    target: peer_id,
                    generation,
                    subscription,
                });
            }
            Err(e) => warn!(peer_id = %peer_id, error = %e, "Failed to subscribe to peer presence"),
        }
    }

    fn unwatch_peer(&mut self) {
        if let Some(stream) = self.peer_stream.take() {
            debug!(peer_id = %stream.target, "Releasing peer presence subscription");
            stream.subscription.close();
        }
        self.is_peer_online = false;
    }

    async fn start_typing(&mut self) {
        let Some(room_id) = self.options.active_room() else {
            debug!(enabled = self.options.enabled, "Typing announcement ignored without an active room");
            return;
        };

        let publish = self
            .typing
            .announce(room_id, Instant::now(), self.options.typing_idle);
        if let Some(publish) = publish {
            publish_typing(self.channel.as_ref(), publish).await;
        }
    }

    async fn stop_typing(&mut self) {
        if let Some(publish) = self.typing.retract() {
            publish_typing(self.channel.as_ref(), publish).await;
        }
    }

    async fn expire_typing(&mut self) {
        if let Some(publish) = self.typing.expire(Instant::now()) {
            debug!(room_id = %publish.room_id, "Typing announcement went idle");
            publish_typing(self.channel.as_ref(), publish).await;
        }
    }

    fn settle(&self, ack: oneshot::Sender<()>) {
        if self.inbox.is_empty() {
            let _ = ack.send(());
        } else {
            // Events queued behind this request were caused by earlier work
            let _ = self.outbox.send(Message::Settle(ack));
        }
    }

    fn on_peer_presence(&mut self, generation: u64, state: &str) {
        let Some(stream) = self.peer_stream.as_ref().filter(|s| s.accepts(generation)) else {
            trace!(generation, "Dropping presence update from a released subscription");
            return;
        };

        self.is_peer_online = PresenceState::parse(state).is_online();
        trace!(peer_id = %stream.target, state, "Peer presence updated");
    }

    fn on_room_typing(&mut self, generation: u64, payload: &Value) {
        let Some(stream) = self.room_stream.as_ref().filter(|s| s.accepts(generation)) else {
            trace!(generation, "Dropping typing update from a released subscription");
            return;
        };

        match TypingMap::from_value(payload) {
            Ok(map) => self.typing_users = map.typing_users(),
            Err(e) => warn!(room_id = %stream.target, error = %e, "Ignoring malformed typing map"),
        }
    }

    async fn teardown(&mut self) {
        self.leave_room().await;
        self.unwatch_peer();
        self.options.enabled = false;
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn publish_snapshot(&self) {
        let next = ParticipantSnapshot::derive(
            self.is_peer_online,
            &self.typing_users,
            self.options.current_user_id.as_ref(),
            self.typing.is_announced(),
        );

        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Publish failures are logged and dropped; the next transition publishes
/// the up to date flag anyway
async fn publish_typing(channel: &dyn PresenceChannel, publish: TypingPublish) {
    let TypingPublish { room_id, is_typing } = publish;
    match channel.set_typing(&room_id, is_typing).await {
        Ok(()) => debug!(room_id = %room_id, is_typing, "Typing flag published"),
        Err(e) => warn!(room_id = %room_id, is_typing, error = %e, "Failed to publish typing flag"),
    }
}

async fn idle_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
