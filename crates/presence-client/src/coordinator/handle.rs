//! Public coordinator handle

use std::fmt;
use std::sync::Arc;

use presence_core::PresenceChannel;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::actor::CoordinatorActor;
use super::message::Message;
use crate::options::ParticipantOptions;
use crate::snapshot::ParticipantSnapshot;

/// Presence and typing coordination for one open conversation.
///
/// Reads come from the latest snapshot and never wait. Commands are queued
/// for the actor and never fail; once the coordinator has stopped they are
/// dropped. Dropping the handle tears the coordinator down in the
/// background, [`shutdown`](Self::shutdown) does the same and waits for it.
pub struct ParticipantCoordinator {
    commands: mpsc::UnboundedSender<Message>,
    snapshot: watch::Receiver<ParticipantSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl ParticipantCoordinator {
    /// Start a coordinator on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(channel: Arc<dyn PresenceChannel>, options: ParticipantOptions) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(ParticipantSnapshot::default());

        // Queued before the actor starts, so it is always handled first
        let _ = commands.send(Message::Update(options));

        let actor = CoordinatorActor::new(channel, inbox, commands.clone(), snapshot_tx);
        let task = tokio::spawn(actor.run());

        Self {
            commands,
            snapshot,
            task: Some(task),
        }
    }

    /// The peer's presence stream last reported `"online"`
    pub fn is_peer_online(&self) -> bool {
        self.snapshot.borrow().is_peer_online
    }

    /// Someone other than the local participant is typing in the room
    pub fn is_peer_typing(&self) -> bool {
        self.snapshot.borrow().is_peer_typing
    }

    /// Every id currently flagged as typing in the room, self included
    pub fn typing_users(&self) -> Vec<String> {
        self.snapshot.borrow().typing_users.clone()
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn watch(&self) -> watch::Receiver<ParticipantSnapshot> {
        self.snapshot.clone()
    }

    /// Report local input activity. Call on every change of the text field.
    ///
    /// `true` announces typing once and keeps the announcement alive for
    /// the configured idle period; `false` withdraws it.
    pub fn announce_typing(&self, is_typing: bool) {
        self.send(Message::AnnounceTyping(is_typing));
    }

    /// Withdraw any typing announcement now, e.g. after sending a message
    pub fn force_reset_typing(&self) {
        self.send(Message::ForceResetTyping);
    }

    /// Apply new inputs
    pub fn update(&self, options: ParticipantOptions) {
        self.send(Message::Update(options));
    }

    /// Wait until everything queued so far, including channel events it
    /// triggered, has been handled
    pub async fn settle(&self) {
        let (ack, done) = oneshot::channel();
        self.send(Message::Settle(ack));
        let _ = done.await;
    }

    /// Release both subscriptions, withdraw any typing announcement, and
    /// wait for the actor to finish
    pub async fn shutdown(mut self) {
        let (ack, done) = oneshot::channel();
        self.send(Message::Shutdown(Some(ack)));
        let _ = done.await;

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Participant coordinator task failed");
            }
        }
    }

    fn send(&self, message: Message) {
        if self.commands.send(message).is_err() {
            debug!("Participant coordinator stopped; command dropped");
        }
    }
}

impl Drop for ParticipantCoordinator {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Message::Shutdown(None));
        }
    }
}

impl fmt::Debug for ParticipantCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticipantCoordinator")
            .field("snapshot", &*self.snapshot.borrow())
            .field("running", &!self.commands.is_closed())
            .finish()
    }
}
