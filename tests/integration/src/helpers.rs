//! Test helpers for integration tests
//!
//! Provides a two-participant conversation over [`LocalPresenceHub`],
//! waiting helpers for asynchronous backends, and environment checks for
//! the Redis-backed tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use presence_cache::{LocalPresenceHub, LocalPresenceSession};
use presence_client::{ParticipantCoordinator, ParticipantOptions, ParticipantSnapshot};
use presence_common::AppConfig;
use presence_core::RoomId;
use tokio::sync::watch;

use crate::fixtures::{unique_room, AGENT_ID, USER_ID};

/// One side of a conversation
pub struct Participant {
    pub session: Arc<LocalPresenceSession>,
    pub coordinator: ParticipantCoordinator,
}

impl Participant {
    /// Join `room_id` as `user_id`, watching `peer_id`.
    ///
    /// The local identity is resolved from the session, the way a screen
    /// would resolve it from the signed-in account.
    pub fn join(
        hub: &LocalPresenceHub,
        room_id: &RoomId,
        user_id: &str,
        peer_id: &str,
        typing_idle: Duration,
    ) -> Self {
        let session = Arc::new(hub.session_for(user_id));
        let options = ParticipantOptions::new(Some(room_id.as_str()), Some(peer_id))
            .with_typing_idle(typing_idle)
            .with_identity_fallback(session.as_ref());
        let coordinator = ParticipantCoordinator::spawn(session.clone(), options);

        Self {
            session,
            coordinator,
        }
    }
}

/// A user and an agent sharing one room on one hub
pub struct TestConversation {
    pub hub: LocalPresenceHub,
    pub room: RoomId,
    pub user: Participant,
    pub agent: Participant,
}

impl TestConversation {
    /// Open a conversation in a fresh room
    pub async fn open() -> Self {
        Self::open_with_idle(presence_client::DEFAULT_TYPING_IDLE).await
    }

    pub async fn open_with_idle(typing_idle: Duration) -> Self {
        let hub = LocalPresenceHub::new();
        let room = unique_room();
        let user = Participant::join(&hub, &room, USER_ID, AGENT_ID, typing_idle);
        let agent = Participant::join(&hub, &room, AGENT_ID, USER_ID, typing_idle);

        let conversation = Self {
            hub,
            room,
            user,
            agent,
        };
        conversation.settle().await;
        conversation
    }

    /// Let both coordinators drain everything the other caused
    pub async fn settle(&self) {
        for _ in 0..2 {
            self.user.coordinator.settle().await;
            self.agent.coordinator.settle().await;
        }
    }

    pub async fn close(self) {
        self.user.coordinator.shutdown().await;
        self.agent.coordinator.shutdown().await;
    }
}

/// Wait until a snapshot satisfies `predicate`, or give up after `timeout`
pub async fn wait_for<F>(
    snapshots: &mut watch::Receiver<ParticipantSnapshot>,
    timeout: Duration,
    predicate: F,
) -> bool
where
    F: FnMut(&ParticipantSnapshot) -> bool,
{
    tokio::time::timeout(timeout, snapshots.wait_for(predicate))
        .await
        .is_ok_and(|result| result.is_ok())
}

/// Check if the Redis-backed tests can run
pub fn check_test_env() -> bool {
    dotenvy::dotenv().ok();

    if std::env::var("REDIS_URL").is_err() {
        eprintln!("Skipping test: REDIS_URL not set");
        return false;
    }

    true
}

/// Load test configuration from environment
pub fn test_config() -> Result<AppConfig> {
    Ok(AppConfig::from_env()?)
}
