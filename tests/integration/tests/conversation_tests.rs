//! Conversation Integration Tests
//!
//! Two coordinators, one per participant, sharing a LocalPresenceHub.
//!
//! Run with: cargo test -p integration-tests --test conversation_tests

use std::time::Duration;

use integration_tests::{
    participant, room, unique_room, Participant, TestConversation, AGENT_ID, USER_ID,
};
use presence_cache::{HubEvent, LocalPresenceHub};
use presence_client::{ParticipantOptions, ParticipantSnapshot, DEFAULT_TYPING_IDLE};
use presence_core::PresenceState;
use tokio::time::advance;

// ============================================================================
// Typing Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_peer_sees_typing() {
    let conversation = TestConversation::open().await;

    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;

    let agent = conversation.agent.coordinator.snapshot();
    assert!(agent.is_peer_typing);
    assert_eq!(agent.typing_users, vec![USER_ID.to_string()]);

    // The typer's own flag never shows up as peer typing
    let user = conversation.user.coordinator.snapshot();
    assert!(!user.is_peer_typing);
    assert_eq!(user.typing_users, vec![USER_ID.to_string()]);
    assert!(user.is_typing_announced);

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_typing_goes_idle() {
    let conversation = TestConversation::open().await;

    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;
    advance(Duration::from_millis(3000)).await;
    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;

    advance(Duration::from_millis(3000)).await;
    conversation.settle().await;
    assert!(conversation.agent.coordinator.is_peer_typing());

    advance(DEFAULT_TYPING_IDLE).await;
    conversation.settle().await;
    assert!(!conversation.agent.coordinator.is_peer_typing());
    assert!(conversation.hub.typing_map(&conversation.room).is_quiet());

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_sending_a_message_clears_typing() {
    let conversation = TestConversation::open().await;

    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;
    conversation.user.coordinator.force_reset_typing();
    conversation.settle().await;

    assert!(!conversation.agent.coordinator.is_peer_typing());

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_both_typing() {
    let conversation = TestConversation::open().await;

    conversation.user.coordinator.announce_typing(true);
    conversation.agent.coordinator.announce_typing(true);
    conversation.settle().await;

    assert!(conversation.user.coordinator.is_peer_typing());
    assert!(conversation.agent.coordinator.is_peer_typing());
    assert_eq!(conversation.user.coordinator.typing_users().len(), 2);

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_sees_current_typing() {
    let hub = LocalPresenceHub::new();
    let room_id = unique_room();

    let user = Participant::join(&hub, &room_id, USER_ID, AGENT_ID, DEFAULT_TYPING_IDLE);
    user.coordinator.announce_typing(true);
    user.coordinator.settle().await;

    let agent = Participant::join(&hub, &room_id, AGENT_ID, USER_ID, DEFAULT_TYPING_IDLE);
    agent.coordinator.settle().await;

    assert!(agent.coordinator.is_peer_typing());

    user.coordinator.shutdown().await;
    agent.coordinator.shutdown().await;
}

// ============================================================================
// Presence Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_peer_presence_toggles() {
    let conversation = TestConversation::open().await;
    assert!(!conversation.user.coordinator.is_peer_online());

    conversation
        .hub
        .set_presence(&participant(AGENT_ID), PresenceState::Online);
    conversation.settle().await;
    assert!(conversation.user.coordinator.is_peer_online());

    conversation
        .hub
        .set_presence(&participant(AGENT_ID), PresenceState::Dnd);
    conversation.settle().await;
    assert!(!conversation.user.coordinator.is_peer_online());

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_clears_typing_and_presence() {
    let conversation = TestConversation::open().await;

    conversation
        .hub
        .set_presence(&participant(USER_ID), PresenceState::Online);
    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;
    assert!(conversation.agent.coordinator.is_peer_online());
    assert!(conversation.agent.coordinator.is_peer_typing());

    // The user's client vanishes without tearing down
    conversation.hub.disconnect(&participant(USER_ID));
    conversation.settle().await;

    assert!(!conversation.agent.coordinator.is_peer_online());
    assert!(!conversation.agent.coordinator.is_peer_typing());

    conversation.close().await;
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_room_switch_clears_old_room_before_subscribing() {
    let conversation = TestConversation::open().await;
    let next_room = unique_room();

    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;
    conversation.hub.clear_journal();

    conversation.user.coordinator.update(
        ParticipantOptions::new(Some(next_room.as_str()), Some(AGENT_ID))
            .with_identity_fallback(conversation.user.session.as_ref()),
    );
    conversation.settle().await;

    let journal = conversation.hub.journal();
    let position = |wanted: &HubEvent| {
        journal
            .iter()
            .position(|event| event == wanted)
            .unwrap_or_else(|| panic!("{wanted:?} not in journal"))
    };

    let cleared = position(&HubEvent::TypingSet {
        room: conversation.room.clone(),
        user: participant(USER_ID),
        is_typing: false,
    });
    let registered = position(&HubEvent::DisconnectRegistered {
        room: next_room.clone(),
        user: participant(USER_ID),
    });
    let subscribed = position(&HubEvent::TypingSubscribed {
        room: next_room.clone(),
    });
    assert!(cleared < registered);
    assert!(registered < subscribed);

    // The agent still in the old room saw the user stop
    assert!(!conversation.agent.coordinator.is_peer_typing());

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_disable_detaches_from_hub() {
    let conversation = TestConversation::open().await;

    conversation.user.coordinator.update(
        ParticipantOptions::new(Some(conversation.room.as_str()), Some(AGENT_ID))
            .with_enabled(false),
    );
    conversation.settle().await;

    assert_eq!(conversation.hub.typing_listener_count(&conversation.room), 1);
    assert_eq!(conversation.hub.presence_listener_count(&participant(AGENT_ID)), 0);
    assert_eq!(
        conversation.user.coordinator.snapshot(),
        ParticipantSnapshot::default()
    );

    conversation.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_releases_everything() {
    let conversation = TestConversation::open().await;
    let hub = conversation.hub.clone();
    let room_id = conversation.room.clone();

    conversation.user.coordinator.announce_typing(true);
    conversation.settle().await;
    assert_eq!(hub.typing_listener_count(&room_id), 2);

    conversation.close().await;

    assert_eq!(hub.typing_listener_count(&room_id), 0);
    assert_eq!(hub.presence_listener_count(&participant(USER_ID)), 0);
    assert_eq!(hub.presence_listener_count(&participant(AGENT_ID)), 0);
    assert!(hub.typing_map(&room_id).is_quiet());
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_session_observes_without_publishing() {
    let hub = LocalPresenceHub::new();
    let room_id = room("room-anon");
    let agent = Participant::join(&hub, &room_id, AGENT_ID, USER_ID, DEFAULT_TYPING_IDLE);
    let anonymous = Participant::join(&hub, &room_id, "   ", AGENT_ID, DEFAULT_TYPING_IDLE);

    agent.coordinator.announce_typing(true);
    anonymous.coordinator.announce_typing(true);
    agent.coordinator.settle().await;
    anonymous.coordinator.settle().await;

    // The anonymous publish fails quietly; observation still works
    assert!(anonymous.coordinator.is_peer_typing());
    assert_eq!(hub.typing_map(&room_id).typing_users(), vec![AGENT_ID.to_string()]);

    agent.coordinator.shutdown().await;
    anonymous.coordinator.shutdown().await;
}
