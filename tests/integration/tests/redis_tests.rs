//! Redis Integration Tests
//!
//! These tests require:
//! - Running Redis instance
//! - Environment variables: REDIS_URL
//!
//! Run with: cargo test -p integration-tests --test redis_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{check_test_env, test_config, unique_remote_room, wait_for};
use presence_cache::{PresenceStore, PresenceStoreConfig, RedisPool, RedisPresenceChannel};
use presence_client::{ParticipantCoordinator, ParticipantOptions};
use presence_core::{PresenceChannel, PresenceState, RoomId, StaticIdentity};

const WAIT: Duration = Duration::from_secs(5);

fn channel_for(user_id: &str) -> Arc<RedisPresenceChannel> {
    let config = test_config().expect("Failed to load config");
    let identity = Arc::new(StaticIdentity::parse(user_id));
    Arc::new(RedisPresenceChannel::from_config(&config, identity).expect("Failed to create channel"))
}

/// Channel whose expiring typing flags last `typing_ttl_secs`
fn short_lived_channel_for(user_id: &str, typing_ttl_secs: u64) -> Arc<RedisPresenceChannel> {
    let mut config = test_config().expect("Failed to load config");
    config.typing.ttl_secs = typing_ttl_secs;
    let identity = Arc::new(StaticIdentity::parse(user_id));
    Arc::new(RedisPresenceChannel::from_config(&config, identity).expect("Failed to create channel"))
}

fn store() -> PresenceStore {
    let config = test_config().expect("Failed to load config");
    let pool = RedisPool::from_config(&config.redis).expect("Failed to create pool");
    PresenceStore::new(pool, PresenceStoreConfig::from(&config))
}

#[tokio::test]
async fn test_peer_presence_over_redis() {
    if !check_test_env() {
        return;
    }

    let agent_id = format!("agent-{}", uuid::Uuid::new_v4());
    let room_id = unique_remote_room();
    let user_channel = channel_for("user-1");
    let agent_channel = channel_for(&agent_id);

    let coordinator = ParticipantCoordinator::spawn(
        user_channel.clone(),
        ParticipantOptions::new(Some(room_id.as_str()), Some(&agent_id))
            .with_current_user(Some("user-1")),
    );
    coordinator.settle().await;
    let mut snapshots = coordinator.watch();

    agent_channel
        .announce_presence(PresenceState::Online)
        .await
        .expect("Failed to announce presence");
    assert!(wait_for(&mut snapshots, WAIT, |s| s.is_peer_online).await);

    agent_channel.disconnect().await.expect("Failed to disconnect");
    assert!(wait_for(&mut snapshots, WAIT, |s| !s.is_peer_online).await);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_peer_typing_over_redis() {
    if !check_test_env() {
        return;
    }

    let room_id = unique_remote_room();
    let user_channel = channel_for("user-1");
    let agent_channel = channel_for("agent-7");

    let user = ParticipantCoordinator::spawn(
        user_channel.clone(),
        ParticipantOptions::new(Some(room_id.as_str()), Some("agent-7"))
            .with_current_user(Some("user-1")),
    );
    user.settle().await;
    let mut snapshots = user.watch();

    agent_channel
        .register_typing_on_disconnect(&room_id)
        .await
        .expect("Failed to register cleanup");
    agent_channel
        .set_typing(&room_id, true)
        .await
        .expect("Failed to set typing");
    assert!(wait_for(&mut snapshots, WAIT, |s| s.is_peer_typing).await);
    assert_eq!(user.typing_users(), vec!["agent-7".to_string()]);

    agent_channel
        .set_typing(&room_id, false)
        .await
        .expect("Failed to clear typing");
    assert!(wait_for(&mut snapshots, WAIT, |s| !s.is_peer_typing).await);

    user.shutdown().await;
}

#[tokio::test]
async fn test_own_announcement_reaches_redis() {
    if !check_test_env() {
        return;
    }

    let room_id = unique_remote_room();
    let user_channel = channel_for("user-1");
    let agent_channel = channel_for("agent-7");

    let agent = ParticipantCoordinator::spawn(
        agent_channel.clone(),
        ParticipantOptions::new(Some(room_id.as_str()), Some("user-1"))
            .with_current_user(Some("agent-7")),
    );
    agent.settle().await;
    let mut snapshots = agent.watch();

    let user = ParticipantCoordinator::spawn(
        user_channel.clone(),
        ParticipantOptions::new(Some(room_id.as_str()), Some("agent-7"))
            .with_current_user(Some("user-1")),
    );
    user.settle().await;
    user.announce_typing(true);
    user.settle().await;

    assert!(wait_for(&mut snapshots, WAIT, |s| s.is_peer_typing).await);

    user.shutdown().await;
    assert!(wait_for(&mut snapshots, WAIT, |s| !s.is_peer_typing).await);

    agent.shutdown().await;
}

#[tokio::test]
async fn test_typing_maps_are_isolated_per_room() {
    if !check_test_env() {
        return;
    }

    let base = unique_remote_room();
    let parent = RoomId::parse(&format!("{base}:1")).unwrap();
    let nested = RoomId::parse(&format!("{base}:1:2")).unwrap();
    let glob = RoomId::parse(&format!("{base}*")).unwrap();
    let agent_channel = channel_for("agent-7");

    agent_channel
        .set_typing(&nested, true)
        .await
        .expect("Failed to set typing");

    let store = store();
    assert!(store.room_typing(&parent).await.unwrap().is_quiet());
    assert!(store.room_typing(&glob).await.unwrap().is_quiet());
    assert_eq!(
        store.room_typing(&nested).await.unwrap().typing_users(),
        vec!["agent-7".to_string()]
    );

    agent_channel
        .set_typing(&nested, false)
        .await
        .expect("Failed to clear typing");
}

#[tokio::test]
async fn test_long_typing_run_outlives_ttl() {
    if !check_test_env() {
        return;
    }

    let room_id = unique_remote_room();
    let agent_channel = short_lived_channel_for("agent-7", 1);

    agent_channel
        .register_typing_on_disconnect(&room_id)
        .await
        .expect("Failed to register cleanup");
    agent_channel
        .set_typing(&room_id, true)
        .await
        .expect("Failed to set typing");

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(store().room_typing(&room_id).await.unwrap().is_typing("agent-7"));

    agent_channel.disconnect().await.expect("Failed to disconnect");
    assert!(store().room_typing(&room_id).await.unwrap().is_quiet());
}

#[tokio::test]
async fn test_abandoned_flag_is_swept_for_subscribers() {
    if !check_test_env() {
        return;
    }

    let room_id = unique_remote_room();
    let user_channel = short_lived_channel_for("user-1", 1);
    let agent_channel = short_lived_channel_for("agent-7", 1);

    let user = ParticipantCoordinator::spawn(
        user_channel.clone(),
        ParticipantOptions::new(Some(room_id.as_str()), Some("agent-7"))
            .with_current_user(Some("user-1")),
    );
    user.settle().await;
    let mut snapshots = user.watch();

    agent_channel
        .register_typing_on_disconnect(&room_id)
        .await
        .expect("Failed to register cleanup");
    agent_channel
        .set_typing(&room_id, true)
        .await
        .expect("Failed to set typing");
    assert!(wait_for(&mut snapshots, WAIT, |s| s.is_peer_typing).await);

    // Gone without clearing its flag
    drop(agent_channel);
    assert!(wait_for(&mut snapshots, WAIT, |s| !s.is_peer_typing).await);
    assert!(store().room_typing(&room_id).await.unwrap().is_quiet());

    user.shutdown().await;
}
