//! Presence probe entry point
//!
//! Joins a conversation through Redis and turns stdin into keystrokes: a
//! non-empty line announces typing, an empty line withdraws it. Snapshot
//! changes are logged. EOF or Ctrl-C leaves the conversation.
//!
//! Run with:
//! ```bash
//! PROBE_ROOM_ID=room-42 PROBE_PEER_ID=agent-7 PROBE_USER_ID=user-1 \
//!     cargo run -p presence-client --bin presence-probe
//! ```
//!
//! Redis and typing settings are loaded from environment variables.

use std::sync::Arc;
use std::time::Duration;

use presence_cache::RedisPresenceChannel;
use presence_client::{ParticipantCoordinator, ParticipantOptions};
use presence_common::{try_init_tracing_with_config, AppConfig, AppError, AppResult, TracingConfig};
use presence_core::{IdentityProvider, ParticipantId, PresenceState, StaticIdentity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(code = e.error_code(), error = %e, "Presence probe failed");
        std::process::exit(1);
    }
}

/// Re-announce well before the stored presence record expires
fn presence_refresh_period(ttl_secs: u64) -> Duration {
    (Duration::from_secs(ttl_secs) / 3).max(Duration::from_secs(1))
}

fn probe_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

async fn run(config: AppConfig) -> AppResult<()> {
    let identity = StaticIdentity::new(
        probe_var("PROBE_USER_ID")
            .as_deref()
            .and_then(ParticipantId::parse),
    );
    if identity.current_user_id().is_none() {
        return Err(AppError::invalid_input("PROBE_USER_ID must be set"));
    }

    let options = ParticipantOptions::new(
        probe_var("PROBE_ROOM_ID").as_deref(),
        probe_var("PROBE_PEER_ID").as_deref(),
    )
    .with_typing_idle(config.typing.idle())
    .with_identity_fallback(&identity);

    info!(
        env = ?config.app.env,
        room_id = ?options.room_id,
        peer_id = ?options.peer_id,
        user_id = ?options.current_user_id,
        "Configuration loaded"
    );

    let channel = Arc::new(
        RedisPresenceChannel::from_config(&config, Arc::new(identity)).map_err(AppError::cache)?,
    );
    if let Err(e) = channel.announce_presence(PresenceState::Online).await {
        warn!(error = %e, "Failed to announce presence");
    }

    let coordinator = ParticipantCoordinator::spawn(channel.clone(), options);
    let mut snapshots = coordinator.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let refresh_period = presence_refresh_period(config.presence.ttl_secs);
    let mut presence_refresh = interval_at(Instant::now() + refresh_period, refresh_period);
    presence_refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            line = lines.next_line() => match line.map_err(AppError::internal)? {
                Some(line) => coordinator.announce_typing(!line.trim().is_empty()),
                None => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                info!(
                    peer_online = snapshot.is_peer_online,
                    peer_typing = snapshot.is_peer_typing,
                    typing_users = ?snapshot.typing_users,
                    announced = snapshot.is_typing_announced,
                    "Conversation state changed"
                );
            }
            _ = presence_refresh.tick() => {
                if let Err(e) = channel.announce_presence(PresenceState::Online).await {
                    warn!(error = %e, "Failed to refresh presence");
                }
            }
            _ = &mut interrupted => {
                info!("Interrupted");
                break;
            }
        }
    }

    coordinator.shutdown().await;
    if let Err(e) = channel.disconnect().await {
        warn!(error = %e, "Failed to clean up presence on exit");
    }

    info!("Presence probe stopped");
    Ok(())
}
