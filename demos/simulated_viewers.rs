//! Simulated viewers against the in-memory store
//!
//! Run with: cargo run --example simulated_viewers [FRAGMENT_DURATION]
//!
//! Examples:
//!   cargo run --example simulated_viewers          # 10s sweep period
//!   cargo run --example simulated_viewers 1        # derived: 1 * 10s
//!   RUST_LOG=viewer_presence=debug cargo run --example simulated_viewers
//!
//! Three viewers join "live1". Two keep polling, one goes silent and is
//! evicted after the session timeout. Halfway through, the broadcast ends and
//! the remaining viewers are disconnected.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use viewer_presence::{BroadcastStatus, MemoryStore, PresenceConfig, PresenceTracker, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("viewer_presence=info")),
        )
        .init();

    let settings = Settings {
        fragment_duration: std::env::args().nth(1),
    };
    let config = PresenceConfig::from_settings(&settings).session_timeout(Duration::from_secs(15));
    let sweep_interval = config.sweep_interval;

    let store = Arc::new(MemoryStore::new());
    store.set_status("live1", BroadcastStatus::Broadcasting).await;

    let (tracker, worker) = PresenceTracker::spawn(config, Arc::clone(&store), Arc::clone(&store));

    tracker.register_viewer("live1", "session-1", Some("alice"))?;
    tracker.register_viewer("live1", "session-2", Some("bob"))?;
    tracker.register_viewer("live1", "session-3", None)?;
    tracker.barrier().await?;
    println!("viewers after join: {}", tracker.viewer_count("live1"));

    // Players poll for segments; session-3 stops after the first round
    let mut poll = tokio::time::interval(Duration::from_secs(2));
    for round in 0..15 {
        poll.tick().await;
        tracker.register_viewer("live1", "session-1", Some("alice"))?;
        tracker.register_viewer("live1", "session-2", Some("bob"))?;
        if round == 0 {
            tracker.register_viewer("live1", "session-3", None)?;
        }
    }

    let report = tracker.sweep_now().await?;
    println!(
        "viewers after silence: {} (evicted {})",
        tracker.viewer_count("live1"),
        report.sessions_evicted
    );

    store.set_status("live1", BroadcastStatus::Finished).await;
    tokio::time::sleep(sweep_interval).await;
    tracker.barrier().await?;

    println!("viewers after broadcast end: {}", tracker.total_viewer_count());
    println!("persisted viewer count: {}", store.viewer_count("live1").await);
    for event in store.events().await {
        println!(
            "{} {} {} at {}",
            event.stream_id, event.subscriber_id, event.event.event_type, event.event.timestamp_ms
        );
    }

    tracker.shutdown().await;
    worker.await?;
    Ok(())
}
