//! # Player Demo
//!
//! Plays a short playlist without a native media engine, so every track runs
//! on the simulated transport. Snapshots are printed as they are published.
//!
//! Run with: `cargo run --example player_demo --package core-playback`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, LogLevel, ResolvedAudio, ResolvedVideo, StreamResolver};
use core_playback::{PlaybackConfig, PlaybackStatus, Player, Track};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;

/// Resolves every track to a fake CDN URL. Video is never available.
struct DemoResolver;

#[async_trait]
impl StreamResolver for DemoResolver {
    async fn resolve_audio(&self, track_id: &str) -> BridgeResult<ResolvedAudio> {
        Ok(ResolvedAudio {
            url: format!("https://cdn.example/{track_id}.m4a?token=demo"),
            duration_seconds: None,
        })
    }

    async fn resolve_video(&self, track_id: &str) -> BridgeResult<ResolvedVideo> {
        Err(BridgeError::NotAvailable(format!("no video for {track_id}")))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    let core = CoreConfig::builder()
        .stream_resolver(Arc::new(DemoResolver))
        .build()?;

    let player = Player::builder(core)
        .playback_config(PlaybackConfig {
            wrap_on_natural_end: false,
            ..Default::default()
        })
        .on_snapshot(|snapshot| {
            let title = snapshot
                .track
                .as_ref()
                .map(|t| t.title.as_str())
                .unwrap_or("-");
            println!(
                "[{:?}] {} {}/{}{}",
                snapshot.status,
                title,
                snapshot.position_label,
                snapshot.duration_label,
                if snapshot.degraded { " (simulated)" } else { "" },
            );
        })
        .spawn()?;

    let playlist = vec![
        Track::new("intro", "Intro").with_duration_seconds(3),
        Track::new("theme", "Main Theme").with_duration_seconds(4),
        Track::new("outro", "Outro").with_duration_seconds(2),
    ];
    player.play(playlist[0].clone(), playlist.clone(), 0).await?;

    let mut snapshots = player.subscribe_snapshots();
    snapshots
        .wait_for(|s| s.status == PlaybackStatus::Playing && s.current_index == Some(1))
        .await?;

    // Pause briefly, then seek while paused. Playback stays paused.
    player.toggle_play_pause()?;
    tokio::time::sleep(Duration::from_millis(800)).await;
    player.seek_to(2_000)?;
    tokio::time::sleep(Duration::from_millis(800)).await;
    player.toggle_play_pause()?;

    snapshots
        .wait_for(|s| s.status == PlaybackStatus::Ended)
        .await?;

    player.close().await?;
    Ok(())
}
