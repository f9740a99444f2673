mod config;
mod player;
mod sensor;

use barkback_core::{BarkResponder, LogSink, Monitor, NotificationSink};
use config::BarkAgentConfig;
use player::CliPlayer;
use sensor::SimulatedMic;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,barkback_core=info,bark_agent=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target = "bark_agent",
        "Starting Bark Agent demo: Mic -> Detector -> Escalation -> Playback"
    );

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = BarkAgentConfig::load();

    // Outbound notifications: log-only sink (swap in a transport here)
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);

    // Response side: CLI player behind the single-flight dispatcher
    let backend = Arc::new(CliPlayer::new(cfg.player.clone())?);
    let responder =
        BarkResponder::new(cfg.responder.clone(), backend, Arc::clone(&sink)).await?;

    // Monitor thread -> responder task, one bounded channel between them
    let (event_tx, event_rx) = mpsc::channel(16);
    let responder_handle = responder.start(event_rx);

    let mic = SimulatedMic::new(8, 6);
    let monitor = Monitor::spawn(cfg.monitor.clone(), Box::new(mic), event_tx)?;

    // Per-second stats: log + publish, same shape the Pi deployment reported
    let topic_volume = cfg.responder.topic_volume.clone();
    let stats_sink = Arc::clone(&sink);

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snap = monitor.snapshot();
                debug!(
                    target = "bark_agent",
                    volume_avg = snap.volume_avg,
                    volume_max = snap.volume_max,
                    high_count = snap.high_count,
                    "volume"
                );
                stats_sink
                    .notify(
                        &topic_volume,
                        &json!({
                            "Average": snap.volume_avg,
                            "Max": snap.volume_max,
                            "High_Count": snap.high_count,
                            "At": chrono::Utc::now().to_rfc3339(),
                        })
                        .to_string(),
                    )
                    .await;
                if !monitor.is_running() {
                    error!(target = "bark_agent", "monitor thread stopped; shutting down");
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!(target = "bark_agent", "ctrl-c received; shutting down");
                break;
            }
        }
    }

    // Join the sampling thread before anything else is torn down; a fatal
    // bus error recorded by the loop surfaces here
    if let Err(e) = monitor.close() {
        error!(target = "bark_agent", error = %e, "monitor exited with error");
    }
    responder_handle.abort();

    info!(target = "bark_agent", "Bark Agent stopped");
    Ok(())
}
