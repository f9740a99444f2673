//! Playback backend contract and the single-flight response dispatcher.

use crate::{BarkError, Result};
use async_trait::async_trait;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Identifier of a playable response asset, as reported by the backend.
pub type AssetId = String;

/// External audio playback backend.
///
/// `start` must return promptly: the asset plays asynchronously and
/// completion is signalled through `await_finished`. A backend that is asked
/// to start while already playing may refuse with `PlaybackError`; the
/// dispatcher treats that as a no-op.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn list_available(&self) -> Result<Vec<AssetId>>;
    async fn start(&self, asset: &AssetId, volume: i32) -> Result<()>;
    async fn await_finished(&self) -> Result<()>;
}

/// Dispatcher-owned playback state. Mutated only by the dispatcher's own
/// start/finish transitions.
#[derive(Debug, Clone, Copy)]
pub enum PlaybackSession {
    Idle,
    Playing { volume: i32, started_at: Instant },
}

/// Guarantees at most one audio response in flight and clamps the requested
/// volume to the loudest configured tier.
pub struct ResponseDispatcher {
    backend: std::sync::Arc<dyn PlaybackBackend>,
    session: Mutex<PlaybackSession>,
    max_volume: i32,
}

impl ResponseDispatcher {
    /// Fails with `ConfigError` when the backend has nothing to play: a
    /// responder that can never respond is a setup mistake, surfaced at
    /// startup rather than retried per event.
    pub async fn new(
        backend: std::sync::Arc<dyn PlaybackBackend>,
        max_volume: i32,
    ) -> Result<Self> {
        let assets = backend.list_available().await?;
        if assets.is_empty() {
            return Err(BarkError::ConfigError(
                "playback backend lists no response assets".into(),
            ));
        }
        info!(target: "playback", assets = assets.len(), "response dispatcher ready");
        Ok(Self {
            backend,
            session: Mutex::new(PlaybackSession::Idle),
            max_volume,
        })
    }

    /// Starts a response at `volume` (clamped to the top tier) unless one is
    /// already playing, in which case this is a no-op and returns `None`.
    /// Returns the chosen asset immediately; playback continues in the
    /// backend.
    pub async fn dispatch(&self, volume: i32) -> Result<Option<AssetId>> {
        let mut session = self.session.lock().await;
        if let PlaybackSession::Playing { .. } = *session {
            debug!(target: "playback", "response already in flight; skipping");
            return Ok(None);
        }

        let volume = volume.min(self.max_volume);
        let assets = self.backend.list_available().await?;
        if assets.is_empty() {
            return Err(BarkError::PlaybackError(
                "no response assets available".into(),
            ));
        }
        let asset = assets[pick_index(assets.len())].clone();

        match self.backend.start(&asset, volume).await {
            Ok(()) => {
                *session = PlaybackSession::Playing {
                    volume,
                    started_at: Instant::now(),
                };
                Ok(Some(asset))
            }
            // The backend refusing a concurrent start is the same no-op as
            // our own single-flight check
            Err(BarkError::PlaybackError(reason)) => {
                debug!(target: "playback", %reason, "backend refused start");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Blocks the caller (never the sampling loop) until the backend signals
    /// completion, then returns the session to idle. The session goes idle
    /// even when the backend reports a failure: a response that died is not
    /// in flight, and holding `Playing` would refuse every later dispatch.
    pub async fn await_completion(&self) -> Result<()> {
        let finished = self.backend.await_finished().await;
        *self.session.lock().await = PlaybackSession::Idle;
        finished
    }

    /// Current session state, for observability.
    pub async fn session(&self) -> PlaybackSession {
        *self.session.lock().await
    }
}

// Nanosecond-seeded pick keeps the response varied without pulling in an
// RNG for a once-per-episode choice.
fn pick_index(len: usize) -> usize {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0);
    nanos % len
}
