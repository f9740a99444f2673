//! CLI playback backend: plays media files through a local player binary.
//!
//! Prefers omxplayer (hardware audio path on the Pi, understands millibel
//! volume), falling back to ffplay or aplay when it is missing. The child
//! process runs on a blocking task; `start` refuses while one is running.

use async_trait::async_trait;
use barkback_core::{AssetId, BarkError, PlaybackBackend, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tokio::sync::Mutex;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::PlayerConfig;

pub struct CliPlayer {
    cfg: PlayerConfig,
    player_bin: PathBuf,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl CliPlayer {
    pub fn new(cfg: PlayerConfig) -> Result<Self> {
        if !cfg.media_dir.is_dir() {
            return Err(BarkError::ConfigError(format!(
                "media path {:?} does not exist or is not a directory",
                cfg.media_dir
            )));
        }
        let player_bin = select_player(cfg.player_bin.as_deref()).ok_or_else(|| {
            BarkError::ConfigError(
                "no audio player found on PATH (tried omxplayer, ffplay, aplay)".into(),
            )
        })?;
        info!(target: "player", bin = ?player_bin, dir = ?cfg.media_dir, "CLI player ready");
        Ok(Self {
            cfg,
            player_bin,
            current: Mutex::new(None),
        })
    }

    fn scan_media(&self) -> Result<Vec<AssetId>> {
        let mut assets = Vec::new();
        for entry in std::fs::read_dir(&self.cfg.media_dir).map_err(BarkError::IoError)? {
            let entry = entry.map_err(BarkError::IoError)?;
            if !entry.file_type().map_err(BarkError::IoError)?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if has_media_extension(&name, &self.cfg.extensions) {
                assets.push(name);
            }
        }
        assets.sort();
        Ok(assets)
    }
}

/// Extension match is case-insensitive on both sides; the configured list
/// may carry any case.
fn has_media_extension(name: &str, extensions: &[String]) -> bool {
    let name = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

#[async_trait]
impl PlaybackBackend for CliPlayer {
    async fn list_available(&self) -> Result<Vec<AssetId>> {
        self.scan_media()
    }

    async fn start(&self, asset: &AssetId, volume: i32) -> Result<()> {
        let mut current = self.current.lock().await;
        if let Some(handle) = current.as_ref() {
            if !handle.is_finished() {
                return Err(BarkError::PlaybackError("already playing".into()));
            }
        }

        let path = self.cfg.media_dir.join(asset);
        let bin = self.player_bin.clone();
        let adev = self.cfg.adev.clone();
        debug!(target: "player", asset = %asset, volume, "starting playback");

        *current = Some(task::spawn_blocking(move || {
            if let Err(e) = run_player(&bin, &path, volume, &adev) {
                warn!(target: "player", error = %e, "player process failed");
            }
        }));
        Ok(())
    }

    async fn await_finished(&self) -> Result<()> {
        let handle = self.current.lock().await.take();
        if let Some(handle) = handle {
            handle.await.map_err(|e| {
                BarkError::PlaybackError(format!("playback task failed: {}", e))
            })?;
        }
        Ok(())
    }
}

/// Spawns the player and waits for it to exit. Argument shape depends on the
/// binary: omxplayer takes millibels directly, ffplay wants a 0-100 scale.
fn run_player(bin: &Path, media: &Path, volume: i32, adev: &str) -> std::io::Result<()> {
    let name = bin.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let mut cmd = Command::new(bin);
    match name {
        "omxplayer" => {
            cmd.arg("--adev")
                .arg(adev)
                .arg("--vol")
                .arg(volume.to_string())
                .arg(media);
        }
        "ffplay" => {
            // Millibels above base map roughly onto ffplay's linear scale
            let pct = (30 + volume / 50).clamp(0, 100);
            cmd.arg("-autoexit")
                .arg("-nodisp")
                .arg("-volume")
                .arg(pct.to_string())
                .arg(media);
        }
        _ => {
            cmd.arg(media);
        }
    }
    cmd.stdout(Stdio::null()).stderr(Stdio::null());
    cmd.status().map(|_| ())
}

fn select_player(pref: Option<&str>) -> Option<PathBuf> {
    if let Some(p) = pref {
        if let Some(bin) = get_from_path(p) {
            return Some(bin);
        }
        warn!(target: "player", preferred = %p, "preferred player not found; trying fallbacks");
    }
    get_from_path("omxplayer")
        .or_else(|| get_from_path("ffplay"))
        .or_else(|| get_from_path("aplay"))
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    if let Ok(paths) = std::env::var("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(bin);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;

    fn player_over(dir: PathBuf) -> CliPlayer {
        CliPlayer {
            cfg: PlayerConfig {
                media_dir: dir,
                ..PlayerConfig::default()
            },
            player_bin: PathBuf::from("/bin/true"),
            current: Mutex::new(None),
        }
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let exts = vec![".mp3".to_string(), ".WAV".to_string()];
        assert!(has_media_extension("Bark.MP3", &exts));
        assert!(has_media_extension("howl.wav", &exts));
        assert!(!has_media_extension("notes.txt", &exts));
    }

    #[test]
    fn test_scan_media_lists_files_only() {
        let dir = std::env::temp_dir().join(format!("bark_media_{}", std::process::id()));
        // A directory whose name looks like a track must not be listed
        std::fs::create_dir_all(dir.join("decoys.mp3")).unwrap();
        std::fs::write(dir.join("Bark.MP3"), b"").unwrap();
        std::fs::write(dir.join("notes.txt"), b"").unwrap();

        let assets = player_over(dir.clone()).scan_media().unwrap();
        assert_eq!(assets, vec!["Bark.MP3".to_string()]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
