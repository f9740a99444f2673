use std::fs;
use std::path::{Path, PathBuf};

use barkback_core::{MonitorConfig, ResponderConfig};

/// High-level configuration for the Bark Agent demo
#[derive(Clone, Debug)]
pub struct BarkAgentConfig {
    pub monitor: MonitorConfig,
    pub responder: ResponderConfig,
    pub player: PlayerConfig,
}

/// CLI playback backend configuration
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Directory scanned for response media files.
    pub media_dir: PathBuf,
    /// Accepted media file extensions.
    pub extensions: Vec<String>,
    /// Audio device name passed to omxplayer (`local` = 3.5mm jack).
    pub adev: String,
    /// Optional player binary preference; discovered on PATH otherwise.
    pub player_bin: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            media_dir: std::env::var("BARK_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            extensions: vec![
                ".aac".into(),
                ".flac".into(),
                ".mp3".into(),
                ".m4a".into(),
                ".wav".into(),
            ],
            adev: std::env::var("BARK_ADEV").unwrap_or_else(|_| "local".into()),
            player_bin: std::env::var("BARK_PLAYER").ok().filter(|s| !s.is_empty()),
        }
    }
}

impl Default for BarkAgentConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            responder: ResponderConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

impl BarkAgentConfig {
    /// Load configuration from a TOML file (path via BARK_AGENT_CONFIG or
    /// ./bark_agent.toml), overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path =
            std::env::var("BARK_AGENT_CONFIG").unwrap_or_else(|_| "bark_agent.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "bark_agent", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<BarkAgentToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "bark_agent", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "bark_agent", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct BarkAgentToml {
    pub monitor: Option<MonitorToml>,
    pub responder: Option<ResponderToml>,
    pub player: Option<PlayerToml>,
}

impl BarkAgentToml {
    fn overlay(self, mut base: BarkAgentConfig) -> BarkAgentConfig {
        if let Some(m) = self.monitor {
            m.apply(&mut base.monitor);
        }
        if let Some(r) = self.responder {
            r.apply(&mut base.responder);
        }
        if let Some(p) = self.player {
            p.apply(&mut base.player);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct MonitorToml {
    pub hz: Option<u32>,
    pub sample_time: Option<f64>,
    pub high_volume_threshold: Option<f64>,
    pub high_volume_period: Option<u32>,
    pub high_volume_max: Option<usize>,
    pub adc_max: Option<u16>,
}
impl MonitorToml {
    fn apply(self, m: &mut MonitorConfig) {
        if let Some(v) = self.hz {
            m.hz = v;
        }
        if let Some(v) = self.sample_time {
            m.sample_time = v;
        }
        if let Some(v) = self.high_volume_threshold {
            m.high_volume_threshold = v;
        }
        if let Some(v) = self.high_volume_period {
            m.high_volume_period = v;
        }
        if let Some(v) = self.high_volume_max {
            m.high_volume_max = v;
        }
        if let Some(v) = self.adc_max {
            m.adc_max = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ResponderToml {
    pub volumes: Option<Vec<i32>>,
    pub escalation_period: Option<u64>,
    pub topic_volume: Option<String>,
    pub topic_playing: Option<String>,
}
impl ResponderToml {
    fn apply(self, r: &mut ResponderConfig) {
        if let Some(v) = self.volumes {
            r.volumes = v;
        }
        if let Some(v) = self.escalation_period {
            r.escalation_period = v;
        }
        if let Some(v) = self.topic_volume {
            r.topic_volume = v;
        }
        if let Some(v) = self.topic_playing {
            r.topic_playing = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PlayerToml {
    pub media_dir: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub adev: Option<String>,
    pub player_bin: Option<String>,
}
impl PlayerToml {
    fn apply(self, p: &mut PlayerConfig) {
        if let Some(v) = self.media_dir {
            p.media_dir = v;
        }
        if let Some(v) = self.extensions {
            p.extensions = v
                .into_iter()
                .filter(|e| !e.is_empty())
                .map(|e| {
                    if e.starts_with('.') {
                        e
                    } else {
                        format!(".{}", e)
                    }
                })
                .collect();
        }
        if let Some(v) = self.adev {
            p.adev = v;
        }
        if let Some(v) = self.player_bin {
            p.player_bin = Some(v);
        }
    }
}
