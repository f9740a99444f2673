// Bark Back core library
// Microphone monitoring and escalating audio-response engine

pub mod config;
pub mod escalation;
pub mod monitor;
pub mod notify;
pub mod playback;
pub mod responder;
pub mod sensor;
pub mod volume;

// Export core types
pub use config::{MonitorConfig, ResponderConfig};
pub use escalation::EscalationPolicy;
pub use monitor::{HighVolumeEvent, Monitor, VolumeSnapshot};
pub use notify::{LogSink, NotificationSink};
pub use playback::{AssetId, PlaybackBackend, PlaybackSession, ResponseDispatcher};
pub use responder::BarkResponder;
pub use sensor::SensorBus;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarkError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Sensor bus error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Playback error: {0}")]
    PlaybackError(String),
}

pub type Result<T> = std::result::Result<T, BarkError>;
