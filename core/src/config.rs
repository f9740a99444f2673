//! Configuration for the monitoring loop and the response side.
//!
//! Defaults match the shipped hardware setup (10-bit MCP3002 ADC, 10 Hz
//! polling, 50 ms peak-to-peak measurement) and may be overridden through
//! `BARK_*` environment variables. Validation runs once, at construction of
//! the component that consumes the struct; nothing is re-checked at runtime.

use crate::{BarkError, Result};
use serde::{Deserialize, Serialize};

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Sampling / detection configuration consumed by [`crate::Monitor`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Polling rate of the sampling loop, in measurements per second.
    pub hz: u32,
    /// Time in seconds spent reading the ADC for one peak-to-peak measurement.
    /// Must be strictly less than `1/hz`.
    pub sample_time: f64,
    /// Loudness (0-100) at or above which a window counts as "high".
    pub high_volume_threshold: f64,
    /// Seconds of window history kept for debounce counting.
    pub high_volume_period: u32,
    /// Number of high windows within the period that triggers an event.
    pub high_volume_max: usize,
    /// Maximum representable ADC reading; also the saturation value that is
    /// discarded as a clipping artifact.
    pub adc_max: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hz: env_parse("BARK_HZ").unwrap_or(10),
            sample_time: env_parse("BARK_SAMPLE_TIME").unwrap_or(0.05),
            high_volume_threshold: env_parse("BARK_HIGH_VOLUME").unwrap_or(50.0),
            high_volume_period: env_parse("BARK_HIGH_VOLUME_PERIOD").unwrap_or(5),
            high_volume_max: env_parse("BARK_HIGH_VOLUME_MAX").unwrap_or(4),
            adc_max: env_parse("BARK_ADC_MAX").unwrap_or(1023),
        }
    }
}

impl MonitorConfig {
    /// Duration of one sampling-loop iteration (`1/hz`).
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.hz as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hz == 0 {
            return Err(BarkError::ConfigError("hz must be at least 1".into()));
        }
        if self.sample_time <= 0.0 {
            return Err(BarkError::ConfigError(format!(
                "sample_time must be positive, got {}",
                self.sample_time
            )));
        }
        if self.sample_time >= 1.0 / self.hz as f64 {
            return Err(BarkError::ConfigError(format!(
                "sample_time {}s does not fit into a 1/{}s polling slot",
                self.sample_time, self.hz
            )));
        }
        if !(0.0..=100.0).contains(&self.high_volume_threshold) {
            return Err(BarkError::ConfigError(format!(
                "high_volume_threshold must be within 0-100, got {}",
                self.high_volume_threshold
            )));
        }
        if self.high_volume_period == 0 {
            return Err(BarkError::ConfigError(
                "high_volume_period must be at least 1 second".into(),
            ));
        }
        if self.high_volume_max == 0 {
            return Err(BarkError::ConfigError(
                "high_volume_max must be at least 1".into(),
            ));
        }
        if self.adc_max == 0 {
            return Err(BarkError::ConfigError("adc_max must be nonzero".into()));
        }
        Ok(())
    }
}

/// Escalation / notification configuration consumed by [`crate::BarkResponder`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// Ordered response volumes, quietest first. Index 0 is the base tier;
    /// anything past the last tier clamps to it.
    pub volumes: Vec<i32>,
    /// Seconds within which repeated events raise the response tier.
    pub escalation_period: u64,
    /// Notification topic for per-second volume statistics.
    pub topic_volume: String,
    /// Notification topic for playback start/finish markers.
    pub topic_playing: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        let volumes = std::env::var("BARK_VOLS")
            .ok()
            .map(|v| {
                v.split(',')
                    .filter_map(|x| x.trim().parse::<i32>().ok())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec![0, 1000, 2000, 3000]);
        Self {
            volumes,
            escalation_period: env_parse("BARK_VOL_PERIOD").unwrap_or(300),
            topic_volume: std::env::var("BARK_TOPIC_VOLUME").unwrap_or_else(|_| "Volume".into()),
            topic_playing: std::env::var("BARK_TOPIC_PLAYING").unwrap_or_else(|_| "Playing".into()),
        }
    }
}

impl ResponderConfig {
    /// Loudest configured volume, used by the dispatcher as the clamp ceiling.
    pub fn max_volume(&self) -> i32 {
        *self.volumes.last().unwrap_or(&0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.volumes.is_empty() {
            return Err(BarkError::ConfigError(
                "at least one response volume is required".into(),
            ));
        }
        if self.volumes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BarkError::ConfigError(format!(
                "response volumes must be strictly increasing, got {:?}",
                self.volumes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_monitor_config_is_valid() {
        let cfg = MonitorConfig {
            hz: 10,
            sample_time: 0.05,
            high_volume_threshold: 50.0,
            high_volume_period: 5,
            high_volume_max: 4,
            adc_max: 1023,
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.period(), std::time::Duration::from_millis(100));
    }

    #[test]
    fn test_sample_time_must_fit_polling_slot() {
        let cfg = MonitorConfig {
            hz: 10,
            sample_time: 0.1,
            ..sane_monitor()
        };
        assert!(matches!(cfg.validate(), Err(BarkError::ConfigError(_))));

        let cfg = MonitorConfig {
            hz: 10,
            sample_time: 0.2,
            ..sane_monitor()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_rates() {
        assert!(MonitorConfig { hz: 0, ..sane_monitor() }.validate().is_err());
        assert!(MonitorConfig {
            high_volume_max: 0,
            ..sane_monitor()
        }
        .validate()
        .is_err());
        assert!(MonitorConfig {
            high_volume_period: 0,
            ..sane_monitor()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_responder_volumes_strictly_increasing() {
        let cfg = ResponderConfig {
            volumes: vec![0, 1000, 1000],
            ..sane_responder()
        };
        assert!(cfg.validate().is_err());

        let cfg = ResponderConfig {
            volumes: vec![],
            ..sane_responder()
        };
        assert!(cfg.validate().is_err());

        let cfg = sane_responder();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_volume(), 3000);
    }

    fn sane_monitor() -> MonitorConfig {
        MonitorConfig {
            hz: 10,
            sample_time: 0.05,
            high_volume_threshold: 50.0,
            high_volume_period: 5,
            high_volume_max: 4,
            adc_max: 1023,
        }
    }

    fn sane_responder() -> ResponderConfig {
        ResponderConfig {
            volumes: vec![0, 1000, 2000, 3000],
            escalation_period: 300,
            topic_volume: "Volume".into(),
            topic_playing: "Playing".into(),
        }
    }
}
