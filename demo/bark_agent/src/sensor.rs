//! Simulated microphone for running the demo without ADC hardware.
//!
//! Produces quiet jitter around the mid-rail with a loud sine burst every
//! few seconds, enough to march the debounce history across its threshold
//! and exercise the full response path.

use barkback_core::{Result, SensorBus};
use std::time::Instant;

pub struct SimulatedMic {
    started: Instant,
    /// Seconds of quiet between loud bursts.
    quiet_secs: u64,
    /// Seconds each loud burst lasts.
    burst_secs: u64,
    phase: f64,
}

impl SimulatedMic {
    pub fn new(quiet_secs: u64, burst_secs: u64) -> Self {
        Self {
            started: Instant::now(),
            quiet_secs: quiet_secs.max(1),
            burst_secs: burst_secs.max(1),
            phase: 0.0,
        }
    }

    fn in_burst(&self) -> bool {
        let cycle = self.quiet_secs + self.burst_secs;
        (self.started.elapsed().as_secs() % cycle) >= self.quiet_secs
    }
}

impl SensorBus for SimulatedMic {
    fn read(&mut self) -> Result<u16> {
        self.phase += 0.25;
        let wave = self.phase.sin();
        let sample = if self.in_burst() {
            // Loud 200 Hz-ish tone swinging across most of the 10-bit range
            512.0 + wave * 400.0
        } else {
            // Near-silent ambient jitter
            512.0 + wave * 12.0
        };
        Ok(sample.clamp(0.0, 1022.0) as u16)
    }
}
