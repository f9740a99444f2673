//! Microphone monitor: the sampling loop.
//!
//! A dedicated producer thread owns the sensor bus exclusively, measures
//! peak-to-peak loudness at a fixed cadence, folds measurements into
//! one-second window summaries, and pushes high-volume events into a tokio
//! mpsc channel consumed on the async side. A slow or blocked consumer never
//! stalls the loop: the channel send is non-blocking and a full queue only
//! costs a log line.

use crate::config::MonitorConfig;
use crate::sensor::SensorBus;
use crate::volume::{HighVolumeDetector, PeakTracker, WindowAccumulator};
use crate::{BarkError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A confirmed sustained-high-volume episode.
#[derive(Debug, Clone, Copy)]
pub struct HighVolumeEvent {
    /// When the debounce count crossed the firing threshold.
    pub at: Instant,
    /// Maximum of the window that completed the count.
    pub peak: f64,
}

/// Point-in-time view of the monitor's rolling statistics, refreshed once
/// per aggregation window.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeSnapshot {
    /// Mean loudness over the last completed window.
    pub volume_avg: f64,
    /// Maximum loudness over the last completed window.
    pub volume_max: f64,
    /// Debounce count after the last completed window.
    pub high_count: usize,
}

struct Shared {
    snapshot: Mutex<VolumeSnapshot>,
    last_error: Mutex<Option<BarkError>>,
    stop: AtomicBool,
}

/// Handle to the background sampling thread.
pub struct Monitor {
    shared: Arc<Shared>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Monitor {
    /// Validates the configuration and spawns the sampling thread. The bus
    /// handle moves into the thread and is released only on [`close`].
    ///
    /// [`close`]: Monitor::close
    pub fn spawn(
        config: MonitorConfig,
        bus: Box<dyn SensorBus>,
        events: mpsc::Sender<HighVolumeEvent>,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            snapshot: Mutex::new(VolumeSnapshot::default()),
            last_error: Mutex::new(None),
            stop: AtomicBool::new(false),
        });

        let loop_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("bark-monitor".into())
            .spawn(move || {
                if let Err(e) = run_sampling_loop(config, bus, events, &loop_shared) {
                    error!(target: "monitor", error = %e, "sampling loop stopped");
                    if let Ok(mut slot) = loop_shared.last_error.lock() {
                        *slot = Some(e);
                    }
                }
            })
            .map_err(BarkError::IoError)?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Statistics from the most recently completed aggregation window.
    pub fn snapshot(&self) -> VolumeSnapshot {
        self.shared
            .snapshot
            .lock()
            .map(|s| *s)
            .unwrap_or_default()
    }

    /// Whether the sampling thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Requests a cooperative stop, joins the sampling thread, and surfaces
    /// any fatal bus error the loop recorded. The sensor bus handle is
    /// dropped before this returns; no in-flight read outlives the call.
    pub fn close(mut self) -> Result<()> {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(BarkError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "sampling thread panicked",
                )));
            }
        }
        // A poisoned slot still holds the recorded error; recover it rather
        // than losing a fatal bus failure behind an unrelated panic
        let mut slot = self
            .shared
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// One peak-to-peak measurement: read the bus for `sample_time`, tracking
/// max/min of the valid (non-saturated) samples.
fn measure_window(
    bus: &mut dyn SensorBus,
    sample_time: Duration,
    adc_max: u16,
) -> Result<f64> {
    let mut tracker = PeakTracker::new(adc_max);
    let start = Instant::now();
    while start.elapsed() < sample_time {
        tracker.observe(bus.read()?);
    }
    Ok(tracker.loudness())
}

fn run_sampling_loop(
    config: MonitorConfig,
    mut bus: Box<dyn SensorBus>,
    events: mpsc::Sender<HighVolumeEvent>,
    shared: &Shared,
) -> Result<()> {
    let period = config.period();
    let sample_time = Duration::from_secs_f64(config.sample_time);
    let mut accumulator = WindowAccumulator::new(config.hz as usize);
    let mut detector = HighVolumeDetector::new(
        config.high_volume_threshold,
        config.high_volume_period,
        config.high_volume_max,
    );

    info!(
        target: "monitor",
        hz = config.hz,
        sample_time_s = config.sample_time,
        threshold = config.high_volume_threshold,
        "monitor started"
    );

    while !shared.stop.load(Ordering::Relaxed) {
        let iteration_start = Instant::now();
        let loudness = measure_window(bus.as_mut(), sample_time, config.adc_max)?;

        if let Some(summary) = accumulator.push(loudness) {
            let fired = detector.observe(summary.max);
            if let Ok(mut snap) = shared.snapshot.lock() {
                *snap = VolumeSnapshot {
                    volume_avg: summary.mean,
                    volume_max: summary.max,
                    high_count: detector.high_count(),
                };
            }
            debug!(
                target: "monitor",
                volume_avg = summary.mean,
                volume_max = summary.max,
                high_count = detector.high_count(),
                "window complete"
            );
            if fired {
                let event = HighVolumeEvent {
                    at: Instant::now(),
                    peak: summary.max,
                };
                match events.try_send(event) {
                    Ok(()) => info!(target: "monitor", peak = event.peak, "high volume detected"),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(target: "monitor", "event queue full; dropping high-volume event")
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!(target: "monitor", "event consumer gone; dropping high-volume event")
                    }
                }
            }
        }

        // Sleep out the rest of the 1/hz slot; drift beyond the slot is
        // tolerated, not corrected.
        let elapsed = iteration_start.elapsed();
        if elapsed < period {
            std::thread::sleep(period - elapsed);
        }
    }

    info!(target: "monitor", "monitor stopped");
    Ok(())
}
