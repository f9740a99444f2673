//! Loudness derivation and high-volume debouncing.
//!
//! Everything here is pure bookkeeping driven by the sampling loop in
//! [`crate::monitor`]: a peak-to-peak tracker for one measurement, a
//! per-second window accumulator, and the bounded debounce history that
//! turns noisy windows into a single edge-triggered event.

use std::collections::VecDeque;

/// Linear rescale of a peak-to-peak amplitude from `[0, adc_max]` to the
/// 0-100 loudness unit used everywhere downstream.
pub fn loudness_unit(peak_to_peak: u16, adc_max: u16) -> f64 {
    peak_to_peak as f64 * 100.0 / adc_max as f64
}

/// Running max/min over the raw samples of one measurement window.
///
/// A sample equal to the saturation value (`adc_max`) is an ADC clipping
/// artifact and is excluded from tracking. If no valid pair of samples was
/// observed, `min` stays above `max` and the amplitude degenerates to 0.
#[derive(Debug)]
pub struct PeakTracker {
    adc_max: u16,
    max: u16,
    min: u16,
}

impl PeakTracker {
    pub fn new(adc_max: u16) -> Self {
        Self {
            adc_max,
            max: 0,
            min: adc_max,
        }
    }

    pub fn observe(&mut self, sample: u16) {
        if sample >= self.adc_max {
            return;
        }
        if sample > self.max {
            self.max = sample;
        } else if sample < self.min {
            self.min = sample;
        }
    }

    /// Peak-to-peak amplitude rescaled to a loudness unit.
    pub fn loudness(&self) -> f64 {
        if self.min > self.max {
            return 0.0;
        }
        loudness_unit(self.max - self.min, self.adc_max)
    }
}

/// Per-window summary handed to the detector once per aggregation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    pub max: f64,
    pub mean: f64,
}

/// Collects loudness values until one window (`hz` values, one second at the
/// configured rate) is complete, then yields a [`WindowSummary`] and resets.
#[derive(Debug)]
pub struct WindowAccumulator {
    window_len: usize,
    values: Vec<f64>,
}

impl WindowAccumulator {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len: window_len.max(1),
            values: Vec::with_capacity(window_len),
        }
    }

    pub fn push(&mut self, loudness: f64) -> Option<WindowSummary> {
        self.values.push(loudness);
        if self.values.len() < self.window_len {
            return None;
        }
        let max = self.values.iter().cloned().fold(0.0f64, f64::max);
        let mean = self.values.iter().sum::<f64>() / self.values.len() as f64;
        self.values.clear();
        Some(WindowSummary { max, mean })
    }
}

/// Bounded FIFO of recent window maxima with edge-triggered firing.
///
/// Capacity is one slot per elapsed aggregation second over the debounce
/// period. When the count of entries at or above the threshold reaches
/// `high_volume_max`, the whole history is cleared and `observe` reports the
/// firing; sustained loudness must newly accumulate the full count before it
/// can fire again.
#[derive(Debug)]
pub struct HighVolumeDetector {
    threshold: f64,
    fire_count: usize,
    capacity: usize,
    history: VecDeque<f64>,
    high_count: usize,
}

impl HighVolumeDetector {
    pub fn new(threshold: f64, period_secs: u32, fire_count: usize) -> Self {
        let capacity = (period_secs as usize).max(1);
        Self {
            threshold,
            fire_count: fire_count.max(1),
            capacity,
            history: VecDeque::with_capacity(capacity),
            high_count: 0,
        }
    }

    /// Folds one window maximum into the history. Returns `true` when the
    /// debounce count reached the firing threshold (history is cleared).
    pub fn observe(&mut self, window_max: f64) -> bool {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(window_max);

        self.high_count = self
            .history
            .iter()
            .filter(|&&v| v >= self.threshold)
            .count();
        if self.high_count >= self.fire_count {
            self.history.clear();
            return true;
        }
        false
    }

    /// Debounce count from the most recent `observe` call.
    pub fn high_count(&self) -> usize {
        self.high_count
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
