//! Unit-local rolling-window arena
//!
//! An append-only buffer per sensor channel, indexed by row position within
//! one equipment unit's ordered series. Statistics are computed over the
//! trailing window ending at the current position — never past it — which
//! keeps the causal-only constraint explicit and testable in isolation.

use statrs::statistics::Statistics;

use crate::types::{SensorChannel, TelemetryRecord, CHANNEL_COUNT};

/// Trailing-window statistics for one channel at one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Append-only channel buffers for a single equipment unit's series.
#[derive(Debug, Clone)]
pub struct ChannelArena {
    buffers: Vec<Vec<f64>>,
}

impl ChannelArena {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            buffers: (0..CHANNEL_COUNT).map(|_| Vec::with_capacity(rows)).collect(),
        }
    }

    /// Append one record's channel values. Records must arrive in ascending
    /// timestamp order; the arena only ever grows.
    pub fn push(&mut self, record: &TelemetryRecord) {
        for ch in SensorChannel::ALL {
            self.buffers[ch.index()].push(record.channel(ch));
        }
    }

    /// Number of rows appended so far.
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at an absolute row position.
    pub fn value_at(&self, ch: SensorChannel, position: usize) -> f64 {
        self.buffers[ch.index()][position]
    }

    /// Lagged value: `lag` rows before `position`, or 0.0 before the series
    /// start (the zero-fill policy for early-life rows).
    pub fn lagged(&self, ch: SensorChannel, position: usize, lag: usize) -> f64 {
        if lag > position {
            0.0
        } else {
            self.buffers[ch.index()][position - lag]
        }
    }

    /// First difference at `position`, 0.0 at the series start.
    pub fn rate_of_change(&self, ch: SensorChannel, position: usize) -> f64 {
        if position == 0 {
            0.0
        } else {
            let buf = &self.buffers[ch.index()];
            buf[position] - buf[position - 1]
        }
    }

    /// Statistics over the trailing window of `window` rows ending at
    /// `position` (inclusive). Early positions use however many rows exist:
    /// the effective window is `min(position + 1, window)`.
    pub fn window_stats(&self, ch: SensorChannel, position: usize, window: usize) -> WindowStats {
        let buf = &self.buffers[ch.index()];
        let start = (position + 1).saturating_sub(window);
        let slice = &buf[start..=position];

        // Sample standard deviation; a single-row window has no spread
        let std = if slice.len() < 2 {
            0.0
        } else {
            slice.iter().std_dev()
        };

        WindowStats {
            mean: slice.iter().mean(),
            std,
            min: slice.iter().copied().fold(f64::INFINITY, f64::min),
            max: slice.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}
