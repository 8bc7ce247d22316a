//! Ordered snapshot windows handed to the calculators.

use factor_pulse_data::Snapshot;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindowError {
    /// Snapshots were not strictly ascending by timestamp. Callers must
    /// re-sort descending query results before building a window.
    #[error("snapshot window is not in ascending timestamp order at index {0}")]
    NotAscending(usize),
}

/// A symbol's snapshot history in strictly ascending timestamp order.
///
/// Index `len() - 1` is "now"; the sample exactly `p` hours before it is at
/// index `len() - 1 - p`, provided the window has no gaps.
pub struct SnapshotWindow {
    snapshots: Vec<Snapshot>,
}

impl SnapshotWindow {
    /// Builds a window, rejecting out-of-order input rather than silently
    /// corrupting every rolling calculation downstream.
    ///
    /// # Errors
    /// Returns `WindowError::NotAscending` if any pair of adjacent
    /// snapshots is out of order or duplicated.
    pub fn new(snapshots: Vec<Snapshot>) -> Result<Self, WindowError> {
        for (i, pair) in snapshots.windows(2).enumerate() {
            if pair[0].timestamp >= pair[1].timestamp {
                return Err(WindowError::NotAscending(i + 1));
            }
        }
        Ok(Self { snapshots })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Absolute close prices as f64, oldest first.
    #[must_use]
    pub fn prices(&self) -> Vec<f64> {
        self.snapshots
            .iter()
            .filter_map(|s| s.price.to_f64())
            .collect()
    }

    /// Hourly volumes as f64, oldest first.
    #[must_use]
    pub fn volumes(&self) -> Vec<f64> {
        self.snapshots
            .iter()
            .filter_map(|s| s.volume_1h.to_f64())
            .collect()
    }

    /// Price series divided by the benchmark's price at the same hour.
    ///
    /// Only hours present in both windows contribute; a symbol hour with no
    /// matching benchmark hour is dropped rather than paired with a
    /// neighboring sample. Measures performance relative to the benchmark
    /// so market-wide moves cancel out.
    #[must_use]
    pub fn relative_prices(&self, benchmark: &SnapshotWindow) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.snapshots.len());
        let mut bench_iter = benchmark.snapshots.iter().peekable();

        for snap in &self.snapshots {
            while let Some(b) = bench_iter.peek() {
                if b.timestamp < snap.timestamp {
                    bench_iter.next();
                } else {
                    break;
                }
            }
            if let Some(b) = bench_iter.peek() {
                if b.timestamp == snap.timestamp {
                    if let (Some(p), Some(bp)) = (snap.price.to_f64(), b.price.to_f64()) {
                        if bp > 0.0 {
                            out.push(p / bp);
                        }
                    }
                }
            }
        }
        out
    }
}
