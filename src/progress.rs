//! Progress reporting for long-running scans and transfers.
//!
//! Progress state lives in an explicit [`ProgressTracker`] owned by the
//! pipeline for the duration of one run, so repeated runs never share
//! counters.

use serde::Serialize;

/// A single progress report: how many files have been processed out of the
/// total known up front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Files processed so far, monotonically increasing within a run
    pub processed: usize,
    /// Total files, computed once before the run and never mutated
    pub total: usize,
    /// Floor of `processed / total * 100`, clamped to 100
    pub percent: u8,
}

/// Accumulator converting raw processed-counts into [`ProgressEvent`]s
#[derive(Debug)]
pub struct ProgressTracker {
    processed: usize,
    total: usize,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    /// Create a tracker for a run over `total` files
    pub fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
            last_percent: None,
        }
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 / self.total).min(100) as u8
    }

    /// Record one processed file and return the resulting event
    pub fn advance(&mut self) -> ProgressEvent {
        self.processed += 1;
        self.event()
    }

    /// The current state as an event without advancing
    pub fn event(&self) -> ProgressEvent {
        ProgressEvent {
            processed: self.processed,
            total: self.total,
            percent: self.percent(),
        }
    }

    /// True when the integer percent moved since the last call, used to
    /// throttle log lines to one per percent step
    pub fn percent_changed(&mut self) -> bool {
        let current = self.percent();
        if self.last_percent == Some(current) {
            false
        } else {
            self.last_percent = Some(current);
            true
        }
    }
}
