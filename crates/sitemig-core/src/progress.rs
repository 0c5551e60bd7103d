//! Phase progress logging

use crate::types::PhaseStats;
use std::time::{Duration, Instant};

/// Counts processed items and logs throughput at a bounded rate
#[derive(Debug)]
pub struct ProgressTracker {
    phase: &'static str,
    total: usize,
    processed: usize,
    started: Instant,
    last_report: Instant,
    interval: Duration,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(phase: &'static str, total: usize, interval: Duration) -> Self {
        let now = Instant::now();
        tracing::info!(phase, total, "phase started");
        Self {
            phase,
            total,
            processed: 0,
            started: now,
            last_report: now,
            interval,
        }
    }

    /// Record one finished item; logs if the interval has elapsed
    pub fn tick(&mut self) {
        self.processed += 1;
        if self.last_report.elapsed() >= self.interval {
            self.last_report = Instant::now();
            tracing::info!(
                phase = self.phase,
                processed = self.processed,
                total = self.total,
                rate = format!("{:.1}/s", self.rate()),
                "progress"
            );
        }
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed
    }

    fn rate(&self) -> f64 {
        let secs = self.started.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Log the phase summary and return its stats
    pub fn finish(self) -> PhaseStats {
        let stats = PhaseStats {
            phase: self.phase,
            processed: self.processed,
            elapsed: self.started.elapsed(),
        };
        tracing::info!(
            phase = self.phase,
            processed = stats.processed,
            elapsed_ms = stats.elapsed_ms(),
            rate = format!("{:.1}/s", stats.throughput()),
            "phase complete"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ticks() {
        let mut tracker = ProgressTracker::new("clients", 3, Duration::ZERO);
        tracker.tick();
        tracker.tick();
        assert_eq!(tracker.processed(), 2);

        let stats = tracker.finish();
        assert_eq!(stats.phase, "clients");
        assert_eq!(stats.processed, 2);
    }
}
