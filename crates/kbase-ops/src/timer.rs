//! Rolling record of outbound call durations and outcomes.
//!
//! [`RequestTimer::time`] wraps an async call, measures wall-clock time
//! across every suspension point and appends one [`TimingRecord`] when the
//! call resolves. The history is bounded; once full, the oldest record is
//! evicted for every new one.

use std::{
    collections::VecDeque,
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use futures::FutureExt;
use kbase_types::{
    config::TimerConfig,
    timing::{TimingRecord, TimingStats},
};
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 100;
pub const SLOW_THRESHOLD_MS: u64 = 1000;

#[derive(Debug)]
pub struct RequestTimer {
    history: Mutex<VecDeque<TimingRecord>>,
    capacity: usize,
    slow_threshold_ms: u64,
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTimer {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, SLOW_THRESHOLD_MS)
    }

    pub fn from_config(config: &TimerConfig) -> Self {
        Self::with_limits(config.capacity, config.slow_threshold_ms)
    }

    /// A zero capacity is raised to one so the latest call is always visible.
    pub fn with_limits(capacity: usize, slow_threshold_ms: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            slow_threshold_ms,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Runs `operation` and records how long it took and whether it failed.
    ///
    /// The operation's value or error is returned untouched. A panic inside
    /// the operation is recorded as a failure and then resumed; a future
    /// dropped before completion records nothing.
    pub async fn time<T, E, F, Fut>(&self, name: impl Into<String>, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let outcome = AssertUnwindSafe(operation()).catch_unwind().await;
        self.finish(name.into(), start, matches!(outcome, Ok(Ok(_))));
        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Appends an already measured record, evicting the oldest when full.
    pub fn record(&self, record: TimingRecord) {
        let mut history = self.history();
        history.push_back(record);
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    /// Current history, oldest first.
    pub fn get_results(&self) -> Vec<TimingRecord> {
        self.history().iter().cloned().collect()
    }

    pub fn clear_results(&self) {
        self.history().clear();
    }

    pub fn get_stats(&self) -> TimingStats {
        let history = self.history();
        if history.is_empty() {
            return TimingStats::default();
        }

        let total_requests = history.len();
        let total_duration: u64 = history.iter().map(|r| r.duration).sum();
        let successes = history.iter().filter(|r| r.success).count();
        let slow_requests = history
            .iter()
            .filter(|r| r.duration > self.slow_threshold_ms)
            .cloned()
            .collect();

        TimingStats {
            total_requests,
            total_duration,
            average_duration: total_duration as f64 / total_requests as f64,
            success_rate: successes as f64 / total_requests as f64 * 100.0,
            slow_requests,
        }
    }

    fn finish(&self, name: String, start: Instant, success: bool) {
        let duration = start.elapsed().as_millis() as u64;
        debug!(
            "[api timer] {}: {}ms ({})",
            name,
            duration,
            if success { "ok" } else { "failed" }
        );
        self.record(TimingRecord {
            name,
            duration,
            success,
            timestamp: Utc::now().timestamp_millis(),
        });
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<TimingRecord>> {
        // Records are pushed whole, so a poisoned lock still guards a consistent queue.
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
