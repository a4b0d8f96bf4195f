use serde::{Deserialize, Serialize};

/// One instrumented call, captured when the call completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRecord {
    pub name: String,
    /// Elapsed wall-clock milliseconds.
    pub duration: u64,
    pub success: bool,
    /// Completion time in epoch milliseconds.
    pub timestamp: i64,
}

/// Summary over the current timing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimingStats {
    pub total_requests: usize,
    pub total_duration: u64,
    pub average_duration: f64,
    /// Percentage in `0.0..=100.0`.
    pub success_rate: f64,
    pub slow_requests: Vec<TimingRecord>,
}
