use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorConfig {
    /// Length of one timeframe window in milliseconds.
    #[serde(default = "default_timeframe_len_ms")]
    pub timeframe_len_ms: u64,

    /// Initial capacity of the pending-request index of each timeframe.
    /// Must be a power of two.
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,

    /// Bounded depth of each consumer queue, in timeframes.
    #[serde(default = "default_output_queue_depth")]
    pub output_queue_depth: usize,
}

impl CollectorConfig {
    /// Window length in capture-time microseconds.
    pub fn timeframe_len_us(&self) -> i64 {
        self.timeframe_len_ms as i64 * 1_000
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            timeframe_len_ms: default_timeframe_len_ms(),
            pending_capacity: default_pending_capacity(),
            output_queue_depth: default_output_queue_depth(),
        }
    }
}

fn default_timeframe_len_ms() -> u64 {
    1_000
}

fn default_pending_capacity() -> usize {
    1_024
}

fn default_output_queue_depth() -> usize {
    8
}
