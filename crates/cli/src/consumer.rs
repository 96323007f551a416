//! Built-in consumer: logs a summary line per closed timeframe.
//!
//! Real output writers hang off the same channel; this one only reads the
//! frozen frame and drops its handle when done.

use std::sync::Arc;

use harvester_collector::Timeframe;
use harvester_domain::format_us_time;
use tokio::sync::mpsc::Receiver;
use tracing::info;

/// Consume timeframes until the channel closes.
pub async fn run_summary(mut rx: Receiver<Arc<Timeframe>>) {
    while let Some(frame) = rx.recv().await {
        let entries = frame.len();
        let matched = frame.matched_count();
        let orphans = frame.orphan_count();
        info!(
            window_start = %format_us_time(frame.time_start()),
            window_end = %format_us_time(frame.time_end()),
            entries,
            matched,
            orphans,
            unmatched = entries - matched - orphans,
            "timeframe"
        );
    }
}
