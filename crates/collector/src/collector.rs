//! Single-producer ingestion loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use harvester_domain::config::CollectorConfig;
use harvester_domain::{format_us_time, DropReason, FrameMeta, UsTime};

use crate::errors::CollectorError;
use crate::parser::parse_frame;
use crate::ports::{DropSink, NullDropSink, PacketSource};
use crate::stats::CollectorStats;
use crate::timeframe::Timeframe;

enum InsertOutcome {
    Request,
    Matched,
    Orphan,
}

/// Parses captured frames into the active timeframe and publishes frozen
/// frames to the consumer queues. All mutation happens on the caller's
/// thread; consumers only ever see closed, immutable frames.
pub struct Collector {
    config: CollectorConfig,
    window_us: i64,
    active: Option<Timeframe>,
    outputs: Vec<mpsc::Sender<Arc<Timeframe>>>,
    drop_sink: Box<dyn DropSink>,
    stats: CollectorStats,
}

impl Collector {
    pub fn new(config: CollectorConfig, outputs: Vec<mpsc::Sender<Arc<Timeframe>>>) -> Self {
        Self::with_drop_sink(config, outputs, Box::new(NullDropSink))
    }

    pub fn with_drop_sink(
        config: CollectorConfig,
        outputs: Vec<mpsc::Sender<Arc<Timeframe>>>,
        drop_sink: Box<dyn DropSink>,
    ) -> Self {
        let window_us = config.timeframe_len_us();
        Self {
            config,
            window_us,
            active: None,
            outputs,
            drop_sink,
            stats: CollectorStats::default(),
        }
    }

    /// Drive the collector from a source until end of stream, then close
    /// the last frame and return the final counters.
    pub fn run<S: PacketSource>(mut self, source: &mut S) -> Result<CollectorStats, CollectorError> {
        while let Some((meta, data)) = source.next_frame()? {
            self.process_frame(meta, data)?;
        }
        Ok(self.finish())
    }

    /// Feed one captured frame through rotation, parsing, correlation and
    /// insertion. Rejected frames go to the drop sink; the error path here
    /// is only for timeframe allocation failure.
    pub fn process_frame(&mut self, meta: FrameMeta, data: &[u8]) -> Result<(), CollectorError> {
        self.stats.frames_seen += 1;
        self.rotate_if_due(meta.ts_us);

        let pkt = match parse_frame(meta, data) {
            Ok(pkt) => pkt,
            Err(reason) => {
                self.stats.record_drop(reason);
                self.drop_sink.frame_dropped(reason, &meta, data);
                debug!(
                    reason = reason.as_str(),
                    ts_us = meta.ts_us,
                    cap_len = meta.cap_len,
                    "frame dropped"
                );
                return Ok(());
            }
        };

        let outcome = {
            let frame = self.active_frame(meta.ts_us)?;
            if pkt.dns().is_response() {
                match frame.match_response(pkt) {
                    Ok(_request) => InsertOutcome::Matched,
                    Err(orphan) => {
                        frame.append_packet(orphan);
                        InsertOutcome::Orphan
                    }
                }
            } else {
                frame.append_packet(pkt);
                InsertOutcome::Request
            }
        };
        match outcome {
            InsertOutcome::Request => self.stats.requests += 1,
            InsertOutcome::Matched => self.stats.responses_matched += 1,
            InsertOutcome::Orphan => self.stats.responses_orphaned += 1,
        }
        Ok(())
    }

    /// Force-close and publish the active frame, then return the final
    /// counters. Dropping the collector drops the senders, which is what
    /// consumers observe as end of stream.
    pub fn finish(mut self) -> CollectorStats {
        if let Some(frame) = self.active.take() {
            let end = frame.time_start() + self.window_us;
            self.publish(frame.close(end));
        }
        for reason in DropReason::ALL {
            let count = self.stats.drops(reason);
            if count > 0 {
                info!(reason = reason.as_str(), count, "drop totals");
            }
        }
        info!(stats = %self.stats, "collection finished");
        self.stats
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    fn rotate_if_due(&mut self, ts_us: UsTime) {
        let due = match &self.active {
            Some(frame) => ts_us >= frame.time_start() + self.window_us,
            None => false,
        };
        if due {
            if let Some(frame) = self.active.take() {
                let end = frame.time_start() + self.window_us;
                self.publish(frame.close(end));
            }
        }
    }

    fn active_frame(&mut self, ts_us: UsTime) -> Result<&mut Timeframe, CollectorError> {
        if self.active.is_none() {
            // Align the window so frame boundaries are stable regardless
            // of when the first packet arrives.
            let start = align_to_window(ts_us, self.window_us);
            debug!(time_start = %format_us_time(start), "opening timeframe");
            self.active = Some(Timeframe::new(&self.config, start)?);
        }
        match self.active.as_mut() {
            Some(frame) => Ok(frame),
            None => unreachable!(),
        }
    }

    /// Hand the frozen frame to every consumer queue. A consumer whose
    /// queue is full or closed misses this frame; the handle count still
    /// reaches zero correctly once the remaining holders are done.
    fn publish(&mut self, frame: Arc<Timeframe>) {
        info!(
            time_start = %format_us_time(frame.time_start()),
            time_end = %format_us_time(frame.time_end()),
            entries = frame.len(),
            matched = frame.matched_count(),
            orphans = frame.orphan_count(),
            "timeframe closed"
        );
        self.stats.frames_published += 1;
        for (consumer, tx) in self.outputs.iter().enumerate() {
            if let Err(e) = tx.try_send(frame.clone()) {
                warn!(consumer, error = %e, "consumer queue rejected timeframe");
            }
        }
    }
}

fn align_to_window(ts_us: i64, window_us: i64) -> i64 {
    if window_us <= 0 {
        return ts_us;
    }
    ts_us - ts_us.rem_euclid(window_us)
}
