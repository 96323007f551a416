use std::fmt;

use harvester_domain::DropReason;

/// Counters kept by the collector over its lifetime.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Frames handed to the parser.
    pub frames_seen: u64,
    /// Frames rejected with any reason.
    pub frames_dropped: u64,
    /// Accepted requests.
    pub requests: u64,
    /// Responses attached to a pending request.
    pub responses_matched: u64,
    /// Responses recorded without a matching request.
    pub responses_orphaned: u64,
    /// Timeframes handed to consumers.
    pub frames_published: u64,
    drops_by_reason: [u64; DropReason::COUNT],
}

impl CollectorStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        self.frames_dropped += 1;
        self.drops_by_reason[reason.index()] += 1;
    }

    pub fn drops(&self, reason: DropReason) -> u64 {
        self.drops_by_reason[reason.index()]
    }

    pub fn accepted(&self) -> u64 {
        self.frames_seen - self.frames_dropped
    }
}

impl fmt::Display for CollectorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seen={} accepted={} dropped={} requests={} matched={} orphans={} published={}",
            self.frames_seen,
            self.accepted(),
            self.frames_dropped,
            self.requests,
            self.responses_matched,
            self.responses_orphaned,
            self.frames_published
        )
    }
}
