//! Time-bounded batch of correlated DNS transactions.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use harvester_domain::config::CollectorConfig;
use harvester_domain::{now_us, packets_match, CorrelationKey, Packet, UsTime};

use crate::errors::CollectorError;

/// One slot in a timeframe's arrival sequence: a request (optionally with
/// its matched response) or an orphan response.
#[derive(Debug)]
pub struct Entry {
    packet: Packet,
    response: Option<Packet>,
}

impl Entry {
    /// The packet that created the slot: a request, or an orphan response.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// The matched response, for request entries that found one.
    pub fn response(&self) -> Option<&Packet> {
        self.response.as_ref()
    }

    pub fn is_matched(&self) -> bool {
        self.response.is_some()
    }

    pub fn is_orphan_response(&self) -> bool {
        self.packet.dns().is_response()
    }
}

/// A bounded window of capture time holding DNS transactions in arrival
/// order, with a side index of pending (unmatched) requests keyed by
/// correlation key.
///
/// Exactly one owner mutates a timeframe while it is being filled.
/// [`close`] is the freeze point: it consumes the builder and returns a
/// shared read-only handle. Consumers clone and drop the handle; the frame
/// and every packet it owns are torn down exactly once, when the last
/// handle drops.
///
/// [`close`]: Timeframe::close
#[derive(Debug)]
pub struct Timeframe {
    time_start: UsTime,
    time_end: UsTime,
    entries: Vec<Entry>,
    pending: FxHashMap<CorrelationKey, usize>,
}

impl Timeframe {
    /// Allocate an empty frame. `time_start` of zero means "now".
    /// Allocation failure surfaces as an error instead of aborting.
    pub fn new(config: &CollectorConfig, time_start: UsTime) -> Result<Self, CollectorError> {
        let mut pending: FxHashMap<CorrelationKey, usize> = FxHashMap::default();
        pending.try_reserve(config.pending_capacity)?;
        let mut entries: Vec<Entry> = Vec::new();
        entries.try_reserve(config.pending_capacity)?;

        let time_start = if time_start == 0 { now_us() } else { time_start };
        Ok(Self {
            time_start,
            time_end: 0,
            entries,
            pending,
        })
    }

    /// Append `pkt` to the arrival sequence, taking ownership. Requests
    /// are also filed in the pending index so a later response can match;
    /// responses are recorded as orphans. On byte-identical retransmitted
    /// requests the latest one becomes the match candidate.
    pub fn append_packet(&mut self, pkt: Packet) {
        let idx = self.entries.len();
        if !pkt.dns().is_response() {
            self.pending.insert(pkt.key().clone(), idx);
        }
        self.entries.push(Entry {
            packet: pkt,
            response: None,
        });
    }

    /// Try to match `pkt` against a pending request. On a hit the response
    /// is attached to the request, the request leaves the pending index,
    /// and the updated entry is returned for information. On a miss `pkt`
    /// is handed back so the caller can record it as an orphan.
    pub fn match_response(&mut self, pkt: Packet) -> Result<&Entry, Packet> {
        let Some(&idx) = self.pending.get(pkt.key()) else {
            return Err(pkt);
        };
        // The key lookup is coarse; re-verify field by field in case a
        // truncated or hostile key aliased another exchange.
        if !packets_match(&self.entries[idx].packet, &pkt) {
            return Err(pkt);
        }
        self.pending.remove(pkt.key());
        self.entries[idx].response = Some(pkt);
        Ok(&self.entries[idx])
    }

    /// Freeze the frame: stamp the end bound, drop the builder-only
    /// pending index, and return the shared read-only handle. Unmatched
    /// requests stay in the sequence as request-only entries. `time_end`
    /// of zero means "now".
    pub fn close(mut self, time_end: UsTime) -> Arc<Timeframe> {
        self.time_end = if time_end == 0 { now_us() } else { time_end };
        self.pending = FxHashMap::default();
        Arc::new(self)
    }

    pub fn time_start(&self) -> UsTime {
        self.time_start
    }

    /// End bound; meaningful once the frame is closed.
    pub fn time_end(&self) -> UsTime {
        self.time_end
    }

    /// Number of entries (a matched pair counts as one).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Requests still waiting for a response.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn matched_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_matched()).count()
    }

    pub fn orphan_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_orphan_response()).count()
    }
}
