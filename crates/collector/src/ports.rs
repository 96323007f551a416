//! Boundary traits toward the capture source and the drop/stats sink.

use harvester_domain::{DropReason, FrameMeta};

use crate::errors::CaptureError;

/// Pull-based frame supplier. The buffer is borrowed per call, starts at
/// the IP header, and is never longer than the captured length; it is only
/// valid until the next call.
pub trait PacketSource {
    fn next_frame(&mut self) -> Result<Option<(FrameMeta, &[u8])>, CaptureError>;
}

/// Observer for rejected frames. Implementations decide whether to persist
/// the raw bytes for diagnostics; any dump quota lives behind this
/// boundary, not in the collector.
pub trait DropSink: Send {
    fn frame_dropped(&mut self, reason: DropReason, meta: &FrameMeta, data: &[u8]);
}

/// Discards every drop event. The collector's counters still see them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDropSink;

impl DropSink for NullDropSink {
    fn frame_dropped(&mut self, _reason: DropReason, _meta: &FrameMeta, _data: &[u8]) {}
}
