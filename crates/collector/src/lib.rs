//! DNS Harvester Collector Layer
//!
//! Turns captured frames into validated DNS transactions and batches them
//! into time-bounded, immutably-shared timeframes.
pub mod collector;
pub mod errors;
pub mod parser;
pub mod ports;
pub mod source;
pub mod stats;
pub mod timeframe;

pub use collector::Collector;
pub use errors::{CaptureError, CollectorError};
pub use parser::parse_frame;
pub use ports::{DropSink, NullDropSink, PacketSource};
pub use source::PcapFileSource;
pub use stats::CollectorStats;
pub use timeframe::{Entry, Timeframe};
