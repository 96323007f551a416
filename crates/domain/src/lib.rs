//! DNS Harvester Domain Layer
pub mod config;
pub mod drop_reason;
pub mod key;
pub mod packet;

pub use config::{CliOverrides, Config, ConfigError};
pub use drop_reason::DropReason;
pub use key::CorrelationKey;
pub use packet::{
    format_us_time, now_us, packets_match, DnsInfo, FrameMeta, Packet, Transport, UsTime,
    DNS_HEADER_MIN_LEN, PACKET_MAX_LEN, PACKET_MIN_LEN, QNAME_MAX_LEN,
};
