//! Capture sources feeding the collector.

mod pcap_file;

pub use pcap_file::PcapFileSource;
