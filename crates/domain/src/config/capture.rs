use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CaptureConfig {
    /// Path of the pcap/pcapng file to read. Usually supplied on the
    /// command line; a value here serves as the default.
    #[serde(default)]
    pub input: Option<String>,
}
