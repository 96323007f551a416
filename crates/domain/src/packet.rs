use std::fmt;
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::key::CorrelationKey;

/// Smallest possible DNS message: the fixed header alone.
pub const DNS_HEADER_MIN_LEN: usize = 12;

/// Smallest acceptable frame: minimal IPv4 + transport + DNS headers.
pub const PACKET_MIN_LEN: usize = 20 + 8 + DNS_HEADER_MIN_LEN;

/// Hard upper limit on a single frame.
pub const PACKET_MAX_LEN: usize = 32_000;

/// Maximum QNAME length on the wire (RFC 1035).
pub const QNAME_MAX_LEN: usize = 255;

/// Microseconds since the Unix epoch.
pub type UsTime = i64;

/// Current wall-clock time as [`UsTime`].
pub fn now_us() -> UsTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Render a [`UsTime`] as UTC `YYYY-mm-dd HH:MM:SS.ffffff` for log output.
pub fn format_us_time(ts: UsTime) -> String {
    chrono::DateTime::from_timestamp_micros(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Transport protocols the collector accepts. Everything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    /// Map an IP upper-layer protocol number, `None` for unaccepted protocols.
    pub fn from_ip_proto(proto: u8) -> Option<Self> {
        match proto {
            6 => Some(Transport::Tcp),
            17 => Some(Transport::Udp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture metadata for one frame, as reported by the capture source.
///
/// `cap_len` may be smaller than `wire_len` for truncated captures; the
/// parser never reads past `cap_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Capture timestamp.
    pub ts_us: UsTime,
    /// Claimed total length on the wire.
    pub wire_len: u32,
    /// Captured data length.
    pub cap_len: u32,
}

impl FrameMeta {
    pub fn is_truncated(&self) -> bool {
        self.cap_len < self.wire_len
    }
}

/// Decoded DNS layer of a packet.
///
/// Holds an owned, wire-order copy of the DNS message. Only constructed by
/// the parser after the DNS stage succeeded, so every accessor is always
/// meaningful: there is no half-parsed state to guard against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsInfo {
    /// Owned copy of the DNS message, network byte order, possibly truncated.
    message: Vec<u8>,
    /// Claimed total length of the original DNS message.
    wire_len: u32,
    /// Length of the raw QNAME including the terminating zero label.
    qname_raw_len: usize,
    /// Dot-separated ASCII rendering of the QNAME.
    qname: String,
    /// Query type, host byte order.
    qtype: u16,
    /// Query class, host byte order.
    qclass: u16,
}

impl DnsInfo {
    /// Invariants: `message` holds at least the fixed header, and the raw
    /// QNAME plus the 4-byte type/class tail fit inside it.
    pub fn new(
        message: Vec<u8>,
        wire_len: u32,
        qname_raw_len: usize,
        qname: String,
        qtype: u16,
        qclass: u16,
    ) -> Self {
        debug_assert!(message.len() >= DNS_HEADER_MIN_LEN);
        debug_assert!(message.len() >= DNS_HEADER_MIN_LEN + qname_raw_len + 4);
        Self {
            message,
            wire_len,
            qname_raw_len,
            qname,
            qtype,
            qclass,
        }
    }

    /// Transaction ID, host byte order.
    pub fn id(&self) -> u16 {
        u16::from_be_bytes([self.message[0], self.message[1]])
    }

    /// QR flag: `true` for responses.
    pub fn is_response(&self) -> bool {
        self.message[2] & 0x80 != 0
    }

    /// Raw wire-format QNAME (length-prefixed labels, terminator included).
    pub fn qname_raw(&self) -> &[u8] {
        &self.message[DNS_HEADER_MIN_LEN..DNS_HEADER_MIN_LEN + self.qname_raw_len]
    }

    /// Dotted ASCII QNAME.
    pub fn qname(&self) -> &str {
        &self.qname
    }

    /// Query type, host byte order.
    pub fn qtype(&self) -> u16 {
        self.qtype
    }

    /// Query class, host byte order.
    pub fn qclass(&self) -> u16 {
        self.qclass
    }

    /// Claimed total length of the DNS message.
    pub fn wire_len(&self) -> u32 {
        self.wire_len
    }

    /// Captured length of the DNS message (length of the owned copy).
    pub fn cap_len(&self) -> u32 {
        self.message.len() as u32
    }

    /// The whole captured message in wire order.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Offset of the first resource record past the question section,
    /// relative to the start of the message.
    pub fn records_offset(&self) -> usize {
        DNS_HEADER_MIN_LEN + self.qname_raw_len + 4
    }
}

/// One captured, fully decoded frame.
///
/// A `Packet` only exists after the whole parse pipeline succeeded: the DNS
/// layer and the correlation key are always present and owned. The raw
/// capture buffer is borrowed by the parser for the duration of the decode
/// call and never retained here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    ts_us: UsTime,
    wire_len: u32,
    cap_len: u32,
    src_addr: IpAddr,
    dst_addr: IpAddr,
    transport: Transport,
    src_port: u16,
    dst_port: u16,
    dns: DnsInfo,
    key: CorrelationKey,
}

impl Packet {
    /// Assemble a packet from decoded layers. Builds the correlation key
    /// from the client side of the exchange (source for a request,
    /// destination for a response), so a request and its response yield
    /// byte-identical keys.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meta: FrameMeta,
        src_addr: IpAddr,
        dst_addr: IpAddr,
        transport: Transport,
        src_port: u16,
        dst_port: u16,
        dns: DnsInfo,
    ) -> Self {
        let (client_addr, client_port) = if dns.is_response() {
            (dst_addr, dst_port)
        } else {
            (src_addr, src_port)
        };
        let key = CorrelationKey::build(&client_addr, client_port, dns.id(), dns.qname_raw());
        Self {
            ts_us: meta.ts_us,
            wire_len: meta.wire_len,
            cap_len: meta.cap_len,
            src_addr,
            dst_addr,
            transport,
            src_port,
            dst_port,
            dns,
            key,
        }
    }

    /// Capture timestamp in microseconds since the epoch.
    pub fn time_us(&self) -> UsTime {
        self.ts_us
    }

    pub fn wire_len(&self) -> u32 {
        self.wire_len
    }

    pub fn cap_len(&self) -> u32 {
        self.cap_len
    }

    pub fn src_addr(&self) -> IpAddr {
        self.src_addr
    }

    pub fn dst_addr(&self) -> IpAddr {
        self.dst_addr
    }

    /// 4 or 6, from the address family.
    pub fn ip_ver(&self) -> u8 {
        match self.src_addr {
            IpAddr::V4(_) => 4,
            IpAddr::V6(_) => 6,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn dns(&self) -> &DnsInfo {
        &self.dns
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// The querying client's address: source for a request, destination
    /// for a response.
    pub fn client_addr(&self) -> IpAddr {
        if self.dns.is_response() {
            self.dst_addr
        } else {
            self.src_addr
        }
    }

    /// The querying client's port, same side selection as [`client_addr`].
    ///
    /// [`client_addr`]: Packet::client_addr
    pub fn client_port(&self) -> u16 {
        if self.dns.is_response() {
            self.dst_port
        } else {
            self.src_port
        }
    }
}

/// Fine-grained request/response match, applied after the coarse key lookup
/// to guard against aliased keys on truncated or adversarial input.
/// Re-verifies direction, transport, transaction ID, client endpoint and
/// QNAME field by field.
pub fn packets_match(request: &Packet, response: &Packet) -> bool {
    !request.dns().is_response()
        && response.dns().is_response()
        && request.transport() == response.transport()
        && request.dns().id() == response.dns().id()
        && request.src_addr() == response.dst_addr()
        && request.src_port() == response.dst_port()
        && request.dns().qname_raw() == response.dns().qname_raw()
}
