use std::net::IpAddr;

use smallvec::SmallVec;

use crate::packet::QNAME_MAX_LEN;

/// Upper bound on a key: IPv6 address + port + transaction ID + longest QNAME.
pub const KEY_MAX_LEN: usize = 16 + 2 + 2 + QNAME_MAX_LEN;

/// Opaque byte key identifying a request/response pair within a timeframe:
/// `[client IP][client port][transaction ID (network order)][raw QNAME]`.
///
/// Requests and responses over the same exchange compare byte-equal, so the
/// key doubles as the hash-index key for pending-request lookup. Built once,
/// never mutated. Typical keys (IPv4, short names) stay inline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(SmallVec<[u8; 48]>);

impl CorrelationKey {
    /// `qname_raw` is the wire-format name including the terminating zero
    /// label, so distinct names can never collide by concatenation.
    pub fn build(
        client_addr: &IpAddr,
        client_port: u16,
        transaction_id: u16,
        qname_raw: &[u8],
    ) -> Self {
        let mut buf = SmallVec::new();
        match client_addr {
            IpAddr::V4(addr) => buf.extend_from_slice(&addr.octets()),
            IpAddr::V6(addr) => buf.extend_from_slice(&addr.octets()),
        }
        buf.extend_from_slice(&client_port.to_be_bytes());
        buf.extend_from_slice(&transaction_id.to_be_bytes());
        buf.extend_from_slice(qname_raw);
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
