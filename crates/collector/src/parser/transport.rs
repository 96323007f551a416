//! Transport-layer stage: UDP/TCP header decoding.

use harvester_domain::{DropReason, FrameMeta, Transport, DNS_HEADER_MIN_LEN};

const UDP_HEADER_LEN: usize = 8;
const TCP_HEADER_MIN_LEN: usize = 20;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TransportHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Claimed length of the DNS message that follows.
    pub dns_wire_len: u32,
}

/// Extract the ports and advance `offset` to the DNS payload. For TCP the
/// 2-byte DNS message length prefix is consumed here.
pub(crate) fn parse(
    data: &[u8],
    offset: &mut usize,
    proto: Transport,
    meta: &FrameMeta,
) -> Result<TransportHeader, DropReason> {
    match proto {
        Transport::Udp => parse_udp(data, offset, meta),
        Transport::Tcp => parse_tcp(data, offset, meta),
    }
}

fn parse_udp(
    data: &[u8],
    offset: &mut usize,
    meta: &FrameMeta,
) -> Result<TransportHeader, DropReason> {
    let start = *offset;
    let hdr = data
        .get(start..start + UDP_HEADER_LEN)
        .ok_or(DropReason::MalformedTransport)?;

    let src_port = u16::from_be_bytes([hdr[0], hdr[1]]);
    let dst_port = u16::from_be_bytes([hdr[2], hdr[3]]);
    let udp_len = usize::from(u16::from_be_bytes([hdr[4], hdr[5]]));
    if udp_len < UDP_HEADER_LEN + DNS_HEADER_MIN_LEN {
        return Err(DropReason::MalformedTransport);
    }

    // Claimed DNS length: the UDP length field, cross-checked against what
    // the frame itself claims to carry past this header.
    let claimed = (meta.wire_len as usize).saturating_sub(start + UDP_HEADER_LEN);
    let dns_wire_len = (udp_len - UDP_HEADER_LEN).min(claimed);
    if dns_wire_len < DNS_HEADER_MIN_LEN {
        return Err(DropReason::MalformedTransport);
    }

    *offset = start + UDP_HEADER_LEN;
    Ok(TransportHeader {
        src_port,
        dst_port,
        dns_wire_len: dns_wire_len as u32,
    })
}

fn parse_tcp(
    data: &[u8],
    offset: &mut usize,
    meta: &FrameMeta,
) -> Result<TransportHeader, DropReason> {
    let start = *offset;
    let hdr = data
        .get(start..start + TCP_HEADER_MIN_LEN)
        .ok_or(DropReason::MalformedTransport)?;

    let src_port = u16::from_be_bytes([hdr[0], hdr[1]]);
    let dst_port = u16::from_be_bytes([hdr[2], hdr[3]]);

    let data_offset = usize::from(hdr[12] >> 4) * 4;
    if data_offset < TCP_HEADER_MIN_LEN {
        return Err(DropReason::MalformedTransport);
    }

    // The DNS message length prefix must be fully captured.
    let prefix_at = start + data_offset;
    let prefix = data
        .get(prefix_at..prefix_at + 2)
        .ok_or(DropReason::MalformedTransport)?;
    let msg_len = usize::from(u16::from_be_bytes([prefix[0], prefix[1]]));
    if msg_len < DNS_HEADER_MIN_LEN {
        return Err(DropReason::MalformedTransport);
    }

    // The prefix may not claim more than the frame claims to carry.
    let claimed = (meta.wire_len as usize).saturating_sub(prefix_at + 2);
    if msg_len > claimed {
        return Err(DropReason::MalformedTransport);
    }

    *offset = prefix_at + 2;
    Ok(TransportHeader {
        src_port,
        dst_port,
        dns_wire_len: msg_len as u32,
    })
}
