//! Network-layer stage: IPv4/IPv6 header decoding.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use harvester_domain::{DropReason, Transport};

const IPV4_HEADER_MIN_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;

const IPV6_EXT_HOP_BY_HOP: u8 = 0;
const IPV6_EXT_ROUTING: u8 = 43;
const IPV6_EXT_FRAGMENT: u8 = 44;
const IPV6_EXT_DEST_OPTS: u8 = 60;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NetworkHeader {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub proto: Transport,
}

/// Detect the IP version from the version nibble, extract addresses and
/// the upper-layer protocol, and advance `offset` past the IP header.
pub(crate) fn parse(data: &[u8], offset: &mut usize) -> Result<NetworkHeader, DropReason> {
    let first = *data.get(*offset).ok_or(DropReason::MalformedIp)?;
    match first >> 4 {
        4 => parse_v4(data, offset),
        6 => parse_v6(data, offset),
        _ => Err(DropReason::MalformedIp),
    }
}

fn parse_v4(data: &[u8], offset: &mut usize) -> Result<NetworkHeader, DropReason> {
    let start = *offset;
    let hdr = data
        .get(start..start + IPV4_HEADER_MIN_LEN)
        .ok_or(DropReason::MalformedIp)?;

    let ihl = usize::from(hdr[0] & 0x0f) * 4;
    if ihl < IPV4_HEADER_MIN_LEN || data.len() < start + ihl {
        return Err(DropReason::MalformedIp);
    }

    // A non-first fragment cannot carry the DNS header.
    let frag_offset = u16::from_be_bytes([hdr[6], hdr[7]]) & 0x1fff;
    if frag_offset != 0 {
        return Err(DropReason::MalformedIp);
    }

    let proto = Transport::from_ip_proto(hdr[9]).ok_or(DropReason::UnsupportedTransport)?;
    let src = IpAddr::V4(Ipv4Addr::new(hdr[12], hdr[13], hdr[14], hdr[15]));
    let dst = IpAddr::V4(Ipv4Addr::new(hdr[16], hdr[17], hdr[18], hdr[19]));

    *offset = start + ihl;
    Ok(NetworkHeader { src, dst, proto })
}

fn parse_v6(data: &[u8], offset: &mut usize) -> Result<NetworkHeader, DropReason> {
    let start = *offset;
    let hdr = data
        .get(start..start + IPV6_HEADER_LEN)
        .ok_or(DropReason::MalformedIp)?;

    let mut src = [0u8; 16];
    src.copy_from_slice(&hdr[8..24]);
    let mut dst = [0u8; 16];
    dst.copy_from_slice(&hdr[24..40]);

    let mut next = hdr[6];
    let mut cursor = start + IPV6_HEADER_LEN;

    // Walk the extension chain to the upper-layer protocol. The cursor
    // advances by at least 8 bytes per header, so this terminates.
    loop {
        match next {
            IPV6_EXT_HOP_BY_HOP | IPV6_EXT_ROUTING | IPV6_EXT_DEST_OPTS => {
                let ext = data
                    .get(cursor..cursor + 2)
                    .ok_or(DropReason::MalformedIp)?;
                next = ext[0];
                cursor += (usize::from(ext[1]) + 1) * 8;
            }
            IPV6_EXT_FRAGMENT => {
                let ext = data
                    .get(cursor..cursor + 8)
                    .ok_or(DropReason::MalformedIp)?;
                let frag_offset = u16::from_be_bytes([ext[2], ext[3]]) >> 3;
                if frag_offset != 0 {
                    return Err(DropReason::MalformedIp);
                }
                next = ext[0];
                cursor += 8;
            }
            _ => break,
        }
        if cursor > data.len() {
            return Err(DropReason::MalformedIp);
        }
    }

    let proto = Transport::from_ip_proto(next).ok_or(DropReason::UnsupportedTransport)?;

    *offset = cursor;
    Ok(NetworkHeader {
        src: IpAddr::V6(Ipv6Addr::from(src)),
        dst: IpAddr::V6(Ipv6Addr::from(dst)),
        proto,
    })
}
