//! Layered frame parser: IP, transport, then DNS.
//!
//! Each stage consumes the previous stage's offset into the captured
//! buffer. Any stage may reject the frame with a classified [`DropReason`];
//! there is no retry and no partial acceptance. The buffer is only borrowed
//! for the duration of the call and never read past its captured length.

mod dns;
mod ip;
mod transport;

use harvester_domain::{DropReason, FrameMeta, Packet, PACKET_MAX_LEN, PACKET_MIN_LEN};

/// Decode one captured frame, starting at the IP header, into an owned
/// [`Packet`]. On success the packet carries its DNS copy and correlation
/// key; on failure the classified reason is returned and nothing is kept.
pub fn parse_frame(meta: FrameMeta, data: &[u8]) -> Result<Packet, DropReason> {
    if (meta.wire_len as usize) < PACKET_MIN_LEN || data.len() < PACKET_MIN_LEN {
        return Err(DropReason::FrameTooShort);
    }
    if (meta.wire_len as usize) > PACKET_MAX_LEN || data.len() > PACKET_MAX_LEN {
        return Err(DropReason::FrameTooLong);
    }

    let mut offset = 0usize;
    let net = ip::parse(data, &mut offset)?;
    let tp = transport::parse(data, &mut offset, net.proto, &meta)?;
    let dns = dns::parse(data, &mut offset, tp.dns_wire_len)?;

    Ok(Packet::new(
        meta,
        net.src,
        net.dst,
        net.proto,
        tp.src_port,
        tp.dst_port,
        dns,
    ))
}
