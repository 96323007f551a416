//! Wire-format frame builders shared by the collector tests.
#![allow(dead_code)]

use harvester_domain::FrameMeta;

pub fn qname_wire(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// Single-question DNS message, qtype A, qclass IN.
pub fn dns_message(id: u16, response: bool, qname: &str) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&id.to_be_bytes());
    let flags: u16 = if response { 0x8180 } else { 0x0100 };
    msg.extend_from_slice(&flags.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg.extend_from_slice(&[0; 6]);
    msg.extend_from_slice(&qname_wire(qname));
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg
}

/// DNS message with an arbitrary question count, for invariant tests.
pub fn dns_message_with_qdcount(id: u16, qdcount: u16, qname: &str) -> Vec<u8> {
    let mut msg = dns_message(id, false, qname);
    msg[4..6].copy_from_slice(&qdcount.to_be_bytes());
    msg
}

pub fn ipv4_header(src: [u8; 4], dst: [u8; 4], proto: u8, payload_len: usize) -> Vec<u8> {
    let total = 20 + payload_len;
    let mut hdr = vec![0x45, 0x00];
    hdr.extend_from_slice(&(total as u16).to_be_bytes());
    hdr.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x40, proto, 0x00, 0x00]);
    hdr.extend_from_slice(&src);
    hdr.extend_from_slice(&dst);
    hdr
}

pub fn udp_frame_v4(
    src: [u8; 4],
    src_port: u16,
    dst: [u8; 4],
    dst_port: u16,
    dns: &[u8],
) -> Vec<u8> {
    let mut frame = ipv4_header(src, dst, 17, 8 + dns.len());
    frame.extend_from_slice(&src_port.to_be_bytes());
    frame.extend_from_slice(&dst_port.to_be_bytes());
    frame.extend_from_slice(&((8 + dns.len()) as u16).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(dns);
    frame
}

pub fn tcp_frame_v4(
    src: [u8; 4],
    src_port: u16,
    dst: [u8; 4],
    dst_port: u16,
    dns: &[u8],
) -> Vec<u8> {
    let mut frame = ipv4_header(src, dst, 6, 20 + 2 + dns.len());
    frame.extend_from_slice(&src_port.to_be_bytes());
    frame.extend_from_slice(&dst_port.to_be_bytes());
    frame.extend_from_slice(&[0; 8]); // seq + ack
    frame.push(5 << 4); // data offset 5 words
    frame.push(0x18); // PSH|ACK
    frame.extend_from_slice(&[0; 4]);
    frame.extend_from_slice(&[0; 2]);
    frame.extend_from_slice(&(dns.len() as u16).to_be_bytes());
    frame.extend_from_slice(dns);
    frame
}

pub fn udp_frame_v6(
    src: [u8; 16],
    src_port: u16,
    dst: [u8; 16],
    dst_port: u16,
    dns: &[u8],
) -> Vec<u8> {
    let payload_len = 8 + dns.len();
    let mut frame = vec![0x60, 0x00, 0x00, 0x00];
    frame.extend_from_slice(&(payload_len as u16).to_be_bytes());
    frame.push(17); // next header: UDP
    frame.push(0x40);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&dst);
    frame.extend_from_slice(&src_port.to_be_bytes());
    frame.extend_from_slice(&dst_port.to_be_bytes());
    frame.extend_from_slice(&(payload_len as u16).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(dns);
    frame
}

/// Metadata for a fully captured frame.
pub fn meta(frame: &[u8], ts_us: i64) -> FrameMeta {
    FrameMeta {
        ts_us,
        wire_len: frame.len() as u32,
        cap_len: frame.len() as u32,
    }
}
