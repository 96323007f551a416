//! Builders for wire-format DNS fixtures shared by the domain tests.
#![allow(dead_code)]

use std::net::IpAddr;

use harvester_domain::{DnsInfo, FrameMeta, Packet, Transport};

/// Encode a dotted name as wire-format length-prefixed labels with the
/// terminating zero label.
pub fn qname_wire(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// Build a single-question DNS message in wire order.
pub fn dns_message(id: u16, response: bool, qname: &str, qtype: u16, qclass: u16) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&id.to_be_bytes());
    let flags: u16 = if response { 0x8180 } else { 0x0100 };
    msg.extend_from_slice(&flags.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    msg.extend_from_slice(&0u16.to_be_bytes()); // ANCOUNT
    msg.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    msg.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT
    msg.extend_from_slice(&qname_wire(qname));
    msg.extend_from_slice(&qtype.to_be_bytes());
    msg.extend_from_slice(&qclass.to_be_bytes());
    msg
}

pub fn dns_info(id: u16, response: bool, qname: &str) -> DnsInfo {
    let message = dns_message(id, response, qname, 1, 1);
    let wire_len = message.len() as u32;
    let qname_raw_len = qname_wire(qname).len();
    DnsInfo::new(message, wire_len, qname_raw_len, qname.to_string(), 1, 1)
}

#[allow(clippy::too_many_arguments)]
pub fn packet(
    src: &str,
    src_port: u16,
    dst: &str,
    dst_port: u16,
    id: u16,
    response: bool,
    qname: &str,
) -> Packet {
    let dns = dns_info(id, response, qname);
    let wire_len = 20 + 8 + dns.wire_len();
    let meta = FrameMeta {
        ts_us: 1_700_000_000_000_000,
        wire_len,
        cap_len: wire_len,
    };
    let src: IpAddr = src.parse().unwrap();
    let dst: IpAddr = dst.parse().unwrap();
    Packet::new(meta, src, dst, Transport::Udp, src_port, dst_port, dns)
}
