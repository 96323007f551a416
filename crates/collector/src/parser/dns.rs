//! DNS-layer stage: header validation, owned message copy, QNAME decoding.

use harvester_domain::{DnsInfo, DropReason, DNS_HEADER_MIN_LEN, QNAME_MAX_LEN};

/// Validate the DNS header, take an owned copy of the message, decode the
/// single question, and advance `offset` to the first resource record.
pub(crate) fn parse(
    data: &[u8],
    offset: &mut usize,
    dns_wire_len: u32,
) -> Result<DnsInfo, DropReason> {
    let start = *offset;
    let avail = data.len().saturating_sub(start);
    if avail < DNS_HEADER_MIN_LEN {
        return Err(DropReason::MalformedDns);
    }

    // Only single-question messages are collected; anything else is not
    // worth a copy.
    let qdcount = u16::from_be_bytes([data[start + 4], data[start + 5]]);
    if qdcount != 1 {
        return Err(DropReason::WrongQueryCount);
    }

    let copy_len = avail.min(dns_wire_len as usize);
    if copy_len < DNS_HEADER_MIN_LEN {
        return Err(DropReason::MalformedDns);
    }
    let mut message: Vec<u8> = Vec::new();
    message
        .try_reserve_exact(copy_len)
        .map_err(|_| DropReason::AllocFailure)?;
    message.extend_from_slice(&data[start..start + copy_len]);

    // Walk the wire-format QNAME labels over the owned copy.
    let mut pos = DNS_HEADER_MIN_LEN;
    loop {
        let len = usize::from(*message.get(pos).ok_or(DropReason::MalformedQname)?);
        if len == 0 {
            pos += 1;
            break;
        }
        // Compression pointers (and the reserved 0b01/0b10 prefixes) are
        // not valid in a question name.
        if len & 0xc0 != 0 {
            return Err(DropReason::MalformedQname);
        }
        pos += 1 + len;
        if pos - DNS_HEADER_MIN_LEN > QNAME_MAX_LEN {
            return Err(DropReason::MalformedQname);
        }
    }
    let qname_raw_len = pos - DNS_HEADER_MIN_LEN;
    if qname_raw_len > QNAME_MAX_LEN {
        return Err(DropReason::MalformedQname);
    }

    // Query type and class must be fully captured.
    if message.len() < pos + 4 {
        return Err(DropReason::MalformedDns);
    }
    let qtype = u16::from_be_bytes([message[pos], message[pos + 1]]);
    let qclass = u16::from_be_bytes([message[pos + 2], message[pos + 3]]);

    let qname = render_qname(&message[DNS_HEADER_MIN_LEN..pos]);

    *offset = start + pos + 4;
    Ok(DnsInfo::new(
        message,
        dns_wire_len,
        qname_raw_len,
        qname,
        qtype,
        qclass,
    ))
}

/// Dotted ASCII rendering of a wire-format name (labels + terminator).
/// Bytes outside the printable ASCII range, dots and backslashes are
/// escaped as `\DDD`, the usual presentation format.
fn render_qname(raw: &[u8]) -> String {
    if raw.len() <= 1 {
        return ".".to_string();
    }
    let mut out = String::with_capacity(raw.len() + 4);
    let mut pos = 0;
    while raw[pos] != 0 {
        let len = usize::from(raw[pos]);
        if !out.is_empty() {
            out.push('.');
        }
        for &b in &raw[pos + 1..pos + 1 + len] {
            if b.is_ascii_graphic() && b != b'.' && b != b'\\' {
                out.push(b as char);
            } else {
                out.push('\\');
                out.push_str(&format!("{b:03}"));
            }
        }
        pos += 1 + len;
    }
    out
}
