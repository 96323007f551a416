//! PCAP/PCAPNG file source.
//!
//! Yields frames with link-layer framing stripped, so the buffer handed to
//! the collector starts at the IP header. Non-IP frames and unsupported
//! link types are skipped, not dropped: they never reach the parser.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, PcapNGReader};
use tracing::{debug, trace};

use harvester_domain::FrameMeta;

use crate::errors::CaptureError;
use crate::ports::PacketSource;

/// Buffer size for reading capture files (64KB).
const BUFFER_SIZE: usize = 65536;

const LINKTYPE_NULL: u16 = 0;
const LINKTYPE_ETHERNET: u16 = 1;
const LINKTYPE_RAW: u16 = 101;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86dd;
const ETHERTYPE_VLAN: u16 = 0x8100;
const ETHERTYPE_QINQ: u16 = 0x88a8;

const ETHERNET_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const NULL_HEADER_LEN: usize = 4;

/// Reader for PCAP and PCAPNG captures.
pub struct PcapFileSource {
    inner: ReaderInner,
    link_type: u16,
    /// Nanosecond-resolution legacy captures carry ns in the sub-second field.
    ts_nanos: bool,
    frame_buf: Vec<u8>,
    frames_read: u64,
    frames_skipped: u64,
}

enum ReaderInner {
    Legacy(LegacyPcapReader<Box<dyn Read + Send>>),
    Ng(PcapNGReader<Box<dyn Read + Send>>),
}

impl PcapFileSource {
    /// Open a capture file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CaptureError::Open(path.display().to_string(), e.to_string()))?;
        Self::from_reader(Box::new(file))
    }

    /// Wrap any byte stream carrying pcap or pcapng data.
    pub fn from_reader(mut reader: Box<dyn Read + Send>) -> Result<Self, CaptureError> {
        // Peek at the magic number to pick the format, then stitch the
        // consumed bytes back in front of the stream.
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(|_| {
            CaptureError::Format("stream too short for a capture header".to_string())
        })?;
        let chained: Box<dyn Read + Send> =
            Box::new(std::io::Cursor::new(magic.to_vec()).chain(reader));

        let mut ts_nanos = false;
        let inner = match magic {
            // Legacy microsecond captures, either endianness.
            [0xd4, 0xc3, 0xb2, 0xa1] | [0xa1, 0xb2, 0xc3, 0xd4] => {
                ReaderInner::Legacy(LegacyPcapReader::new(BUFFER_SIZE, chained).map_err(|e| {
                    CaptureError::Format(format!("Failed to parse PCAP header: {e}"))
                })?)
            }
            // Legacy nanosecond captures.
            [0x4d, 0x3c, 0xb2, 0xa1] | [0xa1, 0xb2, 0x3c, 0x4d] => {
                ts_nanos = true;
                ReaderInner::Legacy(LegacyPcapReader::new(BUFFER_SIZE, chained).map_err(|e| {
                    CaptureError::Format(format!("Failed to parse PCAP header: {e}"))
                })?)
            }
            [0x0a, 0x0d, 0x0d, 0x0a] => {
                ReaderInner::Ng(PcapNGReader::new(BUFFER_SIZE, chained).map_err(|e| {
                    CaptureError::Format(format!("Failed to parse PCAPNG header: {e}"))
                })?)
            }
            _ => {
                return Err(CaptureError::Format(format!(
                    "Unknown magic number: {magic:02x?}"
                )))
            }
        };

        Ok(Self {
            inner,
            link_type: LINKTYPE_ETHERNET,
            ts_nanos,
            frame_buf: Vec::new(),
            frames_read: 0,
            frames_skipped: 0,
        })
    }

    /// Link type of the capture.
    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    /// IP frames handed out so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Non-IP or unsupported-link frames passed over so far.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    fn next_legacy(&mut self) -> Result<Option<FrameMeta>, CaptureError> {
        loop {
            let reader = match &mut self.inner {
                ReaderInner::Legacy(r) => r,
                _ => unreachable!(),
            };
            match reader.next() {
                Ok((offset, block)) => {
                    let mut produced = None;
                    let mut saw_packet = false;
                    match block {
                        PcapBlockOwned::Legacy(packet) => {
                            saw_packet = true;
                            let sub_us = if self.ts_nanos {
                                i64::from(packet.ts_usec) / 1_000
                            } else {
                                i64::from(packet.ts_usec)
                            };
                            let ts_us = i64::from(packet.ts_sec) * 1_000_000 + sub_us;
                            produced = strip_link(
                                self.link_type,
                                ts_us,
                                packet.origlen,
                                packet.data,
                                &mut self.frame_buf,
                            );
                        }
                        PcapBlockOwned::LegacyHeader(header) => {
                            self.link_type = header.network.0 as u16;
                            debug!(link_type = self.link_type, "capture header");
                        }
                        _ => {}
                    }
                    reader.consume(offset);
                    if let Some(meta) = produced {
                        self.frames_read += 1;
                        return Ok(Some(meta));
                    }
                    if saw_packet {
                        self.frames_skipped += 1;
                    }
                    continue;
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| CaptureError::Read(format!("Refill error: {e}")))?;
                    continue;
                }
                Err(e) => return Err(CaptureError::Read(format!("Parse error: {e}"))),
            }
        }
    }

    fn next_ng(&mut self) -> Result<Option<FrameMeta>, CaptureError> {
        loop {
            let reader = match &mut self.inner {
                ReaderInner::Ng(r) => r,
                _ => unreachable!(),
            };
            match reader.next() {
                Ok((offset, block)) => {
                    let mut produced = None;
                    let mut saw_packet = false;
                    if let PcapBlockOwned::NG(ng_block) = block {
                        use pcap_parser::pcapng::Block;

                        match ng_block {
                            Block::InterfaceDescription(idb) => {
                                self.link_type = idb.linktype.0 as u16;
                                debug!(link_type = self.link_type, "interface description");
                            }
                            Block::EnhancedPacket(epb) => {
                                saw_packet = true;
                                // Interface time units, usually microseconds.
                                let ts_us = (i64::from(epb.ts_high) << 32) | i64::from(epb.ts_low);
                                produced = strip_link(
                                    self.link_type,
                                    ts_us,
                                    epb.origlen,
                                    epb.data,
                                    &mut self.frame_buf,
                                );
                            }
                            Block::SimplePacket(spb) => {
                                saw_packet = true;
                                produced = strip_link(
                                    self.link_type,
                                    0,
                                    spb.origlen,
                                    spb.data,
                                    &mut self.frame_buf,
                                );
                            }
                            _ => {}
                        }
                    }
                    reader.consume(offset);
                    if let Some(meta) = produced {
                        self.frames_read += 1;
                        return Ok(Some(meta));
                    }
                    if saw_packet {
                        self.frames_skipped += 1;
                    }
                    continue;
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| CaptureError::Read(format!("Refill error: {e}")))?;
                    continue;
                }
                Err(e) => return Err(CaptureError::Read(format!("Parse error: {e}"))),
            }
        }
    }
}

impl PacketSource for PcapFileSource {
    fn next_frame(&mut self) -> Result<Option<(FrameMeta, &[u8])>, CaptureError> {
        let is_legacy = matches!(self.inner, ReaderInner::Legacy(_));
        let meta = if is_legacy {
            self.next_legacy()?
        } else {
            self.next_ng()?
        };
        Ok(meta.map(|m| (m, self.frame_buf.as_slice())))
    }
}

/// Strip link framing and copy the IP bytes into `buf`. Returns `None`
/// for frames the collector has no use for (non-IP, unknown link type).
fn strip_link(
    link_type: u16,
    ts_us: i64,
    origlen: u32,
    data: &[u8],
    buf: &mut Vec<u8>,
) -> Option<FrameMeta> {
    let ip_offset = match link_type {
        LINKTYPE_ETHERNET => ethernet_ip_offset(data)?,
        LINKTYPE_RAW => 0,
        LINKTYPE_NULL => NULL_HEADER_LEN,
        other => {
            trace!(link_type = other, "unsupported link type, skipping frame");
            return None;
        }
    };
    if data.len() < ip_offset {
        return None;
    }
    let ip_data = &data[ip_offset..];
    buf.clear();
    buf.extend_from_slice(ip_data);
    Some(FrameMeta {
        ts_us,
        wire_len: origlen.saturating_sub(ip_offset as u32),
        cap_len: ip_data.len() as u32,
    })
}

/// Offset of the IP header behind an Ethernet header, unwrapping up to two
/// VLAN tags. `None` for non-IP ethertypes.
fn ethernet_ip_offset(data: &[u8]) -> Option<usize> {
    if data.len() < ETHERNET_HEADER_LEN {
        return None;
    }
    let mut offset = ETHERNET_HEADER_LEN;
    let mut ethertype = u16::from_be_bytes([data[12], data[13]]);
    let mut tags = 0;
    while (ethertype == ETHERTYPE_VLAN || ethertype == ETHERTYPE_QINQ) && tags < 2 {
        if data.len() < offset + VLAN_TAG_LEN {
            return None;
        }
        ethertype = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
        offset += VLAN_TAG_LEN;
        tags += 1;
    }
    match ethertype {
        ETHERTYPE_IPV4 | ETHERTYPE_IPV6 => Some(offset),
        _ => None,
    }
}
