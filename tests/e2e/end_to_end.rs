//! End-to-end: pcap bytes in, frozen timeframes out of the consumer queue.

use std::io::Cursor;
use std::sync::Arc;

use harvester_collector::{Collector, PcapFileSource, Timeframe};
use harvester_domain::config::CollectorConfig;

fn qname_wire(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

fn dns_message(id: u16, response: bool, qname: &str) -> Vec<u8> {
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

fn udp_frame_v4(
    src: [u8; 4],
    src_port: u16,
    dst: [u8; 4],
    dst_port: u16,
    dns: &[u8],
) -> Vec<u8> {
    let total = 20 + 8 + dns.len();
    let mut frame = vec![0x45, 0x00];
    frame.extend_from_slice(&(total as u16).to_be_bytes());
    frame.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x40, 17, 0x00, 0x00]);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&dst);
    frame.extend_from_slice(&src_port.to_be_bytes());
    frame.extend_from_slice(&dst_port.to_be_bytes());
    frame.extend_from_slice(&((8 + dns.len()) as u16).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(dns);
    frame
}

fn ethernet(payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; 12];
    frame.extend_from_slice(&0x0800u16.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Legacy little-endian pcap, fully captured frames.
fn legacy_pcap(records: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // Ethernet
    for (ts_sec, ts_usec, data) in records {
        out.extend_from_slice(&ts_sec.to_le_bytes());
        out.extend_from_slice(&ts_usec.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

#[tokio::test]
async fn test_capture_to_consumer() {
    let client = [192, 168, 1, 10];
    let server = [9, 9, 9, 9];

    // Window 1: a matched exchange and an orphan response.
    // Window 3: a request that never gets an answer.
    let records = vec![
        (
            10,
            100,
            ethernet(&udp_frame_v4(
                client,
                5000,
                server,
                53,
                &dns_message(0x1111, false, "one.example.com"),
            )),
        ),
        (
            10,
            400,
            ethernet(&udp_frame_v4(
                server,
                53,
                client,
                5000,
                &dns_message(0x1111, true, "one.example.com"),
            )),
        ),
        (
            10,
            600,
            ethernet(&udp_frame_v4(
                server,
                53,
                client,
                6000,
                &dns_message(0x2222, true, "two.example.com"),
            )),
        ),
        (
            12,
            0,
            ethernet(&udp_frame_v4(
                client,
                5001,
                server,
                53,
                &dns_message(0x3333, false, "three.example.com"),
            )),
        ),
    ];
    let pcap = legacy_pcap(&records);

    let config = CollectorConfig::default();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Arc<Timeframe>>(8);

    let collector = Collector::new(config, vec![tx]);
    let stats = tokio::task::spawn_blocking(move || {
        let mut source = PcapFileSource::from_reader(Box::new(Cursor::new(pcap))).unwrap();
        collector.run(&mut source).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(stats.frames_seen, 4);
    assert_eq!(stats.accepted(), 4);
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.responses_matched, 1);
    assert_eq!(stats.responses_orphaned, 1);
    assert_eq!(stats.frames_published, 2);

    let first = rx.recv().await.expect("first timeframe");
    assert_eq!(first.time_start(), 10_000_000);
    assert_eq!(first.time_end(), 11_000_000);
    assert_eq!(first.len(), 2);
    assert_eq!(first.matched_count(), 1);
    assert_eq!(first.orphan_count(), 1);

    let matched = first.iter().find(|e| e.is_matched()).expect("matched pair");
    assert_eq!(matched.packet().dns().qname(), "one.example.com");
    assert!(matched.response().unwrap().dns().is_response());

    let second = rx.recv().await.expect("second timeframe");
    assert_eq!(second.time_start(), 12_000_000);
    assert_eq!(second.len(), 1);
    assert_eq!(second.matched_count(), 0);
    assert_eq!(
        second.iter().next().unwrap().packet().dns().qname(),
        "three.example.com"
    );

    // Senders dropped with the collector: the stream ends.
    assert!(rx.recv().await.is_none());

    // Last handles: frames tear down here, exactly once.
    let weak = Arc::downgrade(&first);
    drop(first);
    drop(second);
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn test_drops_do_not_stop_collection() {
    let client = [192, 168, 1, 10];
    let server = [9, 9, 9, 9];

    let mut bad = dns_message(0x0666, false, "bad.example.com");
    bad[4..6].copy_from_slice(&3u16.to_be_bytes()); // QDCOUNT 3

    let records = vec![
        (5, 0, ethernet(&udp_frame_v4(client, 5000, server, 53, &bad))),
        (
            5,
            10,
            ethernet(&udp_frame_v4(
                client,
                5001,
                server,
                53,
                &dns_message(0x0667, false, "good.example.com"),
            )),
        ),
    ];
    let pcap = legacy_pcap(&records);

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Arc<Timeframe>>(8);
    let collector = Collector::new(CollectorConfig::default(), vec![tx]);
    let stats = tokio::task::spawn_blocking(move || {
        let mut source = PcapFileSource::from_reader(Box::new(Cursor::new(pcap))).unwrap();
        collector.run(&mut source).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(stats.frames_seen, 2);
    assert_eq!(stats.frames_dropped, 1);
    assert_eq!(stats.requests, 1);

    let frame = rx.recv().await.expect("timeframe");
    assert_eq!(frame.len(), 1);
    assert_eq!(
        frame.iter().next().unwrap().packet().dns().qname(),
        "good.example.com"
    );
}
