//! Tests for Event / EventData encoding
//!
//! Structural asserts pin the exact byte layout (vtable and slot offsets);
//! reader round-trips prove the offsets resolve to the right data.

use crate::encode::{encode_event_data_into, encode_event_into, EventParams};
use crate::reader::{read_event_data, FlatTable};
use crate::EventType;

fn track_params<'a>(
    device_id: &'a [u8; 16],
    session_id: &'a [u8; 16],
    payload: &'a [u8],
) -> EventParams<'a> {
    EventParams {
        event_type: EventType::Track,
        timestamp: 1_706_000_000_000,
        service: Some("app"),
        device_id: Some(device_id),
        session_id: Some(session_id),
        event_name: Some("Page Viewed"),
        payload,
    }
}

#[test]
fn event_root_offset_points_into_buffer() {
    let params = EventParams {
        event_type: EventType::Track,
        timestamp: 1_706_000_000_000,
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_event_into(&mut buf, &params);

    assert!(buf.len() >= 4);
    let root = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    assert!(root > 0);
    assert!((root as usize) < buf.len());
}

#[test]
fn event_vtable_layout() {
    let params = EventParams {
        event_type: EventType::Identify,
        timestamp: 42,
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_event_into(&mut buf, &params);

    // VTable immediately follows the root offset.
    assert_eq!(u16::from_le_bytes([buf[4], buf[5]]), 18); // vtable size
    assert_eq!(u16::from_le_bytes([buf[6], buf[7]]), 36); // inline table size
    assert_eq!(u16::from_le_bytes([buf[8], buf[9]]), 28); // event_type slot
    assert_eq!(u16::from_le_bytes([buf[10], buf[11]]), 20); // timestamp slot
    // All optional fields absent
    for slot in 2..7 {
        let pos = 8 + slot * 2;
        assert_eq!(u16::from_le_bytes([buf[pos], buf[pos + 1]]), 0, "slot {slot}");
    }
}

#[test]
fn minimal_event_is_sixty_bytes() {
    // root(4) + vtable(18+2 pad) + table(36), no vectors
    let params = EventParams {
        event_type: EventType::Track,
        timestamp: 1,
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_event_into(&mut buf, &params);
    assert_eq!(buf.len(), 60);
}

#[test]
fn event_device_id_bytes_present_verbatim() {
    let device_id: [u8; 16] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
    let params = EventParams {
        event_type: EventType::Track,
        timestamp: 1_706_000_000_000,
        device_id: Some(&device_id),
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_event_into(&mut buf, &params);

    let found = buf.windows(16).any(|w| w == device_id);
    assert!(found, "device_id bytes not found in encoded output");
}

#[test]
fn event_name_has_nul_terminator() {
    let params = EventParams {
        event_type: EventType::Track,
        timestamp: 1,
        event_name: Some("Page Viewed"),
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_event_into(&mut buf, &params);

    let pos = buf
        .windows(11)
        .position(|w| w == b"Page Viewed")
        .expect("event name not found");
    assert_eq!(buf[pos + 11], 0, "string missing NUL terminator");
    // Length prefix precedes the string bytes
    let len = u32::from_le_bytes([buf[pos - 4], buf[pos - 3], buf[pos - 2], buf[pos - 1]]);
    assert_eq!(len, 11);
}

#[test]
fn single_event_roundtrip_through_table_reader() {
    let device_id = [0xAA; 16];
    let session_id = [0xBB; 16];
    let payload = br#"{"user_id":"u"}"#;
    let params = track_params(&device_id, &session_id, payload);

    let mut buf = Vec::new();
    encode_event_into(&mut buf, &params);

    let table = FlatTable::parse_root(&buf).expect("parse encoded event");
    assert_eq!(table.read_u8(0, 0), EventType::Track.as_u8());
    assert_eq!(table.read_u64(1, 0), 1_706_000_000_000);
    assert_eq!(table.read_string(2).unwrap(), Some("app"));
    assert_eq!(
        table.read_fixed_bytes::<16>(3, "device_id").unwrap(),
        Some(&device_id)
    );
    assert_eq!(
        table.read_fixed_bytes::<16>(4, "session_id").unwrap(),
        Some(&session_id)
    );
    assert_eq!(table.read_string(5).unwrap(), Some("Page Viewed"));
    assert_eq!(table.read_bytes(6).unwrap(), Some(payload.as_slice()));
}

#[test]
fn event_data_roundtrip_preserves_order() {
    let device_id = [0x01; 16];
    let session_id = [0x02; 16];

    let names = ["First", "Second", "Third"];
    let params: Vec<EventParams<'_>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| EventParams {
            event_type: EventType::Track,
            timestamp: 1000 + i as u64,
            service: Some("app"),
            device_id: Some(&device_id),
            session_id: Some(&session_id),
            event_name: Some(name),
            payload: b"{}",
        })
        .collect();

    let mut buf = Vec::new();
    let start = encode_event_data_into(&mut buf, &params);
    assert_eq!(start, 0);

    let events = read_event_data(&buf).expect("parse EventData");
    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.event_name, Some(names[i]));
        assert_eq!(event.timestamp, 1000 + i as u64);
        assert_eq!(event.device_id, Some(&device_id));
        assert_eq!(event.session_id, Some(&session_id));
    }
}

#[test]
fn event_data_empty_list() {
    let mut buf = Vec::new();
    encode_event_data_into(&mut buf, &[]);

    let events = read_event_data(&buf).expect("parse empty EventData");
    assert!(events.is_empty());
}

#[test]
fn event_data_appends_at_nonzero_base() {
    // Worker reuses one buffer; a second container must be self-contained
    // at its own start position.
    let device_id = [0x07; 16];
    let params = [EventParams {
        event_type: EventType::Alias,
        timestamp: 7,
        device_id: Some(&device_id),
        payload: b"{}",
        ..Default::default()
    }];

    let mut buf = vec![0xFF; 12];
    let start = encode_event_data_into(&mut buf, &params);
    assert_eq!(start, 12);

    let events = read_event_data(&buf[start..]).expect("parse at offset");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Alias);
}

#[test]
fn absent_payload_reads_back_empty() {
    let params = EventParams {
        event_type: EventType::Track,
        timestamp: 5,
        ..Default::default()
    };

    let mut buf = Vec::new();
    encode_event_data_into(&mut buf, &[params]);

    let events = read_event_data(&buf).unwrap();
    assert_eq!(events[0].payload, b"");
    assert_eq!(events[0].event_name, None);
    assert_eq!(events[0].device_id, None);
}
