//! Event FlatBuffer encoding
//!
//! Encodes analytics events into the Event / EventData tables.
//!
//! # Schema
//!
//! ```text
//! table Event {
//!     event_type:EventType (id: 0);
//!     timestamp:uint64 (id: 1);
//!     service:string (id: 2);
//!     device_id:[ubyte] (id: 3);
//!     session_id:[ubyte] (id: 4);
//!     event_name:string (id: 5);
//!     payload:[ubyte] (id: 6);
//! }
//! table EventData { events:[Event] (required); }
//! ```
//!
//! # Event table layout
//!
//! VTable is 18 bytes (4 header + 7 field slots) plus 2 alignment bytes;
//! the table is 36 bytes inline:
//!
//! ```text
//! +0   soffset to vtable (i32)
//! +4   device_id offset (u32)
//! +8   session_id offset (u32)
//! +12  event_name offset (u32)
//! +16  payload offset (u32)
//! +20  timestamp (u64)
//! +28  event_type (u8) + 3 pad
//! +32  service offset (u32)
//! ```

use super::{
    align4, patch_offset, patch_u32, write_byte_vector, write_i32, write_string, write_u16,
    write_u32, write_u64,
};
use crate::{EventType, UUID_LENGTH};

/// Borrowed parameters for encoding one event
#[derive(Debug, Clone, Copy, Default)]
pub struct EventParams<'a> {
    pub event_type: EventType,
    /// Milliseconds since Unix epoch
    pub timestamp: u64,
    pub service: Option<&'a str>,
    pub device_id: Option<&'a [u8; UUID_LENGTH]>,
    pub session_id: Option<&'a [u8; UUID_LENGTH]>,
    pub event_name: Option<&'a str>,
    /// UTF-8 JSON bytes; empty means absent
    pub payload: &'a [u8],
}

/// Encode a single event as a standalone FlatBuffer (root offset first).
pub fn encode_event_into(buf: &mut Vec<u8>, params: &EventParams<'_>) {
    let has_payload = !params.payload.is_empty();

    let root_pos = buf.len();
    write_u32(buf, 0); // root offset placeholder

    // VTable
    let vtable_start = buf.len();
    write_u16(buf, 18); // vtable_size = 4 + 7*2
    write_u16(buf, 36); // table_size = 4 + 32
    write_u16(buf, 28); // field 0: event_type
    write_u16(buf, 20); // field 1: timestamp
    write_u16(buf, if params.service.is_some() { 32 } else { 0 }); // field 2: service
    write_u16(buf, if params.device_id.is_some() { 4 } else { 0 }); // field 3: device_id
    write_u16(buf, if params.session_id.is_some() { 8 } else { 0 }); // field 4: session_id
    write_u16(buf, if params.event_name.is_some() { 12 } else { 0 }); // field 5: event_name
    write_u16(buf, if has_payload { 16 } else { 0 }); // field 6: payload
    buf.extend_from_slice(&[0, 0]); // vtable alignment padding

    // Table
    let table_start = buf.len();
    write_i32(buf, (table_start - vtable_start) as i32);

    let device_id_off_pos = buf.len();
    write_u32(buf, 0);
    let session_id_off_pos = buf.len();
    write_u32(buf, 0);
    let event_name_off_pos = buf.len();
    write_u32(buf, 0);
    let payload_off_pos = buf.len();
    write_u32(buf, 0);

    write_u64(buf, params.timestamp);
    buf.push(params.event_type.as_u8());
    buf.extend_from_slice(&[0, 0, 0]); // padding

    let service_off_pos = buf.len();
    write_u32(buf, 0);

    // Vectors and strings
    align4(buf);

    if let Some(device_id) = params.device_id {
        let start = write_byte_vector(buf, device_id);
        align4(buf);
        patch_offset(buf, device_id_off_pos, start);
    }

    if let Some(session_id) = params.session_id {
        let start = write_byte_vector(buf, session_id);
        align4(buf);
        patch_offset(buf, session_id_off_pos, start);
    }

    if let Some(service) = params.service {
        let start = write_string(buf, service);
        align4(buf);
        patch_offset(buf, service_off_pos, start);
    }

    if let Some(event_name) = params.event_name {
        let start = write_string(buf, event_name);
        align4(buf);
        patch_offset(buf, event_name_off_pos, start);
    }

    if has_payload {
        let start = write_byte_vector(buf, params.payload);
        patch_offset(buf, payload_off_pos, start);
    }

    patch_u32(buf, root_pos, (table_start - root_pos) as u32);
}

/// Encode an EventData container over `events`. Returns the start position
/// of the container within `buf` (the root offset lives there).
pub fn encode_event_data_into(buf: &mut Vec<u8>, events: &[EventParams<'_>]) -> usize {
    let data_start = buf.len();

    let root_pos = buf.len();
    write_u32(buf, 0);

    // VTable: single field (the vector) at table+4
    let vtable_start = buf.len();
    write_u16(buf, 6); // vtable_size
    write_u16(buf, 8); // table_size
    write_u16(buf, 4); // field 0: events
    buf.extend_from_slice(&[0, 0]); // align vtable

    // Table
    let table_start = buf.len();
    write_i32(buf, (table_start - vtable_start) as i32);

    let events_off_pos = buf.len();
    write_u32(buf, 0);

    align4(buf);

    // Events vector: count then one offset slot per child
    let events_vec_start = buf.len();
    write_u32(buf, events.len() as u32);

    let offsets_start = buf.len();
    for _ in 0..events.len() {
        write_u32(buf, 0); // placeholder
    }

    align4(buf);

    // Child tables, inlined in order; each element offset points at the
    // child's table start, recovered from the child's own root offset.
    let mut table_positions = Vec::with_capacity(events.len());
    for params in events {
        align4(buf);
        let event_start = buf.len();
        encode_event_into(buf, params);

        let root_offset =
            u32::from_le_bytes([buf[event_start], buf[event_start + 1], buf[event_start + 2], buf[event_start + 3]]);
        table_positions.push(event_start + root_offset as usize);
    }

    for (i, &table_pos) in table_positions.iter().enumerate() {
        patch_offset(buf, offsets_start + i * 4, table_pos);
    }

    patch_offset(buf, events_off_pos, events_vec_start);
    patch_u32(buf, root_pos, (table_start - data_start) as u32);

    data_start
}
