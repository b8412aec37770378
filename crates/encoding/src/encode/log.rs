//! Log entry FlatBuffer encoding
//!
//! Encodes structured log entries into the LogEntry / LogData tables.
//!
//! # Schema
//!
//! ```text
//! table LogEntry {
//!     event_type:LogEventType (id: 0);
//!     session_id:[ubyte] (id: 1);
//!     level:LogLevel (id: 2);
//!     timestamp:uint64 (id: 3);
//!     source:string (id: 4);
//!     service:string (id: 5);
//!     payload:[ubyte] (id: 6);
//! }
//! table LogData { logs:[LogEntry] (required); }
//! ```
//!
//! # LogEntry table layout
//!
//! VTable is 18 bytes (4 header + 7 field slots) plus 2 alignment bytes;
//! the table is 32 bytes inline:
//!
//! ```text
//! +0   soffset to vtable (i32)
//! +4   session_id offset (u32)
//! +8   source offset (u32)
//! +12  service offset (u32)
//! +16  payload offset (u32)
//! +20  timestamp (u64)
//! +28  event_type (u8)
//! +29  level (u8) + 2 pad
//! ```

use super::{
    align4, patch_offset, patch_u32, write_byte_vector, write_i32, write_string, write_u16,
    write_u32, write_u64,
};
use crate::{LogEventType, LogLevel, UUID_LENGTH};

/// Borrowed parameters for encoding one log entry
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEntryParams<'a> {
    pub event_type: LogEventType,
    pub session_id: Option<&'a [u8; UUID_LENGTH]>,
    pub level: LogLevel,
    /// Milliseconds since Unix epoch
    pub timestamp: u64,
    pub source: Option<&'a str>,
    pub service: Option<&'a str>,
    /// UTF-8 JSON bytes; empty means absent
    pub payload: &'a [u8],
}

/// Encode a single log entry as a standalone FlatBuffer (root offset first).
pub fn encode_log_entry_into(buf: &mut Vec<u8>, params: &LogEntryParams<'_>) {
    let has_payload = !params.payload.is_empty();

    let root_pos = buf.len();
    write_u32(buf, 0); // root offset placeholder

    // VTable
    let vtable_start = buf.len();
    write_u16(buf, 18); // vtable_size = 4 + 7*2
    write_u16(buf, 32); // table_size = 4 + 28
    write_u16(buf, 28); // field 0: event_type
    write_u16(buf, if params.session_id.is_some() { 4 } else { 0 }); // field 1: session_id
    write_u16(buf, 29); // field 2: level
    write_u16(buf, 20); // field 3: timestamp
    write_u16(buf, if params.source.is_some() { 8 } else { 0 }); // field 4: source
    write_u16(buf, if params.service.is_some() { 12 } else { 0 }); // field 5: service
    write_u16(buf, if has_payload { 16 } else { 0 }); // field 6: payload
    buf.extend_from_slice(&[0, 0]); // vtable alignment padding

    // Table
    let table_start = buf.len();
    write_i32(buf, (table_start - vtable_start) as i32);

    let session_id_off_pos = buf.len();
    write_u32(buf, 0);
    let source_off_pos = buf.len();
    write_u32(buf, 0);
    let service_off_pos = buf.len();
    write_u32(buf, 0);
    let payload_off_pos = buf.len();
    write_u32(buf, 0);

    write_u64(buf, params.timestamp);
    buf.push(params.event_type.as_u8());
    buf.push(params.level.as_u8());
    buf.extend_from_slice(&[0, 0]); // padding

    align4(buf);

    if let Some(session_id) = params.session_id {
        let start = write_byte_vector(buf, session_id);
        align4(buf);
        patch_offset(buf, session_id_off_pos, start);
    }

    if let Some(source) = params.source {
        let start = write_string(buf, source);
        align4(buf);
        patch_offset(buf, source_off_pos, start);
    }

    if let Some(service) = params.service {
        let start = write_string(buf, service);
        align4(buf);
        patch_offset(buf, service_off_pos, start);
    }

    if has_payload {
        let start = write_byte_vector(buf, params.payload);
        patch_offset(buf, payload_off_pos, start);
    }

    patch_u32(buf, root_pos, (table_start - root_pos) as u32);
}

/// Encode a LogData container over `logs`. Returns the start position of
/// the container within `buf`.
pub fn encode_log_data_into(buf: &mut Vec<u8>, logs: &[LogEntryParams<'_>]) -> usize {
    let data_start = buf.len();

    let root_pos = buf.len();
    write_u32(buf, 0);

    // VTable: single field (the vector) at table+4
    let vtable_start = buf.len();
    write_u16(buf, 6); // vtable_size
    write_u16(buf, 8); // table_size
    write_u16(buf, 4); // field 0: logs
    buf.extend_from_slice(&[0, 0]); // align vtable

    // Table
    let table_start = buf.len();
    write_i32(buf, (table_start - vtable_start) as i32);

    let logs_off_pos = buf.len();
    write_u32(buf, 0);

    align4(buf);

    let logs_vec_start = buf.len();
    write_u32(buf, logs.len() as u32);

    let offsets_start = buf.len();
    for _ in 0..logs.len() {
        write_u32(buf, 0); // placeholder
    }

    align4(buf);

    let mut table_positions = Vec::with_capacity(logs.len());
    for params in logs {
        align4(buf);
        let entry_start = buf.len();
        encode_log_entry_into(buf, params);

        let root_offset = u32::from_le_bytes([
            buf[entry_start],
            buf[entry_start + 1],
            buf[entry_start + 2],
            buf[entry_start + 3],
        ]);
        table_positions.push(entry_start + root_offset as usize);
    }

    for (i, &table_pos) in table_positions.iter().enumerate() {
        patch_offset(buf, offsets_start + i * 4, table_pos);
    }

    patch_offset(buf, logs_off_pos, logs_vec_start);
    patch_u32(buf, root_pos, (table_start - data_start) as u32);

    data_start
}
