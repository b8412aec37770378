//! FlatBuffer encoding for building wire-format messages
//!
//! All encoders append to a caller-provided `Vec<u8>` and patch offsets in
//! place, so a worker can clear and refill the same buffers batch after
//! batch. Encoding is infallible: any combination of params produces a
//! structurally valid message.
//!
//! # Wire Format Layout
//!
//! Forward layout: the root offset comes first, each table's vtable
//! immediately precedes the table, and vectors/strings follow the table
//! that references them. Offsets within a table are stored as
//! `target - offset_position` (unsigned, little-endian). The buffer is
//! padded to a 4-byte boundary before every vector or string.

mod batch;
mod event;
mod log;

pub use batch::{encode_batch_into, BatchParams};
pub use event::{encode_event_data_into, encode_event_into, EventParams};
pub use log::{encode_log_data_into, encode_log_entry_into, LogEntryParams};

#[cfg(test)]
mod event_test;
#[cfg(test)]
mod log_test;

/// Write a u16 in little-endian format
#[inline]
fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Write a u32 in little-endian format
#[inline]
fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Write an i32 in little-endian format
#[inline]
fn write_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Write a u64 in little-endian format
#[inline]
fn write_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Pad with zeros to a 4-byte boundary
#[inline]
fn align4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Write `[u32 length][data]` and return the start position
#[inline]
fn write_byte_vector(buf: &mut Vec<u8>, data: &[u8]) -> usize {
    let start = buf.len();
    write_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
    start
}

/// Write `[u32 length][data][NUL]` and return the start position
#[inline]
fn write_string(buf: &mut Vec<u8>, s: &str) -> usize {
    let start = buf.len();
    write_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
    buf.push(0); // null terminator
    start
}

/// Patch a placeholder with the forward distance to `target`
#[inline]
fn patch_offset(buf: &mut [u8], offset_pos: usize, target: usize) {
    let rel = (target - offset_pos) as u32;
    buf[offset_pos..offset_pos + 4].copy_from_slice(&rel.to_le_bytes());
}

/// Patch a placeholder with a literal u32 value
#[inline]
fn patch_u32(buf: &mut [u8], pos: usize, value: u32) {
    buf[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
}
