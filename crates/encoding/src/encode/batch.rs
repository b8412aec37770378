//! Batch FlatBuffer encoding
//!
//! Encodes the outer Batch container that wraps an already-encoded
//! EventData or LogData payload.
//!
//! # Schema
//!
//! ```text
//! table Batch {
//!     api_key:[ubyte] (required, id: 0);
//!     schema_type:SchemaType (id: 1);
//!     version:uint8 (id: 2);
//!     batch_id:uint64 (id: 3);
//!     data:[ubyte] (required, id: 4);
//!     source_ip:[ubyte] (id: 5);
//! }
//! ```
//!
//! # Batch table layout
//!
//! VTable is 16 bytes (4 header + 6 field slots); the table is declared
//! 32 bytes inline:
//!
//! ```text
//! +0   soffset to vtable (i32)
//! +4   api_key offset (u32)
//! +8   data offset (u32)
//! +12  source_ip slot (unused, zero)
//! +16  batch_id (u64)
//! +24  schema_type (u8)
//! +25  version (u8) + 2 pad
//! ```
//!
//! `source_ip` is reserved by the schema for forwarded batches; the SDK
//! never sets it, so its vtable slot is always 0.

use super::{align4, patch_offset, patch_u32, write_byte_vector, write_i32, write_u16, write_u32, write_u64};
use crate::{SchemaType, API_KEY_LENGTH, DEFAULT_VERSION};

/// Borrowed parameters for encoding one batch
#[derive(Debug, Clone, Copy)]
pub struct BatchParams<'a> {
    pub api_key: &'a [u8; API_KEY_LENGTH],
    pub schema_type: SchemaType,
    /// 0 is replaced with [`DEFAULT_VERSION`]
    pub version: u8,
    /// 0 leaves the field absent from the vtable
    pub batch_id: u64,
    /// Already-encoded EventData or LogData bytes
    pub data: &'a [u8],
}

/// Encode a complete Batch message.
pub fn encode_batch_into(buf: &mut Vec<u8>, params: &BatchParams<'_>) {
    let has_batch_id = params.batch_id != 0;
    let version = if params.version == 0 {
        DEFAULT_VERSION
    } else {
        params.version
    };

    let base = buf.len();
    write_u32(buf, 0); // root offset placeholder

    // VTable
    let vtable_start = buf.len();
    write_u16(buf, 16); // vtable_size = 4 + 6*2
    write_u16(buf, 32); // table_size = 4 + 28
    write_u16(buf, 4); // field 0: api_key
    write_u16(buf, 24); // field 1: schema_type
    write_u16(buf, 25); // field 2: version
    write_u16(buf, if has_batch_id { 16 } else { 0 }); // field 3: batch_id
    write_u16(buf, 8); // field 4: data
    write_u16(buf, 0); // field 5: source_ip (not used)

    // Table
    let table_start = buf.len();
    write_i32(buf, (table_start - vtable_start) as i32);

    let api_key_off_pos = buf.len();
    write_u32(buf, 0);

    let data_off_pos = buf.len();
    write_u32(buf, 0);

    write_u32(buf, 0); // source_ip placeholder (unused)

    write_u64(buf, params.batch_id);

    buf.push(params.schema_type.as_u8());
    buf.push(version);
    buf.extend_from_slice(&[0, 0]); // padding

    // Vectors
    align4(buf);

    let api_key_start = write_byte_vector(buf, params.api_key);
    align4(buf);

    let data_start = write_byte_vector(buf, params.data);

    patch_u32(buf, base, (table_start - base) as u32);
    patch_offset(buf, api_key_off_pos, api_key_start);
    patch_offset(buf, data_off_pos, data_start);
}
