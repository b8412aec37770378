//! Bounds-checked parsing of the wire format
//!
//! Zero-copy readers for the Batch, EventData and LogData messages the
//! encoders in this crate produce. All accesses are bounds checked; invalid
//! messages return errors rather than panicking or reading out of bounds.
//!
//! The SDK never parses on its send path. These readers exist so tests and
//! diagnostic tooling can verify frames byte-for-byte instead of trusting
//! the encoder's own arithmetic.

use crate::{
    EncodingError, EventType, LogEventType, LogLevel, Result, SchemaType, API_KEY_LENGTH,
    UUID_LENGTH,
};

/// Field IDs from the Batch table (vtable slot indices, not byte offsets)
const BATCH_FIELD_API_KEY: usize = 0;
const BATCH_FIELD_SCHEMA_TYPE: usize = 1;
const BATCH_FIELD_VERSION: usize = 2;
const BATCH_FIELD_BATCH_ID: usize = 3;
const BATCH_FIELD_DATA: usize = 4;

/// Generic bounds-checked view of one FlatBuffer table
#[derive(Debug, Clone, Copy)]
pub struct FlatTable<'a> {
    buf: &'a [u8],
    table_offset: usize,
    vtable_offset: usize,
    vtable_fields: usize,
}

impl<'a> FlatTable<'a> {
    /// Parse the root table of a message (first 4 bytes are the root offset).
    pub fn parse_root(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < 8 {
            return Err(EncodingError::too_short(8, buf.len()));
        }
        let root_offset = read_u32(buf, 0)? as usize;
        if root_offset >= buf.len() {
            return Err(EncodingError::invalid_flatbuffer("root offset out of bounds"));
        }
        Self::parse(buf, root_offset)
    }

    /// Parse a table at the given offset.
    pub fn parse(buf: &'a [u8], table_offset: usize) -> Result<Self> {
        if table_offset + 4 > buf.len() {
            return Err(EncodingError::invalid_flatbuffer("table offset out of bounds"));
        }

        // vtable location = table location - soffset, for either sign
        let vtable_soffset = read_i32(buf, table_offset)?;
        let vtable_offset = if vtable_soffset >= 0 {
            table_offset
                .checked_sub(vtable_soffset as usize)
                .ok_or_else(|| EncodingError::invalid_flatbuffer("vtable offset underflow"))?
        } else {
            table_offset + ((-vtable_soffset) as usize)
        };

        if vtable_offset + 4 > buf.len() {
            return Err(EncodingError::invalid_flatbuffer("vtable out of bounds"));
        }

        let vtable_size = read_u16(buf, vtable_offset)? as usize;
        if vtable_size < 4 || vtable_offset + vtable_size > buf.len() {
            return Err(EncodingError::invalid_flatbuffer("invalid vtable size"));
        }

        let vtable_fields = (vtable_size - 4) / 2;

        Ok(Self {
            buf,
            table_offset,
            vtable_offset,
            vtable_fields,
        })
    }

    /// Get field offset from vtable, or None if the field is absent
    fn field_offset(&self, field_index: usize) -> Option<usize> {
        if field_index >= self.vtable_fields {
            return None;
        }

        let slot_offset = self.vtable_offset + 4 + field_index * 2;
        if slot_offset + 2 > self.buf.len() {
            return None;
        }

        let field_offset = read_u16(self.buf, slot_offset).ok()? as usize;
        if field_offset == 0 {
            None
        } else {
            Some(self.table_offset + field_offset)
        }
    }

    /// Read a scalar u8 field with default
    pub fn read_u8(&self, field_index: usize, default: u8) -> u8 {
        self.field_offset(field_index)
            .and_then(|off| self.buf.get(off).copied())
            .unwrap_or(default)
    }

    /// Read a scalar u64 field with default
    pub fn read_u64(&self, field_index: usize, default: u64) -> u64 {
        self.field_offset(field_index)
            .and_then(|off| read_u64(self.buf, off).ok())
            .unwrap_or(default)
    }

    /// Whether a field slot is present in the vtable
    pub fn has_field(&self, field_index: usize) -> bool {
        self.field_offset(field_index).is_some()
    }

    /// Read a byte-vector field
    pub fn read_bytes(&self, field_index: usize) -> Result<Option<&'a [u8]>> {
        let Some(field_offset) = self.field_offset(field_index) else {
            return Ok(None);
        };
        read_vector(self.buf, field_offset).map(Some)
    }

    /// Read a fixed-size byte-vector field (e.g. UUID)
    pub fn read_fixed_bytes<const N: usize>(
        &self,
        field_index: usize,
        field: &'static str,
    ) -> Result<Option<&'a [u8; N]>> {
        let Some(bytes) = self.read_bytes(field_index)? else {
            return Ok(None);
        };
        if bytes.len() != N {
            return Err(EncodingError::invalid_length(field, N, bytes.len()));
        }
        Ok(Some(bytes.try_into().expect("length just checked")))
    }

    /// Read a string field (NUL terminator is not included)
    pub fn read_string(&self, field_index: usize) -> Result<Option<&'a str>> {
        let Some(bytes) = self.read_bytes(field_index)? else {
            return Ok(None);
        };
        std::str::from_utf8(bytes)
            .map(Some)
            .map_err(|_| EncodingError::invalid_flatbuffer("invalid UTF-8 string"))
    }

    /// Read a vector-of-tables field
    pub fn read_vector_of_tables(&self, field_index: usize) -> Result<Option<Vec<FlatTable<'a>>>> {
        let Some(field_offset) = self.field_offset(field_index) else {
            return Ok(None);
        };

        if field_offset + 4 > self.buf.len() {
            return Err(EncodingError::invalid_flatbuffer("vector offset out of bounds"));
        }

        let vector_rel = read_u32(self.buf, field_offset)? as usize;
        let vector_offset = field_offset + vector_rel;

        if vector_offset + 4 > self.buf.len() {
            return Err(EncodingError::invalid_flatbuffer("vector data out of bounds"));
        }

        let length = read_u32(self.buf, vector_offset)? as usize;
        let data_start = vector_offset + 4;

        // Each element is a 4-byte offset to a table
        if data_start + length * 4 > self.buf.len() {
            return Err(EncodingError::invalid_flatbuffer("vector elements out of bounds"));
        }

        let mut tables = Vec::with_capacity(length);
        for i in 0..length {
            let elem_offset_pos = data_start + i * 4;
            let elem_rel = read_u32(self.buf, elem_offset_pos)? as usize;
            tables.push(FlatTable::parse(self.buf, elem_offset_pos + elem_rel)?);
        }

        Ok(Some(tables))
    }
}

// =============================================================================
// Batch view
// =============================================================================

/// Parsed view of one Batch message
#[derive(Debug, Clone, Copy)]
pub struct BatchView<'a> {
    table: FlatTable<'a>,
}

impl<'a> BatchView<'a> {
    /// Parse a Batch message.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        Ok(Self {
            table: FlatTable::parse_root(buf)?,
        })
    }

    /// The API key (required, 16 bytes)
    pub fn api_key(&self) -> Result<&'a [u8; API_KEY_LENGTH]> {
        self.table
            .read_fixed_bytes(BATCH_FIELD_API_KEY, "api_key")?
            .ok_or(EncodingError::missing_field("api_key"))
    }

    /// The schema type; Unknown if absent
    pub fn schema_type(&self) -> SchemaType {
        SchemaType::from_u8(self.table.read_u8(BATCH_FIELD_SCHEMA_TYPE, 0))
    }

    /// The protocol version; 0 if absent
    pub fn version(&self) -> u8 {
        self.table.read_u8(BATCH_FIELD_VERSION, 0)
    }

    /// The batch id; 0 if absent
    pub fn batch_id(&self) -> u64 {
        self.table.read_u64(BATCH_FIELD_BATCH_ID, 0)
    }

    /// Whether the batch_id slot is present at all
    pub fn has_batch_id(&self) -> bool {
        self.table.has_field(BATCH_FIELD_BATCH_ID)
    }

    /// The inner EventData/LogData bytes (required)
    pub fn data(&self) -> Result<&'a [u8]> {
        self.table
            .read_bytes(BATCH_FIELD_DATA)?
            .ok_or(EncodingError::missing_field("data"))
    }
}

// =============================================================================
// Event / log entry views
// =============================================================================

/// Decoded view of one Event table
#[derive(Debug, Clone)]
pub struct EventView<'a> {
    pub event_type: EventType,
    pub timestamp: u64,
    pub service: Option<&'a str>,
    pub device_id: Option<&'a [u8; UUID_LENGTH]>,
    pub session_id: Option<&'a [u8; UUID_LENGTH]>,
    pub event_name: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Decoded view of one LogEntry table
#[derive(Debug, Clone)]
pub struct LogEntryView<'a> {
    pub event_type: LogEventType,
    pub session_id: Option<&'a [u8; UUID_LENGTH]>,
    pub level: LogLevel,
    pub timestamp: u64,
    pub source: Option<&'a str>,
    pub service: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Parse an EventData container into its events.
pub fn read_event_data(buf: &[u8]) -> Result<Vec<EventView<'_>>> {
    let table = FlatTable::parse_root(buf)?;
    let children = table
        .read_vector_of_tables(0)?
        .ok_or(EncodingError::missing_field("events"))?;

    let mut events = Vec::with_capacity(children.len());
    for child in children {
        events.push(EventView {
            event_type: EventType::from_u8(child.read_u8(0, 0)),
            timestamp: child.read_u64(1, 0),
            service: child.read_string(2)?,
            device_id: child.read_fixed_bytes(3, "device_id")?,
            session_id: child.read_fixed_bytes(4, "session_id")?,
            event_name: child.read_string(5)?,
            payload: child.read_bytes(6)?.unwrap_or(&[]),
        });
    }
    Ok(events)
}

/// Parse a LogData container into its log entries.
pub fn read_log_data(buf: &[u8]) -> Result<Vec<LogEntryView<'_>>> {
    let table = FlatTable::parse_root(buf)?;
    let children = table
        .read_vector_of_tables(0)?
        .ok_or(EncodingError::missing_field("logs"))?;

    let mut logs = Vec::with_capacity(children.len());
    for child in children {
        logs.push(LogEntryView {
            event_type: LogEventType::from_u8(child.read_u8(0, 0)),
            session_id: child.read_fixed_bytes(1, "session_id")?,
            level: LogLevel::from_u8(child.read_u8(2, 0)),
            timestamp: child.read_u64(3, 0),
            source: child.read_string(4)?,
            service: child.read_string(5)?,
            payload: child.read_bytes(6)?.unwrap_or(&[]),
        });
    }
    Ok(logs)
}

// =============================================================================
// Little-endian read helpers
// =============================================================================

fn read_vector(buf: &[u8], field_offset: usize) -> Result<&[u8]> {
    if field_offset + 4 > buf.len() {
        return Err(EncodingError::invalid_flatbuffer("vector offset out of bounds"));
    }

    let vector_rel = read_u32(buf, field_offset)? as usize;
    let vector_offset = field_offset + vector_rel;

    if vector_offset + 4 > buf.len() {
        return Err(EncodingError::invalid_flatbuffer("vector data out of bounds"));
    }

    let length = read_u32(buf, vector_offset)? as usize;
    let data_start = vector_offset + 4;

    if data_start + length > buf.len() {
        return Err(EncodingError::invalid_flatbuffer("vector data extends past buffer"));
    }

    Ok(&buf[data_start..data_start + length])
}

#[inline]
fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    if offset + 2 > buf.len() {
        return Err(EncodingError::too_short(offset + 2, buf.len()));
    }
    Ok(u16::from_le_bytes([buf[offset], buf[offset + 1]]))
}

#[inline]
fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > buf.len() {
        return Err(EncodingError::too_short(offset + 4, buf.len()));
    }
    Ok(u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

#[inline]
fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    if offset + 4 > buf.len() {
        return Err(EncodingError::too_short(offset + 4, buf.len()));
    }
    Ok(i32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

#[inline]
fn read_u64(buf: &[u8], offset: usize) -> Result<u64> {
    if offset + 8 > buf.len() {
        return Err(EncodingError::too_short(offset + 8, buf.len()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    Ok(u64::from_le_bytes(bytes))
}
