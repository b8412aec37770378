//! Tell wire format - hand-written FlatBuffer encoding
//!
//! This crate produces (and verifies) the FlatBuffer wire format consumed by
//! the Tell collector, without code generation and without an intermediate
//! DOM. Encoders append directly to a caller-provided `Vec<u8>` so buffers
//! can be reused across batches.
//!
//! # Wire Format
//!
//! FlatBuffers uses a vtable-based format:
//! ```text
//! [4 bytes: root offset] -> [table]
//!                              |
//!                              v
//!                           [vtable offset (i32)]
//!                           [field data...]
//!                              |
//!                              v
//!                           [vtable]
//!                           [vtable size (u16)]
//!                           [table size (u16)]
//!                           [field offsets (u16 each)]
//! ```
//!
//! Three top-level tables are written:
//!
//! - `Event` / `EventData` - product analytics events
//! - `LogEntry` / `LogData` - structured log entries
//! - `Batch` - the outer container tagged with API key, schema type,
//!   version and batch id
//!
//! The [`reader`] module parses the same layout back with full bounds
//! checking. It exists for frame verification; the SDK itself never decodes
//! on the hot path.

mod error;
mod schema;

pub mod encode;
pub mod reader;

pub use encode::{
    encode_batch_into, encode_event_data_into, encode_event_into, encode_log_data_into,
    encode_log_entry_into, BatchParams, EventParams, LogEntryParams,
};
pub use error::EncodingError;
pub use reader::{read_event_data, read_log_data, BatchView, EventView, FlatTable, LogEntryView};
pub use schema::{EventType, LogEventType, LogLevel, SchemaType};

/// Result type for wire format operations
pub type Result<T> = std::result::Result<T, EncodingError>;

/// API key length in bytes
pub const API_KEY_LENGTH: usize = 16;

/// Device and session id length in bytes (UUID)
pub const UUID_LENGTH: usize = 16;

/// Wire protocol version written into every batch (v1.0 = 100)
pub const DEFAULT_VERSION: u8 = 100;
