//! Input validation
//!
//! Pure predicates over ingestion inputs, plus the API key decoder. The
//! predicates return `bool`; only the decoder produces an error
//! (kind Configuration) because it runs at build time.

use crate::error::{Result, TellError};

/// Maximum event name length in bytes
pub const MAX_EVENT_NAME_LEN: usize = 256;

/// Maximum log message length in bytes
pub const MAX_LOG_MESSAGE_LEN: usize = 65_536;

/// Maximum service name length in bytes
pub const MAX_SERVICE_NAME_LEN: usize = 256;

/// A user id must be non-empty.
#[inline]
pub fn check_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
}

/// An event name must be non-empty and at most 256 bytes.
#[inline]
pub fn check_event_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_EVENT_NAME_LEN
}

/// A log message must be non-empty and at most 64 KiB.
#[inline]
pub fn check_log_message(message: &str) -> bool {
    !message.is_empty() && message.len() <= MAX_LOG_MESSAGE_LEN
}

/// A service name must be at most 256 bytes; empty is allowed and is
/// resolved to `"app"` elsewhere.
#[inline]
pub fn check_service_name(service: &str) -> bool {
    service.len() <= MAX_SERVICE_NAME_LEN
}

/// Validate and decode a 32-character hex API key to 16 bytes.
///
/// Accepts upper and lower case. Output preserves the input byte order
/// (big-endian with respect to the hex string).
pub fn decode_api_key(api_key: &str) -> Result<[u8; 16]> {
    if api_key.len() != 32 {
        return Err(TellError::configuration(format!(
            "apiKey must be 32 hex characters, got {}",
            api_key.len()
        )));
    }

    let mut bytes = [0u8; 16];
    for (i, chunk) in api_key.as_bytes().chunks_exact(2).enumerate() {
        let hi = hex_value(chunk[0]);
        let lo = hex_value(chunk[1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => bytes[i] = (hi << 4) | lo,
            _ => {
                let bad = if hi.is_none() { chunk[0] } else { chunk[1] };
                return Err(TellError::configuration(format!(
                    "apiKey contains non-hex character '{}'",
                    bad as char
                )));
            }
        }
    }

    Ok(bytes)
}

#[inline]
fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
