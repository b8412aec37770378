//! Error type for wire format parsing
//!
//! Encoding never fails (the encoders accept any input and write a valid
//! buffer); all variants here come from the bounds-checked [`reader`].
//!
//! [`reader`]: crate::reader

use thiserror::Error;

/// Errors raised while parsing a FlatBuffer message
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Buffer ends before a required read
    #[error("message too short: need {needed} bytes, have {actual}")]
    TooShort {
        /// Bytes required to complete the read
        needed: usize,
        /// Bytes available
        actual: usize,
    },

    /// Structural invariant of the FlatBuffer layout is violated
    #[error("invalid flatbuffer: {0}")]
    InvalidFlatbuffer(String),

    /// A required field is absent from the vtable
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A fixed-length byte vector has the wrong length
    #[error("{field} must be exactly {expected} bytes, got {actual}")]
    InvalidLength {
        /// Field name
        field: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length found on the wire
        actual: usize,
    },
}

impl EncodingError {
    pub(crate) fn too_short(needed: usize, actual: usize) -> Self {
        Self::TooShort { needed, actual }
    }

    pub(crate) fn invalid_flatbuffer(msg: impl Into<String>) -> Self {
        Self::InvalidFlatbuffer(msg.into())
    }

    pub(crate) fn missing_field(name: &'static str) -> Self {
        Self::MissingField(name)
    }

    pub(crate) fn invalid_length(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            field,
            expected,
            actual,
        }
    }
}
