use std::str::Utf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Every way a scan can fail. Offsets are absolute positions in the module buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("expected bytes {expected:02x?} at offset {offset}, found {actual:02x?}")]
    UnexpectedBytes { offset: usize, expected: Vec<u8>, actual: Vec<u8> },

    #[error("read of {needed} byte(s) at offset {offset} runs past the end of the buffer ({remaining} remaining)")]
    OutOfBounds { offset: usize, needed: usize, remaining: usize },

    #[error("unterminated LEB128 integer at offset {offset}")]
    MalformedVarint { offset: usize },

    #[error("LEB128 integer at offset {offset} does not fit in 32 bits")]
    IntegerOverflow { offset: usize },

    #[error("name at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: Utf8Error,
    },

    #[error("unknown import descriptor kind 0x{value:02x} at offset {offset}")]
    UnknownImportKind { offset: usize, value: u8 },
}

impl ScanError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        ScanError::InvalidInput { reason: reason.into() }
    }
}
