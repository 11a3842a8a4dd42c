//! Error taxonomy for container decoding.
//!
//! Every variant is terminal for the decode operation that produced it: the
//! format carries no resynchronisation marker, so nothing is retried. Block
//! level variants carry the zero-based index of the offending block record.

use std::fmt;
use std::io;
use thiserror::Error;

/// Why a declared block length was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthFault {
    /// The declared length is larger than the compressed staging buffer.
    ExceedsCapacity { capacity: usize },
    /// The stream ended after `available` of the declared bytes.
    ShortPayload { available: usize },
}

impl fmt::Display for LengthFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthFault::ExceedsCapacity { capacity } => {
                write!(f, "exceeds staging capacity of {capacity} bytes")
            }
            LengthFault::ShortPayload { available } => {
                write!(f, "only {available} bytes available")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid magic number 0x{found:08X} (expected 0x{expected:08X})")]
    BadMagic { found: u32, expected: u32 },

    #[error("Cannot read the container header: {available} of 4 bytes available")]
    TruncatedHeader { available: usize },

    #[error("Block {block}: length prefix truncated, {available} of 4 bytes available")]
    TruncatedLength { block: u64, available: usize },

    #[error("Block {block}: invalid compressed length {declared} ({fault})")]
    InvalidCompressedLength { block: u64, declared: u32, fault: LengthFault },

    #[error("Block {block}: input exhausted before any of the {declared} payload bytes")]
    StreamReadFailure { block: u64, declared: u32 },

    #[error("Block {block}: short write, sink accepted {written} of {expected} bytes")]
    StreamWriteFailure { block: u64, expected: usize, written: usize },

    #[error("Block {block}: decompressed data exceeds output capacity of {capacity} bytes")]
    DecompressionOverflow { block: u64, capacity: usize },

    #[error("Block {block}: corrupt compressed data: {reason}")]
    CorruptBlock { block: u64, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FormatError {
    /// Index of the block record the error refers to, if any.
    pub fn block(&self) -> Option<u64> {
        match self {
            FormatError::TruncatedLength { block, .. }
            | FormatError::InvalidCompressedLength { block, .. }
            | FormatError::StreamReadFailure { block, .. }
            | FormatError::StreamWriteFailure { block, .. }
            | FormatError::DecompressionOverflow { block, .. }
            | FormatError::CorruptBlock { block, .. } => Some(*block),
            FormatError::BadMagic { .. }
            | FormatError::TruncatedHeader { .. }
            | FormatError::Io(_) => None,
        }
    }
}

impl From<FormatError> for io::Error {
    fn from(e: FormatError) -> Self {
        match e {
            FormatError::Io(inner) => inner,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
