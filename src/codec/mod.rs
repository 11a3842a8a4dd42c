//! Block decompression primitive.
//!
//! A container block is a raw LZ4 block: no size prefix, no frame header, no
//! checksum. The only thing the format says about its decompressed size is
//! that it fits the output staging buffer, so every codec here decodes into a
//! caller-supplied, fixed-capacity slice and must refuse to write past its
//! end.
//!
//! Implementations MUST be bounds-checked on both the input and the output
//! side. An unchecked primitive is never acceptable for this format, since the
//! block payload is untrusted and not self-describing.

use lz4_flex::block::DecompressError;
use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The block expands past the output buffer.
    #[error("output buffer of {capacity} bytes is too small")]
    Overflow { capacity: usize },
    /// The block is not a valid encoding.
    #[error("{0}")]
    Corrupt(String),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait BlockCodec: Send + Sync {
    /// Human-readable name (diagnostics only).
    fn name(&self) -> &'static str;

    /// Decompress `src` into `dst`, returning the number of bytes produced.
    ///
    /// Never writes beyond `dst.len()`.
    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;
}

// ── LZ4 ──────────────────────────────────────────────────────────────────────

/// Raw LZ4 block codec backed by `lz4_flex`'s safe decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl BlockCodec for Lz4Codec {
    fn name(&self) -> &'static str { "lz4" }

    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        lz4_flex::block::decompress_into(src, dst).map_err(|e| match e {
            DecompressError::OutputTooSmall { .. } => CodecError::Overflow { capacity: dst.len() },
            other => CodecError::Corrupt(other.to_string()),
        })
    }
}
