//! Streaming container decoding.
//!
//! # Decode loop
//! [`decode_stream`] drives one container from an input reader to an output
//! sink:
//!
//! ```text
//! AwaitHeader ──ok──▶ Streaming ──clean EOF──▶ Done
//!      │                 │  ▲
//!      │                 │  └── block decoded
//!      └──── error ──────┴────────▶ Failed
//! ```
//!
//! Blocks are strictly sequential: the only way to find a block boundary is
//! to consume the block before it. The first error aborts; there is no
//! resynchronisation marker to skip to. Output already written before the
//! failing block stays in the sink.
//!
//! # Reader
//! [`Flz4Reader`] exposes the decoded bytes through `std::io::Read`, decoding
//! one block whenever its buffer runs dry.

use log::{debug, trace};
use serde::Serialize;
use std::io::{self, Read, Write};

use crate::block::{BlockDecoder, DecodeOptions, LENGTH_PREFIX_SIZE};
use crate::error::FormatError;
use crate::header::{read_header, HEADER_SIZE};

/// Statistics for a container that decoded successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeSummary {
    /// Non-empty blocks decoded.
    pub blocks: u64,
    /// Zero-length block records skipped.
    pub empty_blocks: u64,
    /// Container bytes consumed, header included.
    pub bytes_in: u64,
    /// Decompressed bytes written.
    pub bytes_out: u64,
}

enum DecodeState {
    AwaitHeader,
    Streaming,
    Done,
    Failed(FormatError),
}

/// Decode a whole container from `input` into `output` with default
/// options.
pub fn decode_stream<R, W>(input: &mut R, output: &mut W) -> Result<DecodeSummary, FormatError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    decode_stream_with(input, output, &DecodeOptions::default())
}

pub fn decode_stream_with<R, W>(
    input: &mut R,
    output: &mut W,
    options: &DecodeOptions,
) -> Result<DecodeSummary, FormatError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut decoder = BlockDecoder::with_options(options);
    let mut summary = DecodeSummary::default();
    let mut state = DecodeState::AwaitHeader;

    loop {
        state = match state {
            DecodeState::AwaitHeader => match read_header(input) {
                Ok(()) => {
                    summary.bytes_in = HEADER_SIZE as u64;
                    DecodeState::Streaming
                }
                Err(e) => DecodeState::Failed(e),
            },
            DecodeState::Streaming => match decoder.next_block_length(input) {
                Ok(None) => DecodeState::Done,
                Ok(Some(length)) => match decoder.decode_block(input, length, output) {
                    Ok(written) => {
                        summary.bytes_in += (LENGTH_PREFIX_SIZE as u64) + u64::from(length);
                        summary.bytes_out += written as u64;
                        DecodeState::Streaming
                    }
                    Err(e) => DecodeState::Failed(e),
                },
                Err(e) => DecodeState::Failed(e),
            },
            DecodeState::Done => {
                summary.blocks = decoder.blocks_decoded();
                summary.empty_blocks = decoder.records() - decoder.blocks_decoded();
                debug!(
                    "container done: {} block(s), {} -> {} bytes",
                    summary.blocks, summary.bytes_in, summary.bytes_out
                );
                return Ok(summary);
            }
            DecodeState::Failed(e) => {
                debug!(
                    "container failed after {} block(s), {} bytes written: {e}",
                    decoder.blocks_decoded(),
                    summary.bytes_out
                );
                return Err(e);
            }
        };
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// `Read` adapter yielding the decompressed contents of a container.
///
/// The header is validated by [`Flz4Reader::new`]. Format errors surface as
/// `io::ErrorKind::InvalidData` wrapping the [`FormatError`]. A failed reader
/// stays failed: every later read returns `InvalidData` again, never `Ok(0)`.
pub struct Flz4Reader<R: Read> {
    inner: R,
    decoder: BlockDecoder,
    /// Decoded bytes of the current block live in the decoder's output
    /// staging buffer; `pos..filled` is what has not been handed out yet.
    pos: usize,
    filled: usize,
    finished: bool,
    /// Message of the fault that stopped decoding.
    fault: Option<String>,
}

impl<R: Read> Flz4Reader<R> {
    pub fn new(inner: R) -> Result<Self, FormatError> {
        Self::with_options(inner, &DecodeOptions::default())
    }

    pub fn with_options(mut inner: R, options: &DecodeOptions) -> Result<Self, FormatError> {
        read_header(&mut inner)?;
        Ok(Self {
            inner,
            decoder: BlockDecoder::with_options(options),
            pos: 0,
            filled: 0,
            finished: false,
            fault: None,
        })
    }

    /// Non-empty blocks decoded so far.
    pub fn blocks_decoded(&self) -> u64 { self.decoder.blocks_decoded() }

    pub fn into_inner(self) -> R { self.inner }

    /// Decode records until one yields bytes. Returns `false` at clean end of
    /// stream.
    fn refill(&mut self) -> Result<bool, FormatError> {
        loop {
            let length = match self.decoder.next_block_length(&mut self.inner)? {
                Some(length) => length,
                None => return Ok(false),
            };
            let produced = self.decoder.decompress_block(&mut self.inner, length)?.len();
            if produced > 0 {
                trace!("reader: block ready, {produced} bytes");
                self.pos = 0;
                self.filled = produced;
                return Ok(true);
            }
        }
    }
}

impl<R: Read> Read for Flz4Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(fault) = &self.fault {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("container decoding already failed: {fault}"),
            ));
        }
        if self.pos == self.filled {
            if self.finished {
                return Ok(0);
            }
            match self.refill() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    return Ok(0);
                }
                Err(e) => {
                    self.fault = Some(e.to_string());
                    return Err(e.into());
                }
            }
        }
        let pending = &self.decoder.output()[self.pos..self.filled];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MAGIC;
    use std::io::Cursor;

    fn push_block(out: &mut Vec<u8>, data: &[u8]) {
        let payload = lz4_flex::block::compress(data);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&payload);
    }

    fn container(blocks: &[&[u8]]) -> Vec<u8> {
        let mut out = MAGIC.to_le_bytes().to_vec();
        for data in blocks {
            push_block(&mut out, data);
        }
        out
    }

    #[test]
    fn decodes_blocks_in_order() {
        let bytes = container(&[b"alpha alpha alpha", b"beta", b"gamma gamma"]);
        let mut out = Vec::new();
        let summary = decode_stream(&mut Cursor::new(&bytes), &mut out).unwrap();
        assert_eq!(out, b"alpha alpha alphabetagamma gamma");
        assert_eq!(summary.blocks, 3);
        assert_eq!(summary.empty_blocks, 0);
        assert_eq!(summary.bytes_in, bytes.len() as u64);
        assert_eq!(summary.bytes_out, out.len() as u64);
    }

    #[test]
    fn failure_keeps_earlier_output() {
        let mut bytes = container(&[b"kept kept kept"]);
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 10]);
        let mut out = Vec::new();
        let err = decode_stream(&mut Cursor::new(&bytes), &mut out).unwrap_err();
        assert_eq!(err.block(), Some(1));
        assert_eq!(out, b"kept kept kept");
    }

    #[test]
    fn reader_serves_small_reads_across_blocks() {
        let mut bytes = container(&[b"0123456789"]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        push_block(&mut bytes, b"abcdef");
        let mut reader = Flz4Reader::new(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"0123456789abcdef");
        assert_eq!(reader.blocks_decoded(), 2);
    }

    #[test]
    fn reader_surfaces_format_errors_as_invalid_data() {
        let mut bytes = container(&[b"ok"]);
        bytes.push(0x01);
        let mut reader = Flz4Reader::new(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let inner = err.into_inner().unwrap().downcast::<FormatError>().unwrap();
        assert!(matches!(*inner, FormatError::TruncatedLength { block: 1, available: 1 }));
    }

    #[test]
    fn reader_stays_failed_after_a_fault() {
        let mut bytes = container(&[b"8 bytes!"]);
        bytes.push(0x01);
        let mut reader = Flz4Reader::new(Cursor::new(bytes)).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 8);
        for _ in 0..2 {
            let err = reader.read(&mut buf).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        }
    }

    #[test]
    fn reader_rejects_bad_magic_up_front() {
        assert!(matches!(
            Flz4Reader::new(Cursor::new(b"LZ4F".to_vec())),
            Err(FormatError::BadMagic { .. })
        ));
    }
}
