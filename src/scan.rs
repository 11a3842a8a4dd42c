//! Container scanner: per-block diagnostics without producing output.
//!
//! # How it works
//!
//! The scanner walks the container exactly like the decode loop does (header,
//! then length prefix and payload, one record at a time) and decompresses
//! every block into the staging buffer, but writes nothing. Each record gets a
//! [`BlockEntry`] with its offset, sizes and [`BlockHealth`].
//!
//! Format faults are data here, not errors: `scan()` only returns `Err` for
//! genuine I/O failures. The first fault ends the walk, since the format has
//! no marker to resynchronise on, and becomes the report's [`ScanOutcome`].

use log::info;
use serde::Serialize;
use std::io::{self, Read};

use crate::block::{BlockDecoder, DecodeOptions, LENGTH_PREFIX_SIZE};
use crate::error::{FormatError, LengthFault};
use crate::header::{read_header, HEADER_SIZE};

// ── Types ─────────────────────────────────────────────────────────────────────

/// The health verdict for one block record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockHealth {
    /// Payload read and decompressed.
    Healthy,
    /// Zero-length record.
    Empty,
    /// Declared length larger than the staging buffer.
    Oversized { capacity: usize },
    /// Fewer payload bytes follow than the prefix declares.
    TruncatedPayload { available: usize },
    /// Payload expands past the output buffer.
    Overflow { capacity: usize },
    /// Payload is not a valid LZ4 block.
    Corrupt { reason: String },
}

impl BlockHealth {
    pub fn is_usable(&self) -> bool {
        matches!(self, BlockHealth::Healthy | BlockHealth::Empty)
    }
}

/// Diagnostic record for one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEntry {
    pub index: u64,
    /// Byte offset of the length prefix in the container.
    pub offset: u64,
    pub compressed_len: u32,
    /// Known only for usable blocks.
    pub decompressed_len: Option<usize>,
    pub health: BlockHealth,
}

/// How the walk ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Clean end of stream after the last record.
    Complete,
    /// The header was missing or wrong; no block was examined.
    BadHeader { message: String },
    /// 1–3 stray bytes where a length prefix should be.
    TruncatedLength { available: usize },
    /// The last entry in the block log is unusable.
    BlockFault,
}

/// Complete report produced by `scan()`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    /// Container bytes examined.
    pub bytes_scanned: u64,
    /// Sum of the decompressed sizes of usable blocks.
    pub decompressed_bytes: u64,
    pub blocks: Vec<BlockEntry>,
}

impl ScanReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == ScanOutcome::Complete
    }

    pub fn healthy_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.health == BlockHealth::Healthy).count()
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        format!(
            "{:?}: {} record(s), {} healthy, {} -> {} bytes",
            self.outcome,
            self.blocks.len(),
            self.healthy_blocks(),
            self.bytes_scanned,
            self.decompressed_bytes,
        )
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

/// Walk a container and report on every block record up to the first fault.
pub fn scan<R: Read + ?Sized>(input: &mut R, options: &DecodeOptions) -> io::Result<ScanReport> {
    let mut report = ScanReport {
        outcome: ScanOutcome::Complete,
        bytes_scanned: 0,
        decompressed_bytes: 0,
        blocks: Vec::new(),
    };

    match read_header(input) {
        Ok(()) => report.bytes_scanned = HEADER_SIZE as u64,
        Err(FormatError::Io(e)) => return Err(e),
        Err(e) => {
            report.outcome = ScanOutcome::BadHeader { message: e.to_string() };
            return Ok(report);
        }
    }

    let mut decoder = BlockDecoder::with_options(options);
    loop {
        let offset = report.bytes_scanned;
        let compressed_len = match decoder.next_block_length(input) {
            Ok(Some(length)) => length,
            Ok(None) => break,
            Err(FormatError::TruncatedLength { available, .. }) => {
                report.bytes_scanned += available as u64;
                report.outcome = ScanOutcome::TruncatedLength { available };
                break;
            }
            Err(FormatError::Io(e)) => return Err(e),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        let index = decoder.records();
        report.bytes_scanned += LENGTH_PREFIX_SIZE as u64;

        let (health, decompressed_len, consumed) =
            match decoder.decompress_block(input, compressed_len) {
                Ok(data) if compressed_len == 0 => (BlockHealth::Empty, Some(data.len()), 0),
                Ok(data) => (BlockHealth::Healthy, Some(data.len()), compressed_len as usize),
                Err(e) => {
                    let (health, consumed) = classify(e, compressed_len)?;
                    (health, None, consumed)
                }
            };

        report.bytes_scanned += consumed as u64;
        report.decompressed_bytes += decompressed_len.unwrap_or(0) as u64;
        let usable = health.is_usable();
        report.blocks.push(BlockEntry { index, offset, compressed_len, decompressed_len, health });
        if !usable {
            report.outcome = ScanOutcome::BlockFault;
            break;
        }
    }

    info!("scan: {}", report.summary());
    Ok(report)
}

/// Map a block-level decode error to a health verdict and the number of
/// payload bytes it consumed.
fn classify(err: FormatError, declared: u32) -> io::Result<(BlockHealth, usize)> {
    Ok(match err {
        FormatError::InvalidCompressedLength { fault, .. } => match fault {
            LengthFault::ExceedsCapacity { capacity } => (BlockHealth::Oversized { capacity }, 0),
            LengthFault::ShortPayload { available } => {
                (BlockHealth::TruncatedPayload { available }, available)
            }
        },
        FormatError::StreamReadFailure { .. } => (BlockHealth::TruncatedPayload { available: 0 }, 0),
        FormatError::DecompressionOverflow { capacity, .. } => {
            (BlockHealth::Overflow { capacity }, declared as usize)
        }
        FormatError::CorruptBlock { reason, .. } => {
            (BlockHealth::Corrupt { reason }, declared as usize)
        }
        FormatError::Io(e) => return Err(e),
        other => return Err(io::Error::new(io::ErrorKind::InvalidData, other)),
    })
}
