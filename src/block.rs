//! Block records: length prefixes and per-block decompression.
//!
//! A [`BlockDecoder`] owns the two staging buffers for its whole lifetime and
//! reuses them for every block, so the per-block path never allocates. It
//! also carries the only stream state the format has: how many records have
//! been consumed, used to label errors.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use std::io::{Read, Write};

use crate::codec::{BlockCodec, CodecError, Lz4Codec};
use crate::error::{FormatError, LengthFault};
use crate::util::{read_up_to, write_up_to};

/// Size of a block record's length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;
/// Default compressed staging capacity.
pub const DEFAULT_STAGING_CAPACITY: usize = 65536;
/// Default decompressed staging capacity.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 65536;
/// Upper bound the CLI accepts for either staging capacity.
pub const MAX_CAPACITY: usize = 64 * 1024 * 1024;

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Largest compressed block accepted.
    pub staging_capacity: usize,
    /// Largest decompressed block accepted.
    pub output_capacity: usize,
    /// Keep the partial output file when decoding fails (file API only).
    pub keep_partial: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            staging_capacity: DEFAULT_STAGING_CAPACITY,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            keep_partial: false,
        }
    }
}

/// Fixed-capacity scratch space for one block.
#[derive(Debug)]
pub struct StagingBuffers {
    compressed: Box<[u8]>,
    decompressed: Box<[u8]>,
}

impl StagingBuffers {
    pub fn new(staging_capacity: usize, output_capacity: usize) -> Self {
        Self {
            compressed: vec![0u8; staging_capacity].into_boxed_slice(),
            decompressed: vec![0u8; output_capacity].into_boxed_slice(),
        }
    }

    pub fn staging_capacity(&self) -> usize { self.compressed.len() }
    pub fn output_capacity(&self) -> usize { self.decompressed.len() }
}

pub struct BlockDecoder {
    buffers: StagingBuffers,
    codec: Box<dyn BlockCodec>,
    /// Records consumed so far, including empty ones.
    records: u64,
    blocks_decoded: u64,
}

impl BlockDecoder {
    pub fn new() -> Self {
        Self::with_options(&DecodeOptions::default())
    }

    pub fn with_options(options: &DecodeOptions) -> Self {
        Self::with_codec(options, Box::new(Lz4Codec))
    }

    pub(crate) fn with_codec(options: &DecodeOptions, codec: Box<dyn BlockCodec>) -> Self {
        Self {
            buffers: StagingBuffers::new(options.staging_capacity, options.output_capacity),
            codec,
            records: 0,
            blocks_decoded: 0,
        }
    }

    /// Non-empty blocks successfully decompressed so far.
    pub fn blocks_decoded(&self) -> u64 { self.blocks_decoded }

    /// Block records consumed so far; also the index of the next record.
    pub fn records(&self) -> u64 { self.records }

    pub fn buffers(&self) -> &StagingBuffers { &self.buffers }

    /// The whole output staging buffer; only the prefix returned by the last
    /// [`decompress_block`](Self::decompress_block) is meaningful.
    pub(crate) fn output(&self) -> &[u8] { &self.buffers.decompressed }

    /// Read the next length prefix.
    ///
    /// `Ok(None)` means the stream ended cleanly on a record boundary. One to
    /// three trailing bytes are a truncated prefix, not end of stream.
    pub fn next_block_length<R: Read + ?Sized>(
        &self,
        input: &mut R,
    ) -> Result<Option<u32>, FormatError> {
        let mut buf = [0u8; LENGTH_PREFIX_SIZE];
        match read_up_to(input, &mut buf)? {
            0 => Ok(None),
            LENGTH_PREFIX_SIZE => {
                let length = LittleEndian::read_u32(&buf);
                trace!("block {}: length prefix {length}", self.records);
                Ok(Some(length))
            }
            available => Err(FormatError::TruncatedLength { block: self.records, available }),
        }
    }

    /// Read `length` payload bytes and decompress them into the output
    /// staging buffer, returning the decompressed bytes.
    ///
    /// A zero `length` reads nothing and yields an empty slice.
    pub fn decompress_block<R: Read + ?Sized>(
        &mut self,
        input: &mut R,
        length: u32,
    ) -> Result<&[u8], FormatError> {
        let block = self.records;
        self.records += 1;

        let declared = length as usize;
        let capacity = self.buffers.staging_capacity();
        if declared > capacity {
            return Err(FormatError::InvalidCompressedLength {
                block,
                declared: length,
                fault: LengthFault::ExceedsCapacity { capacity },
            });
        }
        if declared == 0 {
            debug!("block {block}: empty record");
            return Ok(&[]);
        }

        let staged = &mut self.buffers.compressed[..declared];
        let available = read_up_to(input, staged)?;
        if available == 0 {
            return Err(FormatError::StreamReadFailure { block, declared: length });
        }
        if available < declared {
            return Err(FormatError::InvalidCompressedLength {
                block,
                declared: length,
                fault: LengthFault::ShortPayload { available },
            });
        }

        let produced = self
            .codec
            .decompress_into(&self.buffers.compressed[..declared], &mut self.buffers.decompressed)
            .map_err(|e| match e {
                CodecError::Overflow { capacity } => {
                    FormatError::DecompressionOverflow { block, capacity }
                }
                CodecError::Corrupt(reason) => FormatError::CorruptBlock { block, reason },
            })?;

        self.blocks_decoded += 1;
        debug!("block {block}: {declared} -> {produced} bytes ({})", self.codec.name());
        Ok(&self.buffers.decompressed[..produced])
    }

    /// Decode one block record and write its bytes to `output`.
    ///
    /// Returns the number of bytes written, which is exactly how far `output`
    /// advanced.
    pub fn decode_block<R: Read + ?Sized, W: Write + ?Sized>(
        &mut self,
        input: &mut R,
        length: u32,
        output: &mut W,
    ) -> Result<usize, FormatError> {
        let block = self.records;
        let data = self.decompress_block(input, length)?;
        let expected = data.len();
        let written = write_up_to(output, data)?;
        if written < expected {
            return Err(FormatError::StreamWriteFailure { block, expected, written });
        }
        Ok(written)
    }
}

impl Default for BlockDecoder {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn small_options(staging: usize, output: usize) -> DecodeOptions {
        DecodeOptions { staging_capacity: staging, output_capacity: output, ..Default::default() }
    }

    #[test]
    fn length_prefix_clean_end_and_truncation() {
        let dec = BlockDecoder::new();
        assert_eq!(dec.next_block_length(&mut Cursor::new(Vec::new())).unwrap(), None);
        assert_eq!(
            dec.next_block_length(&mut Cursor::new(vec![0x10, 0x27, 0, 0])).unwrap(),
            Some(10_000)
        );
        for n in 1..LENGTH_PREFIX_SIZE {
            match dec.next_block_length(&mut Cursor::new(vec![0xAA; n])) {
                Err(FormatError::TruncatedLength { block: 0, available }) => assert_eq!(available, n),
                other => panic!("expected TruncatedLength, got {other:?}"),
            }
        }
    }

    #[test]
    fn decodes_block_to_output() {
        let data = b"the quick brown fox jumps over the lazy dog, the lazy dog".to_vec();
        let payload = lz4_flex::block::compress(&data);
        let mut dec = BlockDecoder::new();
        let mut out = Vec::new();
        let n = dec
            .decode_block(&mut Cursor::new(&payload), payload.len() as u32, &mut out)
            .unwrap();
        assert_eq!(n, data.len());
        assert_eq!(out, data);
        assert_eq!(dec.blocks_decoded(), 1);
    }

    #[test]
    fn oversized_length_rejected_before_reading() {
        let mut dec = BlockDecoder::new();
        let mut input = Cursor::new(vec![0u8; 16]);
        let err = dec
            .decode_block(&mut input, DEFAULT_STAGING_CAPACITY as u32 + 1, &mut Vec::new())
            .unwrap_err();
        match err {
            FormatError::InvalidCompressedLength { declared, fault, .. } => {
                assert_eq!(declared, 65537);
                assert_eq!(fault, LengthFault::ExceedsCapacity { capacity: 65536 });
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn exhausted_input_is_read_failure() {
        let mut dec = BlockDecoder::new();
        let err = dec.decode_block(&mut Cursor::new(Vec::new()), 8, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FormatError::StreamReadFailure { block: 0, declared: 8 }));
    }

    #[test]
    fn short_payload_is_invalid_length() {
        let mut dec = BlockDecoder::new();
        let err = dec.decode_block(&mut Cursor::new(vec![0u8; 3]), 8, &mut Vec::new()).unwrap_err();
        match err {
            FormatError::InvalidCompressedLength { declared: 8, fault, .. } => {
                assert_eq!(fault, LengthFault::ShortPayload { available: 3 })
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn expansion_past_output_capacity_overflows() {
        let payload = lz4_flex::block::compress(&[0u8; 512]);
        let mut dec = BlockDecoder::with_options(&small_options(1024, 256));
        let err = dec
            .decode_block(&mut Cursor::new(&payload), payload.len() as u32, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, FormatError::DecompressionOverflow { block: 0, capacity: 256 }));
    }

    #[test]
    fn malformed_payload_is_corrupt() {
        let mut dec = BlockDecoder::new();
        let err = dec
            .decode_block(&mut Cursor::new(vec![0x00, 0x01, 0x00]), 3, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, FormatError::CorruptBlock { block: 0, .. }));
    }

    /// Refuses every block as too large for the output buffer.
    struct Refusing;

    impl BlockCodec for Refusing {
        fn name(&self) -> &'static str { "refusing" }

        fn decompress_into(&self, _src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
            Err(CodecError::Overflow { capacity: dst.len() })
        }
    }

    #[test]
    fn codec_overflow_is_labelled_with_block_index() {
        let mut dec = BlockDecoder::with_codec(&small_options(64, 32), Box::new(Refusing));
        let mut input = Cursor::new(vec![0u8; 8]);
        assert_eq!(dec.decode_block(&mut input, 0, &mut Vec::new()).unwrap(), 0);
        let err = dec.decode_block(&mut input, 8, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FormatError::DecompressionOverflow { block: 1, capacity: 32 }));
    }

    #[test]
    fn zero_length_record_is_empty() {
        let mut dec = BlockDecoder::new();
        let mut out = Vec::new();
        assert_eq!(dec.decode_block(&mut Cursor::new(Vec::new()), 0, &mut out).unwrap(), 0);
        assert!(out.is_empty());
        assert_eq!(dec.blocks_decoded(), 0);
        assert_eq!(dec.records(), 1);
    }

    #[test]
    fn short_write_is_write_failure() {
        let data = vec![b'x'; 100];
        let payload = lz4_flex::block::compress(&data);
        let mut dec = BlockDecoder::new();
        let mut storage = [0u8; 40];
        let mut sink: &mut [u8] = &mut storage;
        let err = dec
            .decode_block(&mut Cursor::new(&payload), payload.len() as u32, &mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            FormatError::StreamWriteFailure { block: 0, expected: 100, written: 40 }
        ));
    }

    #[test]
    fn buffers_are_reused_across_blocks() {
        let mut dec = BlockDecoder::new();
        let before = dec.buffers().output_capacity();
        let mut out = Vec::new();
        for chunk in [&b"first block first block"[..], &b"second"[..], &b"third third third"[..]] {
            let payload = lz4_flex::block::compress(chunk);
            dec.decode_block(&mut Cursor::new(&payload), payload.len() as u32, &mut out).unwrap();
        }
        assert_eq!(out, b"first block first blocksecondthird third third");
        assert_eq!(dec.buffers().output_capacity(), before);
        assert_eq!(dec.records(), 3);
    }
}
