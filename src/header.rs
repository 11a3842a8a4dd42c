use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use std::io::Read;

use crate::error::FormatError;
use crate::util::read_up_to;

/// Container magic, stored little-endian as the ASCII bytes `FLZ4`.
pub const MAGIC: u32 = 0x345A_4C46;
/// Size of the magic number on disk.
pub const HEADER_SIZE: usize = 4;

/// Read and validate the container header.
///
/// Consumes exactly [`HEADER_SIZE`] bytes when they are available. Must be
/// called once, before any block record is read.
pub fn read_header<R: Read + ?Sized>(input: &mut R) -> Result<(), FormatError> {
    let mut buf = [0u8; HEADER_SIZE];
    let available = read_up_to(input, &mut buf)?;
    if available < HEADER_SIZE {
        return Err(FormatError::TruncatedHeader { available });
    }
    let found = LittleEndian::read_u32(&buf);
    if found != MAGIC {
        return Err(FormatError::BadMagic { found, expected: MAGIC });
    }
    trace!("container header ok (0x{found:08X})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn magic_bytes_spell_flz4() {
        assert_eq!(&MAGIC.to_le_bytes(), b"FLZ4");
    }

    #[test]
    fn accepts_magic_and_leaves_cursor_after_it() {
        let mut input = Cursor::new(b"FLZ4rest".to_vec());
        read_header(&mut input).unwrap();
        assert_eq!(input.position(), HEADER_SIZE as u64);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut input = Cursor::new(vec![0x02, 0x21, 0x4C, 0x18]);
        match read_header(&mut input) {
            Err(FormatError::BadMagic { found, expected }) => {
                assert_eq!(found, 0x184C_2102);
                assert_eq!(expected, MAGIC);
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn short_input_is_truncated_header() {
        for len in 0..HEADER_SIZE {
            let mut input = Cursor::new(b"FLZ4"[..len].to_vec());
            match read_header(&mut input) {
                Err(FormatError::TruncatedHeader { available }) => assert_eq!(available, len),
                other => panic!("expected TruncatedHeader, got {other:?}"),
            }
        }
    }
}
