use std::io::{self, Read, Write};

/// Read until `buf` is full or the reader reports end of input.
///
/// Returns how many bytes landed in `buf`. Unlike `read_exact`, a short count
/// is not an error here: callers decide what a partial read means.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Write all of `buf`, stopping early if the writer accepts zero bytes.
///
/// Returns how many bytes were accepted. A count below `buf.len()` is a short
/// write.
pub(crate) fn write_up_to<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}
