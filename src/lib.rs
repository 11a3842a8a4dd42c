pub mod error;
pub mod header;
pub mod codec;
pub mod block;
pub mod io_stream;
pub mod scan;
pub mod container;
mod util;

pub use error::{FormatError, LengthFault};
pub use header::{read_header, MAGIC};
pub use codec::{BlockCodec, CodecError, Lz4Codec};
pub use block::{BlockDecoder, DecodeOptions};
pub use io_stream::{decode_stream, decode_stream_with, DecodeSummary, Flz4Reader};
pub use scan::{scan, ScanReport};
