pub mod cursor;
pub mod codec;
pub mod diagnostics;
pub mod header;
pub mod block;
pub mod index;
pub mod perf;
pub mod segment;
pub mod error;
pub mod container;
pub mod xml;
pub mod manifest;
pub mod archive;

pub use codec::{get_codec, CodecId};
pub use container::{decode, decode_with, encode, encode_with, DecodeOptions, DecodedContainer, Document, EncodeOptions};
pub use diagnostics::{Outcome, Warning};
pub use error::{CxbError, Result};
pub use header::SegmentHeader;
pub use index::FormatError;
