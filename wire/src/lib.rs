//! wire library
//! provides the binary trace dump format shared by the tracer and offline tools
//!
//! A dump is a fixed 8-byte magic, a 4-byte version, a 4-byte reserved word,
//! then a plain sequence of records until end of file. There is no event count
//! and no checksum; readers consume records until the stream ends. All
//! multi-byte integers are little-endian, strings are UTF-8 with a 2-byte
//! length prefix and no terminator.

mod decode;
mod encode;
mod record;

pub use decode::*;
pub use encode::*;
pub use record::*;

/// First 8 bytes of every dump file.
pub const MAGIC: [u8; 8] = *b"TRCLOG10";

/// Current format version.
pub const FORMAT_VERSION: u32 = 2;
