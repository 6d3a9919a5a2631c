//! Archive entry encoding.
//!
//! Each tile becomes one ustar entry: a 512 byte header, the tile payload, and
//! zero padding up to the next 512 byte boundary. Entries are emitted back to
//! back with no index, so any sequential tar reader can consume the stream.

mod header;
mod reader;

pub use header::{
    padding_len, EntryFields, EntryHeader, BLOCK_SIZE, CHECKSUM_MASK, MAX_ENTRY_SIZE,
};
pub use reader::{ArchiveEntry, ArchiveReader};

/// Extension of every tile entry name.
pub const ENTRY_EXTENSION: &str = ".tile";

/// Zero bytes used for payload padding.
pub static ZERO_BLOCK: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// Archive path of the tile at `(level, row, col)`.
///
/// Uses the exploded cache naming: decimal level, hexadecimal row and column.
pub fn entry_name(level: u32, row: u64, col: u64) -> String {
    format!("L{:02}/R{:08x}/C{:08x}{}", level, row, col, ENTRY_EXTENSION)
}
