//! Fixed-layout ustar entry header.
//!
//! Every field is written at an explicit offset into a 512 byte block, so the
//! layout does not depend on struct representation.
//!
//! ```text
//! offset  len  field
//!      0  100  name
//!    100    8  mode
//!    108    8  uid
//!    116    8  gid
//!    124   12  size
//!    136   12  mtime
//!    148    8  checksum
//!    156    1  typeflag
//!    157  100  linkname
//!    257    6  magic
//!    263    2  version
//!    265   32  uname
//!    297   32  gname
//!    329    8  devmajor
//!    337    8  devminor
//!    345  155  prefix
//!    500   12  padding
//! ```

use crate::error::ArchiveError;

/// Size of a header and the alignment unit of payloads.
pub const BLOCK_SIZE: usize = 512;

const NAME: (usize, usize) = (0, 100);
const MODE: (usize, usize) = (100, 8);
const UID: (usize, usize) = (108, 8);
const GID: (usize, usize) = (116, 8);
const SIZE: (usize, usize) = (124, 12);
const MTIME: (usize, usize) = (136, 12);
const CHECKSUM: (usize, usize) = (148, 8);
const TYPEFLAG: usize = 156;
const MAGIC: (usize, usize) = (257, 6);
const VERSION: (usize, usize) = (263, 2);
const UNAME: (usize, usize) = (265, 32);
const GNAME: (usize, usize) = (297, 32);
const DEVMAJOR: (usize, usize) = (329, 8);
const DEVMINOR: (usize, usize) = (337, 8);

/// Checksums are stored as 7 octal digits.
pub const CHECKSUM_MASK: u32 = 0o7777777;

/// Largest payload the 11 digit size field can describe.
pub const MAX_ENTRY_SIZE: u64 = 0o77777777777;

const ENTRY_MODE: u64 = 0o644;
const ENTRY_UID: u64 = 0;
const ENTRY_GID: u64 = 0;
const ENTRY_MTIME: u64 = 0;
const ENTRY_OWNER: &[u8] = b"root";
const TYPEFLAG_REGULAR: u8 = b'0';
const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
const USTAR_VERSION: &[u8; 2] = b"00";

/// A reusable 512 byte entry header.
#[derive(Clone)]
pub struct EntryHeader {
    block: [u8; BLOCK_SIZE],
}

impl Default for EntryHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntryHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryHeader")
            .field("name", &String::from_utf8_lossy(field_str(self.field(NAME))))
            .field("size", &parse_octal(self.field(SIZE)))
            .finish()
    }
}

impl EntryHeader {
    /// Create an all-zero header.
    pub fn new() -> Self {
        Self {
            block: [0; BLOCK_SIZE],
        }
    }

    /// Zero every field.
    pub fn reset(&mut self) {
        self.block.fill(0);
    }

    /// Fill the header for a regular file entry.
    ///
    /// The header is reset first, so no value from a previous entry survives.
    pub fn encode(&mut self, name: &str, size: u64) -> Result<&[u8; BLOCK_SIZE], ArchiveError> {
        // The name field must keep a terminating NUL.
        if name.len() >= NAME.1 {
            return Err(ArchiveError::NameTooLong(name.len()));
        }
        if size > MAX_ENTRY_SIZE {
            return Err(ArchiveError::SizeOverflow(size));
        }

        self.reset();
        self.field_mut(NAME)[..name.len()].copy_from_slice(name.as_bytes());
        write_octal(self.field_mut(MODE), ENTRY_MODE);
        write_octal(self.field_mut(UID), ENTRY_UID);
        write_octal(self.field_mut(GID), ENTRY_GID);
        write_octal(self.field_mut(SIZE), size);
        write_octal(self.field_mut(MTIME), ENTRY_MTIME);
        self.block[TYPEFLAG] = TYPEFLAG_REGULAR;
        self.field_mut(MAGIC).copy_from_slice(USTAR_MAGIC);
        self.field_mut(VERSION).copy_from_slice(USTAR_VERSION);
        self.field_mut(UNAME)[..ENTRY_OWNER.len()].copy_from_slice(ENTRY_OWNER);
        self.field_mut(GNAME)[..ENTRY_OWNER.len()].copy_from_slice(ENTRY_OWNER);
        write_octal(self.field_mut(DEVMAJOR), 0);
        write_octal(self.field_mut(DEVMINOR), 0);

        let sum = self.compute_checksum();
        write_octal(self.field_mut(CHECKSUM), sum as u64);

        Ok(&self.block)
    }

    /// Byte sum of the header with the checksum field read as spaces,
    /// masked to the width of the checksum field.
    pub fn compute_checksum(&self) -> u32 {
        let (start, len) = CHECKSUM;
        let sum: u32 = self
            .block
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                if (start..start + len).contains(&i) {
                    b' ' as u32
                } else {
                    b as u32
                }
            })
            .sum();
        sum & CHECKSUM_MASK
    }

    /// Raw header bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.block
    }

    /// Wrap an existing header block.
    pub fn from_bytes(block: [u8; BLOCK_SIZE]) -> Self {
        Self { block }
    }

    /// Decode the fields a reader cares about, verifying the checksum.
    pub fn decode(&self) -> Result<EntryFields, ArchiveError> {
        let stored = parse_octal(self.field(CHECKSUM))
            .ok_or(ArchiveError::InvalidField { field: "checksum" })? as u32;
        let computed = self.compute_checksum();
        if stored != computed {
            return Err(ArchiveError::BadChecksum { stored, computed });
        }

        Ok(EntryFields {
            name: String::from_utf8_lossy(field_str(self.field(NAME))).into_owned(),
            mode: parse_octal(self.field(MODE)).ok_or(ArchiveError::InvalidField { field: "mode" })?
                as u32,
            size: parse_octal(self.field(SIZE)).ok_or(ArchiveError::InvalidField { field: "size" })?,
            mtime: parse_octal(self.field(MTIME))
                .ok_or(ArchiveError::InvalidField { field: "mtime" })?,
            typeflag: self.block[TYPEFLAG],
            magic: self.field(MAGIC).try_into().unwrap_or([0; 6]),
            checksum: stored,
        })
    }

    fn field(&self, (start, len): (usize, usize)) -> &[u8] {
        &self.block[start..start + len]
    }

    fn field_mut(&mut self, (start, len): (usize, usize)) -> &mut [u8] {
        &mut self.block[start..start + len]
    }
}

/// Decoded header values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub name: String,
    pub mode: u32,
    pub size: u64,
    pub mtime: u64,
    pub typeflag: u8,
    pub magic: [u8; 6],
    pub checksum: u32,
}

/// Number of zero bytes that align `len` to the next block boundary.
pub fn padding_len(len: u64) -> usize {
    let rem = (len % BLOCK_SIZE as u64) as usize;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE - rem
    }
}

/// Write `value` as zero-padded octal digits followed by a NUL, filling the
/// field. Digits beyond the field width are dropped from the left.
fn write_octal(field: &mut [u8], value: u64) {
    let digits = field.len() - 1;
    let text = format!("{:0width$o}", value, width = digits);
    let text = &text.as_bytes()[text.len() - digits..];
    field[..digits].copy_from_slice(text);
    field[digits] = 0;
}

/// Parse an octal field, ignoring leading spaces and stopping at NUL or space.
fn parse_octal(field: &[u8]) -> Option<u64> {
    let digits: &[u8] = {
        let trimmed = field
            .iter()
            .position(|&b| b != b' ')
            .map_or(&field[..0], |start| &field[start..]);
        let end = trimmed
            .iter()
            .position(|&b| b == 0 || b == b' ')
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u64, |acc, &b| match b {
        b'0'..=b'7' => acc.checked_mul(8)?.checked_add((b - b'0') as u64),
        _ => None,
    })
}

fn field_str(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}
