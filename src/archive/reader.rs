use crate::error::ArchiveError;

use super::header::{padding_len, EntryFields, EntryHeader, BLOCK_SIZE};

/// One entry read back from an archive stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry<'a> {
    pub fields: EntryFields,
    pub payload: &'a [u8],
}

/// Sequential reader over a complete archive held in memory.
///
/// Stops at the end of the buffer or at an all-zero end-of-archive block.
pub struct ArchiveReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_entry(&mut self) -> Result<Option<ArchiveEntry<'a>>, ArchiveError> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }

        let header_end = self.offset + BLOCK_SIZE;
        let block: [u8; BLOCK_SIZE] = self
            .data
            .get(self.offset..header_end)
            .and_then(|b| b.try_into().ok())
            .ok_or(ArchiveError::Truncated {
                offset: self.offset,
            })?;
        if block.iter().all(|&b| b == 0) {
            self.offset = self.data.len();
            return Ok(None);
        }

        let fields = EntryHeader::from_bytes(block).decode()?;
        let payload_end = usize::try_from(fields.size)
            .ok()
            .and_then(|size| header_end.checked_add(size))
            .filter(|&end| end <= self.data.len())
            .ok_or(ArchiveError::Truncated { offset: header_end })?;
        let payload = &self.data[header_end..payload_end];

        let next = payload_end + padding_len(fields.size);
        if next > self.data.len() {
            return Err(ArchiveError::Truncated {
                offset: payload_end,
            });
        }
        self.offset = next;

        Ok(Some(ArchiveEntry { fields, payload }))
    }
}

impl<'a> Iterator for ArchiveReader<'a> {
    type Item = Result<ArchiveEntry<'a>, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}
