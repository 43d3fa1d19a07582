//! Partition table readers for package (PFS0) and gamecard (HFS0) images.
//!
//! Only the file tables are decoded; content archives themselves are never
//! decrypted or decompressed.

mod hfs0;
mod pfs0;

pub use self::hfs0::gamecard_entries;
pub use self::pfs0::entries as package_entries;
use crate::consts::{MAX_PARTITION_ENTRIES, MAX_STRING_TABLE};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Read, Seek, SeekFrom};

/// A named file inside a partition, with its absolute offset in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}
impl Entry {
    /// Reads the entry's bytes, refusing anything larger than `limit`.
    pub fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R, limit: u64) -> Result<Vec<u8>> {
        if self.size > limit {
            exn::bail!(ErrorKind::ParseError { field: "entry size", value: format!("{} ({} bytes)", self.name, self.size) });
        }
        reader.seek(SeekFrom::Start(self.offset)).or_raise(|| ErrorKind::Unreadable)?;
        let mut buffer = vec![0; self.size as usize];
        reader.read_exact(&mut buffer).or_raise(|| ErrorKind::Unreadable)?;
        Ok(buffer)
    }
}

/// Layout shared by PFS0 and HFS0 partition headers: magic, entry count,
/// string table size, then a fixed-size entry table and the string table.
pub(crate) struct PartitionLayout {
    pub magic: &'static [u8; 4],
    pub label: &'static str,
    pub entry_size: usize,
}
impl PartitionLayout {
    pub(crate) fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R, base: u64) -> Result<Vec<Entry>> {
        reader.seek(SeekFrom::Start(base)).or_raise(|| ErrorKind::Unreadable)?;
        let mut header = [0u8; 0x10];
        reader.read_exact(&mut header).or_raise(|| ErrorKind::Malformed(self.label))?;
        if &header[0..4] != self.magic {
            exn::bail!(ErrorKind::Malformed(self.label));
        }
        let count = le_u32(&header, 0x4);
        let string_table_size = le_u32(&header, 0x8);
        if count > MAX_PARTITION_ENTRIES || string_table_size > MAX_STRING_TABLE {
            exn::bail!(ErrorKind::Malformed(self.label));
        }

        let mut table = vec![0u8; count as usize * self.entry_size];
        reader.read_exact(&mut table).or_raise(|| ErrorKind::Malformed(self.label))?;
        let mut strings = vec![0u8; string_table_size as usize];
        reader.read_exact(&mut strings).or_raise(|| ErrorKind::Malformed(self.label))?;

        let data_start = base
            .checked_add(0x10 + table.len() as u64 + strings.len() as u64)
            .ok_or_else(|| exn::Exn::from(ErrorKind::Malformed(self.label)))?;
        table
            .chunks_exact(self.entry_size)
            .map(|raw| -> Result<Entry> {
                let name_offset = le_u32(raw, 0x10) as usize;
                let name = strings
                    .get(name_offset..)
                    .and_then(|rest| rest.split(|b| *b == 0).next())
                    .ok_or_else(|| exn::Exn::from(ErrorKind::Malformed(self.label)))?;
                let offset = data_start
                    .checked_add(le_u64(raw, 0x0))
                    .ok_or_else(|| exn::Exn::from(ErrorKind::Malformed(self.label)))?;
                Ok(Entry {
                    name: String::from_utf8_lossy(name).into_owned(),
                    offset,
                    size: le_u64(raw, 0x8),
                })
            })
            .collect()
    }
}

pub(crate) fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

pub(crate) fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}
