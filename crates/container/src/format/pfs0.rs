use super::{Entry, PartitionLayout};
use crate::error::Result;
use std::io::{Read, Seek};

const PFS0: PartitionLayout = PartitionLayout { magic: b"PFS0", label: "PFS0", entry_size: 0x18 };

/// Lists the files of a package image (NSP/NSZ), whose PFS0 header starts at
/// offset zero.
pub fn entries<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Vec<Entry>> {
    PFS0.read(reader, 0)
}
