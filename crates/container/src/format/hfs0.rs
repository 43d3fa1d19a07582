use super::{Entry, PartitionLayout, le_u64};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Read, Seek, SeekFrom};

const HFS0: PartitionLayout = PartitionLayout { magic: b"HFS0", label: "XCI", entry_size: 0x40 };
const CARD_MAGIC_OFFSET: u64 = 0x100;
const ROOT_PARTITION_OFFSET: u64 = 0x130;
/// Partitions that may carry installable content, in lookup order.
const CONTENT_PARTITIONS: [&str; 2] = ["secure", "normal"];

/// Lists the files of a gamecard image (XCI/XCZ).
///
/// The card header points at a root HFS0 partition whose entries are
/// themselves HFS0 partitions; the files of the content-bearing ones are
/// returned.
pub fn gamecard_entries<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Vec<Entry>> {
    let mut header = [0u8; 0x38];
    reader.seek(SeekFrom::Start(CARD_MAGIC_OFFSET)).or_raise(|| ErrorKind::Unreadable)?;
    reader.read_exact(&mut header).or_raise(|| ErrorKind::Malformed("XCI"))?;
    if &header[0..4] != b"HEAD" {
        exn::bail!(ErrorKind::Malformed("XCI"));
    }
    let root_offset = le_u64(&header, (ROOT_PARTITION_OFFSET - CARD_MAGIC_OFFSET) as usize);
    let root = HFS0.read(reader, root_offset)?;

    let mut files = Vec::new();
    for name in CONTENT_PARTITIONS {
        if let Some(partition) = root.iter().find(|e| e.name == name) {
            files.extend(HFS0.read(reader, partition.offset)?);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::XciBuilder;
    use std::io::Cursor;

    #[test]
    fn test_lists_secure_partition_files() {
        let image = XciBuilder::new().file("abc.cnmt.xml", b"<ContentMeta/>").build();
        let mut cursor = Cursor::new(image);
        let entries = gamecard_entries(&mut cursor).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "abc.cnmt.xml");
        assert_eq!(entries[0].read(&mut cursor, 1024).unwrap(), b"<ContentMeta/>");
    }

    #[test]
    fn test_rejects_missing_card_header() {
        let mut cursor = Cursor::new(vec![0u8; 0x200]);
        assert!(gamecard_entries(&mut cursor).is_err());
    }
}
