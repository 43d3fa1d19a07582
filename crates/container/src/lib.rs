//! Identity extraction for game container files.
//!
//! [`discover`] groups a folder listing into logical containers (joining
//! split archives) and [`Parser`] turns each one into content records:
//! title id, version and localized names.

mod consts;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod format;
pub mod models;
pub mod names;
mod reader;
mod split;

use crate::error::{ErrorKind, Result};
use crate::models::{ContainerFile, ContainerKind, Format, GameMetadata, ParsedContainer};
pub use crate::reader::{EmbeddedXmlReader, MetadataReader, ReadSeek};
pub use crate::split::{BrokenFamily, Discovered, SplitReader, discover, is_candidate, part_suffix};
use exn::ResultExt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::instrument;

/// Parses logical containers with a configurable [`MetadataReader`].
pub struct Parser {
    reader: Box<dyn MetadataReader>,
}
impl Default for Parser {
    fn default() -> Self {
        Self::new(EmbeddedXmlReader)
    }
}
impl Parser {
    pub fn new(reader: impl MetadataReader + 'static) -> Self {
        Self { reader: Box::new(reader) }
    }

    /// Extracts every content record from a container.
    ///
    /// Records without a localized name get one derived from the file name.
    /// When the container has no embedded records at all, the title id and
    /// version come from `[0100...]` and `[vN]` tags in the file name.
    ///
    /// # Errors
    ///
    /// Any error is specific to this file; callers are expected to record it
    /// and move on to the next file.
    #[instrument(skip(self, file), fields(path = %file.path.display()))]
    pub fn parse(&self, file: &ContainerFile) -> Result<ParsedContainer> {
        let mut reader: Box<dyn ReadSeek> = match file.parts.as_slice() {
            [] | [_] => Box::new(BufReader::new(File::open(&file.path).or_raise(|| ErrorKind::Unreadable)?)),
            parts => Box::new(BufReader::new(SplitReader::open(parts).or_raise(|| ErrorKind::Unreadable)?)),
        };
        let file_name = file.file_name();
        let mut metadata = self.reader.read(file.format, &mut *reader)?;
        if metadata.is_empty() {
            tracing::debug!("No embedded metadata; falling back to file name");
            let title_id = names::title_id_tag(&file_name).ok_or_else(|| exn::Exn::from(ErrorKind::MissingMetadata))?;
            metadata.push(GameMetadata::new(title_id, names::version_tag(&file_name).unwrap_or(0)));
        }
        for record in metadata.iter_mut().filter(|m| m.names.is_empty()) {
            record.derived_name = Some(names::title_from_file_name(&file_name));
        }

        let mut file = file.clone();
        if metadata.len() > 1 && file.kind == ContainerKind::Plain {
            file.kind = ContainerKind::MultiContent;
        }
        Ok(ParsedContainer { file, metadata })
    }

    /// Parses a single, unsplit file.
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<ParsedContainer> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let format =
            Format::from_extension(extension).ok_or_else(|| ErrorKind::UnsupportedFormat(extension.to_string()))?;
        self.parse(&ContainerFile {
            path: path.to_path_buf(),
            parts: vec![path.to_path_buf()],
            format,
            kind: ContainerKind::Plain,
        })
    }
}
