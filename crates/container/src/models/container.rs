use super::GameMetadata;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// On-disk image format, decided by extension and confirmed by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Format {
    Nsp,
    Nsz,
    Xci,
    Xcz,
}
impl Format {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "nsp" => Some(Self::Nsp),
            "nsz" => Some(Self::Nsz),
            "xci" => Some(Self::Xci),
            "xcz" => Some(Self::Xcz),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Nsp => "nsp",
            Self::Nsz => "nsz",
            Self::Xci => "xci",
            Self::Xcz => "xcz",
        }
    }

    /// Package images (PFS0) versus gamecard images (HFS0 partitions).
    pub fn is_gamecard(&self) -> bool {
        matches!(self, Self::Xci | Self::Xcz)
    }
}
impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.extension())
    }
}

/// How a logical container is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ContainerKind {
    /// One file, one content record.
    Plain,
    /// Several sequentially numbered parts forming one file.
    Split,
    /// One file embedding more than one content record.
    MultiContent,
}

/// A logical container file.
///
/// For split archives `path` is part zero and `parts` lists every part in
/// order; otherwise `parts` holds just `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerFile {
    pub path: PathBuf,
    pub parts: Vec<PathBuf>,
    pub format: Format,
    pub kind: ContainerKind,
}
impl ContainerFile {
    /// The folder containing the file.
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }

    pub fn is_split(&self) -> bool {
        self.parts.len() > 1 || matches!(self.kind, ContainerKind::Split)
    }

    /// Label used in listings: `split`, `multi-content` or the extension.
    pub fn type_label(&self) -> &'static str {
        match self.kind {
            ContainerKind::Split => "split",
            ContainerKind::MultiContent => "multi-content",
            ContainerKind::Plain => self.format.extension(),
        }
    }
}

/// The outcome of successfully parsing one container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedContainer {
    pub file: ContainerFile,
    /// Never empty; more than one entry means a multi-content container.
    pub metadata: Vec<GameMetadata>,
}
