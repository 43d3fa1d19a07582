//! Candidate discovery and split-archive handling.
//!
//! Large images are often stored as sequentially numbered parts, either
//! `game.nsp.00`, `game.nsp.01`, ... or `game.ns0`, `game.ns1`, ... Each
//! family is treated as one logical container whose first part stands in for
//! the whole.

use crate::consts::{SPLIT_NUMBERED_REGEX, SPLIT_SHORT_REGEX};
use crate::error::ErrorKind;
use crate::models::{ContainerFile, ContainerKind, Format};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A split family that cannot be read as one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenFamily {
    pub parts: Vec<PathBuf>,
    pub reason: ErrorKind,
}

/// Every candidate found in a set of paths.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// Sorted by path.
    pub containers: Vec<ContainerFile>,
    pub broken: Vec<BrokenFamily>,
}

enum Classified {
    Plain(Format),
    Part { family: PathBuf, format: Format, index: u32 },
}

fn classify(path: &Path) -> Option<Classified> {
    let name = path.file_name()?.to_str()?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    if let Some(captures) = SPLIT_NUMBERED_REGEX.captures(name) {
        let stem = &captures[1];
        let format = Format::from_extension(Path::new(stem).extension()?.to_str()?)?;
        let index = captures[2].parse().ok()?;
        return Some(Classified::Part { family: parent.join(stem), format, index });
    }
    if let Some(captures) = SPLIT_SHORT_REGEX.captures(name) {
        let format = match captures[2].to_ascii_lowercase().as_str() {
            "ns" => Format::Nsp,
            _ => Format::Xci,
        };
        let index = captures[3].parse().ok()?;
        let family = parent.join(format!("{}.{}", &captures[1], &captures[2]));
        return Some(Classified::Part { family, format, index });
    }
    Format::from_extension(path.extension()?.to_str()?).map(Classified::Plain)
}

/// The part of a split archive's file name that identifies the part, such
/// as `.nsp.01` or `.ns1`; renaming a family keeps this suffix on every part.
pub fn part_suffix(file_name: &str) -> Option<&str> {
    if let Some(stem) = SPLIT_NUMBERED_REGEX.captures(file_name).and_then(|c| c.get(1)) {
        let extension = Path::new(stem.as_str()).extension()?.len() + 1;
        return Some(&file_name[stem.end() - extension..]);
    }
    let stem = SPLIT_SHORT_REGEX.captures(file_name)?.get(1)?;
    Some(&file_name[stem.end()..])
}

/// Returns whether the path looks like a container or a container part.
pub fn is_candidate(path: &Path) -> bool {
    classify(path).is_some()
}

/// Groups paths into logical containers; paths with other extensions are
/// ignored.
pub fn discover<I, P>(paths: I) -> Discovered
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let mut discovered = Discovered::default();
    let mut families: BTreeMap<PathBuf, (Format, BTreeMap<u32, PathBuf>)> = BTreeMap::new();
    for path in paths.into_iter().map(Into::into) {
        match classify(&path) {
            Some(Classified::Plain(format)) => discovered.containers.push(ContainerFile {
                parts: vec![path.clone()],
                path,
                format,
                kind: ContainerKind::Plain,
            }),
            Some(Classified::Part { family, format, index }) => {
                families.entry(family).or_insert_with(|| (format, BTreeMap::new())).1.insert(index, path);
            },
            None => {},
        }
    }

    for (family, (format, parts)) in families {
        let missing =
            parts.keys().enumerate().find(|(expected, index)| *expected as u32 != **index).map(|(expected, _)| expected);
        let parts: Vec<PathBuf> = parts.into_values().collect();
        if let Some(expected) = missing {
            tracing::debug!(family = %family.display(), part = expected, "Split archive has a gap");
            discovered.broken.push(BrokenFamily { parts, reason: ErrorKind::MissingPart(expected as u32) });
            continue;
        }
        discovered.containers.push(ContainerFile {
            path: parts[0].clone(),
            parts,
            format,
            kind: ContainerKind::Split,
        });
    }
    discovered.containers.sort_by(|a, b| a.path.cmp(&b.path));
    discovered
}

struct Part {
    file: File,
    start: u64,
    len: u64,
}

/// Presents the parts of a split archive as one seekable stream.
pub struct SplitReader {
    parts: Vec<Part>,
    total: u64,
    position: u64,
}
impl SplitReader {
    pub fn open(paths: &[PathBuf]) -> io::Result<Self> {
        let mut parts = Vec::with_capacity(paths.len());
        let mut start = 0;
        for path in paths {
            let file = File::open(path)?;
            let len = file.metadata()?.len();
            parts.push(Part { file, start, len });
            start += len;
        }
        Ok(Self { parts, total: start, position: 0 })
    }
}
impl Read for SplitReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.position;
        let Some(part) = self.parts.iter_mut().find(|p| position >= p.start && position < p.start + p.len) else {
            return Ok(0);
        };
        let offset = position - part.start;
        let available = (part.len - offset).min(buf.len() as u64) as usize;
        part.file.seek(SeekFrom::Start(offset))?;
        let read = part.file.read(&mut buf[..available])?;
        self.position += read as u64;
        Ok(read)
    }
}
impl Seek for SplitReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.total.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(target) => {
                self.position = target;
                Ok(target)
            },
            None => Err(io::Error::new(io::ErrorKind::InvalidInput, "seek before start of split archive")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("games/Game.nsp", true)]
    #[case("games/Game.XCI", true)]
    #[case("games/Game.nsp.00", true)]
    #[case("games/Game.ns3", true)]
    #[case("games/Game.xc0", true)]
    #[case("games/Game.zip", false)]
    #[case("games/notes.txt", false)]
    #[case("games/Game.nsp.part", false)]
    fn test_is_candidate(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_candidate(Path::new(path)), expected);
    }

    #[rstest]
    #[case("Game.nsp.01", Some(".nsp.01"))]
    #[case("Game.XCI.00", Some(".XCI.00"))]
    #[case("Game.ns3", Some(".ns3"))]
    #[case("Game.nsp", None)]
    fn test_part_suffix(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(part_suffix(name), expected);
    }

    #[test]
    fn test_discover_groups_split_families() {
        let discovered = discover([
            "g/b.xci",
            "g/a.nsp.01",
            "g/a.nsp.00",
            "g/readme.txt",
            "g/c.ns0",
            "g/c.ns1",
        ]);
        assert!(discovered.broken.is_empty());
        let paths: Vec<_> = discovered.containers.iter().map(|c| c.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("g/a.nsp.00"), PathBuf::from("g/b.xci"), PathBuf::from("g/c.ns0")]);
        assert_eq!(discovered.containers[0].parts, vec![PathBuf::from("g/a.nsp.00"), PathBuf::from("g/a.nsp.01")]);
        assert_eq!(discovered.containers[0].kind, ContainerKind::Split);
        assert_eq!(discovered.containers[1].kind, ContainerKind::Plain);
        assert_eq!(discovered.containers[2].format, Format::Nsp);
    }

    #[test]
    fn test_discover_reports_gaps() {
        let discovered = discover(["g/a.nsp.00", "g/a.nsp.02"]);
        assert!(discovered.containers.is_empty());
        assert_eq!(discovered.broken.len(), 1);
        assert_eq!(discovered.broken[0].reason, ErrorKind::MissingPart(1));
        assert_eq!(discovered.broken[0].parts.len(), 2);

        let discovered = discover(["g/a.ns1"]);
        assert_eq!(discovered.broken[0].reason, ErrorKind::MissingPart(0));
    }

    #[test]
    fn test_split_reader_spans_parts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = [&b"abc"[..], b"", b"defg"]
            .iter()
            .enumerate()
            .map(|(i, data)| {
                let path = temp_dir.path().join(format!("game.nsp.0{i}"));
                std::fs::write(&path, data).unwrap();
                path
            })
            .collect();
        let mut reader = SplitReader::open(&paths).unwrap();
        assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 7);
        reader.rewind().unwrap();
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"abcdefg");

        reader.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cde");
        reader.seek(SeekFrom::End(-1)).unwrap();
        reader.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(buf[0], b'g');
        assert!(reader.seek(SeekFrom::Current(-100)).is_err());
    }
}
