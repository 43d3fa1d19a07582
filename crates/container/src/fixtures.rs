//! Builders for synthetic container images, for tests in this crate and in
//! dependent crates (via the `fixtures` feature).

use crate::models::{ContentKind, TitleId};

const PFS0_ENTRY_SIZE: usize = 0x18;
const HFS0_ENTRY_SIZE: usize = 0x40;
const XCI_ROOT_OFFSET: usize = 0x200;

fn partition(magic: &[u8; 4], entry_size: usize, files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut strings = Vec::new();
    let mut table = Vec::new();
    let mut data = Vec::new();
    for (name, bytes) in files {
        let mut entry = vec![0u8; entry_size];
        entry[0x0..0x8].copy_from_slice(&(data.len() as u64).to_le_bytes());
        entry[0x8..0x10].copy_from_slice(&(bytes.len() as u64).to_le_bytes());
        entry[0x10..0x14].copy_from_slice(&(strings.len() as u32).to_le_bytes());
        table.extend_from_slice(&entry);
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
        data.extend_from_slice(bytes);
    }
    while strings.len() % 0x20 != 0 {
        strings.push(0);
    }
    let mut image = Vec::with_capacity(0x10 + table.len() + strings.len() + data.len());
    image.extend_from_slice(magic);
    image.extend_from_slice(&(files.len() as u32).to_le_bytes());
    image.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    image.extend_from_slice(&[0u8; 4]);
    image.extend_from_slice(&table);
    image.extend_from_slice(&strings);
    image.extend_from_slice(&data);
    image
}

/// Builds an NSP-style PFS0 image.
#[derive(Debug, Default, Clone)]
pub struct Pfs0Builder {
    files: Vec<(String, Vec<u8>)>,
}
impl Pfs0Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.files.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        partition(b"PFS0", PFS0_ENTRY_SIZE, &self.files)
    }
}

/// Builds an XCI-style gamecard image with a single `secure` partition.
#[derive(Debug, Default, Clone)]
pub struct XciBuilder {
    files: Vec<(String, Vec<u8>)>,
}
impl XciBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, data: &[u8]) -> Self {
        self.files.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let secure = partition(b"HFS0", HFS0_ENTRY_SIZE, &self.files);
        let root = partition(b"HFS0", HFS0_ENTRY_SIZE, &[("secure".to_string(), secure)]);
        let mut image = vec![0u8; XCI_ROOT_OFFSET];
        image[0x100..0x104].copy_from_slice(b"HEAD");
        image[0x130..0x138].copy_from_slice(&(XCI_ROOT_OFFSET as u64).to_le_bytes());
        image.extend_from_slice(&root);
        image
    }
}

/// A content meta record as written by common dumping tools.
pub fn cnmt_xml(title_id: &str, version: u32, control: Option<&str>) -> String {
    let kind = match title_id.parse::<TitleId>().map(|id| id.kind()) {
        Ok(ContentKind::Update) => "Patch",
        Ok(ContentKind::AddOn) => "AddOnContent",
        _ => "Application",
    };
    let content = control
        .map(|id| format!("  <Content>\n    <Type>Control</Type>\n    <Id>{id}</Id>\n  </Content>\n"))
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<ContentMeta>\n  <Type>{kind}</Type>\n  <Id>0x{}</Id>\n  \
         <Version>{version}</Version>\n{content}</ContentMeta>\n",
        title_id.to_ascii_lowercase()
    )
}

/// An application properties record; `names` pairs are (language, name) and
/// are inserted verbatim, so callers escape them.
pub fn nacp_xml(names: &[(&str, &str)], display_version: &str) -> String {
    let titles: String = names
        .iter()
        .map(|(language, name)| {
            format!(
                "  <Title>\n    <Language>{language}</Language>\n    <Name>{name}</Name>\n    \
                 <Publisher>Publisher</Publisher>\n  </Title>\n"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Application>\n{titles}  \
         <DisplayVersion>{display_version}</DisplayVersion>\n</Application>\n"
    )
}
