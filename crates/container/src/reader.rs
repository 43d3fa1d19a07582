//! Pluggable metadata extraction.
//!
//! The default [`EmbeddedXmlReader`] only looks at the plain-text XML records
//! that dumping tools place next to the content archives: `<id>.cnmt.xml`
//! (content meta) and `<control id>.nacp.xml` (application properties).

use crate::consts::{
    CNMT_CONTROL_REGEX, CNMT_ID_REGEX, CNMT_ROOT_REGEX, CNMT_VERSION_REGEX, MAX_XML_SIZE,
    NACP_DISPLAY_VERSION_REGEX, NACP_TITLE_REGEX,
};
use crate::error::{ErrorKind, Result};
use crate::format::{Entry, gamecard_entries, package_entries};
use crate::models::{ContentKind, Format, GameMetadata};
use std::borrow::Cow;
use std::io::{Read, Seek};

/// Anything that can be read and seeked, so readers can be boxed.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Extracts content records from an opened container.
///
/// Returning an empty list means "no embedded metadata"; the parser then
/// falls back to the file name. Returning an error marks the file as broken.
pub trait MetadataReader: Send + Sync {
    fn read(&self, format: Format, reader: &mut dyn ReadSeek) -> Result<Vec<GameMetadata>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedXmlReader;

struct ContentMeta {
    metadata: GameMetadata,
    control: Option<String>,
}

struct Properties {
    control: String,
    names: Vec<(String, String)>,
    display_version: Option<String>,
}

impl MetadataReader for EmbeddedXmlReader {
    fn read(&self, format: Format, reader: &mut dyn ReadSeek) -> Result<Vec<GameMetadata>> {
        let entries = match format.is_gamecard() {
            true => gamecard_entries(reader)?,
            false => package_entries(reader)?,
        };
        let mut metas = Vec::new();
        let mut properties = Vec::new();
        for entry in &entries {
            let lower = entry.name.to_ascii_lowercase();
            if lower.ends_with(".cnmt.xml") {
                metas.push(parse_content_meta(entry, &read_text(entry, reader)?)?);
            } else if let Some(control) = lower.strip_suffix(".nacp.xml") {
                properties.push(parse_properties(control, &read_text(entry, reader)?));
            }
        }
        tracing::trace!(records = metas.len(), properties = properties.len(), "Read embedded metadata");

        Ok(metas
            .into_iter()
            .map(|meta| {
                let mut metadata = meta.metadata;
                let matched = meta
                    .control
                    .as_deref()
                    .and_then(|control| properties.iter().find(|p| p.control == control))
                    .or_else(|| match (&properties[..], metadata.kind()) {
                        // Older dumps name the record after the package instead
                        // of the control content.
                        ([only], ContentKind::Base | ContentKind::Update) => Some(only),
                        _ => None,
                    });
                if let Some(props) = matched {
                    metadata.names.extend(props.names.iter().cloned());
                    metadata.display_version.clone_from(&props.display_version);
                }
                metadata
            })
            .collect())
    }
}

fn read_text(entry: &Entry, reader: &mut dyn ReadSeek) -> Result<String> {
    let bytes = entry.read(reader, MAX_XML_SIZE)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_content_meta(entry: &Entry, xml: &str) -> Result<ContentMeta> {
    let parse_error = || ErrorKind::ParseError { field: "content meta", value: entry.name.clone() };
    if !CNMT_ROOT_REGEX.is_match(xml) {
        exn::bail!(parse_error());
    }
    let id = CNMT_ID_REGEX.captures(xml).ok_or_else(parse_error)?;
    let title_id = id[1].parse()?;
    let version = match CNMT_VERSION_REGEX.captures(xml) {
        Some(captures) => captures[1].parse().map_err(|_| ErrorKind::ParseError {
            field: "version",
            value: captures[1].to_string(),
        })?,
        None => 0,
    };
    Ok(ContentMeta {
        metadata: GameMetadata::new(title_id, version),
        control: CNMT_CONTROL_REGEX.captures(xml).map(|c| c[1].to_ascii_lowercase()),
    })
}

fn parse_properties(control: &str, xml: &str) -> Properties {
    let names = NACP_TITLE_REGEX
        .captures_iter(xml)
        .map(|c| (c[1].to_string(), unescape(c[2].trim()).into_owned()))
        .filter(|(_, name)| !name.is_empty())
        .collect();
    let display_version = NACP_DISPLAY_VERSION_REGEX
        .captures(xml)
        .map(|c| unescape(c[1].trim()).into_owned())
        .filter(|v| !v.is_empty());
    Properties { control: control.to_string(), names, display_version }
}

/// Decodes the predefined XML entities and numeric character references.
fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let Some(end) = rest.find(';') else { break };
        let decoded = match &rest[1..end] {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            entity => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse().ok()))
                .flatten()
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            },
            None => {
                out.push('&');
                rest = &rest[1..];
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
