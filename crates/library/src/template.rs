//! Name templating for library organization.
//!
//! Renders a folder or file name from a content record with a
//! user-configured [upon] template. The syntax follows upon's Mustache-like
//! conventions (`{{ variable }}`, `{{ value|formatter }}`), extended with:
//!
//! - **`safe`**: removes characters that are illegal in file names.
//! - **`slug`**: converts strings to URL-safe slugs, stripping quotation
//!   marks first to avoid artifacts like leading/trailing hyphens.
//! - **`truncate`**: truncates strings to a maximum byte length at a character
//!   boundary, usable as either `truncate(value, n)` or `{{ value|truncate: n }}`.
//!
//! # Template Variables
//!
//! | Variable          | Type             | Description                                  |
//! |-------------------|------------------|----------------------------------------------|
//! | `name`            | `String`         | Base title name                              |
//! | `title_id`        | `String`         | Id of this record, 16 hex digits             |
//! | `base_id`         | `String`         | Id of the base title                         |
//! | `version`         | `u64`            | Version number (0 for base games)            |
//! | `display_version` | `Option<String>` | Human readable version, e.g. `1.2.0`         |
//! | `region`          | `Option<String>` | Catalog region                               |
//! | `kind`            | `String`         | `base`, `update` or `dlc`                    |
//! | `dlc_name`        | `Option<String>` | Add-on name, only set for add-ons            |
//!
//! A rendered name is always passed through the same filter as `safe` and
//! must be a single, non-empty path segment.
//!
//! # Example
//!
//! ```
//! use nxshelf_container::models::{ContentKind, TitleId};
//! use nxshelf_library::template::{NameContext, NameTemplate};
//!
//! let template: NameTemplate = "{{ name }} [{{ title_id }}][v{{ version }}]".parse().unwrap();
//! let context = NameContext::new("Super: Game", TitleId::new(0x0100000000010800), 65536);
//! assert_eq!(template.render(&context).unwrap(), "Super Game [0100000000010800][v65536]");
//! ```

use crate::error::{Error, ErrorKind, Result};
use nxshelf_container::models::{ContentKind, TitleId};
use nxshelf_storage::validate_path;
use std::path::{Component, Path};
use std::str::FromStr;
use upon::{Engine, Template};

/// Everything a template can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameContext {
    pub name: String,
    pub title_id: TitleId,
    pub version: u32,
    pub display_version: Option<String>,
    pub region: Option<String>,
    pub dlc_name: Option<String>,
}
impl NameContext {
    pub fn new(name: impl Into<String>, title_id: TitleId, version: u32) -> Self {
        Self { name: name.into(), title_id, version, display_version: None, region: None, dlc_name: None }
    }

    /// Used to check a template once before any file is touched: one record
    /// with every optional field set and one with none of them.
    fn samples() -> [Self; 2] {
        let sparse = Self::new("Sample Game", TitleId::new(0x0100000000010000), 0);
        let full =
            Self { display_version: Some("1.0.0".into()), region: Some("US".into()), ..sparse.clone() };
        [full, sparse]
    }

    fn value(&self) -> upon::Value {
        let kind: ContentKind = self.title_id.kind();
        upon::value! {
            name: &self.name,
            title_id: self.title_id.to_string(),
            base_id: self.title_id.base().to_string(),
            version: u64::from(self.version),
            display_version: self.display_version.as_deref(),
            region: self.region.as_deref(),
            kind: kind.as_str(),
            dlc_name: self.dlc_name.as_deref(),
        }
    }
}

/// A compiled folder or file name template.
///
/// Constructed via [`FromStr`], which compiles the template and renders it
/// against sample records with and without optional fields, so both syntax
/// errors and templates that can render an empty name surface at creation
/// time.
pub struct NameTemplate {
    engine: Engine<'static>,
    template: Template<'static>,
}
impl FromStr for NameTemplate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let template = engine.compile(s.to_string()).map_err(|e| ErrorKind::InvalidTemplate(e.to_string()))?;
        let generator = Self { engine, template };
        for sample in NameContext::samples() {
            generator.render(&sample)?;
        }
        Ok(generator)
    }
}
impl NameTemplate {
    /// Renders and sanitizes a name.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidTemplate`] when rendering fails or the result is
    /// empty once illegal characters are removed.
    pub fn render(&self, context: &NameContext) -> Result<String> {
        let rendered = self
            .template
            .render(&self.engine, context.value())
            .to_string()
            .map_err(|e| ErrorKind::InvalidTemplate(e.to_string()))?;
        let name = addons::sanitize(&rendered);
        let single = validate_path(Path::new(&name))
            .is_ok_and(|p| matches!(p.components().collect::<Vec<_>>().as_slice(), [Component::Normal(_)]));
        if name.is_empty() || !single {
            exn::bail!(ErrorKind::InvalidTemplate(format!("template renders an unusable name {rendered:?}")));
        }
        Ok(name)
    }
}

/// Custom [`upon`] extensions for path-safe string manipulation.
mod addons {
    use rslug::slugify;
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    /// Strips characters that are illegal in file names on any common
    /// filesystem, collapses whitespace and trims trailing dots.
    pub(super) fn sanitize(s: &str) -> String {
        let cleaned: String = s.chars().filter(|c| !ILLEGAL.contains(c) && !c.is_control()).collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim_end_matches(['.', ' ']).to_string()
    }

    fn safe_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => write!(f, "{}", sanitize(s))?,
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Custom formatter that converts strings to URL-safe slugs.
    ///
    /// Strips quotation marks before slugifying to avoid awkward slug output
    /// like `"hello"` becoming `-hello-`.
    fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                // Various quotation marks: '"''""„"`«»
                let marks = [
                    '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                    '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
                ];
                let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
                write!(f, "{}", slugify!(&stripped))?
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> String {
        s[..s.floor_char_boundary(max_bytes)].to_string()
    }

    pub(super) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("safe", safe_formatter);
        engine.add_formatter("slug", slug_formatter);
        engine.add_function("truncate", truncate_to_char_boundary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxshelf_config::{DEFAULT_FILE_TEMPLATE, DEFAULT_FOLDER_TEMPLATE};
    use rstest::rstest;

    const UPDATE: TitleId = TitleId::new(0x0100000000010800);
    const ADD_ON: TitleId = TitleId::new(0x0100000000011001);

    #[test]
    fn test_default_templates() {
        let folder: NameTemplate = DEFAULT_FOLDER_TEMPLATE.parse().unwrap();
        let file: NameTemplate = DEFAULT_FILE_TEMPLATE.parse().unwrap();
        let context = NameContext::new("Zelda: Breath of the Wild", UPDATE, 65536);
        assert_eq!(folder.render(&context).unwrap(), "Zelda Breath of the Wild");
        assert_eq!(file.render(&context).unwrap(), "Zelda Breath of the Wild [0100000000010800][v65536]");

        let mut dlc = NameContext::new("Zelda", ADD_ON, 0);
        dlc.dlc_name = Some("Expansion Pass".into());
        assert_eq!(file.render(&dlc).unwrap(), "Zelda [Expansion Pass] [0100000000011001][v0]");
    }

    #[test]
    fn test_variables() {
        let template: NameTemplate = "{{ kind }}-{{ base_id }}-{{ region }}-{{ display_version }}".parse().unwrap();
        let mut context = NameContext::new("Game", ADD_ON, 0);
        context.region = Some("EU".into());
        context.display_version = Some("1.0.2".into());
        assert_eq!(template.render(&context).unwrap(), "dlc-0100000000010000-EU-1.0.2");
    }

    #[test]
    fn test_slug_strips_quotes() {
        let template: NameTemplate = "{{ name|slug }}".parse().unwrap();
        let context = NameContext::new("\"Hello\" World's 'Test'", UPDATE, 0);
        assert_eq!(template.render(&context).unwrap(), "hello-worlds-test");
    }

    #[rstest]
    #[case("{{ truncate(name, 10)|slug }}")]
    #[case("{{ name|truncate: 10|slug }}")]
    fn test_truncate(#[case] template: &str) {
        let template: NameTemplate = template.parse().unwrap();
        let context = NameContext::new("A Very Long Title Indeed", UPDATE, 0);
        assert_eq!(template.render(&context).unwrap(), "a-very-lon");
    }

    #[rstest]
    #[case("{{ name")]
    #[case("{{ unknown }}")]
    #[case("{{ dlc_name }}")]
    #[case("{{ region }}")]
    #[case("{{ display_version|safe }}")]
    #[case("   ")]
    #[case("..")]
    #[case("{{ name|nope }}")]
    fn test_rejects_unusable_templates(#[case] template: &str) {
        let err = template.parse::<NameTemplate>().err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidTemplate(_)));
    }

    #[test]
    fn test_optional_fields_behind_conditions_are_accepted() {
        let template: NameTemplate = "{{ name }}{% if region %} ({{ region }}){% endif %}".parse().unwrap();
        assert_eq!(template.render(&NameContext::new("Game", UPDATE, 0)).unwrap(), "Game");
    }

    #[test]
    fn test_rendered_names_are_single_segments() {
        let template: NameTemplate = "{{ name }}".parse().unwrap();
        let context = NameContext::new("a/b\\c: <d>?", UPDATE, 0);
        assert_eq!(template.render(&context).unwrap(), "abc d");
        assert!(template.render(&NameContext::new("../..", UPDATE, 0)).is_err());
    }
}
