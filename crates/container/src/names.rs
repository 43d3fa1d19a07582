//! File-name heuristics, used when a container carries no embedded metadata
//! or no localized name.

use crate::consts::{
    BRACKET_TAG_REGEX, RELEASE_GROUP_REGEX, SPLIT_NUMBERED_REGEX, SPLIT_SHORT_REGEX, TITLE_ID_TAG_REGEX,
    TRAILING_TAGS_REGEX, TRAILING_VERSION_REGEX, VERSION_TAG_REGEX, WHITESPACE_REGEX,
};
use crate::models::{Format, TitleId};
use std::path::Path;

/// The first `[0100XXXXXXXXXXXX]` tag in a file name.
pub fn title_id_tag(file_name: &str) -> Option<TitleId> {
    TITLE_ID_TAG_REGEX.captures(file_name).and_then(|c| c[1].parse().ok())
}

/// The first `[vN]` tag in a file name.
pub fn version_tag(file_name: &str) -> Option<u32> {
    VERSION_TAG_REGEX.captures(file_name).and_then(|c| c[1].parse().ok())
}

fn strip_extensions(file_name: &str) -> &str {
    if let Some(captures) = SPLIT_NUMBERED_REGEX.captures(file_name) {
        let stem = captures.get(1).map_or(file_name, |m| &file_name[m.range()]);
        return strip_extensions(stem);
    }
    if let Some(m) = SPLIT_SHORT_REGEX.captures(file_name).and_then(|c| c.get(1)) {
        return &file_name[m.range()];
    }
    let path = Path::new(file_name);
    match (path.file_stem().and_then(|s| s.to_str()), path.extension().and_then(|e| e.to_str())) {
        (Some(stem), Some(ext)) if Format::from_extension(ext).is_some() => stem,
        _ => file_name,
    }
}

/// Guesses a human readable title from a file name.
///
/// ```
/// use nxshelf_container::names::title_from_file_name;
/// assert_eq!(title_from_file_name("Super Mario Odyssey [0100000000010000][v0].nsp"), "Super Mario Odyssey");
/// assert_eq!(title_from_file_name("Celeste_NSW-BigBlueBox.nsp.00"), "Celeste");
/// ```
pub fn title_from_file_name(file_name: &str) -> String {
    let stem = strip_extensions(file_name);
    let untagged = BRACKET_TAG_REGEX.replace_all(stem, " ");
    // Release-group suffixes only appear on scene-style names, which use
    // separators instead of spaces.
    let scene = !untagged.trim().contains(' ') || untagged.contains('_');
    let mut name = untagged.trim().to_string();
    if scene {
        name = RELEASE_GROUP_REGEX.replace(&name, "").into_owned();
    }
    name = TRAILING_TAGS_REGEX.replace(&name, "").into_owned();
    name = TRAILING_VERSION_REGEX.replace(&name, "").into_owned();
    name = TRAILING_TAGS_REGEX.replace(&name, "").into_owned();
    if scene {
        name = name.replace(['_', '.'], " ");
    }
    WHITESPACE_REGEX.replace_all(name.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Super Mario Odyssey [0100000000010000][v0].nsp", "Super Mario Odyssey")]
    #[case("Super Mario Odyssey [0100000000010800][v65536] (US).nsz", "Super Mario Odyssey")]
    #[case("Celeste_NSW-BigBlueBox.nsp", "Celeste")]
    #[case("Hollow.Knight.v1.4.3.NSW-VENOM.xci", "Hollow Knight")]
    #[case("Game Name (v1.2.0).xci", "Game Name")]
    #[case("Game Name.nsp.01", "Game Name")]
    #[case("Game Name.ns1", "Game Name")]
    #[case("Spider-Man Game.nsp", "Spider-Man Game")]
    #[case("notes", "notes")]
    fn test_title_from_file_name(#[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(title_from_file_name(file_name), expected);
    }

    #[rstest]
    #[case("Game [0100000000010000][v0].nsp", Some(0x0100000000010000), Some(0))]
    #[case("Game [01000000000100aa] [V131072].nsp", Some(0x01000000000100AA), Some(131072))]
    #[case("Game [0100].nsp", None, None)]
    #[case("Game.nsp", None, None)]
    fn test_tags(#[case] file_name: &str, #[case] id: Option<u64>, #[case] version: Option<u32>) {
        assert_eq!(title_id_tag(file_name), id.map(TitleId::new));
        assert_eq!(version_tag(file_name), version);
    }
}
