use super::{ContentKind, TitleId};
use std::collections::BTreeMap;

/// Locales tried, in order, when picking a single display name.
const PREFERRED_LOCALES: [&str; 3] = ["AmericanEnglish", "BritishEnglish", "CanadianFrench"];

/// Identity of one piece of content embedded in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameMetadata {
    pub title_id: TitleId,
    /// 0 for base games; updates carry multiples of 0x10000.
    pub version: u32,
    /// Localized names keyed by locale (e.g. `AmericanEnglish`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub names: BTreeMap<String, String>,
    /// Human readable version string such as `1.2.0`, when embedded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_version: Option<String>,
    /// Name guessed from the file name, only set when `names` is empty.
    #[cfg_attr(feature = "serde", serde(default))]
    pub derived_name: Option<String>,
}
impl GameMetadata {
    pub fn new(title_id: TitleId, version: u32) -> Self {
        Self {
            title_id,
            version,
            names: BTreeMap::new(),
            display_version: None,
            derived_name: None,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.title_id.kind()
    }

    /// Picks a single name: a preferred locale, then any locale, then the
    /// name derived from the file name.
    pub fn display_name(&self) -> Option<&str> {
        PREFERRED_LOCALES
            .iter()
            .find_map(|locale| self.names.get(*locale))
            .or_else(|| self.names.values().next())
            .or(self.derived_name.as_ref())
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}
