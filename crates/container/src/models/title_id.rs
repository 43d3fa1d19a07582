use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const KIND_MASK: u64 = 0xFFF;
const UPDATE_SUFFIX: u64 = 0x800;
const ADD_ON_OFFSET: u64 = 0x1000;

/// What a title id refers to, derived purely from the id's low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ContentKind {
    /// Base game, id ends in `000`.
    Base,
    /// Update (patch), id ends in `800`.
    Update,
    /// Add-on content, anything else.
    #[cfg_attr(feature = "serde", serde(rename = "dlc"))]
    AddOn,
}
impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Base => "base",
            ContentKind::Update => "update",
            ContentKind::AddOn => "dlc",
        }
    }
}
impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A 64-bit title identifier, written as 16 hexadecimal digits.
///
/// ```
/// use nxshelf_container::models::{ContentKind, TitleId};
/// let update: TitleId = "0100000000010800".parse().unwrap();
/// assert_eq!(update.kind(), ContentKind::Update);
/// assert_eq!(update.base().to_string(), "0100000000010000");
/// let dlc: TitleId = "0x0100000000011001".parse().unwrap();
/// assert_eq!(dlc.kind(), ContentKind::AddOn);
/// assert_eq!(dlc.base().to_string(), "0100000000010000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleId(u64);
impl TitleId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }

    pub fn kind(&self) -> ContentKind {
        match self.0 & KIND_MASK {
            0 => ContentKind::Base,
            UPDATE_SUFFIX => ContentKind::Update,
            _ => ContentKind::AddOn,
        }
    }

    /// The id of the base game this content belongs to.
    pub fn base(&self) -> TitleId {
        match self.kind() {
            ContentKind::Base => *self,
            ContentKind::Update => Self(self.0 & !UPDATE_SUFFIX),
            ContentKind::AddOn => Self(self.0.wrapping_sub(ADD_ON_OFFSET) & !KIND_MASK),
        }
    }

    /// The id updates for this base game are published under.
    pub fn update(&self) -> TitleId {
        Self(self.base().0 | UPDATE_SUFFIX)
    }
}
impl Display for TitleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:016X}", self.0)
    }
}
impl FromStr for TitleId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
        if digits.len() != 16 {
            exn::bail!(ErrorKind::ParseError { field: "title id", value: s.to_string() });
        }
        match u64::from_str_radix(digits, 16) {
            Ok(id) => Ok(Self(id)),
            Err(_) => exn::bail!(ErrorKind::ParseError { field: "title id", value: s.to_string() }),
        }
    }
}
impl From<u64> for TitleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TitleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TitleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(|e: Error| serde::de::Error::custom(&*e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0100000000010000", ContentKind::Base, "0100000000010000")]
    #[case("0100000000010800", ContentKind::Update, "0100000000010000")]
    #[case("0100000000011001", ContentKind::AddOn, "0100000000010000")]
    #[case("010000000001101F", ContentKind::AddOn, "0100000000010000")]
    #[case("01006F8002326000", ContentKind::Base, "01006F8002326000")]
    #[case("01006F8002327002", ContentKind::AddOn, "01006F8002326000")]
    fn test_classification(#[case] id: &str, #[case] kind: ContentKind, #[case] base: &str) {
        let id: TitleId = id.parse().unwrap();
        assert_eq!(id.kind(), kind);
        assert_eq!(id.base().to_string(), base);
    }

    #[rstest]
    #[case("0100000000010000")]
    #[case("0x0100000000010000")]
    #[case("  0100000000010000 ")]
    #[case("01000000000100aa")]
    fn test_parse_accepts(#[case] input: &str) {
        assert!(input.parse::<TitleId>().is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("0100")]
    #[case("010000000001000G")]
    #[case("01000000000100000")]
    fn test_parse_rejects(#[case] input: &str) {
        assert!(input.parse::<TitleId>().is_err());
    }

    #[test]
    fn test_display_is_uppercase_and_padded() {
        assert_eq!(TitleId::new(0x01000000000100aa).to_string(), "01000000000100AA");
        assert_eq!(TitleId::new(0x1).to_string(), "0000000000000001");
    }

    #[test]
    fn test_update_id() {
        let dlc: TitleId = "0100000000011001".parse().unwrap();
        assert_eq!(dlc.update().to_string(), "0100000000010800");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_hex_string() {
        let id = TitleId::new(0x0100000000010800);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0100000000010800\"");
        assert_eq!(serde_json::from_str::<TitleId>("\"0100000000010800\"").unwrap(), id);
        assert!(serde_json::from_str::<TitleId>("\"nope\"").is_err());
    }
}
