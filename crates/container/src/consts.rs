use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Largest embedded XML record we are willing to buffer.
pub(crate) const MAX_XML_SIZE: u64 = 1024 * 1024;
/// Upper bound on partition entries; real images carry a few dozen.
pub(crate) const MAX_PARTITION_ENTRIES: u32 = 0x4000;
/// Upper bound on a partition's string table.
pub(crate) const MAX_STRING_TABLE: u32 = 0x10_0000;

// File names.
regex!(TITLE_ID_TAG_REGEX, r"\[([0-9A-Fa-f]{16})\]");
regex!(VERSION_TAG_REGEX, r"(?i)\[v(\d+)\]");
regex!(BRACKET_TAG_REGEX, r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}");
regex!(SPLIT_NUMBERED_REGEX, r"(?i)^(.+\.(?:nsp|nsz|xci|xcz))\.(\d{2})$");
regex!(SPLIT_SHORT_REGEX, r"(?i)^(.+)\.(ns|xc)(\d)$");
regex!(RELEASE_GROUP_REGEX, r"-[A-Za-z0-9]+$");
regex!(TRAILING_VERSION_REGEX, r"(?i)[\s._]+v?\d+(?:\.\d+)+$");
regex!(TRAILING_TAGS_REGEX, r"(?i)(?:[\s._]+(?:nsw|switch|eshop|update|dlc|multi\d*|\d+[kmg]b))+$");
regex!(WHITESPACE_REGEX, r"\s+");

// Embedded metadata records.
regex!(CNMT_ROOT_REGEX, r"<ContentMeta>");
regex!(CNMT_ID_REGEX, r"<Id>0x([0-9A-Fa-f]{16})</Id>");
regex!(CNMT_VERSION_REGEX, r"<Version>(\d+)</Version>");
regex!(
    CNMT_CONTROL_REGEX,
    r"(?s)<Content>\s*<Type>Control</Type>\s*<Id>([0-9A-Fa-f]{32})</Id>"
);
regex!(NACP_TITLE_REGEX, r"(?s)<Title>\s*<Language>(\w+)</Language>\s*<Name>(.*?)</Name>");
regex!(NACP_DISPLAY_VERSION_REGEX, r"<DisplayVersion>(.*?)</DisplayVersion>");
