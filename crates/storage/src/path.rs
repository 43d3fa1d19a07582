//! Relative path validation.
//!
//! Organize templates produce relative paths that are joined onto a library
//! folder. Anything that would land outside that folder is rejected here.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a path relative to a library folder.
///
/// `.` segments and repeated separators are dropped, `..` is resolved as long
/// as it never climbs above the folder, and null bytes are rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use nxshelf_storage::validate_path;
/// assert!(validate_path("Zelda/Zelda [0100000000010000][v0].nsp").is_ok());
/// assert!(validate_path("a/../Zelda.nsp").is_ok());
/// assert!(validate_path("../Zelda.nsp").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(validate_path("x/.././Zelda//v1.nsp/").unwrap(), Path::new("Zelda/v1.nsp"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Mario/Mario [0100000000010000][v0].nsp", "Mario/Mario [0100000000010000][v0].nsp")]
    #[case("a//b//c.nsp", "a/b/c.nsp")]
    #[case("a/./b/./c.xci", "a/b/c.xci")]
    #[case("a/b/..", "a")]
    #[case("Mario/", "Mario")]
    fn test_valid_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../outside.nsp")]
    #[case("a/../../b")]
    #[case("..")]
    #[case("")]
    #[case(".")]
    #[case("./.")]
    #[case("//")]
    #[case("a\0b")]
    fn test_invalid_paths(#[case] input: &str) {
        assert!(validate(input).is_err());
    }
}
