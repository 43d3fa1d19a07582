//! The single-threaded second pass of a scan: placing every parsed record
//! into its title's entry.

use super::models::{ContentFile, LibraryEntry, LocalLibrary};
use nxshelf_container::models::{ContentKind, ParsedContainer};
use std::path::PathBuf;

/// What the collect pass learned about one logical file.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Parsed(ParsedContainer),
    /// Every path listed is skipped with the same reason.
    Skipped { paths: Vec<PathBuf>, reason: String },
}
impl Outcome {
    fn sort_key(&self) -> Option<&PathBuf> {
        match self {
            Outcome::Parsed(parsed) => Some(&parsed.file.path),
            Outcome::Skipped { paths, .. } => paths.first(),
        }
    }
}

/// Why a record could not take a slot.
fn place(library: &mut LocalLibrary, content: ContentFile) -> Result<(), String> {
    let id = content.metadata.title_id;
    let entry = library.titles.entry(id.base()).or_insert_with(|| LibraryEntry::new(id.base()));
    match id.kind() {
        ContentKind::Base => match &entry.base {
            Some(existing) if existing.path() == content.path() => Ok(()),
            Some(existing) => Err(format!("duplicate base file, already found at {}", existing.path().display())),
            None => {
                entry.base = Some(content);
                Ok(())
            },
        },
        ContentKind::Update => {
            let version = content.metadata.version;
            match entry.updates.get(&version) {
                Some(existing) if existing.path() == content.path() => Ok(()),
                Some(existing) => Err(format!(
                    "duplicate update version {version}, already found at {}",
                    existing.path().display()
                )),
                None => {
                    entry.updates.insert(version, content);
                    Ok(())
                },
            }
        },
        ContentKind::AddOn => {
            let duplicate = entry
                .dlc
                .iter()
                .find(|d| d.metadata.title_id == id && d.metadata.version == content.metadata.version);
            match duplicate {
                Some(existing) if existing.path() == content.path() => Ok(()),
                Some(existing) => Err(format!(
                    "duplicate add-on {id} version {}, already found at {}",
                    content.metadata.version,
                    existing.path().display()
                )),
                None => {
                    entry.dlc.push(content);
                    Ok(())
                },
            }
        },
    }
}

/// Groups collect-pass outcomes by base title.
///
/// Outcomes are sorted by path first, so the result does not depend on
/// the order workers finished in; among duplicates the first path wins.
pub(crate) fn resolve(mut outcomes: Vec<Outcome>, num_files: usize) -> LocalLibrary {
    outcomes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let mut library = LocalLibrary { num_files, ..LocalLibrary::default() };
    for outcome in outcomes {
        match outcome {
            Outcome::Skipped { paths, reason } => {
                for path in paths {
                    library.skipped.insert(path, reason.clone());
                }
            },
            Outcome::Parsed(ParsedContainer { file, metadata }) => {
                let mut placed = 0;
                let mut rejected = None;
                for record in metadata {
                    match place(&mut library, ContentFile { file: file.clone(), metadata: record }) {
                        Ok(()) => placed += 1,
                        Err(reason) => rejected = rejected.or(Some(reason)),
                    }
                }
                match (placed, rejected) {
                    (0, Some(reason)) => {
                        tracing::warn!(path = %file.path.display(), %reason, "Skipping file");
                        library.skipped.insert(file.path, reason);
                    },
                    // A multi-content file that still holds a slot is not an
                    // issue; its duplicate record is simply dropped.
                    (_, Some(reason)) => tracing::debug!(path = %file.path.display(), %reason, "Dropped duplicate record"),
                    _ => {},
                }
            },
        }
    }
    // Entries created only to reject a duplicate stay empty.
    library.titles.retain(|_, entry| entry.contents().next().is_some());
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::models::MISSING_BASE_REASON;
    use nxshelf_container::models::{ContainerFile, ContainerKind, Format, GameMetadata, TitleId};
    use std::path::Path;

    const BASE: u64 = 0x0100000000010000;
    const UPDATE: u64 = 0x0100000000010800;
    const ADD_ON: u64 = 0x0100000000011001;

    fn parsed(path: &str, records: &[(u64, u32)]) -> Outcome {
        Outcome::Parsed(ParsedContainer {
            file: ContainerFile {
                path: PathBuf::from(path),
                parts: vec![PathBuf::from(path)],
                format: Format::Nsp,
                kind: if records.len() > 1 { ContainerKind::MultiContent } else { ContainerKind::Plain },
            },
            metadata: records.iter().map(|(id, version)| GameMetadata::new(TitleId::new(*id), *version)).collect(),
        })
    }

    fn assert_accounted(library: &LocalLibrary) {
        assert_eq!(library.accounted_files().len(), library.num_files);
    }

    #[test]
    fn test_groups_by_base_regardless_of_order() {
        let outcomes = vec![
            parsed("/g/dlc.nsp", &[(ADD_ON, 0)]),
            parsed("/g/update.nsp", &[(UPDATE, 131072)]),
            parsed("/g/base.nsp", &[(BASE, 0)]),
            parsed("/g/update-old.nsp", &[(UPDATE, 65536)]),
        ];
        let mut reversed = outcomes.clone();
        reversed.reverse();
        let library = resolve(outcomes, 4);
        assert_eq!(library, resolve(reversed, 4));

        let entry = &library.titles[&TitleId::new(BASE)];
        assert!(entry.base_exists());
        assert_eq!(entry.updates.keys().copied().collect::<Vec<_>>(), vec![65536, 131072]);
        assert_eq!(entry.latest_update(), 131072);
        assert_eq!(entry.dlc.len(), 1);
        assert!(library.issues().is_empty());
        assert_accounted(&library);
    }

    #[test]
    fn test_missing_base_keeps_files_and_reports_them() {
        let library = resolve(vec![parsed("/g/update.nsp", &[(UPDATE, 65536)]), parsed("/g/dlc.nsp", &[(ADD_ON, 0)])], 2);
        let entry = &library.titles[&TitleId::new(BASE)];
        assert!(!entry.base_exists());
        assert_eq!(entry.latest_update(), 65536);
        assert_eq!(entry.dlc.len(), 1);
        assert_eq!(library.complete().count(), 0);

        let issues = library.issues();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.reason == MISSING_BASE_REASON));
        assert!(library.skipped.is_empty());
        assert_accounted(&library);
    }

    #[test]
    fn test_duplicates_are_skipped_first_path_wins() {
        let library = resolve(
            vec![
                parsed("/g/b-base.nsp", &[(BASE, 0)]),
                parsed("/g/a-base.nsp", &[(BASE, 0)]),
                parsed("/g/u1.nsp", &[(UPDATE, 65536)]),
                parsed("/g/u2.nsp", &[(UPDATE, 65536)]),
                parsed("/g/d1.nsp", &[(ADD_ON, 0)]),
                parsed("/g/d2.nsp", &[(ADD_ON, 0)]),
                parsed("/g/d3.nsp", &[(ADD_ON, 65536)]),
            ],
            7,
        );
        let entry = &library.titles[&TitleId::new(BASE)];
        assert_eq!(entry.base.as_ref().map(|b| b.path()), Some(Path::new("/g/a-base.nsp")));
        assert_eq!(entry.dlc.len(), 2);
        assert_eq!(library.skipped.len(), 3);
        assert!(library.skipped[Path::new("/g/b-base.nsp")].starts_with("duplicate base file"));
        assert!(library.skipped[Path::new("/g/u2.nsp")].starts_with("duplicate update version 65536"));
        assert!(library.skipped[Path::new("/g/d2.nsp")].starts_with("duplicate add-on"));
        assert_accounted(&library);
    }

    #[test]
    fn test_multi_content_fills_several_slots() {
        let library = resolve(
            vec![parsed("/g/bundle.nsp", &[(BASE, 0), (UPDATE, 65536), (ADD_ON, 0)]), parsed("/g/u.nsp", &[(UPDATE, 65536)])],
            2,
        );
        let entry = &library.titles[&TitleId::new(BASE)];
        assert!(entry.base_exists());
        assert_eq!(entry.latest_update(), 65536);
        assert_eq!(entry.dlc.len(), 1);
        assert!(library.skipped.contains_key(Path::new("/g/u.nsp")));
        assert_accounted(&library);
    }

    #[test]
    fn test_skipped_outcomes_cover_every_part() {
        let library = resolve(
            vec![Outcome::Skipped {
                paths: vec![PathBuf::from("/g/a.nsp.00"), PathBuf::from("/g/a.nsp.02")],
                reason: "split archive is missing part 1".into(),
            }],
            2,
        );
        assert!(library.titles.is_empty());
        assert_eq!(library.issues().len(), 2);
        assert_accounted(&library);
    }

    #[test]
    fn test_same_path_twice_is_not_a_duplicate() {
        let library = resolve(vec![parsed("/g/base.nsp", &[(BASE, 0)]), parsed("/g/base.nsp", &[(BASE, 0)])], 1);
        assert!(library.skipped.is_empty());
        assert!(library.titles[&TitleId::new(BASE)].base_exists());
        assert_accounted(&library);
    }
}
