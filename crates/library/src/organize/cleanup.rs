use super::{Failure, OrganizeReport};
use crate::progress::Progress;
use crate::scan::LocalLibrary;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Paths of every update older than its title's latest, in any scanned
/// folder.
///
/// A file that also holds the base or the latest update (a multi-content
/// bundle) is never selected.
fn superseded_updates(local: &LocalLibrary) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    for entry in local.titles.values().filter(|e| e.updates.len() > 1) {
        let latest = entry.latest_update();
        let keep: BTreeSet<&Path> = entry
            .base
            .iter()
            .chain(entry.updates.get(&latest))
            .flat_map(|c| c.file.parts.iter())
            .map(PathBuf::as_path)
            .collect();
        for (_, update) in entry.updates.range(..latest) {
            for part in &update.file.parts {
                if !keep.contains(part.as_path()) {
                    paths.insert(part.clone());
                }
            }
        }
    }
    paths
}

/// Deletes every update file superseded by a newer local update.
///
/// Each deletion is independent: a failure is recorded in the report and
/// the remaining files are still attempted.
#[instrument(skip_all, fields(titles = local.titles.len()))]
pub async fn delete_old_updates(local: &LocalLibrary, progress: &dyn Progress) -> OrganizeReport {
    let paths = superseded_updates(local);
    let total = paths.len() as u64;
    let mut report = OrganizeReport::default();
    progress.update(0, total, "Deleting old updates");
    for (index, path) in paths.into_iter().enumerate() {
        match nxshelf_storage::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Deleted old update");
                report.deleted.push(path);
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Could not delete old update");
                report.failures.push(Failure { path, reason: (*err).to_string() });
            },
        }
        progress.update(index as u64 + 1, total, "Deleting old updates");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::scan::{ContentFile, LibraryEntry};
    use nxshelf_container::models::{ContainerFile, ContainerKind, Format, GameMetadata, TitleId};
    use std::collections::BTreeMap;

    const BASE: TitleId = TitleId::new(0x0100000000010000);

    fn content(path: &Path, id: TitleId, version: u32) -> ContentFile {
        ContentFile {
            file: ContainerFile {
                path: path.to_path_buf(),
                parts: vec![path.to_path_buf()],
                format: Format::Nsp,
                kind: ContainerKind::Plain,
            },
            metadata: GameMetadata::new(id, version),
        }
    }

    fn library(root: &Path, updates: &[(&str, u32)]) -> LocalLibrary {
        let mut entry = LibraryEntry::new(BASE);
        entry.base = Some(content(&root.join("base.nsp"), BASE, 0));
        for (name, version) in updates {
            let path = root.join(name);
            std::fs::write(&path, b"update").unwrap();
            entry.updates.insert(*version, content(&path, BASE.update(), *version));
        }
        LocalLibrary { titles: BTreeMap::from([(BASE, entry)]), ..LocalLibrary::default() }
    }

    #[tokio::test]
    async fn test_deletes_all_but_latest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let local = library(temp_dir.path(), &[("v1.nsp", 65536), ("v2.nsp", 131072), ("v3.nsp", 196608)]);
        let report = delete_old_updates(&local, &NoProgress).await;
        assert_eq!(report.deleted, vec![temp_dir.path().join("v1.nsp"), temp_dir.path().join("v2.nsp")]);
        assert!(report.failures.is_empty());
        assert!(temp_dir.path().join("v3.nsp").exists());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let local = library(temp_dir.path(), &[("v1.nsp", 65536), ("v2.nsp", 131072), ("v3.nsp", 196608)]);
        std::fs::remove_file(temp_dir.path().join("v1.nsp")).unwrap();
        let report = delete_old_updates(&local, &NoProgress).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, temp_dir.path().join("v1.nsp"));
        assert_eq!(report.deleted, vec![temp_dir.path().join("v2.nsp")]);
    }

    #[test]
    fn test_keeps_bundles_and_covers_every_folder() {
        let root = Path::new("/games");
        let mut entry = LibraryEntry::new(BASE);
        let bundle = content(&root.join("bundle.nsp"), BASE, 0);
        entry.base = Some(bundle.clone());
        entry.updates.insert(65536, ContentFile { metadata: GameMetadata::new(BASE.update(), 65536), ..bundle });
        entry.updates.insert(131072, content(Path::new("/elsewhere/v2.nsp"), BASE.update(), 131072));
        entry.updates.insert(196608, content(&root.join("v3.nsp"), BASE.update(), 196608));
        let local = LocalLibrary { titles: BTreeMap::from([(BASE, entry)]), ..LocalLibrary::default() };
        assert_eq!(superseded_updates(&local), BTreeSet::from([PathBuf::from("/elsewhere/v2.nsp")]));
    }

    #[tokio::test]
    async fn test_deletes_old_updates_outside_the_source_folder() {
        let source = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let mut local = library(source.path(), &[("v3.nsp", 196608)]);
        let old = other.path().join("v1.nsp");
        std::fs::write(&old, b"update").unwrap();
        let entry = local.titles.get_mut(&BASE).unwrap();
        entry.updates.insert(65536, content(&old, BASE.update(), 65536));

        let report = delete_old_updates(&local, &NoProgress).await;
        assert_eq!(report.deleted, vec![old.clone()]);
        assert!(!old.exists());
        assert!(source.path().join("v3.nsp").exists());
    }
}
