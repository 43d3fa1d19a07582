//! Library organization: moving and renaming files according to name
//! templates, and pruning superseded updates.

mod cleanup;

pub use self::cleanup::delete_old_updates;
use crate::error::{ErrorKind, Result};
use crate::progress::Progress;
use crate::scan::{ContentFile, LibraryEntry, LocalLibrary};
use crate::template::{NameContext, NameTemplate};
use nxshelf_catalog::TitleCatalog;
use nxshelf_config::OrganizeOptions;
use nxshelf_container::models::ContentKind;
use nxshelf_container::part_suffix;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A file (or split part) that was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Moved {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// A file that could not be moved or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything an organize run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeReport {
    pub moved: Vec<Moved>,
    pub already_correct: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<Failure>,
    pub removed_folders: usize,
}
impl OrganizeReport {
    fn merge(&mut self, other: OrganizeReport) {
        self.moved.extend(other.moved);
        self.already_correct.extend(other.already_correct);
        self.deleted.extend(other.deleted);
        self.failures.extend(other.failures);
        self.removed_folders += other.removed_folders;
    }
}

/// Moves library files into place with validated templates.
///
/// # Examples
///
/// ```no_run
/// use nxshelf_catalog::TitleCatalog;
/// use nxshelf_config::OrganizeOptions;
/// use nxshelf_library::organize::Organizer;
/// use nxshelf_library::progress::NoProgress;
/// use nxshelf_library::scan::LocalLibrary;
/// use std::path::Path;
///
/// # async fn example(library: LocalLibrary, catalog: TitleCatalog) -> nxshelf_library::error::Result<()> {
/// let options = OrganizeOptions { create_folder_per_game: true, ..OrganizeOptions::default() };
/// let report = Organizer::new(&options)?.organize(Path::new("/mnt/sd/games"), &library, &catalog, &NoProgress).await;
/// println!("moved {} files", report.moved.len());
/// # Ok(())
/// # }
/// ```
pub struct Organizer {
    folder: Option<NameTemplate>,
    file: Option<NameTemplate>,
    delete_empty_folders: bool,
    delete_old_update_files: bool,
}
impl Organizer {
    /// Compiles and checks the enabled templates.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidTemplate`] when an enabled template is empty, does
    /// not compile or cannot produce a usable name. Nothing has been touched
    /// on disk at that point.
    pub fn new(options: &OrganizeOptions) -> Result<Self> {
        if !options.is_valid() {
            exn::bail!(ErrorKind::InvalidTemplate("renaming is enabled but its template is empty".into()));
        }
        let folder = match options.create_folder_per_game {
            true => Some(options.folder_name_template.parse()?),
            false => None,
        };
        let file = match options.rename_files {
            true => Some(options.file_name_template.parse()?),
            false => None,
        };
        Ok(Self {
            folder,
            file,
            delete_empty_folders: options.delete_empty_folders,
            delete_old_update_files: options.delete_old_update_files,
        })
    }

    /// Organizes every title whose base file is present.
    ///
    /// With folder-per-game enabled, files move into
    /// `source_folder/<folder name>/`; otherwise they stay in the folder they
    /// are in and are only renamed. Per-file problems end up in
    /// [`OrganizeReport::failures`] and never stop the run.
    #[instrument(skip(self, local, catalog, progress), fields(source_folder = %source_folder.display()))]
    pub async fn organize(
        &self,
        source_folder: &Path,
        local: &LocalLibrary,
        catalog: &TitleCatalog,
        progress: &dyn Progress,
    ) -> OrganizeReport {
        let mut report = OrganizeReport::default();
        if self.delete_old_update_files {
            report.merge(delete_old_updates(local, progress).await);
        }

        let mut handled: HashSet<PathBuf> = report.deleted.iter().cloned().collect();
        let entries: Vec<&LibraryEntry> = local.complete().collect();
        let total = entries.len() as u64;
        for (index, entry) in entries.into_iter().enumerate() {
            progress.update(index as u64, total, "Organizing files");
            for content in entry.contents() {
                // Multi-content files appear once per record; move them once.
                if !handled.insert(content.path().to_path_buf()) {
                    continue;
                }
                self.organize_file(source_folder, entry, content, catalog, &mut report).await;
            }
        }
        progress.update(total, total, "Organizing files");

        if self.delete_empty_folders {
            match nxshelf_storage::fs::remove_empty_dirs(source_folder).await {
                Ok(removed) => report.removed_folders += removed,
                Err(err) => {
                    tracing::warn!(error = %err, "Could not remove empty folders");
                    report.failures.push(Failure { path: source_folder.to_path_buf(), reason: (*err).to_string() });
                },
            }
        }
        tracing::info!(
            moved = report.moved.len(),
            deleted = report.deleted.len(),
            failures = report.failures.len(),
            "Organize complete"
        );
        report
    }

    async fn organize_file(
        &self,
        source_folder: &Path,
        entry: &LibraryEntry,
        content: &ContentFile,
        catalog: &TitleCatalog,
        report: &mut OrganizeReport,
    ) {
        let targets = match self.targets(source_folder, entry, content, catalog) {
            Ok(targets) => targets,
            Err(err) => {
                tracing::warn!(path = %content.path().display(), error = %err, "Could not name file");
                report.failures.push(Failure { path: content.path().to_path_buf(), reason: (*err).to_string() });
                return;
            },
        };
        for (from, to) in targets {
            if from == to {
                report.already_correct.push(from);
                continue;
            }
            match nxshelf_storage::fs::move_file(&from, &to).await {
                Ok(()) => {
                    tracing::debug!(from = %from.display(), to = %to.display(), "Moved file");
                    report.moved.push(Moved { from, to });
                },
                Err(err) => {
                    tracing::warn!(path = %from.display(), error = %err, "Could not move file");
                    report.failures.push(Failure { path: from, reason: (*err).to_string() });
                },
            }
        }
    }

    /// Where every part of a content file should live.
    fn targets(
        &self,
        source_folder: &Path,
        entry: &LibraryEntry,
        content: &ContentFile,
        catalog: &TitleCatalog,
    ) -> Result<Vec<(PathBuf, PathBuf)>> {
        let base = catalog.get(entry.base_id);
        let name = base
            .map(|title| title.name.as_str())
            .filter(|name| !name.is_empty())
            .or_else(|| entry.display_name())
            .unwrap_or_default();
        let region = base.and_then(|title| title.region.clone());

        let folder = match &self.folder {
            Some(template) => {
                let mut context = NameContext::new(name, entry.base_id, 0);
                context.region = region.clone();
                context.display_version = entry.base.as_ref().and_then(|b| b.metadata.display_version.clone());
                source_folder.join(template.render(&context)?)
            },
            None => content.file.folder().to_path_buf(),
        };
        let stem = match &self.file {
            Some(template) => {
                let metadata = &content.metadata;
                let mut context = NameContext::new(name, metadata.title_id, metadata.version);
                context.region = region;
                context.display_version = metadata.display_version.clone();
                if metadata.kind() == ContentKind::AddOn {
                    let catalog_name = catalog.get(metadata.title_id).map(|t| t.name.as_str()).filter(|n| !n.is_empty());
                    context.dlc_name = catalog_name.or_else(|| metadata.display_name()).map(str::to_string);
                }
                Some(template.render(&context)?)
            },
            None => None,
        };

        let mut targets = Vec::with_capacity(content.file.parts.len());
        for part in &content.file.parts {
            let current = part.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let file_name = match (&stem, content.file.is_split()) {
                (None, _) => current,
                (Some(stem), true) => format!("{stem}{}", part_suffix(&current).unwrap_or_default()),
                (Some(stem), false) => format!("{stem}.{}", content.file.format.extension()),
            };
            targets.push((part.clone(), folder.join(file_name)));
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use nxshelf_catalog::CatalogTitle;
    use nxshelf_container::models::{ContainerFile, ContainerKind, Format, GameMetadata, TitleId};
    use std::collections::BTreeMap;

    const BASE: TitleId = TitleId::new(0x0100000000010000);
    const ADD_ON: TitleId = TitleId::new(0x0100000000011001);

    fn touch(path: &Path) -> PathBuf {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"data").unwrap();
        path.to_path_buf()
    }

    fn content(parts: Vec<PathBuf>, id: TitleId, version: u32) -> ContentFile {
        let kind = if parts.len() > 1 { ContainerKind::Split } else { ContainerKind::Plain };
        ContentFile {
            file: ContainerFile { path: parts[0].clone(), parts, format: Format::Nsp, kind },
            metadata: GameMetadata::new(id, version),
        }
    }

    fn catalog() -> TitleCatalog {
        let mut title = CatalogTitle::new(BASE);
        title.name = "Super Game".into();
        let mut add_on = CatalogTitle::new(ADD_ON);
        add_on.name = "Expansion Pass".into();
        title.add_ons.insert(ADD_ON, add_on);
        TitleCatalog { titles: BTreeMap::from([(BASE, title)]) }
    }

    fn options() -> OrganizeOptions {
        OrganizeOptions {
            create_folder_per_game: true,
            rename_files: true,
            delete_empty_folders: true,
            ..OrganizeOptions::default()
        }
    }

    #[test]
    fn test_invalid_options_fail_before_touching_files() {
        let empty = OrganizeOptions { rename_files: true, file_name_template: String::new(), ..OrganizeOptions::default() };
        assert!(matches!(&*Organizer::new(&empty).err().unwrap(), ErrorKind::InvalidTemplate(_)));
        let blank = OrganizeOptions {
            create_folder_per_game: true,
            folder_name_template: "{{ dlc_name }}".into(),
            ..OrganizeOptions::default()
        };
        assert!(matches!(&*Organizer::new(&blank).err().unwrap(), ErrorKind::InvalidTemplate(_)));
    }

    #[tokio::test]
    async fn test_organize_into_game_folders() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let mut entry = LibraryEntry::new(BASE);
        entry.base = Some(content(vec![touch(&root.join("incoming/base.nsp"))], BASE, 0));
        entry.updates.insert(65536, content(vec![touch(&root.join("incoming/upd.nsp"))], BASE.update(), 65536));
        entry.dlc.push(content(vec![touch(&root.join("dlc.nsp.00")), touch(&root.join("dlc.nsp.01"))], ADD_ON, 0));
        let local = LocalLibrary { titles: BTreeMap::from([(BASE, entry)]), num_files: 3, ..LocalLibrary::default() };

        let report = Organizer::new(&options()).unwrap().organize(root, &local, &catalog(), &NoProgress).await;
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.moved.len(), 4);
        let folder = root.join("Super Game");
        assert!(folder.join("Super Game [0100000000010000][v0].nsp").exists());
        assert!(folder.join("Super Game [0100000000010800][v65536].nsp").exists());
        assert!(folder.join("Super Game [Expansion Pass] [0100000000011001][v0].nsp.00").exists());
        assert!(folder.join("Super Game [Expansion Pass] [0100000000011001][v0].nsp.01").exists());
        // The emptied incoming folder is removed.
        assert_eq!(report.removed_folders, 1);
        assert!(!root.join("incoming").exists());
    }

    #[tokio::test]
    async fn test_organize_is_stable_and_skips_base_less_titles() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let placed = touch(&root.join("Super Game/Super Game [0100000000010000][v0].nsp"));
        let mut entry = LibraryEntry::new(BASE);
        entry.base = Some(content(vec![placed.clone()], BASE, 0));
        let orphan_id = TitleId::new(0x0100000000020000);
        let mut orphan = LibraryEntry::new(orphan_id);
        let orphan_path = touch(&root.join("orphan.nsp"));
        orphan.updates.insert(65536, content(vec![orphan_path.clone()], orphan_id.update(), 65536));
        let local = LocalLibrary {
            titles: BTreeMap::from([(BASE, entry), (orphan_id, orphan)]),
            ..LocalLibrary::default()
        };

        let report = Organizer::new(&options()).unwrap().organize(root, &local, &catalog(), &NoProgress).await;
        assert_eq!(report.already_correct, vec![placed]);
        assert!(report.moved.is_empty());
        assert!(orphan_path.exists());
    }

    #[tokio::test]
    async fn test_existing_destination_is_a_per_file_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(&root.join("Super Game/Super Game [0100000000010000][v0].nsp"));
        let mut entry = LibraryEntry::new(BASE);
        entry.base = Some(content(vec![touch(&root.join("copy.nsp"))], BASE, 0));
        entry.updates.insert(65536, content(vec![touch(&root.join("upd.nsp"))], BASE.update(), 65536));
        let local = LocalLibrary { titles: BTreeMap::from([(BASE, entry)]), ..LocalLibrary::default() };

        let report = Organizer::new(&options()).unwrap().organize(root, &local, &catalog(), &NoProgress).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, root.join("copy.nsp"));
        assert_eq!(report.moved.len(), 1);
        assert!(root.join("copy.nsp").exists());
    }

    #[tokio::test]
    async fn test_rename_in_place_and_delete_old_updates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let mut entry = LibraryEntry::new(BASE);
        entry.base = Some(content(vec![touch(&root.join("sub/base.nsp"))], BASE, 0));
        entry.updates.insert(65536, content(vec![touch(&root.join("sub/old.nsp"))], BASE.update(), 65536));
        entry.updates.insert(131072, content(vec![touch(&root.join("sub/new.nsp"))], BASE.update(), 131072));
        let local = LocalLibrary { titles: BTreeMap::from([(BASE, entry)]), ..LocalLibrary::default() };

        let options = OrganizeOptions { rename_files: true, delete_old_update_files: true, ..OrganizeOptions::default() };
        let report = Organizer::new(&options).unwrap().organize(root, &local, &catalog(), &NoProgress).await;
        assert_eq!(report.deleted, vec![root.join("sub/old.nsp")]);
        assert_eq!(report.moved.len(), 2);
        assert!(root.join("sub/Super Game [0100000000010000][v0].nsp").exists());
        assert!(root.join("sub/Super Game [0100000000010800][v131072].nsp").exists());
        assert!(!root.join("sub/old.nsp").exists());
    }
}
