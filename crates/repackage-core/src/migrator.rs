//! Moves a package directory tree (`com/example/old`) to its new location
//! (`com/example/new`), merging into whatever already exists there, then
//! prunes the emptied ancestors of the old tree.

use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::identifier::DottedIdentifier;
use crate::RepackageError;

const STAGING_SUFFIX: &str = "repackage-staging";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Entries relocated to a destination that had nothing by that name.
    pub moved: usize,
    /// Source directories merged into an existing destination directory.
    pub merged: usize,
    /// Destination files replaced by a source file of the same name.
    pub overwritten: usize,
    pub removed_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Migration {
    MissingSource(PathBuf),
    Completed(MigrationSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    source_root: PathBuf,
    from: PathBuf,
    to: PathBuf,
}

impl MigrationPlan {
    pub fn new(source_root: &Path, old: &DottedIdentifier, new: &DottedIdentifier) -> Result<Self, RepackageError> {
        if old.is_empty() {
            return Err(RepackageError::EmptyIdentifier {
                role: "old",
                identifier: old.to_string(),
            });
        }
        if new.is_empty() {
            return Err(RepackageError::EmptyIdentifier {
                role: "new",
                identifier: new.to_string(),
            });
        }
        if old.segments() == new.segments() {
            return Err(RepackageError::SameIdentifier {
                identifier: old.to_string(),
            });
        }

        Ok(Self {
            source_root: source_root.to_path_buf(),
            from: source_root.join(old.to_relative_path()),
            to: source_root.join(new.to_relative_path()),
        })
    }

    pub fn from(&self) -> &Path {
        &self.from
    }

    pub fn to(&self) -> &Path {
        &self.to
    }

    pub fn source_exists(&self) -> bool {
        self.from.is_dir()
    }

    fn overlaps(&self) -> bool {
        self.to.starts_with(&self.from) || self.from.starts_with(&self.to)
    }

    /// Performs the migration.
    ///
    /// Any filesystem error aborts immediately and leaves the tree partially
    /// migrated.
    pub fn execute(&self) -> Result<Migration> {
        if !self.source_exists() {
            return Ok(Migration::MissingSource(self.from.clone()));
        }

        let mut summary = self.summary();
        let source = if self.overlaps() {
            self.stage_source()?
        } else {
            self.from.clone()
        };

        fs::create_dir_all(&self.to).map_err(at(&self.to))?;

        for entry in sorted_entries(&source)? {
            let child = entry.path();
            let target = self.to.join(entry.file_name());
            relocate(&entry, &child, &target, &mut summary)?;
        }

        summary.removed_dirs = self.prune_from(&source);
        Ok(Migration::Completed(summary))
    }

    /// Computes what [`execute`](Self::execute) would do without touching disk.
    pub fn preview(&self) -> Result<Migration> {
        if !self.source_exists() {
            return Ok(Migration::MissingSource(self.from.clone()));
        }

        let mut summary = self.summary();
        let dest_cleared = self.to.starts_with(&self.from);

        for entry in sorted_entries(&self.from)? {
            let child = entry.path();
            let target = self.to.join(entry.file_name());
            if dest_cleared || target == self.from || !exists(&target) {
                summary.moved += 1;
            } else if entry.file_type().map_err(at(&child))?.is_dir() {
                preview_merge(&child, &target, &mut summary)?;
            } else if target.is_dir() {
                return Err(RepackageError::Conflict { path: target }.into());
            } else {
                summary.overwritten += 1;
            }
        }
        Ok(Migration::Completed(summary))
    }

    fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            from: self.from.clone(),
            to: self.to.clone(),
            ..Default::default()
        }
    }

    /// Renames the source tree to a sibling so neither tree contains the other.
    fn stage_source(&self) -> Result<PathBuf> {
        let parent = self.from.parent().unwrap_or(&self.source_root);
        let name = self
            .from
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut staging = parent.join(format!(".{name}.{STAGING_SUFFIX}"));
        let mut attempt = 1;
        while exists(&staging) {
            staging = parent.join(format!(".{name}.{STAGING_SUFFIX}-{attempt}"));
            attempt += 1;
        }

        debug!("Staging overlapping source {:?} at {:?}", self.from, staging);
        fs::rename(&self.from, &staging).map_err(at(&self.from))?;
        Ok(staging)
    }

    /// Removes `start` and each emptied ancestor, stopping at the first
    /// directory that still has content, at the destination or one of its
    /// ancestors, or at the source root.
    fn prune_from(&self, start: &Path) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        let mut current = start.to_path_buf();

        while current != self.source_root
            && current.starts_with(&self.source_root)
            && !self.to.starts_with(&current)
        {
            match fs::remove_dir(&current) {
                Ok(()) => {
                    debug!("Removed empty directory: {:?}", current);
                    removed.push(current.clone());
                }
                Err(err) if err.kind() == io::ErrorKind::DirectoryNotEmpty => break,
                Err(err) if err.kind() == io::ErrorKind::NotFound => break,
                Err(err) => {
                    warn!("Stopped cleaning up at {:?}: {}", current, err);
                    break;
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
        removed
    }
}

fn relocate(entry: &DirEntry, child: &Path, target: &Path, summary: &mut MigrationSummary) -> Result<()> {
    let is_dir = entry.file_type().map_err(at(child))?.is_dir();

    match fs::symlink_metadata(target) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("Moving {:?} -> {:?}", child, target);
            fs::rename(child, target).map_err(at(child))?;
            summary.moved += 1;
        }
        Err(err) => return Err(at(target)(err).into()),
        Ok(existing) if is_dir && existing.is_dir() => {
            summary.merged += 1;
            merge_directory(child, target, summary)?;
        }
        Ok(existing) if is_dir || existing.is_dir() => {
            return Err(RepackageError::Conflict {
                path: target.to_path_buf(),
            }
            .into());
        }
        Ok(_) => {
            debug!("Overwriting {:?} with {:?}", target, child);
            fs::rename(child, target).map_err(at(child))?;
            summary.overwritten += 1;
        }
    }
    Ok(())
}

/// Moves the contents of `src` into the existing directory `dst` file by file,
/// creating directories as needed, then removes the emptied `src`.
fn merge_directory(src: &Path, dst: &Path, summary: &mut MigrationSummary) -> Result<()> {
    debug!("Merging {:?} into {:?}", src, dst);

    for entry in sorted_entries(src)? {
        let child = entry.path();
        let target = dst.join(entry.file_name());

        if entry.file_type().map_err(at(&child))?.is_dir() {
            match fs::symlink_metadata(&target) {
                Ok(existing) if existing.is_dir() => {
                    summary.merged += 1;
                    merge_directory(&child, &target, summary)?;
                }
                Ok(_) => {
                    return Err(RepackageError::Conflict { path: target }.into());
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    fs::create_dir(&target).map_err(at(&target))?;
                    merge_directory(&child, &target, summary)?;
                }
                Err(err) => return Err(at(&target)(err).into()),
            }
        } else {
            relocate(&entry, &child, &target, summary)?;
        }
    }

    fs::remove_dir(src).map_err(at(src))?;
    Ok(())
}

fn preview_merge(src: &Path, dst: &Path, summary: &mut MigrationSummary) -> Result<()> {
    if !dst.is_dir() {
        return Err(RepackageError::Conflict { path: dst.to_path_buf() }.into());
    }
    summary.merged += 1;

    for entry in sorted_entries(src)? {
        let child = entry.path();
        let target = dst.join(entry.file_name());
        let is_dir = entry.file_type().map_err(at(&child))?.is_dir();

        if !exists(&target) {
            summary.moved += 1;
        } else if is_dir {
            preview_merge(&child, &target, summary)?;
        } else if target.is_dir() {
            return Err(RepackageError::Conflict { path: target }.into());
        } else {
            summary.overwritten += 1;
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<DirEntry>> {
    let mut entries = fs::read_dir(dir)
        .map_err(at(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(at(dir))?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn at(path: &Path) -> impl FnOnce(io::Error) -> RepackageError + '_ {
    move |source| RepackageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn plan(root: &Path, old: &str, new: &str) -> MigrationPlan {
        MigrationPlan::new(root, &DottedIdentifier::parse(old), &DottedIdentifier::parse(new)).unwrap()
    }

    fn completed(migration: Migration) -> MigrationSummary {
        match migration {
            Migration::Completed(summary) => summary,
            Migration::MissingSource(path) => panic!("Source unexpectedly missing: {:?}", path),
        }
    }

    #[test]
    fn test_move_into_fresh_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("a/b/c/File.kt"), "file");
        write(&root.join("a/sibling/Keep.kt"), "keep");

        let summary = completed(plan(root, "a.b.c", "a.b.x.y").execute().unwrap());

        assert_eq!(fs::read_to_string(root.join("a/b/x/y/File.kt")).unwrap(), "file");
        assert!(!root.join("a/b/c").exists());
        assert!(root.join("a/b").exists());
        assert!(root.join("a/sibling/Keep.kt").exists());
        assert_eq!(summary.moved, 1);
        assert_eq!(summary.removed_dirs, vec![root.join("a/b/c")]);
    }

    #[test]
    fn test_prunes_emptied_ancestors_but_keeps_populated_ones() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("a/b/c/File.kt"), "file");
        write(&root.join("a/other/Keep.kt"), "keep");

        let summary = completed(plan(root, "a.b.c", "x.y").execute().unwrap());

        assert!(root.join("x/y/File.kt").exists());
        assert!(!root.join("a/b").exists());
        assert!(root.join("a").exists());
        assert_eq!(summary.removed_dirs, vec![root.join("a/b/c"), root.join("a/b")]);
    }

    #[test]
    fn test_never_removes_source_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("java");
        write(&root.join("a/File.kt"), "file");

        completed(plan(&root, "a", "b").execute().unwrap());

        assert!(root.join("b/File.kt").exists());
        assert!(!root.join("a").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_merge_into_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("x/y/Existing.kt"), "existing");
        write(&root.join("a/b/Other.kt"), "other");

        completed(plan(root, "a.b", "x.y").execute().unwrap());

        assert_eq!(fs::read_to_string(root.join("x/y/Existing.kt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(root.join("x/y/Other.kt")).unwrap(), "other");
        assert!(!root.join("a").exists());
    }

    #[test]
    fn test_merge_same_named_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("x/y/ui/Existing.kt"), "existing");
        write(&root.join("x/y/ui/Shared.kt"), "old shared");
        write(&root.join("a/b/ui/New.kt"), "new");
        write(&root.join("a/b/ui/Shared.kt"), "new shared");
        write(&root.join("a/b/ui/deep/nested/Deep.kt"), "deep");

        let summary = completed(plan(root, "a.b", "x.y").execute().unwrap());

        assert_eq!(fs::read_to_string(root.join("x/y/ui/Existing.kt")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(root.join("x/y/ui/New.kt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(root.join("x/y/ui/Shared.kt")).unwrap(), "new shared");
        assert_eq!(fs::read_to_string(root.join("x/y/ui/deep/nested/Deep.kt")).unwrap(), "deep");
        assert!(!root.join("a").exists());
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.overwritten, 1);
        assert_eq!(summary.moved, 2);
    }

    #[test]
    fn test_top_level_file_overwrites_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("x/Main.kt"), "destination");
        write(&root.join("a/Main.kt"), "source");

        let summary = completed(plan(root, "a", "x").execute().unwrap());

        assert_eq!(fs::read_to_string(root.join("x/Main.kt")).unwrap(), "source");
        assert_eq!(summary.overwritten, 1);
    }

    #[test]
    fn test_destination_nested_inside_source() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("com/app/Main.kt"), "main");
        write(&root.join("com/app/pro/Feature.kt"), "feature");

        let summary = completed(plan(root, "com.app", "com.app.pro").execute().unwrap());

        assert_eq!(fs::read_to_string(root.join("com/app/pro/Main.kt")).unwrap(), "main");
        assert_eq!(fs::read_to_string(root.join("com/app/pro/pro/Feature.kt")).unwrap(), "feature");
        assert!(!root.join("com/app/Main.kt").exists());
        assert!(summary.removed_dirs.iter().all(|dir| dir.file_name().unwrap() != "app"));
        assert_eq!(fs::read_dir(root.join("com")).unwrap().count(), 1);
    }

    #[test]
    fn test_source_nested_inside_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("com/app/lite/Main.kt"), "main");
        write(&root.join("com/app/lite/lite/Inner.kt"), "inner");
        write(&root.join("com/app/Existing.kt"), "existing");

        completed(plan(root, "com.app.lite", "com.app").execute().unwrap());

        assert_eq!(fs::read_to_string(root.join("com/app/Main.kt")).unwrap(), "main");
        assert_eq!(fs::read_to_string(root.join("com/app/lite/Inner.kt")).unwrap(), "inner");
        assert_eq!(fs::read_to_string(root.join("com/app/Existing.kt")).unwrap(), "existing");
        assert_eq!(fs::read_dir(root.join("com/app")).unwrap().count(), 3);
    }

    #[test]
    fn test_empty_source_does_not_remove_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("com/app/lite")).unwrap();

        completed(plan(root, "com.app.lite", "com.app").execute().unwrap());

        assert!(root.join("com/app").is_dir());
        assert!(!root.join("com/app/lite").exists());
    }

    #[test]
    fn test_missing_source_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let migration = plan(root, "a.b", "c.d").execute().unwrap();

        assert_eq!(migration, Migration::MissingSource(root.join("a/b")));
        assert!(!root.join("c").exists());
    }

    #[test]
    fn test_file_directory_conflict_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("x/ui"), "a file named ui");
        write(&root.join("a/ui/Screen.kt"), "screen");

        let err = plan(root, "a", "x").execute().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RepackageError>(),
            Some(RepackageError::Conflict { .. })
        ));
        assert!(root.join("a/ui/Screen.kt").exists());
    }

    #[test]
    fn test_preview_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(&root.join("x/y/ui/Shared.kt"), "old");
        write(&root.join("a/b/ui/Shared.kt"), "new");
        write(&root.join("a/b/Main.kt"), "main");

        let summary = completed(plan(root, "a.b", "x.y").preview().unwrap());

        assert_eq!(summary.moved, 1);
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.overwritten, 1);
        assert!(root.join("a/b/Main.kt").exists());
        assert!(!root.join("x/y/Main.kt").exists());
    }

    #[test]
    fn test_plan_rejects_same_and_empty_identifiers() {
        let root = Path::new("/project/java");
        let same = MigrationPlan::new(root, &DottedIdentifier::parse("a.b"), &DottedIdentifier::parse("a..b"));
        let empty = MigrationPlan::new(root, &DottedIdentifier::parse(".."), &DottedIdentifier::parse("a"));

        assert!(matches!(same, Err(RepackageError::SameIdentifier { .. })));
        assert!(matches!(empty, Err(RepackageError::EmptyIdentifier { role: "old", .. })));
    }
}
