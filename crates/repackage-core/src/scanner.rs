use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::rewriter::LiteralRewriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// No occurrence of the token, nothing written.
    Untouched,
    Updated,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl ScannedFile {
    pub fn changed(&self) -> bool {
        self.status == FileStatus::Updated
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    MissingRoot,
    Files(Vec<ScannedFile>),
}

/// Applies `rewriter` to every file under `root` with the given extension.
///
/// Files are only written when their content actually changes and `review`
/// accepts the change. With `dry_run` nothing is written but the statuses are
/// reported as if it had been.
pub fn scan<F>(
    root: &Path,
    extension: &str,
    rewriter: &LiteralRewriter,
    dry_run: bool,
    review: &F,
) -> Result<Scan>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    if !root.is_dir() {
        return Ok(Scan::MissingRoot);
    }

    let mut files = Vec::new();
    collect_files(root, OsStr::new(extension), &mut files)?;
    debug!("Found {} .{} files under {:?}", files.len(), extension, root);

    let mut scanned = Vec::with_capacity(files.len());
    for path in files {
        let status = rewrite_file(&path, rewriter, dry_run, review)?;
        scanned.push(ScannedFile { path, status });
    }
    Ok(Scan::Files(scanned))
}

fn collect_files(dir: &Path, extension: &OsStr, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            subdirs.push(path);
        } else if file_type.is_file() && path.extension() == Some(extension) {
            files.push(path);
        }
    }

    for subdir in subdirs {
        collect_files(&subdir, extension, files)?;
    }
    Ok(())
}

fn rewrite_file<F>(path: &Path, rewriter: &LiteralRewriter, dry_run: bool, review: &F) -> Result<FileStatus>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
            debug!("Skipping non UTF-8 file: {:?}", path);
            return Ok(FileStatus::Untouched);
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to read {:?}", path)),
    };

    let Some(new_content) = rewriter.process_content(&content).changed() else {
        return Ok(FileStatus::Untouched);
    };

    if !review(path, &content, &new_content, "Package reference update")? {
        debug!("Change declined: {:?}", path);
        return Ok(FileStatus::Declined);
    }

    if dry_run {
        debug!("Would update contents of: {:?}", path);
    } else {
        debug!("Updating contents of: {:?}", path);
        fs::write(path, new_content).with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(FileStatus::Updated)
}
