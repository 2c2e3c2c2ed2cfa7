use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Absolute project directory every other path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    path: PathBuf,
}

impl ProjectRoot {
    /// Canonicalizes `path`, which must be an existing directory.
    pub fn resolve(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Project root does not exist: {:?}", path))?;
        if !path.is_dir() {
            anyhow::bail!("Project root must be a directory: {:?}", path);
        }
        Ok(Self { path })
    }

    /// Wraps an already absolute path without touching the filesystem.
    pub fn from_absolute(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }

    /// `path` relative to the root, or unchanged when it lies outside.
    pub fn display_relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.path).unwrap_or(path)
    }
}

/// Where the renamed project keeps each file it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub build_file: PathBuf,
    pub build_keys: Vec<String>,
    pub source_root: PathBuf,
    pub source_extension: String,
    pub strings_file: PathBuf,
    pub app_name_element: String,
    pub readme: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            build_file: ["app", "build.gradle.kts"].iter().collect(),
            build_keys: vec!["namespace".to_string(), "applicationId".to_string()],
            source_root: ["app", "src", "main", "java"].iter().collect(),
            source_extension: "kt".to_string(),
            strings_file: ["app", "src", "main", "res", "values", "strings.xml"].iter().collect(),
            app_name_element: "app_name".to_string(),
            readme: PathBuf::from("README.md"),
        }
    }
}

impl ProjectLayout {
    pub fn with_source_extension(mut self, extension: &str) -> Self {
        self.source_extension = extension.trim_start_matches('.').to_string();
        self
    }
}
