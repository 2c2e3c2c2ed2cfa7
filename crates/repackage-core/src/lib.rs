use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod identifier;
pub mod layout;
pub mod migrator;
pub mod outcome;
pub mod rewriter;
pub mod scanner;

pub use identifier::DottedIdentifier;
pub use layout::{ProjectLayout, ProjectRoot};
pub use migrator::{Migration, MigrationPlan, MigrationSummary};
pub use outcome::{RunReport, Stage, StageOutcome, StageReport};
pub use rewriter::{KeyValueRewriter, LiteralRewriter, Rewrite, TagRewriter};
pub use scanner::{FileStatus, Scan, ScannedFile};

/// Display name the template ships with, replaced in the README when a new name is given.
pub const DEFAULT_OLD_NAME: &str = "android app";

#[derive(thiserror::Error, Debug)]
pub enum RepackageError {
    #[error("old-id and new-id are the same ('{identifier}'); nothing to do")]
    SameIdentifier { identifier: String },
    #[error("The {role} id '{identifier}' has no package segments")]
    EmptyIdentifier { role: &'static str, identifier: String },
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot merge {path:?}: a file and a directory share this name")]
    Conflict { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequest {
    pub old_id: DottedIdentifier,
    pub new_id: DottedIdentifier,
    pub new_name: Option<String>,
    pub old_name: String,
    pub update_readme: bool,
}

impl RenameRequest {
    pub fn new(old_id: &str, new_id: &str) -> Self {
        Self {
            old_id: DottedIdentifier::parse(old_id),
            new_id: DottedIdentifier::parse(new_id),
            new_name: None,
            old_name: DEFAULT_OLD_NAME.to_string(),
            update_readme: false,
        }
    }

    /// An empty name counts as no name.
    pub fn with_new_name(mut self, new_name: Option<&str>) -> Self {
        self.new_name = new_name.filter(|name| !name.is_empty()).map(str::to_string);
        self
    }

    pub fn with_old_name(mut self, old_name: &str) -> Self {
        self.old_name = old_name.to_string();
        self
    }

    pub fn with_readme(mut self, update_readme: bool) -> Self {
        self.update_readme = update_readme;
        self
    }

    /// Refuses requests that would do nothing or rewrite with an empty identifier.
    pub fn validate(&self) -> Result<(), RepackageError> {
        if self.old_id.as_str() == self.new_id.as_str() || self.old_id.segments() == self.new_id.segments() {
            return Err(RepackageError::SameIdentifier {
                identifier: self.old_id.to_string(),
            });
        }
        for (role, id) in [("old", &self.old_id), ("new", &self.new_id)] {
            if id.is_empty() {
                return Err(RepackageError::EmptyIdentifier {
                    role,
                    identifier: id.to_string(),
                });
            }
        }
        Ok(())
    }
}

pub fn rename_project(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    request: &RenameRequest,
    dry_run: bool,
) -> Result<RunReport, RepackageError> {
    rename_project_interactive(
        root,
        layout,
        request,
        dry_run,
        |_: &Path, _: &str, _: &str, _: &str| Ok(true),
        |_: &Path, _: &Path| Ok(true),
    )
}

/// Runs every stage in order, asking `content_callback` before each file write
/// and `path_callback` before the directory migration.
///
/// Missing files and absent patterns skip their stage; a filesystem error
/// fails its stage and ends the run. Both are recorded in the returned report.
pub fn rename_project_interactive<F, G>(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    request: &RenameRequest,
    dry_run: bool,
    content_callback: F,
    path_callback: G,
) -> Result<RunReport, RepackageError>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
    G: Fn(&Path, &Path) -> Result<bool>,
{
    request.validate()?;

    info!("Renaming package/applicationId: {} -> {}", request.old_id, request.new_id);
    debug!("Project root: {:?}", root.path());

    let mut report = RunReport::new(dry_run);

    let stage = Stage::BuildConfig;
    if !report.record(stage, update_build_file(root, layout, request, dry_run, &content_callback)) {
        return Ok(report);
    }

    let stage = Stage::Sources;
    if !report.record(stage, update_sources(root, layout, request, dry_run, &content_callback)) {
        return Ok(report);
    }

    let stage = Stage::PackageDirectory;
    if !report.record(stage, migrate_package_directory(root, layout, request, dry_run, &path_callback)) {
        return Ok(report);
    }

    if let Some(new_name) = &request.new_name {
        let stage = Stage::AppName;
        if !report.record(stage, update_app_name(root, layout, new_name, dry_run, &content_callback)) {
            return Ok(report);
        }
    }

    if request.update_readme {
        report.record(Stage::Readme, update_readme(root, layout, request, dry_run, &content_callback));
    }

    info!(
        "Rename finished: {} stages run, {} files changed",
        report.stages.len(),
        report.changed_files().count()
    );

    Ok(report)
}

fn update_build_file<F>(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    request: &RenameRequest,
    dry_run: bool,
    content_callback: &F,
) -> Result<StageReport>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    let stage = Stage::BuildConfig;
    let path = root.join(&layout.build_file);
    let shown = root.display_relative(&path).display().to_string();
    let Some(content) = read_if_exists(&path)? else {
        return Ok(StageReport::missing(stage, path.clone(), format!("{} not found at {}", shown, path.display())));
    };

    let keys = layout.build_keys.join(" and ");
    let rewriter = KeyValueRewriter::new(&layout.build_keys, request.old_id.as_str(), request.new_id.as_str());
    let Some(new_content) = rewriter.process_content(&content).changed() else {
        let detail = if content.contains(request.old_id.as_str()) {
            format!("No {} declaration of '{}' in {}", keys, request.old_id, shown)
        } else {
            format!("Old id '{}' not found in {}", request.old_id, shown)
        };
        return Ok(StageReport::not_found(stage, detail));
    };

    if !write_reviewed(&path, &content, &new_content, "Build configuration update", dry_run, content_callback)? {
        return Ok(StageReport::declined(stage, format!("Kept {} unchanged", shown)));
    }

    Ok(StageReport::applied(stage, format!("{} {} in {}", verb(dry_run), keys, shown)).with_changed_files(vec![path]))
}

fn update_sources<F>(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    request: &RenameRequest,
    dry_run: bool,
    content_callback: &F,
) -> Result<StageReport>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    let stage = Stage::Sources;
    let source_root = root.join(&layout.source_root);
    let rewriter = LiteralRewriter::new(request.old_id.as_str(), request.new_id.as_str());

    let files = match scanner::scan(&source_root, &layout.source_extension, &rewriter, dry_run, content_callback)? {
        Scan::MissingRoot => {
            let detail = format!("Source root not found at {}", source_root.display());
            return Ok(StageReport::missing(stage, source_root, detail));
        }
        Scan::Files(files) => files,
    };

    let declined = files.iter().filter(|file| file.status == FileStatus::Declined).count();
    let changed: Vec<PathBuf> = files.into_iter().filter(|file| file.changed()).map(|file| file.path).collect();

    if changed.is_empty() {
        if declined > 0 {
            return Ok(StageReport::declined(stage, format!("Kept {} source files unchanged", declined)));
        }
        return Ok(StageReport::not_found(
            stage,
            format!(
                "No .{} files under {} reference '{}'",
                layout.source_extension,
                layout.source_root.display(),
                request.old_id
            ),
        ));
    }

    let mut detail = format!("{} package/imports in {} source files", verb(dry_run), changed.len());
    if declined > 0 {
        detail.push_str(&format!(" ({} declined)", declined));
    }
    Ok(StageReport::applied(stage, detail).with_changed_files(changed))
}

fn migrate_package_directory<G>(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    request: &RenameRequest,
    dry_run: bool,
    path_callback: &G,
) -> Result<StageReport>
where
    G: Fn(&Path, &Path) -> Result<bool>,
{
    let stage = Stage::PackageDirectory;
    let source_root = root.join(&layout.source_root);
    if !source_root.is_dir() {
        let detail = format!("Source root not found at {}", source_root.display());
        return Ok(StageReport::missing(stage, source_root, detail));
    }

    let plan = MigrationPlan::new(&source_root, &request.old_id, &request.new_id)?;
    if !plan.source_exists() {
        let detail = format!("Old package directory not found: {}", plan.from().display());
        return Ok(StageReport::missing(stage, plan.from().to_path_buf(), detail));
    }

    let from = root.display_relative(plan.from()).display().to_string();
    let to = root.display_relative(plan.to()).display().to_string();

    if !path_callback(plan.from(), plan.to())? {
        return Ok(StageReport::declined(stage, format!("Kept package directory {}", from)));
    }

    let migration = if dry_run { plan.preview()? } else { plan.execute()? };
    match migration {
        Migration::MissingSource(path) => {
            let detail = format!("Old package directory not found: {}", path.display());
            Ok(StageReport::missing(stage, path, detail))
        }
        Migration::Completed(summary) => {
            let action = if dry_run { "Would rename" } else { "Renamed" };
            info!(
                "{} package directory: {} moved, {} merged, {} overwritten",
                action, summary.moved, summary.merged, summary.overwritten
            );
            Ok(StageReport::applied(stage, format!("{} package directory {} -> {}", action, from, to)).with_migration(summary))
        }
    }
}

fn update_app_name<F>(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    new_name: &str,
    dry_run: bool,
    content_callback: &F,
) -> Result<StageReport>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    let stage = Stage::AppName;
    let path = root.join(&layout.strings_file);
    let shown = root.display_relative(&path).display().to_string();
    let Some(content) = read_if_exists(&path)? else {
        return Ok(StageReport::missing(stage, path.clone(), format!("{} not found at {}", shown, path.display())));
    };

    let element = &layout.app_name_element;
    let rewriter = TagRewriter::string_resource(element, new_name)
        .with_context(|| format!("Invalid element name '{}'", element))?;

    let new_content = match rewriter.process_content(&content) {
        Rewrite::Changed(new_content) => new_content,
        Rewrite::Unchanged => {
            return Ok(StageReport::applied(stage, format!("{} already set to '{}' in {}", element, new_name, shown)));
        }
        Rewrite::NotFound => {
            return Ok(StageReport::not_found(stage, format!("<string name=\"{}\"> not found in {}", element, shown)));
        }
    };

    if !write_reviewed(&path, &content, &new_content, "App name update", dry_run, content_callback)? {
        return Ok(StageReport::declined(stage, format!("Kept {} unchanged", shown)));
    }

    Ok(StageReport::applied(stage, format!("{} {} in {}", verb(dry_run), element, shown)).with_changed_files(vec![path]))
}

fn update_readme<F>(
    root: &ProjectRoot,
    layout: &ProjectLayout,
    request: &RenameRequest,
    dry_run: bool,
    content_callback: &F,
) -> Result<StageReport>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    let stage = Stage::Readme;
    let path = root.join(&layout.readme);
    let shown = root.display_relative(&path).display().to_string();
    let Some(content) = read_if_exists(&path)? else {
        return Ok(StageReport::missing(stage, path.clone(), format!("{} not found at {}", shown, path.display())));
    };

    let mut updated = content.clone();
    let mut replaced = Vec::new();

    if let Some(text) = LiteralRewriter::new(request.old_id.as_str(), request.new_id.as_str())
        .process_content(&updated)
        .changed()
    {
        updated = text;
        replaced.push("package");
    }

    if let Some(new_name) = &request.new_name {
        if !request.old_name.is_empty() {
            if let Some(text) = LiteralRewriter::new(&request.old_name, new_name).process_content(&updated).changed() {
                updated = text;
                replaced.push("app name");
            }
        }
    }

    if replaced.is_empty() {
        return Ok(StageReport::not_found(stage, format!("No {} changes were necessary", shown)));
    }

    if !write_reviewed(&path, &content, &updated, "README update", dry_run, content_callback)? {
        return Ok(StageReport::declined(stage, format!("Kept {} unchanged", shown)));
    }

    Ok(StageReport::applied(
        stage,
        format!("{} {} occurrences in {}", verb(dry_run), replaced.join(" and "), shown),
    )
    .with_changed_files(vec![path]))
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(Some(content))
}

/// Returns false when the callback declines the change.
fn write_reviewed<F>(
    path: &Path,
    content: &str,
    new_content: &str,
    description: &str,
    dry_run: bool,
    content_callback: &F,
) -> Result<bool>
where
    F: Fn(&Path, &str, &str, &str) -> Result<bool>,
{
    if !content_callback(path, content, new_content, description)? {
        return Ok(false);
    }
    if dry_run {
        debug!("Would update contents of: {:?}", path);
    } else {
        debug!("Updating contents of: {:?}", path);
        fs::write(path, new_content).with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(true)
}

fn verb(dry_run: bool) -> &'static str {
    if dry_run {
        "Would update"
    } else {
        "Updated"
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

    fn project() -> (TempDir, ProjectRoot) {
        let temp_dir = TempDir::new().unwrap();
        let root = ProjectRoot::resolve(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_validate_rejects_same_identifier() {
        let request = RenameRequest::new(" com.example.app ", "com.example.app");

        assert!(matches!(request.validate(), Err(RepackageError::SameIdentifier { .. })));
    }

    #[test]
    fn test_validate_rejects_identifiers_with_same_segments() {
        let request = RenameRequest::new("com.example.app", "com..example.app.");

        assert!(matches!(request.validate(), Err(RepackageError::SameIdentifier { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_identifier() {
        let request = RenameRequest::new("com.example", "..");

        assert!(matches!(
            request.validate(),
            Err(RepackageError::EmptyIdentifier { role: "new", .. })
        ));
    }

    #[test]
    fn test_empty_new_name_is_ignored() {
        let request = RenameRequest::new("a.b", "c.d").with_new_name(Some(""));

        assert_eq!(request.new_name, None);
    }

    #[test]
    fn test_missing_files_skip_each_stage() {
        let (_temp_dir, root) = project();
        let request = RenameRequest::new("a.b", "c.d").with_new_name(Some("New")).with_readme(true);

        let report = rename_project(&root, &ProjectLayout::default(), &request, false).unwrap();

        assert_eq!(report.stages.len(), 5);
        assert!(report.is_complete());
        assert!(report
            .stages
            .iter()
            .all(|stage| matches!(stage.outcome, StageOutcome::SkippedMissing(_))));
    }

    #[test]
    fn test_optional_stages_only_run_when_requested() {
        let (_temp_dir, root) = project();
        let request = RenameRequest::new("a.b", "c.d");

        let report = rename_project(&root, &ProjectLayout::default(), &request, false).unwrap();

        assert_eq!(report.stages.len(), 3);
        assert!(report.stage(Stage::AppName).is_none());
        assert!(report.stage(Stage::Readme).is_none());
    }

    #[test]
    fn test_build_file_without_old_id_is_reported_not_found() {
        let (_temp_dir, root) = project();
        let layout = ProjectLayout::default();
        let build_file = root.join(&layout.build_file);
        write(&build_file, "namespace = \"org.other\"\n");

        let request = RenameRequest::new("a.b", "c.d");
        let report = rename_project(&root, &layout, &request, false).unwrap();

        let stage = report.stage(Stage::BuildConfig).unwrap();
        assert_eq!(stage.outcome, StageOutcome::SkippedNotFound);
        assert!(stage.detail.contains("not found"));
        assert_eq!(fs::read_to_string(build_file).unwrap(), "namespace = \"org.other\"\n");
    }

    #[test]
    fn test_app_name_replacement() {
        let (_temp_dir, root) = project();
        let layout = ProjectLayout::default();
        let strings = root.join(&layout.strings_file);
        write(&strings, "<resources>\n    <string name=\"app_name\">android app</string>\n</resources>\n");

        let request = RenameRequest::new("a.b", "c.d").with_new_name(Some("Timers"));
        let report = rename_project(&root, &layout, &request, false).unwrap();

        assert_eq!(report.stage(Stage::AppName).unwrap().outcome, StageOutcome::Applied);
        assert_eq!(
            fs::read_to_string(strings).unwrap(),
            "<resources>\n    <string name=\"app_name\">Timers</string>\n</resources>\n"
        );
    }

    #[test]
    fn test_app_name_tag_missing() {
        let (_temp_dir, root) = project();
        let layout = ProjectLayout::default();
        let strings = root.join(&layout.strings_file);
        write(&strings, "<resources/>\n");

        let request = RenameRequest::new("a.b", "c.d").with_new_name(Some("Timers"));
        let report = rename_project(&root, &layout, &request, false).unwrap();

        assert_eq!(report.stage(Stage::AppName).unwrap().outcome, StageOutcome::SkippedNotFound);
        assert_eq!(fs::read_to_string(strings).unwrap(), "<resources/>\n");
    }

    #[test]
    fn test_readme_replaces_package_and_app_name() {
        let (_temp_dir, root) = project();
        let layout = ProjectLayout::default();
        let readme = root.join(&layout.readme);
        write(&readme, "# android app\n\nPackage: `com.example.old`\n");

        let request = RenameRequest::new("com.example.old", "com.example.new")
            .with_new_name(Some("Timers"))
            .with_readme(true);
        let report = rename_project(&root, &layout, &request, false).unwrap();

        let stage = report.stage(Stage::Readme).unwrap();
        assert_eq!(stage.outcome, StageOutcome::Applied);
        assert_eq!(
            fs::read_to_string(readme).unwrap(),
            "# Timers\n\nPackage: `com.example.new`\n"
        );
    }

    #[test]
    fn test_readme_without_matches() {
        let (_temp_dir, root) = project();
        let layout = ProjectLayout::default();
        write(&root.join(&layout.readme), "# Project\n");

        let request = RenameRequest::new("a.b", "c.d").with_readme(true);
        let report = rename_project(&root, &layout, &request, false).unwrap();

        assert_eq!(report.stage(Stage::Readme).unwrap().outcome, StageOutcome::SkippedNotFound);
    }

    #[test]
    fn test_declined_changes_are_not_written() {
        let (_temp_dir, root) = project();
        let layout = ProjectLayout::default();
        let build_file = root.join(&layout.build_file);
        let main = root.join(&layout.source_root).join("a/b/Main.kt");
        write(&build_file, "namespace = \"a.b\"\n");
        write(&main, "package a.b\n");

        let request = RenameRequest::new("a.b", "c.d");
        let report = rename_project_interactive(
            &root,
            &layout,
            &request,
            false,
            |_: &Path, _: &str, _: &str, _: &str| Ok(false),
            |_: &Path, _: &Path| Ok(false),
        )
        .unwrap();

        assert!(report
            .stages
            .iter()
            .all(|stage| stage.outcome == StageOutcome::SkippedDeclined));
        assert_eq!(fs::read_to_string(&build_file).unwrap(), "namespace = \"a.b\"\n");
        assert_eq!(fs::read_to_string(&main).unwrap(), "package a.b\n");
    }
}
