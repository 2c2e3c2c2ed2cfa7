use std::fmt;
use std::path::PathBuf;

use crate::migrator::MigrationSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildConfig,
    Sources,
    PackageDirectory,
    AppName,
    Readme,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::BuildConfig => "build configuration",
            Stage::Sources => "source files",
            Stage::PackageDirectory => "package directory",
            Stage::AppName => "app name",
            Stage::Readme => "README",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Applied,
    SkippedMissing(PathBuf),
    SkippedNotFound,
    SkippedDeclined,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub detail: String,
    pub changed_files: Vec<PathBuf>,
    pub migration: Option<MigrationSummary>,
}

impl StageReport {
    fn new(stage: Stage, outcome: StageOutcome, detail: String) -> Self {
        Self {
            stage,
            outcome,
            detail,
            changed_files: Vec::new(),
            migration: None,
        }
    }

    pub fn applied(stage: Stage, detail: impl Into<String>) -> Self {
        Self::new(stage, StageOutcome::Applied, detail.into())
    }

    pub fn missing(stage: Stage, path: PathBuf, detail: impl Into<String>) -> Self {
        Self::new(stage, StageOutcome::SkippedMissing(path), detail.into())
    }

    pub fn not_found(stage: Stage, detail: impl Into<String>) -> Self {
        Self::new(stage, StageOutcome::SkippedNotFound, detail.into())
    }

    pub fn declined(stage: Stage, detail: impl Into<String>) -> Self {
        Self::new(stage, StageOutcome::SkippedDeclined, detail.into())
    }

    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(stage, StageOutcome::Failed(message.clone()), message)
    }

    pub fn with_changed_files(mut self, files: Vec<PathBuf>) -> Self {
        self.changed_files = files;
        self
    }

    pub fn with_migration(mut self, summary: MigrationSummary) -> Self {
        self.migration = Some(summary);
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, StageOutcome::Failed(_))
    }
}

/// Outcome of every stage that ran, in order.
///
/// A failed stage is always the last entry: the run stops there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub dry_run: bool,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            stages: Vec::new(),
        }
    }

    /// Records a stage result and tells whether the run may continue.
    pub fn record(&mut self, stage: Stage, result: anyhow::Result<StageReport>) -> bool {
        let report = result.unwrap_or_else(|err| StageReport::failed(stage, format!("{:#}", err)));
        let proceed = !report.is_failed();
        self.stages.push(report);
        proceed
    }

    pub fn failed(&self) -> Option<&StageReport> {
        self.stages.iter().find(|stage| stage.is_failed())
    }

    pub fn is_complete(&self) -> bool {
        self.failed().is_none()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.stages.iter().flat_map(|stage| stage.changed_files.iter())
    }
}
