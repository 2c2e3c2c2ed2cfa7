use repackage_core::{ProjectRoot, RunReport, Stage, StageOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Info,
    Ok,
    Warn,
    Error,
    Done,
}

impl Marker {
    fn tag(self) -> &'static str {
        match self {
            Marker::Info => "[INFO]",
            Marker::Ok => "[OK]",
            Marker::Warn => "[WARN]",
            Marker::Error => "[ERROR]",
            Marker::Done => "[DONE]",
        }
    }

    fn shown_when_quiet(self) -> bool {
        matches!(self, Marker::Warn | Marker::Error | Marker::Done)
    }
}

pub struct StatusLog {
    quiet: bool,
}

impl StatusLog {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn line(&self, marker: Marker, message: impl AsRef<str>) {
        if !self.quiet || marker.shown_when_quiet() {
            println!("{} {}", marker.tag(), message.as_ref());
        }
    }

    pub fn print_report(&self, root: &ProjectRoot, report: &RunReport) {
        for (marker, message) in render(root, report) {
            self.line(marker, message);
        }
    }
}

pub fn render(root: &ProjectRoot, report: &RunReport) -> Vec<(Marker, String)> {
    let mut lines = Vec::new();

    for stage in &report.stages {
        match &stage.outcome {
            StageOutcome::Applied if stage.stage == Stage::Sources => {
                let verb = if report.dry_run { "Would update" } else { "Updated" };
                for file in &stage.changed_files {
                    lines.push((
                        Marker::Ok,
                        format!("{} package/imports in {}", verb, root.display_relative(file).display()),
                    ));
                }
            }
            StageOutcome::Applied => {
                lines.push((Marker::Ok, stage.detail.clone()));
                if let Some(summary) = &stage.migration {
                    lines.push((
                        Marker::Info,
                        format!(
                            "{} moved, {} merged, {} overwritten, {} empty directories removed",
                            summary.moved,
                            summary.merged,
                            summary.overwritten,
                            summary.removed_dirs.len()
                        ),
                    ));
                }
            }
            StageOutcome::SkippedMissing(_) | StageOutcome::SkippedNotFound => {
                lines.push((Marker::Warn, stage.detail.clone()));
            }
            StageOutcome::SkippedDeclined => {
                lines.push((Marker::Info, stage.detail.clone()));
            }
            StageOutcome::Failed(message) => {
                lines.push((Marker::Error, format!("Updating {} failed: {}", stage.stage, message)));
            }
        }
    }

    if let Some(failed) = report.failed() {
        lines.push((
            Marker::Error,
            format!(
                "Rename stopped at the {} stage; changes made before it remain on disk.",
                failed.stage
            ),
        ));
    } else if report.dry_run {
        lines.push((Marker::Done, "Dry run completed; no files were changed.".to_string()));
    } else {
        lines.push((
            Marker::Done,
            "Rename completed. Please sync and rebuild the project in Android Studio.".to_string(),
        ));
    }

    lines
}
