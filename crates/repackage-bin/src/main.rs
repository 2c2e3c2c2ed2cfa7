mod cli;
mod diff;
mod report;

use anyhow::Result;
use cli::Cli;
use report::{Marker, StatusLog};
use repackage_core::{ProjectLayout, ProjectRoot, RenameRequest, RepackageError};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A stage failed part-way; earlier stages' changes remain.
const EXIT_PARTIAL: u8 = 1;
/// The request was refused before any stage ran.
const EXIT_REFUSED: u8 = 2;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    setup_logging(&cli)?;

    info!("Starting repackage");

    let status = StatusLog::new(cli.quiet);
    let code = run(&cli, &status)?;

    info!("Repackage finished");
    Ok(code)
}

fn run(cli: &Cli, status: &StatusLog) -> Result<ExitCode> {
    let root_dir = match &cli.project_root {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let root = ProjectRoot::resolve(&root_dir)?;
    status.line(Marker::Info, format!("Project root: {}", root.path().display()));

    let layout = ProjectLayout::default().with_source_extension(&cli.extension);
    let request = RenameRequest::new(&cli.old_id, &cli.new_id)
        .with_new_name(cli.new_name.as_deref())
        .with_old_name(&cli.old_name)
        .with_readme(cli.update_readme);

    debug!("Layout: {:?}", layout);

    if cli.dry_run {
        warn!("Dry run mode - no changes will be made");
    }

    status.line(
        Marker::Info,
        format!("Renaming package/applicationId: {} -> {}", request.old_id, request.new_id),
    );

    let result = if cli.interactive {
        repackage_core::rename_project_interactive(
            &root,
            &layout,
            &request,
            cli.dry_run,
            |path, old_content, new_content, description| {
                diff::confirm_content_change(path, old_content, new_content, description)
            },
            |from, to| diff::confirm_package_move(from, to),
        )
    } else {
        repackage_core::rename_project(&root, &layout, &request, cli.dry_run)
    };

    let report = match result {
        Ok(report) => report,
        Err(err @ (RepackageError::SameIdentifier { .. } | RepackageError::EmptyIdentifier { .. })) => {
            status.line(Marker::Error, err.to_string());
            return Ok(ExitCode::from(EXIT_REFUSED));
        }
        Err(err) => return Err(err.into()),
    };

    status.print_report(&root, &report);

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .with(filter)
        .init();

    Ok(())
}
