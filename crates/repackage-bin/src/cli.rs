use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repackage")]
#[command(version)]
#[command(about = "Rename the package and app name of an Android template project")]
#[command(long_about = "Rewrites the namespace and applicationId in app/build.gradle.kts, package references in Kotlin sources, moves the package directories to match, and optionally updates the app_name string resource and README.md.")]
pub struct Cli {
    #[arg(short, long, help = "Old applicationId / package (e.g. ru.lavafrai.study.template)")]
    pub old_id: String,

    #[arg(short, long, help = "New applicationId / package (e.g. com.example.myapp)")]
    pub new_id: String,

    #[arg(short = 'N', long, help = "New app name (string resource app_name)")]
    pub new_name: Option<String>,

    #[arg(
        short = 'r',
        long,
        env = "REPACKAGE_PROJECT_ROOT",
        help = "Project root path (defaults to current directory)"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(long, help = "Also update occurrences in README.md")]
    pub update_readme: bool,

    #[arg(
        long,
        default_value = repackage_core::DEFAULT_OLD_NAME,
        help = "App name replaced in README.md when --new-name is given"
    )]
    pub old_name: String,

    #[arg(long, default_value = "kt", help = "Extension of source files to rewrite")]
    pub extension: String,

    #[arg(long, help = "Perform a dry run without making changes")]
    pub dry_run: bool,

    #[arg(short, long, help = "Interactive mode - prompt for each change")]
    pub interactive: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
