use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

const BIN_NAME: &str = "repackage";
const FIXTURE_PACKAGE: &str = "ru.lavafrai.study.template";

fn main() -> Result<()> {
    let args = clap::command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("install").about("Install the repackage binary locally"))
        .subcommand(
            Command::new("run")
                .about("Build and run repackage with arguments")
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .arg(
                    Arg::new("args")
                        .help("Arguments to pass to repackage")
                        .action(clap::ArgAction::Append)
                        .num_args(0..),
                ),
        )
        .subcommand(
            Command::new("test")
                .about("Test Operations")
                .subcommand(Command::new("all").about("Run every test in the workspace"))
                .subcommand(Command::new("core").about("Run tests for repackage-core"))
                .subcommand(Command::new("bin").about("Run tests for repackage-bin")),
        )
        .subcommand(
            Command::new("fixture")
                .about("Write a sample Android template project to rename by hand")
                .arg(Arg::new("dir").help("Directory to create").required(true)),
        )
        .get_matches();

    match args.subcommand() {
        Some(("install", _)) => cargo(&["install", "--path", "crates/repackage-bin"], "install repackage"),
        Some(("run", args)) => handle_run_command(args),
        Some(("test", args)) => handle_test_commands(args),
        Some(("fixture", args)) => handle_fixture_command(args),
        Some((command, _)) => anyhow::bail!("Unexpected command: {command}"),
        None => anyhow::bail!("Expected subcommand"),
    }
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    let status = process::Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("Failed to {what}");
    }
    Ok(())
}

fn handle_run_command(args: &ArgMatches) -> Result<()> {
    let run_args: Vec<&str> = args
        .get_many::<String>("args")
        .map_or(Vec::new(), |vals| vals.map(String::as_str).collect());

    let mut command = vec!["run", "--bin", BIN_NAME, "--"];
    command.extend(run_args);
    cargo(&command, "run repackage")
}

fn handle_test_commands(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("all", _)) => cargo(&["test", "--workspace"], "run workspace tests"),
        Some(("core", _)) => cargo(&["test", "--package", "repackage-core"], "run core tests"),
        Some(("bin", _)) => cargo(&["test", "--package", "repackage-bin"], "run binary tests"),
        _ => {
            println!("Available test commands:");
            println!("  all   - Run every test in the workspace");
            println!("  core  - Run tests for repackage-core");
            println!("  bin   - Run tests for repackage-bin");
            Ok(())
        }
    }
}

fn handle_fixture_command(args: &ArgMatches) -> Result<()> {
    let dir = args
        .get_one::<String>("dir")
        .map(PathBuf::from)
        .context("Missing fixture directory")?;
    if dir.exists() {
        anyhow::bail!("Refusing to overwrite existing path: {:?}", dir);
    }

    write_fixture(&dir)?;
    println!("Fixture written to {}", dir.display());
    println!("Try: cargo xtask run -- -o {FIXTURE_PACKAGE} -n com.example.myapp -N \"My App\" --update-readme -r {}", dir.display());
    Ok(())
}

fn write_fixture(dir: &Path) -> Result<()> {
    let package_dir: PathBuf = ["app", "src", "main", "java"]
        .into_iter()
        .chain(FIXTURE_PACKAGE.split('.'))
        .collect();

    let files = [
        (
            PathBuf::from("app/build.gradle.kts"),
            format!(
                "android {{\n    namespace = \"{FIXTURE_PACKAGE}\"\n\n    defaultConfig {{\n        applicationId = \"{FIXTURE_PACKAGE}\"\n    }}\n}}\n"
            ),
        ),
        (
            PathBuf::from("app/src/main/res/values/strings.xml"),
            "<resources>\n    <string name=\"app_name\">android app</string>\n</resources>\n".to_string(),
        ),
        (
            PathBuf::from("README.md"),
            format!("# android app\n\nApplication id: `{FIXTURE_PACKAGE}`\n"),
        ),
        (
            package_dir.join("MainActivity.kt"),
            format!("package {FIXTURE_PACKAGE}\n\nimport {FIXTURE_PACKAGE}.models.TimerItem\n\nclass MainActivity\n"),
        ),
        (
            package_dir.join("models/TimerItem.kt"),
            format!("package {FIXTURE_PACKAGE}.models\n\ndata class TimerItem(val id: Long)\n"),
        ),
    ];

    for (relative, content) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(())
}
