use anyhow::Result;
use inquire::Confirm;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::path::Path;

/// Coloured unified-style diff with three lines of context, or `None` when
/// the two texts are identical.
pub fn render_diff(old_content: &str, new_content: &str) -> Result<Option<String>> {
    let diff = TextDiff::from_lines(old_content, new_content);
    let mut output = String::new();
    let mut has_changes = false;

    for (i, group) in diff.grouped_ops(3).iter().enumerate() {
        if i > 0 {
            writeln!(output, "{:-^1$}", "", 40)?;
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, style) = match change.tag() {
                    ChangeTag::Delete => ("- ", "\x1b[31m"),
                    ChangeTag::Insert => ("+ ", "\x1b[32m"),
                    ChangeTag::Equal => ("  ", "\x1b[0m"),
                };
                write!(output, "{}{}{}\x1b[0m", style, sign, change.value())?;
                if change.missing_newline() {
                    writeln!(output)?;
                }
                has_changes |= change.tag() != ChangeTag::Equal;
            }
        }
    }

    Ok(has_changes.then_some(output))
}

pub fn confirm_content_change(
    file_path: &Path,
    old_content: &str,
    new_content: &str,
    description: &str,
) -> Result<bool> {
    let Some(diff) = render_diff(old_content, new_content)? else {
        return Ok(false);
    };

    println!("\n📝 {}: {}", description, file_path.display());
    println!("{}", diff);

    let apply = Confirm::new("Apply this change?").with_default(true).prompt()?;
    Ok(apply)
}

pub fn confirm_package_move(from: &Path, to: &Path) -> Result<bool> {
    println!("\n📁 Package directory move:");
    println!("  \x1b[31m- {}\x1b[0m", from.display());
    println!("  \x1b[32m+ {}\x1b[0m", to.display());

    let apply = Confirm::new("Move the package directory (merging into any existing files)?")
        .with_default(true)
        .prompt()?;
    Ok(apply)
}
