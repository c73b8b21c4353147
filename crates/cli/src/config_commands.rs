use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use ferry_config::validate::{self, Diagnostic, Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(explicit, verbose),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// File-level checks first; semantic checks only run on a file that parses.
fn collect(explicit: Option<&Path>) -> ValidationResult {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(ferry_config::find_config_file);

    let mut result = match path.as_deref() {
        Some(p) => validate::validate_file(p),
        None => ValidationResult::default(),
    };
    if result.has_errors() {
        return result;
    }

    match ferry_config::load(path.as_deref()) {
        Ok(config) => result
            .diagnostics
            .extend(validate::validate(&config).diagnostics),
        Err(e) => result.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message: format!("{e:#}"),
        }),
    }
    result
}

fn check(explicit: Option<&Path>, verbose: bool) -> Result<()> {
    let result = collect(explicit);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults and environment.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!(
                "  {BOLD}{color}{}{RESET} {}: {}",
                d.severity, d.path, d.message
            );
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn unknown_key_stops_before_semantic_checks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ferry.toml", "[ragflow]\nkb_idd = \"kb_hr\"\n");

        let result = collect(Some(&path));

        assert!(result.has_errors());
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(
            result
                .diagnostics
                .iter()
                .all(|d| d.category == "unknown-field")
        );
    }

    #[test]
    fn semantic_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ferry.toml", "[http]\nconnect_timeout_secs = 0\n");

        let result = collect(Some(&path));

        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "http" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = collect(Some(&dir.path().join("absent.toml")));
        assert!(result.has_errors());
    }
}
