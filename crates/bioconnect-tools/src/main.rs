//! validate-connectors — lint connector specifications.
//!
//! Usage: validate-connectors [SPEC_DIR]
//!
//! Without an argument the bundled specifications are checked, plus
//! `[connectors] spec_dir` from bioconnect.toml when set. Exits non-zero if
//! any specification fails to load or has lint errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bioconnect_common::Config;
use bioconnect_connectors::sources::{self, BUNDLED};
use bioconnect_connectors::{lint, LintReport, Specification};

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bioconnect=debug,info")),
        )
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not load bioconnect.toml: {e}, using defaults");
            Config::default()
        }
    };

    let mut results: Vec<(String, LintReport)> = Vec::new();
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(dir) => results.extend(lint_dir(&dir)?),
        None => {
            for source in &BUNDLED {
                let report = match source.specification() {
                    Ok(spec) => lint(&spec, &(source.transforms)()),
                    Err(e) => load_failure(e),
                };
                results.push((format!("bundled:{}", source.name), report));
            }
            if let Some(dir) = &config.connectors.spec_dir {
                results.extend(lint_dir(Path::new(dir))?);
            }
        }
    }

    let mut failed = 0;
    for (name, report) in &results {
        println!("\nValidating {name}...");
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
        if report.is_ok() {
            println!("  ok");
        } else {
            failed += 1;
            println!("  validation failed:");
            for error in &report.errors {
                println!("  - {error}");
            }
        }
    }

    info!(checked = results.len(), failed, "Validation finished");
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn lint_dir(dir: &Path) -> anyhow::Result<Vec<(String, LintReport)>> {
    let files = sources::spec_files(dir)
        .with_context(|| format!("listing specifications in {}", dir.display()))?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "No specification files found");
    }
    Ok(files
        .into_iter()
        .map(|path| {
            let report = lint_file(&path);
            (path.display().to_string(), report)
        })
        .collect())
}

fn lint_file(path: &Path) -> LintReport {
    match Specification::from_path(path) {
        Ok(spec) => {
            let transforms = sources::transforms_for(&spec.name);
            lint(&spec, &transforms)
        }
        Err(e) => load_failure(e),
    }
}

fn load_failure(e: impl std::fmt::Display) -> LintReport {
    LintReport { errors: vec![format!("failed to load: {e}")], warnings: vec![] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lint_dir_reports_each_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pubmed.yaml"), sources::pubmed::SPEC).unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "name: [unterminated").unwrap();
        std::fs::write(
            dir.path().join("renamed.yaml"),
            sources::openalex::SPEC.replace("name: openalex", "name: OpenAlex"),
        )
        .unwrap();

        let results = lint_dir(dir.path()).unwrap();
        assert_eq!(results.len(), 3);
        let by_file = |suffix: &str| &results.iter().find(|(n, _)| n.ends_with(suffix)).unwrap().1;

        assert!(by_file("pubmed.yaml").is_ok());
        assert!(by_file("broken.yaml").errors[0].starts_with("failed to load"));
        assert!(!by_file("renamed.yaml").is_ok());
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(lint_dir(Path::new("/definitely/not/here")).is_err());
    }
}
