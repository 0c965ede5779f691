//! `config` subcommands
//!
//! `validate` checks one or more files and reports every problem it finds;
//! `show` prints the configuration after loading and normalization.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::cli::args::{ConfigShowArgs, ConfigValidateArgs, DocumentFormat, OutputFormat};
use crate::config::{self, ConfigLoader, LoadResult, resolve_paths};
use crate::error::{Severity, TextClassError, ValidationIssue};

/// Outcome of validating a single file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_path: Option<String>,
    warnings: Vec<String>,
    issues: Vec<ValidationIssue>,
}

impl FileReport {
    fn failed_load(path: &Path, err: &crate::error::ConfigError) -> Self {
        Self {
            file: path.display().to_string(),
            valid: false,
            error: Some(err.to_string()),
            error_path: err.key_path().map(str::to_string),
            warnings: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn loaded(path: &Path, result: LoadResult, strict: bool) -> Self {
        let warnings: Vec<String> = result
            .warnings
            .into_iter()
            .map(|w| match w.location {
                Some(location) => format!("{} ({location})", w.message),
                None => w.message,
            })
            .collect();
        let threshold = if strict {
            Severity::Warning
        } else {
            Severity::Error
        };
        let valid = !result.issues.iter().any(|i| i.severity >= threshold)
            && !(strict && !warnings.is_empty());

        Self {
            file: path.display().to_string(),
            valid,
            error: None,
            error_path: None,
            warnings,
            issues: result.issues,
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
    valid: usize,
    failed: usize,
}

/// Validate configuration files.
///
/// Every file is checked even after a failure so one run reports all of
/// them.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, or
/// [`TextClassError::Invalid`] if any file fails to load or carries an
/// error-severity issue (any issue or load warning under `--strict`).
pub fn validate(args: &ConfigValidateArgs) -> Result<(), TextClassError> {
    if let Some(missing) = args.files.iter().find(|p| !p.exists()) {
        return Err(TextClassError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", missing.display()),
        )));
    }

    let loader = ConfigLoader::with_defaults();
    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| {
            tracing::info!(file = %path.display(), "validating configuration");
            match loader.load(path) {
                Ok(result) => FileReport::loaded(path, result, args.strict),
                Err(err) => {
                    tracing::debug!(file = %path.display(), error = %err, "load failed");
                    FileReport::failed_load(path, &err)
                }
            }
        })
        .collect();

    let failed = reports.iter().filter(|r| !r.valid).count();
    let summary = Summary {
        total: reports.len(),
        valid: reports.len() - failed,
        failed,
    };

    let mut out = std::io::stdout().lock();
    match args.format {
        OutputFormat::Human => write_human(&mut out, &reports)?,
        OutputFormat::Json => {
            let doc = serde_json::json!({ "files": reports, "summary": summary });
            writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
    }

    if failed > 0 {
        return Err(TextClassError::Invalid {
            failed,
            total: summary.total,
        });
    }
    Ok(())
}

fn write_human(out: &mut impl Write, reports: &[FileReport]) -> std::io::Result<()> {
    for report in reports {
        if let Some(error) = &report.error {
            writeln!(out, "{}: FAILED", report.file)?;
            writeln!(out, "  {error}")?;
            continue;
        }

        let status = if report.valid { "ok" } else { "FAILED" };
        writeln!(out, "{}: {status}", report.file)?;
        for warning in &report.warnings {
            writeln!(out, "  warning: {warning}")?;
        }
        for issue in &report.issues {
            writeln!(out, "  {issue}")?;
        }
    }
    Ok(())
}

/// Print the normalized configuration.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the output cannot be
/// serialized or written.
pub fn show(args: &ConfigShowArgs) -> Result<(), TextClassError> {
    let loaded = config::load(&args.config)?;
    let resolved = args
        .base_dir
        .as_deref()
        .map(|base| resolve_paths(&loaded, base));
    let config = resolved.as_ref().unwrap_or(&*loaded);

    let rendered = match args.format {
        DocumentFormat::Yaml => config.to_yaml()?,
        DocumentFormat::Json => serde_json::to_string_pretty(config)?,
    };

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", rendered.trim_end())?;
    Ok(())
}
