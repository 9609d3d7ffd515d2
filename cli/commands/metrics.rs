use crate::cli_args::MetricsArgs;
use crate::commands::scan_project;
use crate::output::{print_json, print_metrics_pretty_table};
use crate::{ConfigOverrides, determine_project_root, load_config_for_command};
use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use ctxbuilder_core::{TokenEstimator, is_likely_binary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct ProjectMetrics {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u128,
    pub total_bytes_readable: String,
    pub estimated_tokens: usize,
    pub document_tokens: usize,
    pub format: String,
    pub approximate: bool,
    pub files_details: Vec<FileMetrics>,
}

#[derive(Debug, Serialize)]
pub struct FileMetrics {
    pub path: String,
    pub lines: usize,
    pub bytes: usize,
    pub bytes_readable: String,
    pub estimated_tokens: usize,
}

pub fn handle_metrics_command(args: MetricsArgs, quiet: bool) -> Result<()> {
    let project_root = determine_project_root(&args.project_config)?;

    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        ConfigOverrides {
            scan: Some(&args.scan),
            format_output: Some(&args.format_output),
            selection: Some(&args.selection),
            tokens: Some(&args.tokens),
            watch_delay: None,
        },
    )
    .context("Failed to load configuration for metrics command")?;

    let project = scan_project(&project_root, &config)?;
    let selected = project
        .select_matching(&config.selection.include)
        .context("Failed to apply file selection")?;

    if selected.is_empty() {
        if !quiet {
            eprintln!("No selectable files found to calculate metrics.");
        }
        return Ok(());
    }

    let estimator = TokenEstimator::for_model(&config.tokens.model);
    log::debug!("Calculating metrics...");
    let mut metrics = calculate_metrics(&selected, &project_root, &estimator);
    let document = project.generate(&selected, &config.serialization_options(), &estimator);
    metrics.document_tokens = document.tokens;
    metrics.format = config.output.format.to_string();
    log::debug!("Metrics calculation complete.");

    if args.json {
        print_json(&metrics)
    } else {
        print_metrics_pretty_table(&metrics)
    }
}

fn calculate_metrics(files: &[PathBuf], project_root: &Path, estimator: &TokenEstimator) -> ProjectMetrics {
    let mut total_files = 0;
    let mut total_lines = 0;
    let mut total_bytes: u128 = 0;
    let mut total_tokens = 0;
    let mut files_details = Vec::new();

    for path in files {
        if is_likely_binary(path) {
            log::debug!("Skipping binary file in metrics: {}", path.display());
            continue;
        }
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Could not read {} for metrics: {}", path.display(), e);
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let lines = content.lines().count();
        let tokens = estimator.estimate(&content);

        let relative_path = pathdiff::diff_paths(path, project_root)
            .unwrap_or_else(|| path.clone())
            .to_string_lossy()
            .to_string();

        total_files += 1;
        total_lines += lines;
        total_bytes = total_bytes.saturating_add(bytes.len() as u128);
        total_tokens += tokens;

        files_details.push(FileMetrics {
            path: relative_path,
            lines,
            bytes: bytes.len(),
            bytes_readable: readable_size(bytes.len() as u128),
            estimated_tokens: tokens,
        });
    }

    files_details.sort_by(|a, b| a.path.cmp(&b.path));

    ProjectMetrics {
        total_files,
        total_lines,
        total_bytes,
        total_bytes_readable: readable_size(total_bytes),
        estimated_tokens: total_tokens,
        document_tokens: 0,
        format: String::new(),
        approximate: estimator.is_approximate(),
        files_details,
    }
}

fn readable_size(bytes: u128) -> String {
    Byte::from_u128(bytes)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_count_lines_bytes_and_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "one\ntwo\nthree\n").unwrap();
        fs::write(&b, "x".repeat(40)).unwrap();

        let metrics = calculate_metrics(
            &[b.clone(), a.clone()],
            dir.path(),
            &TokenEstimator::approximate(),
        );
        assert_eq!(metrics.total_files, 2);
        assert_eq!(metrics.total_lines, 4);
        assert_eq!(metrics.total_bytes, 54);
        assert_eq!(metrics.estimated_tokens, 3 + 10);
        assert!(metrics.approximate);
        assert_eq!(metrics.files_details[0].path, "a.txt");
        assert_eq!(metrics.files_details[1].estimated_tokens, 10);
    }

    #[test]
    fn binary_and_missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blob.bin");
        fs::write(&blob, [0u8, 1, 2]).unwrap();
        let metrics = calculate_metrics(
            &[blob, dir.path().join("gone.txt")],
            dir.path(),
            &TokenEstimator::approximate(),
        );
        assert_eq!(metrics.total_files, 0);
        assert!(metrics.files_details.is_empty());
    }
}
