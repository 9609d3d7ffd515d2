use crate::cli_args::GenerateArgs;
use crate::commands::scan_project;
use crate::output::{self, OutputTargets};
use crate::{ConfigOverrides, determine_project_root, load_config_for_command};
use anyhow::{Context, Result};
use colored::Colorize;
use ctxbuilder_core::{Config, GeneratedContext, TokenEstimator};
use std::path::Path;

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
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
    .context("Failed to load configuration")?;

    let targets = OutputTargets::from_flags(
        &config,
        &project_root,
        args.save.as_ref(),
        args.copy,
        args.stdout,
    );
    let estimator = TokenEstimator::for_model(&config.tokens.model);

    trigger_generation(&project_root, &config, &estimator, &targets, quiet).map(|_| ())
}

/// Scans, selects, serializes and delivers one document. Shared with the
/// watch loop, which calls it again after every debounced change.
pub fn trigger_generation(
    project_root: &Path,
    config: &Config,
    estimator: &TokenEstimator,
    targets: &OutputTargets,
    quiet: bool,
) -> Result<GeneratedContext> {
    log::info!(
        "Starting context generation for: {}",
        project_root.display()
    );

    let project = scan_project(project_root, config)?;
    let mut selected = project
        .select_matching(&config.selection.include)
        .context("Failed to apply file selection")?;
    // A previous run's saved document must not end up inside the next one.
    selected.retain(|path| !targets.is_save_target(path));
    if selected.is_empty() && !quiet {
        eprintln!(
            "{}",
            "Warning: no files selected; the document only contains the project tree.".yellow()
        );
    }

    let generated = project.generate(&selected, &config.serialization_options(), estimator);
    output::deliver(&generated.text, targets, quiet)?;

    if !quiet {
        eprintln!(
            "{} {} files, ~{} tokens{}",
            "ℹ".blue(),
            generated.file_count,
            generated.tokens.to_string().cyan(),
            if estimator.is_approximate() {
                " (approximate)"
            } else {
                ""
            }
        );
    }
    Ok(generated)
}
