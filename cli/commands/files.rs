use crate::cli_args::FilesArgs;
use crate::commands::scan_project;
use crate::output::write_to_stdout;
use crate::{ConfigOverrides, determine_project_root, load_config_for_command};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn handle_files_command(args: FilesArgs, quiet: bool) -> Result<()> {
    let project_root = determine_project_root(&args.project_config)?;
    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        ConfigOverrides {
            scan: Some(&args.scan),
            selection: Some(&args.selection),
            ..ConfigOverrides::default()
        },
    )
    .context("Failed to load configuration for files command")?;

    let project = scan_project(&project_root, &config)?;
    let selected = project
        .select_matching(&config.selection.include)
        .context("Failed to apply file selection")?;

    if selected.is_empty() {
        if !quiet {
            eprintln!("No selectable files found.");
        }
        return Ok(());
    }
    write_to_stdout(&format_listing(&project_root, &selected, args.absolute))
}

fn format_listing(project_root: &Path, files: &[PathBuf], absolute: bool) -> String {
    files
        .iter()
        .map(|path| {
            if absolute {
                path.display().to_string()
            } else {
                pathdiff::diff_paths(path, project_root)
                    .unwrap_or_else(|| path.clone())
                    .display()
                    .to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
