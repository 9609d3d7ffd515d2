use crate::cli_args::TreeArgs;
use crate::commands::scan_project;
use crate::output::write_to_stdout;
use crate::{ConfigOverrides, determine_project_root, load_config_for_command};
use anyhow::{Context, Result};
use ctxbuilder_core::render_with_root;

pub fn handle_tree_command(args: TreeArgs) -> Result<()> {
    let project_root = determine_project_root(&args.project_config)?;
    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        ConfigOverrides {
            scan: Some(&args.scan),
            ..ConfigOverrides::default()
        },
    )
    .context("Failed to load configuration for tree command")?;

    let project = scan_project(&project_root, &config)?;
    write_to_stdout(&render_with_root(project.tree()))
}
