use crate::cli_args::ConfigArgs;
use crate::output::write_to_stdout;
use crate::{ConfigOverrides, determine_project_root, load_config_for_command};
use anyhow::{Context, Result};
use ctxbuilder_core::Config;

/// Prints the configuration the other commands would run with. Nothing is
/// ever written back to disk.
pub fn handle_config_command(args: &ConfigArgs) -> Result<()> {
    let config = if args.defaults {
        Config::default()
    } else {
        let project_root = determine_project_root(&args.project_config)?;
        load_config_for_command(
            &project_root,
            &args.project_config,
            ConfigOverrides::default(),
        )
        .context("Failed to load configuration")?
    };
    let toml_text = config
        .to_toml_string()
        .context("Failed to serialize configuration")?;
    write_to_stdout(&toml_text)
}
