mod cli_args;
mod commands;
mod output;
mod watch;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{
    Cli, Commands, FormatOutputOpts, ProjectConfigOpts, ScanOpts, SelectionOpts, TokenOpts,
};
use ctxbuilder_core::{AppError, Config, OutputFormat};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;
    let verbose = cli_args.verbose;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet, verbose) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::InvalidArgument(_)) => 1,
        Some(AppError::DurationParse(_)) => 1,
        Some(AppError::Glob(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::NotADirectory(_)) => 2,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool, verbose: u8) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet)?;
            }
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(args)?;
            }
            Commands::Files(args) => {
                log::debug!("Executing 'files' command...");
                commands::files::handle_files_command(args, quiet)?;
            }
            Commands::Metrics(args) => {
                log::debug!("Executing 'metrics' command...");
                commands::metrics::handle_metrics_command(args, quiet)?;
            }
            Commands::Watch(args) => {
                log::debug!("Executing 'watch' command...");
                watch::run_watch_mode(args, quiet, verbose)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                commands::config::handle_config_command(&args)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Command-line values that take precedence over the config file.
#[derive(Default, Clone, Copy)]
pub struct ConfigOverrides<'a> {
    pub scan: Option<&'a ScanOpts>,
    pub format_output: Option<&'a FormatOutputOpts>,
    pub selection: Option<&'a SelectionOpts>,
    pub tokens: Option<&'a TokenOpts>,
    pub watch_delay: Option<&'a String>,
}

pub fn determine_project_root(project_opts: &ProjectConfigOpts) -> Result<PathBuf> {
    let project_root = Config::determine_project_root(project_opts.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());
    Ok(project_root)
}

pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    overrides: ConfigOverrides,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.context_file.as_ref(),
        project_opts.disable_context_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    merge_config_with_cli_overrides(config, overrides)
}

fn merge_config_with_cli_overrides(mut config: Config, overrides: ConfigOverrides) -> Result<Config> {
    log::trace!("Applying CLI overrides to config...");

    if let Some(scan) = overrides.scan {
        if scan.include_hidden {
            config.scan.ignore_hidden = false;
        }
        if scan.exclude_hidden {
            config.scan.ignore_hidden = true;
        }
        if scan.disable_gitignore {
            config.scan.use_gitignore = false;
        }
        if scan.enable_gitignore {
            config.scan.use_gitignore = true;
        }
    }

    if let Some(fmt) = overrides.format_output {
        if let Some(format) = &fmt.format {
            config.output.format = format.parse::<OutputFormat>()?;
        }
        if fmt.line_numbers {
            config.output.line_numbers = true;
        }
        if fmt.no_line_numbers {
            config.output.line_numbers = false;
        }
        if fmt.project_tree {
            config.output.project_tree = true;
        }
        if fmt.no_project_tree {
            config.output.project_tree = false;
        }
    }

    if let Some(selection) = overrides.selection {
        if !selection.include.is_empty() {
            config.selection.include = selection.include.clone();
        }
    }

    if let Some(model) = overrides.tokens.and_then(|t| t.tokenizer_model.as_ref()) {
        config.tokens.model = model.clone();
    }

    if let Some(delay) = overrides.watch_delay {
        config.watch.delay = delay.clone();
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    Ok(config)
}
