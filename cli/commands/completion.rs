use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use colored::*;
use ctxbuilder_core::AppError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli_args::{Cli, CompletionArgs};

pub fn handle_completion_command(args: &CompletionArgs, quiet: bool) -> Result<()> {
    let shell_str = args.shell.as_deref().unwrap_or("fish");
    let shell = parse_shell(shell_str)?;

    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    if !args.save {
        generate(shell, &mut command, bin_name, &mut io::stdout());
        return Ok(());
    }

    let (save_dir, filename) = default_completion_location(shell, &bin_name)?;
    let save_path = save_dir.join(&filename);

    if save_path.exists() && !confirm_overwrite(&save_path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }

    fs::create_dir_all(&save_dir)
        .with_context(|| format!("Failed to create directory {}", save_dir.display()))?;
    let mut file = File::create(&save_path)
        .with_context(|| format!("Failed to create file {}", save_path.display()))?;
    generate(shell, &mut command, bin_name, &mut file);

    if !quiet {
        println!(
            "{} {} completions saved to: {}",
            "✅".green(),
            shell_str.cyan(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}

fn parse_shell(shell_str: &str) -> Result<Shell> {
    match shell_str.to_lowercase().as_str() {
        "fish" => Ok(Shell::Fish),
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        _ => anyhow::bail!(AppError::InvalidArgument(format!(
            "Unsupported shell for completion: {}",
            shell_str
        ))),
    }
}

fn default_completion_location(shell: Shell, bin_name: &str) -> Result<(PathBuf, String)> {
    let location = match shell {
        Shell::Fish => dirs::config_dir()
            .map(|p| (p.join("fish").join("completions"), format!("{}.fish", bin_name))),
        Shell::Bash => dirs::data_local_dir().map(|p| {
            (
                p.join("bash-completion").join("completions"),
                bin_name.to_string(),
            )
        }),
        Shell::Zsh => dirs::data_local_dir()
            .map(|p| (p.join("zsh").join("site-functions"), format!("_{}", bin_name))),
        _ => anyhow::bail!(AppError::InvalidArgument(format!(
            "Default save location not known for shell: {}",
            shell
        ))),
    };
    location.ok_or_else(|| anyhow::anyhow!("Could not determine standard completion directory."))
}

fn confirm_overwrite(save_path: &std::path::Path, quiet: bool) -> Result<bool> {
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            save_path.display()
        );
    }
    print!(
        "{} Completion file already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        save_path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}
