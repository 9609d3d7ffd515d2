use anyhow::{Context, Result};
use arboard::Clipboard;
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use ctxbuilder_core::{AppError, Config};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::commands::metrics::ProjectMetrics;

/// Where a generated document goes. Stdout is used when nothing else is asked for.
#[derive(Debug, Clone, Default)]
pub struct OutputTargets {
    pub save_path: Option<PathBuf>,
    pub copy: bool,
    pub stdout: bool,
}

impl OutputTargets {
    pub fn from_flags(
        config: &Config,
        project_root: &Path,
        save: Option<&Option<PathBuf>>,
        copy: bool,
        stdout: bool,
    ) -> Self {
        Self {
            save_path: save.map(|cli_path| resolve_save_path(config, project_root, cli_path.as_deref())),
            copy,
            stdout,
        }
    }

    fn wants_stdout(&self) -> bool {
        self.stdout || (self.save_path.is_none() && !self.copy)
    }

    /// True when `path` is the file the document gets saved to.
    pub fn is_save_target(&self, path: &Path) -> bool {
        self.save_path
            .as_deref()
            .is_some_and(|save_path| same_path(path, save_path))
    }
}

pub fn same_path(a: &Path, b: &Path) -> bool {
    let canonical = |p: &Path| -> PathBuf { p.canonicalize().unwrap_or_else(|_| p.to_path_buf()) };
    a == b || canonical(a) == canonical(b)
}

/// Writes `content` to every requested sink.
pub fn deliver(content: &str, targets: &OutputTargets, quiet: bool) -> Result<()> {
    if let Some(path) = &targets.save_path {
        write_to_file(path, content)?;
        if !quiet {
            eprintln!(
                "{} Context saved to: {}",
                "✅".green(),
                path.display().to_string().blue()
            );
        }
    }
    if targets.copy {
        copy_to_clipboard(content)?;
        if !quiet {
            eprintln!("{} Context copied to clipboard.", "📋".green());
        }
    }
    if targets.wants_stdout() {
        write_to_stdout(content)?;
    }
    Ok(())
}

/// `--save` without a value uses the configured location; with a value, an
/// existing directory receives the default file name and anything else is
/// taken as the file path.
pub fn resolve_save_path(config: &Config, project_root: &Path, cli_path: Option<&Path>) -> PathBuf {
    let default_path = config.get_default_save_path(project_root);
    match cli_path {
        None => {
            log::trace!("Save flag used without path, using {}", default_path.display());
            default_path
        }
        Some(path) if path.is_dir() => {
            let file_name = default_path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("context.txt"));
            path.join(file_name)
        }
        Some(path) => path.to_path_buf(),
    }
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AppError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut file = File::create(path).map_err(|source| AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(content.as_bytes())
        .map_err(|source| AppError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn copy_to_clipboard(content: &str) -> Result<()> {
    log::debug!("Initializing clipboard");
    let mut clipboard = Clipboard::new().map_err(|e| AppError::Clipboard(e.to_string()))?;
    clipboard
        .set_text(content.to_string())
        .map_err(|e| AppError::Clipboard(e.to_string()))?;
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data).context("Failed to serialize JSON output")?;
    write_to_stdout(&content)
}

pub fn print_metrics_pretty_table(metrics: &ProjectMetrics) -> Result<()> {
    println!();
    println!("{}", " Project Metrics Summary ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        metrics.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Lines:".green(),
        metrics.total_lines.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        metrics.total_bytes_readable.cyan()
    );
    println!(
        "{:<20} {}",
        "File Tokens:".green(),
        metrics.estimated_tokens.to_string().cyan()
    );
    println!(
        "{:<20} {} ({})",
        "Document Tokens:".green(),
        metrics.document_tokens.to_string().cyan(),
        metrics.format.dimmed()
    );
    if metrics.approximate {
        println!(
            "{}",
            "(Token counts are character-based estimates; no tokenizer for this model.)".yellow()
        );
    }

    if metrics.files_details.is_empty() {
        println!("\n{}", "(No files included in metrics)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Lines").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
        ]);
        for file in &metrics.files_details {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(file.lines).set_alignment(CellAlignment::Right),
                Cell::new(&file.bytes_readable)
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                Cell::new(file.estimated_tokens).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    println!();
    Ok(())
}
