use crate::context::ScanSettings;
use crate::error::{AppError, Result};
use crate::output_formats::{OutputFormat, SerializationOptions};
use crate::tokens::DEFAULT_TOKENIZER_MODEL;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".ctxbuilder";
pub const DEFAULT_CONFIG_FILENAME: &str = "ctxbuilder.toml";
pub const DEFAULT_OUTPUT_DIR: &str = ".ctxbuilder/out";
pub const DEFAULT_WATCH_DELAY: &str = "300ms";

/// Settings read from the optional `ctxbuilder.toml`. Every section and key
/// may be omitted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default = "default_true")]
    pub ignore_hidden: bool,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub line_numbers: bool,
    #[serde(default = "default_true")]
    pub project_tree: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    #[serde(default)]
    pub include: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TokensConfig {
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SaveConfig {
    #[serde(default = "default_save_dir_config")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub filename_base: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "default_watch_delay_string")]
    pub delay: String,
}

fn default_true() -> bool {
    true
}
fn default_model() -> String {
    DEFAULT_TOKENIZER_MODEL.to_string()
}
fn default_save_dir_config() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}
fn default_watch_delay_string() -> String {
    DEFAULT_WATCH_DELAY.to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_hidden: default_true(),
            use_gitignore: default_true(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            line_numbers: false,
            project_tree: default_true(),
        }
    }
}
impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}
impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            output_dir: default_save_dir_config(),
            filename_base: None,
            extension: None,
        }
    }
}
impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay: default_watch_delay_string(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        let resolved = path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })?;
        if !resolved.is_dir() {
            return Err(AppError::NotADirectory(resolved));
        }
        Ok(resolved)
    }

    /// Finds the config file to load, if any.
    ///
    /// `cli_config_file` may be a path (absolute or containing a separator) or
    /// a bare name looked up in `<root>/.ctxbuilder/`; `.toml` is appended when
    /// missing. An explicitly named file that does not exist is an error; a
    /// missing default file is not.
    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let path_to_check = match cli_config_file {
            Some(p_str) => {
                let expanded_path_cow = shellexpand::tilde(p_str);
                let mut path = PathBuf::from(expanded_path_cow.as_ref());
                let looks_like_path = path.is_absolute()
                    || path.components().count() > 1
                    || p_str.contains(['/', '\\']);

                if looks_like_path {
                    if !path.exists() && path.extension().is_none() {
                        path.set_extension("toml");
                    }
                    if !path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file not found at path: {}",
                            path.display()
                        )));
                    }
                    log::debug!("Using specified config file path: {}", path.display());
                    Some(path)
                } else {
                    let filename = if path.extension().map_or(true, |e| e != "toml") {
                        format!("{}.toml", path.to_string_lossy())
                    } else {
                        path.to_string_lossy().to_string()
                    };
                    let config_dir = project_root.join(DEFAULT_CONFIG_DIR);
                    let full_path = config_dir.join(filename);
                    if !full_path.exists() {
                        return Err(AppError::Config(format!(
                            "Specified config file '{}' not found in default directory: {}",
                            path.display(),
                            config_dir.display()
                        )));
                    }
                    log::debug!(
                        "Using specified config filename in default directory: {}",
                        full_path.display()
                    );
                    Some(full_path)
                }
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Some(default_path)
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    None
                }
            }
        };
        Ok(path_to_check)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn get_watch_delay(&self) -> Result<Duration> {
        parse(&self.watch.delay).map_err(|e| {
            AppError::DurationParse(format!(
                "Invalid watch delay duration '{}': {}. Use format like '500ms', '2s'.",
                self.watch.delay, e
            ))
        })
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            ignore_hidden: self.scan.ignore_hidden,
            use_gitignore: self.scan.use_gitignore,
        }
    }

    pub fn serialization_options(&self) -> SerializationOptions {
        SerializationOptions {
            format: self.output.format,
            include_line_numbers: self.output.line_numbers,
            include_project_tree: self.output.project_tree,
        }
    }

    /// `<root name>_context` unless `[save] filename_base` is set.
    pub fn get_effective_filename_base(&self, project_root: &Path) -> String {
        self.save.filename_base.clone().unwrap_or_else(|| {
            let name = project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "project".to_string());
            format!("{}_context", name)
        })
    }

    pub fn get_effective_extension(&self) -> String {
        self.save
            .extension
            .as_deref()
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.output.format.extension().to_string())
    }

    /// Default save location: `output_dir` (relative to the root unless
    /// absolute) joined with the effective file name.
    pub fn get_default_save_path(&self, project_root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.save.output_dir.to_string_lossy()).into_owned();
        let dir = PathBuf::from(expanded);
        let dir = if dir.is_absolute() {
            dir
        } else {
            project_root.join(dir)
        };
        dir.join(format!(
            "{}.{}",
            self.get_effective_filename_base(project_root),
            self.get_effective_extension()
        ))
    }
}
