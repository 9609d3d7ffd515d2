pub mod completion;
pub mod config;
pub mod files;
pub mod generate;
pub mod metrics;
pub mod tree;

use anyhow::{Context, Result};
use ctxbuilder_core::{Config, ProjectContext};
use std::path::Path;

/// Scans `project_root` with the scan settings of `config`.
pub fn scan_project(project_root: &Path, config: &Config) -> Result<ProjectContext> {
    ProjectContext::scan(project_root, config.scan_settings())
        .with_context(|| format!("Failed to scan project at {}", project_root.display()))
}
