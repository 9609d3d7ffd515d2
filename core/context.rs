use crate::error::{AppError, Result};
use crate::gather::{self, TreeNode};
use crate::output_formats::{self, SerializationOptions};
use crate::rules::IgnoreRuleSet;
use crate::tokens::TokenEstimator;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Filters applied while scanning. The same value drives the selectable file
/// list and the tree diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSettings {
    pub ignore_hidden: bool,
    pub use_gitignore: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ignore_hidden: true,
            use_gitignore: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContext {
    pub text: String,
    pub tokens: usize,
    pub file_count: usize,
}

/// A scanned project: the root, the settings it was scanned with and the
/// resulting snapshot. Selections are always made against this snapshot.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
    settings: ScanSettings,
    rules: IgnoreRuleSet,
    tree: TreeNode,
}

impl ProjectContext {
    pub fn scan(root: &Path, settings: ScanSettings) -> Result<Self> {
        if !root.is_dir() {
            return Err(AppError::NotADirectory(root.to_path_buf()));
        }
        let rules = if settings.use_gitignore {
            IgnoreRuleSet::load_gitignore(root)
        } else {
            log::debug!("Gitignore handling disabled.");
            IgnoreRuleSet::new()
        };
        let tree = gather::scan(root, settings.ignore_hidden, &rules);
        Ok(Self {
            root: root.to_path_buf(),
            settings,
            rules,
            tree,
        })
    }

    /// Replaces the snapshot with a fresh scan. `.gitignore` is re-read too.
    pub fn rescan(&mut self) -> Result<()> {
        *self = Self::scan(&self.root, self.settings)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> ScanSettings {
        self.settings
    }

    pub fn rules(&self) -> &IgnoreRuleSet {
        &self.rules
    }

    pub fn tree(&self) -> &TreeNode {
        &self.tree
    }

    pub fn select_all(&self) -> Vec<PathBuf> {
        self.tree.files()
    }

    /// Files of the snapshot whose root-relative path (with `/` separators)
    /// matches any of `patterns`. An empty pattern list selects everything.
    pub fn select_matching(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        if patterns.is_empty() {
            return Ok(self.select_all());
        }
        let set = build_glob_set_from_vec(patterns)?;
        let selected: Vec<PathBuf> = self
            .tree
            .files()
            .into_iter()
            .filter(|path| set.is_match(relative_slash_path(&self.root, path)))
            .collect();
        log::debug!(
            "{} of {} files match the selection patterns.",
            selected.len(),
            self.tree.file_count()
        );
        Ok(selected)
    }

    pub fn generate(
        &self,
        selected: &[PathBuf],
        options: &SerializationOptions,
        estimator: &TokenEstimator,
    ) -> GeneratedContext {
        let text = output_formats::serialize(&self.root, selected, options, &self.tree);
        let tokens = estimator.estimate(&text);
        log::info!(
            "Generated {} context for {} files (~{} tokens).",
            options.format,
            selected.len(),
            tokens
        );
        GeneratedContext {
            text,
            tokens,
            file_count: selected.len(),
        }
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_glob_set_from_vec(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        match Glob::new(&processed_pattern) {
            Ok(glob) => {
                log::trace!(
                    "Adding selection pattern: {} (processed as {})",
                    pattern_str,
                    processed_pattern
                );
                builder.add(glob);
            }
            Err(e) => {
                return Err(AppError::Glob(format!(
                    "Invalid selection pattern \"{}\": {}",
                    pattern_str, e
                )));
            }
        }
    }
    builder.build().map_err(AppError::from)
}
