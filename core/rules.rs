//! Gitignore-style ignore rules.
//!
//! This is a deliberately reduced dialect of `.gitignore`:
//!
//! * `name/` only applies to directories and matches the basename.
//! * A pattern containing `/` matches the whole root-relative path, with an
//!   implicit leading `*` (so `docs/*.md` also matches `sub/docs/a.md`).
//! * Anything else matches the basename with shell-glob rules (`*`, `?`, `[...]`).
//! * `!pattern` un-ignores a path. Once un-ignored, later plain rules leave it alone.
//!
//! There is no `**` handling and no anchoring to the directory that holds the
//! ignore file.

use crate::error::{AppError, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};

pub const GITIGNORE_FILENAME: &str = ".gitignore";

#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: String,
    negated: bool,
    dir_only: bool,
    matcher: GlobMatcher,
}

impl IgnoreRule {
    /// Parses one line of an ignore file. Blank lines and comments yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Ok(None);
        }

        let dir_only = body.ends_with('/');
        let glob_source = if dir_only {
            body.trim_end_matches('/').to_string()
        } else if body.contains('/') {
            format!("*{}", body)
        } else {
            body.to_string()
        };
        if glob_source.is_empty() {
            return Ok(None);
        }

        let matcher = GlobBuilder::new(&glob_source)
            .literal_separator(false)
            .build()
            .map_err(|e| {
                AppError::Glob(format!("Invalid ignore pattern \"{}\": {}", trimmed, e))
            })?
            .compile_matcher();

        Ok(Some(Self {
            pattern: body.to_string(),
            negated,
            dir_only,
            matcher,
        }))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_dir_only(&self) -> bool {
        self.dir_only
    }

    fn matches(&self, slash_path: &str, basename: &str, is_dir: bool) -> bool {
        if self.dir_only {
            is_dir && self.matcher.is_match(basename)
        } else if self.pattern.contains('/') {
            self.matcher.is_match(slash_path)
        } else {
            self.matcher.is_match(basename)
        }
    }
}

/// Ordered rule list, evaluated in insertion (file) order.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<IgnoreRule>,
}

impl IgnoreRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rule set from the text of an ignore file.
    ///
    /// Invalid glob lines are dropped with a warning instead of failing the
    /// whole file.
    pub fn parse(text: &str) -> Self {
        let mut set = Self::new();
        for (line_no, line) in text.lines().enumerate() {
            match IgnoreRule::parse(line) {
                Ok(Some(rule)) => {
                    log::trace!("Ignore rule {}: {:?}", line_no + 1, rule.pattern);
                    set.rules.push(rule);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Skipping ignore rule on line {}: {}", line_no + 1, e),
            }
        }
        set
    }

    /// Reads `<root>/.gitignore`. A missing or unreadable file gives an empty set.
    pub fn load_gitignore(root: &Path) -> Self {
        let path = root.join(GITIGNORE_FILENAME);
        match fs::read(&path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    let set = Self::parse(&text);
                    log::debug!("Loaded {} ignore rules from {}", set.len(), path.display());
                    set
                }
                Err(e) => {
                    log::warn!("Could not decode {} as UTF-8: {}", path.display(), e);
                    Self::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::trace!("No {} in {}", GITIGNORE_FILENAME, root.display());
                Self::new()
            }
            Err(e) => {
                log::warn!("Could not read {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IgnoreRule> {
        self.rules.iter()
    }

    /// Verdict for `relative_path` (relative to the scan root).
    pub fn is_ignored(&self, relative_path: &Path, is_dir: bool) -> bool {
        let segments: Vec<String> = relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let Some(basename) = segments.last() else {
            return false;
        };
        let slash_path = format!("/{}", segments.join("/"));

        let mut ignored = false;
        let mut unignored = false;
        for rule in &self.rules {
            if !rule.matches(&slash_path, basename, is_dir) {
                continue;
            }
            if rule.negated {
                ignored = false;
                unignored = true;
            } else if !unignored {
                ignored = true;
            }
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rules(text: &str) -> IgnoreRuleSet {
        IgnoreRuleSet::parse(text)
    }

    #[test]
    fn single_rule_ignores_matching_file() {
        let set = rules("*.log");
        assert!(set.is_ignored(Path::new("debug.log"), false));
        assert!(set.is_ignored(Path::new("nested/dir/trace.log"), false));
        assert!(!set.is_ignored(Path::new("main.py"), false));
    }

    #[test]
    fn negation_after_rule_unignores() {
        let set = rules("*.log\n!*.log");
        assert!(!set.is_ignored(Path::new("debug.log"), false));
    }

    #[test]
    fn negation_is_sticky_for_later_rules() {
        let set = rules("*.log\n!keep.log\n*.log");
        assert!(!set.is_ignored(Path::new("keep.log"), false));
        assert!(set.is_ignored(Path::new("other.log"), false));
    }

    #[test]
    fn negation_before_rule_wins() {
        let set = rules("!important.txt\n*.txt");
        assert!(!set.is_ignored(Path::new("important.txt"), false));
        assert!(set.is_ignored(Path::new("notes.txt"), false));
    }

    #[test]
    fn directory_rule_only_applies_to_directories() {
        let set = rules("build/");
        assert!(set.is_ignored(Path::new("build"), true));
        assert!(set.is_ignored(Path::new("sub/build"), true));
        assert!(!set.is_ignored(Path::new("build"), false));
    }

    #[test]
    fn path_rule_matches_with_leading_wildcard() {
        let set = rules("docs/*.md");
        assert!(set.is_ignored(Path::new("docs/guide.md"), false));
        assert!(set.is_ignored(Path::new("pkg/docs/guide.md"), false));
        assert!(!set.is_ignored(Path::new("guide.md"), false));
    }

    #[test]
    fn leading_slash_path_rule_matches_top_level() {
        let set = rules("/dist/bundle.js");
        assert!(set.is_ignored(Path::new("dist/bundle.js"), false));
    }

    #[test]
    fn question_mark_and_class_globs() {
        let set = rules("file?.txt\n[ab].rs");
        assert!(set.is_ignored(Path::new("file1.txt"), false));
        assert!(!set.is_ignored(Path::new("file10.txt"), false));
        assert!(set.is_ignored(Path::new("a.rs"), false));
        assert!(!set.is_ignored(Path::new("c.rs"), false));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let set = rules("# a comment\n\n   \n*.tmp\n  # indented comment");
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().map(IgnoreRule::pattern), Some("*.tmp"));
    }

    #[test]
    fn invalid_pattern_is_dropped() {
        let set = rules("[unclosed\n*.bak");
        assert_eq!(set.len(), 1);
        assert!(set.is_ignored(Path::new("x.bak"), false));
    }

    #[test]
    fn rule_flags_are_parsed() {
        let rule = IgnoreRule::parse("!target/").unwrap().unwrap();
        assert!(rule.is_negated());
        assert!(rule.is_dir_only());
        assert_eq!(rule.pattern(), "target/");
    }

    #[test]
    fn empty_path_is_never_ignored() {
        let set = rules("*");
        assert!(!set.is_ignored(&PathBuf::new(), true));
    }

    #[test]
    fn missing_gitignore_gives_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IgnoreRuleSet::load_gitignore(dir.path()).is_empty());
    }

    #[test]
    fn gitignore_is_loaded_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "# deps\nnode_modules/\n*.log\n").unwrap();
        let set = IgnoreRuleSet::load_gitignore(dir.path());
        assert_eq!(set.len(), 2);
        assert!(set.is_ignored(Path::new("node_modules"), true));
    }
}
