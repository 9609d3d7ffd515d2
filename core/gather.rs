use crate::rules::IgnoreRuleSet;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Number of leading bytes inspected when deciding whether a file is binary.
pub const BINARY_PROBE_LEN: usize = 1024;

/// One entry of a filtered scan. Nodes own their children; a tree is never
/// patched in place, only replaced by a new scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    name: String,
    path: PathBuf,
    #[serde(rename = "directory")]
    is_dir: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_binary: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn directory(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            is_dir: true,
            is_binary: false,
            children: Vec::new(),
        }
    }

    fn file(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            is_dir: false,
            is_binary: false,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Always false for nodes produced by [`scan`], which drops binary files.
    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// All file paths below this node, depth-first in display order.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files(&self, out: &mut Vec<PathBuf>) {
        for child in &self.children {
            if child.is_dir {
                child.collect_files(out);
            } else {
                out.push(child.path.clone());
            }
        }
    }

    /// Like [`TreeNode::files`], with `root` stripped where possible.
    pub fn relative_files(&self, root: &Path) -> Vec<PathBuf> {
        self.files()
            .into_iter()
            .map(|p| p.strip_prefix(root).map(Path::to_path_buf).unwrap_or(p))
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| if c.is_dir { c.file_count() } else { 1 })
            .sum()
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.children.iter().any(|c| {
            if c.is_dir {
                path.starts_with(&c.path) && c.contains_file(path)
            } else {
                c.path == path
            }
        })
    }
}

/// Walks `root` depth-first and returns the filtered tree.
///
/// Hidden entries (when `ignore_hidden`) and entries matched by `rules` are
/// dropped before descending. Binary files never make it into the tree.
/// Unreadable directories simply end up without children, and symlinks that
/// loop back to an ancestor are skipped.
pub fn scan(root: &Path, ignore_hidden: bool, rules: &IgnoreRuleSet) -> TreeNode {
    log::info!("Scanning project directory: {}", root.display());
    let mut stack: Vec<TreeNode> = vec![TreeNode::directory(
        display_name(root),
        root.to_path_buf(),
    )];

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by(compare_entries)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || keep_entry(root, entry, ignore_hidden, rules));

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                if e.loop_ancestor().is_some() {
                    log::warn!("Skipping symlink loop: {}", e);
                } else {
                    log::warn!("Error walking directory: {}", e);
                }
                continue;
            }
        };
        let depth = entry.depth();
        if depth == 0 {
            continue;
        }

        while stack.len() > depth {
            close_directory(&mut stack);
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path().to_path_buf();
        if entry.file_type().is_dir() {
            log::trace!("Entering directory: {}", path.display());
            stack.push(TreeNode::directory(name, path));
        } else if let Some(parent) = stack.last_mut() {
            log::trace!("Adding file: {}", path.display());
            parent.children.push(TreeNode::file(name, path));
        }
    }

    while stack.len() > 1 {
        close_directory(&mut stack);
    }
    let tree = stack
        .pop()
        .unwrap_or_else(|| TreeNode::directory(display_name(root), root.to_path_buf()));
    log::info!("Scan complete: {} selectable files.", tree.file_count());
    tree
}

/// Heuristic binary check: a NUL byte in the first [`BINARY_PROBE_LEN`]
/// bytes. Files that cannot be read count as binary.
pub fn is_likely_binary(path: &Path) -> bool {
    let mut buffer = Vec::with_capacity(BINARY_PROBE_LEN);
    let read = File::open(path)
        .and_then(|file| file.take(BINARY_PROBE_LEN as u64).read_to_end(&mut buffer));
    match read {
        Ok(_) => buffer.contains(&0),
        Err(e) => {
            log::debug!("Binary probe failed for {}: {}", path.display(), e);
            true
        }
    }
}

fn close_directory(stack: &mut Vec<TreeNode>) {
    if let Some(done) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(done);
        }
    }
}

fn keep_entry(root: &Path, entry: &DirEntry, ignore_hidden: bool, rules: &IgnoreRuleSet) -> bool {
    let name = entry.file_name().to_string_lossy();
    if ignore_hidden && name.starts_with('.') {
        log::trace!("Skipping hidden entry: {}", entry.path().display());
        return false;
    }

    let file_type = entry.file_type();
    let is_dir = file_type.is_dir();
    if !is_dir && !file_type.is_file() {
        log::trace!("Skipping special file: {}", entry.path().display());
        return false;
    }

    if !rules.is_empty() {
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if rules.is_ignored(relative, is_dir) {
            log::trace!("Ignored by rules: {}", relative.display());
            return false;
        }
    }

    if !is_dir && is_likely_binary(entry.path()) {
        log::debug!("Skipping likely binary file: {}", entry.path().display());
        return false;
    }
    true
}

fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = sorts_as_dir(a);
    let b_dir = sorts_as_dir(b);
    b_dir.cmp(&a_dir).then_with(|| {
        let a_name = a.file_name().to_string_lossy();
        let b_name = b.file_name().to_string_lossy();
        a_name
            .to_lowercase()
            .cmp(&b_name.to_lowercase())
            .then_with(|| a_name.cmp(&b_name))
    })
}

/// The sorter sees entries before links are followed.
fn sorts_as_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir())
}

fn display_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &[u8])]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children().iter().map(TreeNode::name).collect()
    }

    #[test]
    fn gitignore_pattern_excludes_log_file() {
        let dir = project(&[(".gitignore", b"*.log\n"), ("debug.log", b"x"), ("main.py", b"print()")]);
        let rules = IgnoreRuleSet::load_gitignore(dir.path());
        let tree = scan(dir.path(), true, &rules);
        assert_eq!(names(&tree), vec!["main.py"]);
    }

    #[test]
    fn directories_first_then_case_insensitive_names() {
        let dir = project(&[("b.txt", b"b"), ("a.txt", b"a"), ("A/inner.txt", b"i")]);
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(names(&tree), vec!["A", "a.txt", "b.txt"]);
    }

    #[test]
    fn hidden_entries_follow_the_toggle() {
        let dir = project(&[(".env", b"SECRET=1"), (".config/x.toml", b"a = 1"), ("visible.rs", b"")]);
        let hidden_off = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(names(&hidden_off), vec!["visible.rs"]);

        let hidden_on = scan(dir.path(), false, &IgnoreRuleSet::new());
        assert_eq!(names(&hidden_on), vec![".config", ".env", "visible.rs"]);
    }

    #[test]
    fn binary_files_are_excluded() {
        let mut blob = vec![b'a'; 100];
        blob.push(0);
        let dir = project(&[("image.bin", &blob), ("notes.txt", b"plain")]);
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(names(&tree), vec!["notes.txt"]);
        assert!(tree.children().iter().all(|n| !n.is_binary()));
    }

    #[test]
    fn null_byte_past_first_kilobyte_is_not_binary() {
        let mut content = vec![b'x'; BINARY_PROBE_LEN];
        content.push(0);
        let dir = project(&[("late.txt", &content)]);
        assert!(!is_likely_binary(&dir.path().join("late.txt")));
    }

    #[test]
    fn missing_file_counts_as_binary() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_likely_binary(&dir.path().join("nope.txt")));
    }

    #[test]
    fn ignored_directory_is_not_descended() {
        let dir = project(&[("target/debug/out.txt", b"x"), ("src/lib.rs", b"")]);
        let rules = IgnoreRuleSet::parse("target/");
        let tree = scan(dir.path(), true, &rules);
        assert_eq!(names(&tree), vec!["src"]);
        assert_eq!(tree.files(), vec![dir.path().join("src").join("lib.rs")]);
    }

    #[test]
    fn nested_tree_keeps_structure() {
        let dir = project(&[("src/b.rs", b""), ("src/a/mod.rs", b""), ("README.md", b"")]);
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(names(&tree), vec!["src", "README.md"]);
        let src = &tree.children()[0];
        assert!(src.is_dir());
        assert_eq!(names(src), vec!["a", "b.rs"]);
        assert_eq!(names(&src.children()[0]), vec!["mod.rs"]);
        assert_eq!(tree.file_count(), 3);
        assert_eq!(
            tree.relative_files(dir.path()),
            vec![
                Path::new("src").join("a").join("mod.rs"),
                Path::new("src").join("b.rs"),
                PathBuf::from("README.md"),
            ]
        );
        assert!(tree.contains_file(&dir.path().join("src").join("a").join("mod.rs")));
        assert!(!tree.contains_file(&dir.path().join("src").join("a")));
    }

    #[test]
    fn empty_directory_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(names(&tree), vec!["empty"]);
        assert!(tree.children()[0].children().is_empty());
    }

    #[test]
    fn missing_root_yields_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = scan(&dir.path().join("gone"), true, &IgnoreRuleSet::new());
        assert_eq!(tree.name(), "gone");
        assert!(tree.children().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_skipped() {
        let dir = project(&[("pkg/file.txt", b"data")]);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("pkg").join("back")).unwrap();
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(tree.files(), vec![dir.path().join("pkg").join("file.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn linked_directory_sorts_with_directories() {
        let target = project(&[("inside.txt", b"x")]);
        let dir = project(&[("a.txt", b"a")]);
        std::os::unix::fs::symlink(target.path(), dir.path().join("zlink")).unwrap();
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        assert_eq!(names(&tree), vec!["zlink", "a.txt"]);
        assert!(tree.children()[0].is_dir());
        assert_eq!(names(&tree.children()[0]), vec!["inside.txt"]);
    }
}
