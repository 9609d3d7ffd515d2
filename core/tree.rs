//! Box-drawing rendering of an already filtered [`TreeNode`].
//!
//! Rendering never looks at the filesystem or the ignore rules again, so the
//! diagram always lists exactly what the scan produced.

use crate::gather::TreeNode;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_INDENT: &str = "│   ";
const SPACE_INDENT: &str = "    ";

/// Renders the children of `node`, one line per entry, each line starting
/// with `prefix`.
pub fn render(node: &TreeNode, prefix: &str) -> Vec<String> {
    let mut lines = Vec::new();
    render_into(node, prefix, &mut lines);
    lines
}

fn render_into(node: &TreeNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children().len();
    for (i, child) in node.children().iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { LAST_BRANCH } else { BRANCH };
        lines.push(format!("{prefix}{connector}{}", child.name()));
        if child.is_dir() {
            let indent = if is_last { SPACE_INDENT } else { PIPE_INDENT };
            render_into(child, &format!("{prefix}{indent}"), lines);
        }
    }
}

/// The root name on the first line, followed by the rendered tree.
pub fn render_with_root(node: &TreeNode) -> String {
    let mut lines = Vec::with_capacity(node.file_count() + 1);
    lines.push(node.name().to_string());
    render_into(node, "", &mut lines);
    lines.join("\n")
}
