use crate::error::AppError;
use crate::gather::{TreeNode, is_likely_binary};
use crate::tree::render_with_root;
use quick_xml::escape::partial_escape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod mapping;

pub use mapping::language_for_path;

pub const LINE_NUMBER_DELIMITER: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Markdown,
    PlainText,
}

impl OutputFormat {
    /// File extension used when saving a document in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "md",
            OutputFormat::PlainText => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Markdown => "markdown",
            OutputFormat::PlainText => "plaintext",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "plaintext" | "plain" | "text" | "txt" => Ok(OutputFormat::PlainText),
            _ => Err(AppError::InvalidArgument(format!(
                "Unknown output format '{}'. Use xml, markdown or plaintext.",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializationOptions {
    pub format: OutputFormat,
    pub include_line_numbers: bool,
    pub include_project_tree: bool,
}

/// Builds the context document for `selected_paths`.
///
/// `tree` must be the same filtered snapshot the selection was made from; the
/// project-structure block is rendered from it as is. Files are emitted in
/// path order. A file that turns out to be binary or cannot be read is
/// replaced by an inline warning and the rest of the batch still goes out.
pub fn serialize(
    root: &Path,
    selected_paths: &[PathBuf],
    options: &SerializationOptions,
    tree: &TreeNode,
) -> String {
    let format = options.format;
    let mut lines: Vec<String> = Vec::new();

    if format == OutputFormat::Xml {
        lines.push("<context>".to_string());
    }

    if options.include_project_tree {
        log::trace!("Rendering project structure block...");
        let diagram = render_with_root(tree);
        match format {
            OutputFormat::Xml => {
                lines.push("<projectTree>".to_string());
                lines.push(partial_escape(&diagram).into_owned());
                lines.push("</projectTree>".to_string());
            }
            OutputFormat::Markdown => {
                lines.push("**Project Structure:**".to_string());
                lines.push("```".to_string());
                lines.push(diagram);
                lines.push("```".to_string());
            }
            OutputFormat::PlainText => {
                lines.push("--- Project Structure ---".to_string());
                lines.push(diagram);
                lines.push("--- End Structure ---".to_string());
            }
        }
        lines.push(String::new());
    }

    if !selected_paths.is_empty() {
        match format {
            OutputFormat::Xml => lines.push("<files>".to_string()),
            OutputFormat::Markdown | OutputFormat::PlainText => {
                lines.push("--- Files ---".to_string());
                lines.push(String::new());
            }
        }

        let mut ordered: Vec<&PathBuf> = selected_paths.iter().collect();
        ordered.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        log::debug!("Serializing {} files as {}", ordered.len(), format);

        for path in ordered {
            if is_likely_binary(path) {
                let message = format!("Skipping likely binary file: {}", basename(path));
                log::warn!("{}", message);
                lines.push(warning_line(format, &message));
                continue;
            }
            match render_file(root, path, options) {
                Ok(block) => lines.extend(block),
                Err(e) => {
                    let message = format!(
                        "Warning: Error processing file '{}': {}",
                        basename(path),
                        e
                    );
                    log::warn!("{}", message);
                    lines.push(warning_line(format, &message));
                }
            }
        }

        if format == OutputFormat::Xml {
            lines.push("</files>".to_string());
        }
    }

    if format == OutputFormat::Xml {
        lines.push("</context>".to_string());
    }
    lines.join("\n")
}

/// Prefixes each line with its 1-based number, right-aligned to the width of
/// the last number.
pub fn number_lines(content: &str) -> String {
    let source_lines: Vec<&str> = content.lines().collect();
    if source_lines.is_empty() {
        return String::new();
    }
    let width = source_lines.len().to_string().len();
    source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}{}{}", i + 1, LINE_NUMBER_DELIMITER, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Path as shown in the document: relative to `root` when it lies below it.
pub fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_string_lossy().into_owned(),
        _ => path.to_string_lossy().into_owned(),
    }
}

fn render_file(
    root: &Path,
    path: &Path,
    options: &SerializationOptions,
) -> Result<Vec<String>, AppError> {
    let bytes = fs::read(path).map_err(|source| AppError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    if options.include_line_numbers {
        content = number_lines(&content);
    }

    let shown = display_path(root, path);
    let block = match options.format {
        OutputFormat::PlainText => vec![
            format!("--- File: {} ---", shown),
            content,
            "--- End File ---".to_string(),
            String::new(),
        ],
        OutputFormat::Xml => {
            let extension = Path::new(&shown)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            vec![
                format!(
                    "<file path=\"{}\" type=\"{}\">",
                    partial_escape(&shown),
                    partial_escape(&extension)
                ),
                partial_escape(&content).into_owned(),
                "</file>".to_string(),
            ]
        }
        OutputFormat::Markdown => vec![
            format!("**File:** `{}`", shown),
            format!("```{}", language_for_path(&shown)),
            content,
            "```".to_string(),
            String::new(),
        ],
    };
    Ok(block)
}

fn warning_line(format: OutputFormat, message: &str) -> String {
    match format {
        OutputFormat::Xml => format!("<!-- WARNING: {} -->", comment_text(message)),
        OutputFormat::Markdown | OutputFormat::PlainText => format!("# {}", message),
    }
}

/// XML comments may not contain `--`.
fn comment_text(message: &str) -> String {
    let mut text = partial_escape(message).into_owned();
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    text
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gather::scan;
    use crate::rules::IgnoreRuleSet;
    use tempfile::TempDir;

    fn project(files: &[(&str, &[u8])]) -> (TempDir, TreeNode) {
        let dir = tempfile::Builder::new().prefix("demo").tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let tree = scan(dir.path(), true, &IgnoreRuleSet::new());
        (dir, tree)
    }

    fn options(format: OutputFormat) -> SerializationOptions {
        SerializationOptions {
            format,
            include_line_numbers: false,
            include_project_tree: false,
        }
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("XML".parse::<OutputFormat>().unwrap(), OutputFormat::Xml);
        assert_eq!("Markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("Plain Text".parse::<OutputFormat>().unwrap(), OutputFormat::PlainText);
        assert!("json".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::PlainText.to_string(), "plaintext");
    }

    #[test]
    fn plaintext_layout() {
        let (dir, tree) = project(&[("b.txt", b"bee"), ("a.txt", b"ay\n")]);
        let selected = tree.files();
        let out = serialize(dir.path(), &selected, &options(OutputFormat::PlainText), &tree);
        assert_eq!(
            out,
            "--- Files ---\n\n\
             --- File: a.txt ---\nay\n\n--- End File ---\n\n\
             --- File: b.txt ---\nbee\n--- End File ---\n"
        );
    }

    #[test]
    fn xml_layout_escapes_content_and_attributes() {
        let (dir, tree) = project(&[("a&b.rs", b"if a < b && c > d {}")]);
        let out = serialize(dir.path(), &tree.files(), &options(OutputFormat::Xml), &tree);
        assert_eq!(
            out,
            "<context>\n<files>\n\
             <file path=\"a&amp;b.rs\" type=\"rs\">\n\
             if a &lt; b &amp;&amp; c &gt; d {}\n\
             </file>\n</files>\n</context>"
        );
    }

    #[test]
    fn markdown_layout_uses_language_table() {
        let (dir, tree) = project(&[("main.py", b"print('hi')"), ("Makefile", b"all:")]);
        let out = serialize(dir.path(), &tree.files(), &options(OutputFormat::Markdown), &tree);
        assert_eq!(
            out,
            "--- Files ---\n\n\
             **File:** `Makefile`\n```\nall:\n```\n\n\
             **File:** `main.py`\n```python\nprint('hi')\n```\n"
        );
    }

    #[test]
    fn project_tree_block_per_format() {
        let (dir, tree) = project(&[("src/lib.rs", b"")]);
        let root_name = tree.name().to_string();
        let mut opts = options(OutputFormat::PlainText);
        opts.include_project_tree = true;

        let plain = serialize(dir.path(), &[], &opts, &tree);
        assert_eq!(
            plain,
            format!(
                "--- Project Structure ---\n{root_name}\n└── src\n    └── lib.rs\n--- End Structure ---\n"
            )
        );

        opts.format = OutputFormat::Markdown;
        let md = serialize(dir.path(), &[], &opts, &tree);
        assert!(md.starts_with(&format!("**Project Structure:**\n```\n{root_name}\n")));

        opts.format = OutputFormat::Xml;
        let xml = serialize(dir.path(), &[], &opts, &tree);
        assert!(xml.starts_with(&format!("<context>\n<projectTree>\n{root_name}\n└── src")));
        assert!(xml.ends_with("</projectTree>\n\n</context>"));
    }

    #[test]
    fn plaintext_round_trips_content() {
        let files: &[(&str, &[u8])] = &[
            ("one.txt", b"first line\nsecond line\n"),
            ("two.md", b"# Title\n\nbody without newline"),
            ("nested/three.rs", b"fn main() {\n    println!(\"--- not a marker\");\n}\n"),
        ];
        let (dir, tree) = project(files);
        let out = serialize(dir.path(), &tree.files(), &options(OutputFormat::PlainText), &tree);
        for (rel, content) in files {
            let shown = display_path(dir.path(), &dir.path().join(rel));
            let start_marker = format!("--- File: {} ---\n", shown);
            let start = out.find(&start_marker).unwrap() + start_marker.len();
            let end = start + out[start..].find("\n--- End File ---").unwrap();
            assert_eq!(out[start..end].as_bytes(), *content);
        }
    }

    #[test]
    fn serialize_is_idempotent() {
        let (dir, tree) = project(&[("x.txt", b"x"), ("y/z.json", b"{}")]);
        let mut opts = options(OutputFormat::Markdown);
        opts.include_project_tree = true;
        opts.include_line_numbers = true;
        let first = serialize(dir.path(), &tree.files(), &opts, &tree);
        let second = serialize(dir.path(), &tree.files(), &opts, &tree);
        assert_eq!(first, second);
    }

    #[test]
    fn forced_binary_file_becomes_warning() {
        let (dir, tree) = project(&[("ok.txt", b"fine")]);
        let blob = dir.path().join("blob.dat");
        fs::write(&blob, [0x89, b'P', b'N', b'G', 0x00, 0x01]).unwrap();
        let selected = vec![blob, dir.path().join("ok.txt")];

        let plain = serialize(dir.path(), &selected, &options(OutputFormat::PlainText), &tree);
        assert!(plain.contains("# Skipping likely binary file: blob.dat"));
        assert!(plain.contains("--- File: ok.txt ---\nfine\n--- End File ---"));
        assert!(!plain.contains("PNG"));

        let xml = serialize(dir.path(), &selected, &options(OutputFormat::Xml), &tree);
        assert!(xml.contains("<!-- WARNING: Skipping likely binary file: blob.dat -->"));
    }

    #[test]
    fn xml_warning_keeps_comment_well_formed() {
        let (dir, tree) = project(&[]);
        let blob = dir.path().join("a---b-");
        fs::write(&blob, [0u8, 1]).unwrap();
        let xml = serialize(dir.path(), &[blob], &options(OutputFormat::Xml), &tree);
        let comment = xml
            .lines()
            .find(|line| line.starts_with("<!-- WARNING:"))
            .unwrap();
        assert_eq!(comment, "<!-- WARNING: Skipping likely binary file: a- - -b- -->");
        let body = &comment["<!--".len()..comment.len() - "-->".len()];
        assert!(!body.contains("--"));
    }

    #[test]
    fn unreadable_file_does_not_abort_batch() {
        let (dir, tree) = project(&[("good.txt", b"good")]);
        // Deleted between scan and generate.
        let missing = dir.path().join("vanished.txt");
        let selected = vec![missing, dir.path().join("good.txt")];
        let out = serialize(dir.path(), &selected, &options(OutputFormat::PlainText), &tree);
        assert!(out.contains("# Skipping likely binary file: vanished.txt"));
        assert!(out.contains("--- File: good.txt ---\ngood\n--- End File ---"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let (dir, tree) = project(&[("latin.txt", b"caf\xe9 ok")]);
        let out = serialize(dir.path(), &tree.files(), &options(OutputFormat::PlainText), &tree);
        assert!(out.contains("caf\u{FFFD} ok"));
    }

    #[test]
    fn line_numbers_are_left_padded() {
        let content: String = (1..=10).map(|i| format!("line{i}\n")).collect();
        let numbered = number_lines(&content);
        let lines: Vec<&str> = numbered.lines().collect();
        assert_eq!(lines[0], " 1 | line1");
        assert_eq!(lines[9], "10 | line10");
        assert_eq!(number_lines(""), "");
        assert_eq!(number_lines("solo"), "1 | solo");
    }

    #[test]
    fn line_numbers_inside_document() {
        let (dir, tree) = project(&[("a.txt", b"x\ny")]);
        let mut opts = options(OutputFormat::PlainText);
        opts.include_line_numbers = true;
        let out = serialize(dir.path(), &tree.files(), &opts, &tree);
        assert!(out.contains("--- File: a.txt ---\n1 | x\n2 | y\n--- End File ---"));
    }

    #[test]
    fn paths_are_sorted_by_full_path_string() {
        let (dir, tree) = project(&[("a-b.txt", b"1"), ("a/b.txt", b"2")]);
        let out = serialize(dir.path(), &tree.files(), &options(OutputFormat::PlainText), &tree);
        let dash = out.find("--- File: a-b.txt").unwrap();
        let nested = out.find(&format!("--- File: {}", Path::new("a").join("b.txt").display())).unwrap();
        assert!(dash < nested);
    }

    #[test]
    fn empty_selection_without_tree() {
        let (dir, tree) = project(&[]);
        assert_eq!(serialize(dir.path(), &[], &options(OutputFormat::Xml), &tree), "<context>\n</context>");
        assert_eq!(serialize(dir.path(), &[], &options(OutputFormat::PlainText), &tree), "");
    }

    #[test]
    fn path_outside_root_is_shown_as_given() {
        let outside = Path::new("/elsewhere/file.txt");
        assert_eq!(display_path(Path::new("/project"), outside), "/elsewhere/file.txt");
        assert_eq!(display_path(Path::new("/project"), Path::new("/project/src/a.rs")), Path::new("src").join("a.rs").to_string_lossy());
    }
}
