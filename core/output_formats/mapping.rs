// Maps a lowercase file extension to the info string used on Markdown code
// fences. Unknown extensions get an untagged fence.
pub fn map_extension_to_language(extension: &str) -> Option<&'static str> {
    match extension {
        "py" => Some("python"),
        "c" => Some("c"),
        "cpp" => Some("cpp"),
        "java" => Some("java"),
        "js" => Some("javascript"),
        "ts" | "tsx" => Some("typescript"),
        "html" => Some("html"),
        "css" => Some("css"),
        "xml" => Some("xml"),
        "json" => Some("json"),
        "yaml" | "yml" => Some("yaml"),
        "sh" => Some("bash"),
        "rb" => Some("ruby"),
        "kt" => Some("kotlin"),
        "go" => Some("go"),
        "php" => Some("php"),
        "swift" => Some("swift"),
        "sql" => Some("sql"),
        "rs" => Some("rust"),
        "md" => Some("markdown"),
        "toml" => Some("toml"),
        _ => None,
    }
}

/// Fence language for a display path: the text after the last `.`, lowercased.
pub fn language_for_path(path: &str) -> &'static str {
    let tail = path.rsplit('.').next().unwrap_or_default().to_lowercase();
    map_extension_to_language(&tail).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_map_to_languages() {
        assert_eq!(language_for_path("src/app.py"), "python");
        assert_eq!(language_for_path("web/App.TSX"), "typescript");
        assert_eq!(language_for_path("deploy/values.yml"), "yaml");
        assert_eq!(language_for_path("scripts/run.sh"), "bash");
    }

    #[test]
    fn unknown_or_missing_extension_is_untagged() {
        assert_eq!(language_for_path("Makefile"), "");
        assert_eq!(language_for_path("data.unknownext"), "");
    }
}
