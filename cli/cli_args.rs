use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the target project directory (default: $PROJECT_ROOT, then current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .ctxbuilder/ctxbuilder.toml).",
        value_name = "CONTEXT_FILE",
        conflicts_with = "disable_context_file",
        help_heading = "Project Setup"
    )]
    pub context_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "context_file",
        help_heading = "Project Setup"
    )]
    pub disable_context_file: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScanOpts {
    #[arg(
        long,
        help = "Include hidden files and directories (names starting with '.').",
        overrides_with = "exclude_hidden",
        help_heading = "Scanning"
    )]
    pub include_hidden: bool,
    #[arg(
        long,
        help = "Skip hidden files and directories [default].",
        overrides_with = "include_hidden",
        help_heading = "Scanning"
    )]
    pub exclude_hidden: bool,

    #[arg(
        long,
        help = "Respect the project's top-level .gitignore [default].",
        overrides_with = "disable_gitignore",
        help_heading = "Scanning"
    )]
    pub enable_gitignore: bool,
    #[arg(
        long,
        help = "Ignore the project's .gitignore.",
        overrides_with = "enable_gitignore",
        help_heading = "Scanning"
    )]
    pub disable_gitignore: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionOpts {
    #[arg(
        short = 'i',
        long = "include",
        value_name = "GLOB",
        action = clap::ArgAction::Append,
        help = "Select files whose root-relative path matches GLOB (repeatable). Default: all scanned files.",
        help_heading = "Selection"
    )]
    pub include: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(
        short = 'f',
        long,
        help = "Set the document format.",
        value_name = "FORMAT",
        value_parser = ["xml", "markdown", "md", "plaintext", "text", "txt"],
        help_heading = "Document Format"
    )]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Prefix every file line with its line number.",
        overrides_with = "no_line_numbers",
        help_heading = "Document Format"
    )]
    pub line_numbers: bool,
    #[arg(
        long,
        help = "Emit file contents without line numbers [default].",
        overrides_with = "line_numbers",
        help_heading = "Document Format"
    )]
    pub no_line_numbers: bool,

    #[arg(
        long,
        help = "Include the project structure diagram [default].",
        overrides_with = "no_project_tree",
        help_heading = "Document Format"
    )]
    pub project_tree: bool,
    #[arg(
        long,
        help = "Leave out the project structure diagram.",
        overrides_with = "project_tree",
        help_heading = "Document Format"
    )]
    pub no_project_tree: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TokenOpts {
    #[arg(
        long,
        value_name = "MODEL",
        help = "Model whose tokenizer is used for estimates [default: gpt-4].",
        help_heading = "Tokens"
    )]
    pub tokenizer_model: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "ctxbuilder",
    author,
    version,
    about = "Assemble selected project files into a single context document for language models.",
    long_about = "ctxbuilder scans a project directory (respecting .gitignore, hidden files and \nbinary detection), lets you select files by glob and writes them as one XML, \nMarkdown or plain-text document with an optional project tree and line numbers.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  ctxbuilder generate -f markdown -i 'src/**/*.rs' --copy\n  ctxbuilder tree --include-hidden\n  ctxbuilder metrics -i '*.py'\n  ctxbuilder watch --save",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Generate the context document for the selected files."
    )]
    Generate(GenerateArgs),

    #[command(visible_alias = "t", about = "Print the filtered project tree.")]
    Tree(TreeArgs),

    #[command(
        visible_alias = "ls",
        about = "List the selectable (non-ignored, non-binary) files."
    )]
    Files(FilesArgs),

    #[command(
        visible_alias = "m",
        about = "Show per-file lines, size and token estimates."
    )]
    Metrics(MetricsArgs),

    #[command(
        visible_alias = "w",
        about = "Regenerate the context document whenever project files change."
    )]
    Watch(WatchArgs),

    #[command(about = "Print the effective configuration as TOML.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub scan: ScanOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub tokens: TokenOpts,

    #[arg(
        long,
        help = "Also write the document to standard output when saving or copying.",
        help_heading = "Output Control"
    )]
    pub stdout: bool,

    #[arg(
        short = 's', long, value_name = "PATH",
        num_args = 0..=1,
        help_heading = "Output Control",
        help = "Save the document. Optional PATH (file or existing directory) overrides config/default logic.",
    )]
    pub save: Option<Option<PathBuf>>,

    #[arg(
        short = 'c',
        long,
        help = "Copy the document to the system clipboard.",
        help_heading = "Output Control"
    )]
    pub copy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan: ScanOpts,
}

#[derive(Args, Debug, Clone)]
pub struct FilesArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan: ScanOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,

    #[arg(long, help = "Print absolute paths instead of root-relative ones.")]
    pub absolute: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub scan: ScanOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub tokens: TokenOpts,

    #[arg(long, help = "Print metrics as JSON instead of a table.")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub scan: ScanOpts,
    #[clap(flatten)]
    pub selection: SelectionOpts,
    #[clap(flatten)]
    pub tokens: TokenOpts,

    #[arg(
        long,
        value_name = "DELAY_STRING",
        help = "Set debounce delay for watch mode [default: 300ms]"
    )]
    pub watch_delay: Option<String>,

    #[arg(
        short = 's', long, value_name = "PATH", num_args = 0..=1,
        help = "Save the document on every change instead of printing it. Optional PATH overrides config/default logic.",
    )]
    pub save: Option<Option<PathBuf>>,

    #[arg(short = 'c', long, help = "Copy the document to the clipboard on every change.")]
    pub copy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(long, help = "Print the built-in defaults, ignoring any config file.")]
    pub defaults: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}
