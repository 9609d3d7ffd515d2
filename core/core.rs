pub mod config;
pub mod context;
pub mod error;
pub mod gather;
pub mod output_formats;
pub mod rules;
pub mod tokens;
pub mod tree;

pub use config::Config;
pub use context::{GeneratedContext, ProjectContext, ScanSettings};
pub use error::{AppError, Result};
pub use gather::{TreeNode, is_likely_binary, scan};
pub use output_formats::{OutputFormat, SerializationOptions, number_lines, serialize};
pub use rules::{IgnoreRule, IgnoreRuleSet};
pub use tokens::TokenEstimator;
pub use tree::{render, render_with_root};
