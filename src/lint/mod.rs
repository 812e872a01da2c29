//! Repository-wide document checks.

pub mod report;
pub mod runner;

pub use report::{render_json, render_text, OutputFormat, Summary};
pub use runner::LintRunner;
