//! Rule document model and markdown parser.

pub mod parser;
pub mod types;

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub use parser::parse;
pub use types::{normalize_heading, RuleDocument, RuleId, SectionKind};

/// Read a markdown file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io_read(path, e))?;
    let text = String::from_utf8(bytes).map_err(|_| Error::DocumentEncoding {
        path: path.to_path_buf(),
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Read and parse a markdown file.
pub fn load(path: &Path) -> Result<RuleDocument> {
    read_text(path).map(|text| parse(&text))
}
