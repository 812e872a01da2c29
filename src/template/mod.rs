//! Templates for new rule documents and feature specs.

pub mod registry;
pub mod renderer;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub use registry::TemplateRegistry;
pub use renderer::Template;

/// Parse a `name=value` assignment from the command line.
pub fn parse_assignment(input: &str) -> Result<(String, String)> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| Error::invalid_value(input, "expected name=value"))?;
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(Error::invalid_value(
            input,
            format!("'{}' is not a valid placeholder name", name),
        ));
    }
    Ok((name.to_string(), value.to_string()))
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Load placeholder values from a TOML file.
///
/// Nested tables flatten to dotted names, so `[context] level = "x"`
/// supplies `context.level`. Strings are used as-is; numbers, booleans and
/// dates use their TOML text.
pub fn load_values(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path).map_err(|e| Error::io_read(path, e))?;
    let table: toml::Table = toml::from_str(&content).map_err(|e: toml::de::Error| {
        Error::invalid_value(path.display().to_string(), e.message().to_string())
    })?;

    let mut values = BTreeMap::new();
    flatten_into(&mut values, "", &table)?;
    Ok(values)
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, table: &toml::Table) -> Result<()> {
    for (key, value) in table {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::String(s) => {
                out.insert(name, s.clone());
            }
            toml::Value::Table(nested) => flatten_into(out, &name, nested)?,
            toml::Value::Array(_) => {
                return Err(Error::invalid_value(name, "arrays are not supported as values"));
            }
            other => {
                out.insert(name, other.to_string());
            }
        }
    }
    Ok(())
}
