//! Placeholder discovery and substitution.
//!
//! Placeholders are written `{{ name }}` or `{{ name | default text }}`.
//! Names follow `[A-Za-z_][A-Za-z0-9_.-]*`; whitespace inside the braces is
//! ignored. A template may declare its document kind on its first line with
//! `<!-- template: rule-document -->`; the directive is not rendered.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::schema::ProfileKind;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_.-]*)\s*(?:\|\s*(.*?))?\s*$").expect("valid regex")
    })
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*<!--\s*template\s*:\s*([A-Za-z_-]+)\s*-->\s*$").expect("valid regex")
    })
}

/// Where a template came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "path")]
pub enum Origin {
    /// Compiled into the binary
    Bundled,
    /// Found in the configured templates directory
    Directory(PathBuf),
    /// Loaded from an explicit path
    File(PathBuf),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Bundled => write!(f, "bundled"),
            Origin::Directory(path) | Origin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A distinct placeholder with its effective default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Line of first appearance in the template file
    pub line: usize,
}

impl Placeholder {
    pub fn required(&self) -> bool {
        self.default.is_none()
    }
}

/// Output of a successful render.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    /// Supplied values that matched no placeholder, sorted
    pub unused: Vec<String>,
}

enum Segment<'a> {
    Text(&'a str),
    Slot {
        name: &'a str,
        default: Option<&'a str>,
        line: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    /// Document kind declared by the first-line directive
    pub kind: Option<ProfileKind>,
    pub origin: Origin,
    body: String,
    /// Source lines removed before `body` (the directive)
    line_offset: usize,
}

impl Template {
    pub fn new(name: impl Into<String>, source: &str, origin: Origin) -> Self {
        let name = name.into();
        let first_line = source.lines().next().unwrap_or_default();

        let (kind, body, line_offset) = match directive_re().captures(first_line) {
            Some(caps) => {
                let kind = caps[1].parse::<ProfileKind>().ok();
                if kind.is_none() {
                    warn!(template = %name, kind = &caps[1], "Unknown template kind in directive");
                }
                let rest = source.split_once('\n').map_or("", |(_, rest)| rest);
                (kind, rest.to_string(), 1)
            }
            None => (None, source.to_string(), 0),
        };

        Self {
            name,
            kind,
            origin,
            body,
            line_offset,
        }
    }

    /// Template text with the kind directive removed.
    pub fn body(&self) -> &str {
        &self.body
    }

    fn segments(&self) -> Result<Vec<Segment<'_>>> {
        let mut segments = Vec::new();
        let mut rest = self.body.as_str();
        let mut consumed = 0;

        while let Some(open) = rest.find("{{") {
            let line = self.line_at(consumed + open);
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                return Err(self.syntax_error(line, "unterminated '{{'"));
            };
            let inner = &after_open[..close];
            if inner.contains('\n') || inner.contains("{{") {
                return Err(self.syntax_error(line, "unterminated '{{'"));
            }
            let Some(caps) = placeholder_re().captures(inner) else {
                return Err(self.syntax_error(
                    line,
                    &format!("invalid placeholder '{{{{{}}}}}'", inner),
                ));
            };

            if open > 0 {
                segments.push(Segment::Text(&rest[..open]));
            }
            segments.push(Segment::Slot {
                name: caps.get(1).map_or("", |m| m.as_str()),
                default: caps.get(2).map(|m| m.as_str()),
                line,
            });

            let advance = open + 2 + close + 2;
            consumed += advance;
            rest = &rest[advance..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest));
        }
        Ok(segments)
    }

    fn line_at(&self, offset: usize) -> usize {
        self.line_offset + self.body[..offset].matches('\n').count() + 1
    }

    fn syntax_error(&self, line: usize, message: &str) -> Error {
        Error::TemplateSyntax {
            template: self.name.clone(),
            line,
            message: message.to_string(),
        }
    }

    /// Distinct placeholders in order of first appearance.
    ///
    /// When a name appears both with and without a default, the first
    /// default seen applies to every occurrence.
    pub fn placeholders(&self) -> Result<Vec<Placeholder>> {
        let mut out: Vec<Placeholder> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for segment in self.segments()? {
            let Segment::Slot {
                name,
                default,
                line,
            } = segment
            else {
                continue;
            };
            match index.get(name) {
                Some(&i) => {
                    if out[i].default.is_none() {
                        out[i].default = default.map(str::to_string);
                    }
                }
                None => {
                    index.insert(name, out.len());
                    out.push(Placeholder {
                        name: name.to_string(),
                        default: default.map(str::to_string),
                        line,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Substitute every placeholder. Supplied values win over defaults.
    pub fn render(&self, values: &BTreeMap<String, String>) -> Result<Rendered> {
        let placeholders = self.placeholders()?;
        let defaults: HashMap<&str, Option<&str>> = placeholders
            .iter()
            .map(|p| (p.name.as_str(), p.default.as_deref()))
            .collect();

        let missing: BTreeSet<&str> = placeholders
            .iter()
            .filter(|p| p.required() && !values.contains_key(&p.name))
            .map(|p| p.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(Error::PlaceholdersMissing {
                template: self.name.clone(),
                names: missing.into_iter().map(str::to_string).collect(),
            });
        }

        let mut text = String::with_capacity(self.body.len());
        for segment in self.segments()? {
            match segment {
                Segment::Text(t) => text.push_str(t),
                Segment::Slot { name, .. } => {
                    let value = values
                        .get(name)
                        .map(String::as_str)
                        .or_else(|| defaults.get(name).copied().flatten())
                        .unwrap_or_default();
                    text.push_str(value);
                }
            }
        }

        let unused: Vec<String> = values
            .keys()
            .filter(|k| !defaults.contains_key(k.as_str()))
            .cloned()
            .collect();
        for name in &unused {
            warn!(template = %self.name, placeholder = %name, "Value does not match any placeholder");
        }

        debug!(
            template = %self.name,
            placeholders = placeholders.len(),
            supplied = values.len(),
            "Rendered template"
        );
        Ok(Rendered { text, unused })
    }
}
