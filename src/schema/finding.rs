//! Findings and per-document reports.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::profile::ProfileKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What kind of authoring problem a finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    MissingTitle,
    MissingSection,
    DuplicateSection,
    SectionOrder,
    EmptySection,
    MalformedRuleId,
    DuplicateRuleId,
    TierMismatch,
    UntieredRule,
    UnknownRuleReference,
    UnresolvedLink,
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::SectionOrder
            | FindingKind::EmptySection
            | FindingKind::UntieredRule
            | FindingKind::UnknownRuleReference => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::MissingTitle => "missing-title",
            FindingKind::MissingSection => "missing-section",
            FindingKind::DuplicateSection => "duplicate-section",
            FindingKind::SectionOrder => "section-order",
            FindingKind::EmptySection => "empty-section",
            FindingKind::MalformedRuleId => "malformed-rule-id",
            FindingKind::DuplicateRuleId => "duplicate-rule-id",
            FindingKind::TierMismatch => "tier-mismatch",
            FindingKind::UntieredRule => "untiered-rule",
            FindingKind::UnknownRuleReference => "unknown-rule-reference",
            FindingKind::UnresolvedLink => "unresolved-link",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            line: None,
        }
    }

    pub fn at(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Validation outcome for one document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub profile: ProfileKind,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// No errors, and in strict mode no warnings either.
    pub fn passed(&self, strict: bool) -> bool {
        if strict {
            self.findings.is_empty()
        } else {
            self.errors() == 0
        }
    }

    #[cfg(test)]
    pub fn has(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }
}
