//! Core types for rule documents.
//!
//! A rule document is a markdown file with an H1 title, a fixed set of H2
//! sections, and tiered rules identified as `RULE-NNN`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

// ─────────────────────────────────────────────────────────────────
// Tier
// ─────────────────────────────────────────────────────────────────

/// MoSCoW priority of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Must,
    Should,
    Could,
}

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[Tier::Must, Tier::Should, Tier::Could]
    }

    /// Heading text used for this tier inside the Rules section.
    pub fn heading(&self) -> &'static str {
        match self {
            Tier::Must => "Must Have",
            Tier::Should => "Should Have",
            Tier::Could => "Could Have",
        }
    }

    /// Tier implied by a rule number: 1-99 must, 101-199 should, 201-299 could.
    pub fn for_number(number: u16) -> Option<Tier> {
        match number {
            1..=99 => Some(Tier::Must),
            101..=199 => Some(Tier::Should),
            201..=299 => Some(Tier::Could),
            _ => None,
        }
    }

    /// Recognize a tier from heading text such as "🔴 Must Have (Critical)".
    pub fn from_heading(text: &str) -> Option<Tier> {
        let normalized = normalize_heading(text);
        Tier::all().iter().copied().find(|tier| {
            let name = tier.slug();
            normalized.contains(&format!("{} have", name))
                || normalized.split(' ').next() == Some(name)
        })
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Tier::Must => "must",
            Tier::Should => "should",
            Tier::Could => "could",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

// ─────────────────────────────────────────────────────────────────
// Rule identifiers
// ─────────────────────────────────────────────────────────────────

/// A well-formed rule identifier, `RULE-` followed by three digits in a tier range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u16);

impl RuleId {
    #[cfg(test)]
    pub fn number(&self) -> u16 {
        self.0
    }

    pub fn tier(&self) -> Tier {
        // Construction guarantees the number is inside a tier range.
        Tier::for_number(self.0).unwrap_or(Tier::Could)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RULE-{:03}", self.0)
    }
}

impl Serialize for RuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("RULE-")
            .ok_or_else(|| "identifier must start with uppercase 'RULE-'".to_string())?;
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err("identifier must end with exactly three digits".to_string());
        }
        let number: u16 = digits
            .parse()
            .map_err(|_| "identifier must end with exactly three digits".to_string())?;
        if Tier::for_number(number).is_none() {
            return Err(format!(
                "number {:03} is outside the tier ranges 001-099, 101-199, 201-299",
                number
            ));
        }
        Ok(RuleId(number))
    }
}

/// A rule definition found in the Rules section.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: RuleId,
    /// Tier heading the rule was listed under, if any
    pub declared_tier: Option<Tier>,
    pub text: String,
    pub line: usize,
}

impl Rule {
    /// Tier implied by the identifier number.
    pub fn tier(&self) -> Tier {
        self.id.tier()
    }
}

/// An identifier-like token (`RULE-…`) that does not follow the convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRuleId {
    pub token: String,
    pub reason: String,
    pub line: usize,
}

/// A well-formed identifier mentioned outside a rule definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMention {
    pub id: RuleId,
    pub line: usize,
}

// ─────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────

/// Sections with structured content in a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Context,
    CorePrinciples,
    Rules,
    Patterns,
    DecisionFramework,
    Exceptions,
    QualityGates,
    RelatedRules,
    References,
    TlDr,
}

impl SectionKind {
    /// All kinds in canonical document order.
    pub fn all() -> &'static [SectionKind] {
        &[
            SectionKind::Context,
            SectionKind::CorePrinciples,
            SectionKind::Rules,
            SectionKind::Patterns,
            SectionKind::DecisionFramework,
            SectionKind::Exceptions,
            SectionKind::QualityGates,
            SectionKind::RelatedRules,
            SectionKind::References,
            SectionKind::TlDr,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Context => "Context",
            SectionKind::CorePrinciples => "Core Principles",
            SectionKind::Rules => "Rules",
            SectionKind::Patterns => "Patterns & Anti-Patterns",
            SectionKind::DecisionFramework => "Decision Framework",
            SectionKind::Exceptions => "Exceptions",
            SectionKind::QualityGates => "Quality Gates",
            SectionKind::RelatedRules => "Related Rules",
            SectionKind::References => "References",
            SectionKind::TlDr => "TL;DR",
        }
    }

    /// Alternate headings accepted for this section.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            SectionKind::Patterns => &["Patterns", "Patterns and Anti-Patterns"],
            SectionKind::TlDr => &["TLDR", "Summary"],
            SectionKind::RelatedRules => &["Related"],
            _ => &[],
        }
    }

    pub fn from_heading(text: &str) -> Option<SectionKind> {
        let normalized = normalize_heading(text);
        SectionKind::all().iter().copied().find(|kind| {
            normalize_heading(kind.title()) == normalized
                || kind
                    .aliases()
                    .iter()
                    .any(|alias| normalize_heading(alias) == normalized)
        })
    }
}

/// Fold a heading into a comparable form.
///
/// Lowercases, treats `&` as "and", turns punctuation and emoji into spaces,
/// drops leading numbering, and collapses whitespace.
pub fn normalize_heading(text: &str) -> String {
    let folded: String = text
        .replace('&', " and ")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let mut words = folded.split_whitespace().peekable();
    while words
        .peek()
        .is_some_and(|w| w.chars().all(|c| c.is_ascii_digit()))
    {
        words.next();
    }
    words.collect::<Vec<_>>().join(" ")
}

/// One line of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    /// 1-based line number
    pub number: usize,
    pub text: String,
    /// Inside a fenced code block (fence lines included)
    pub in_code: bool,
}

/// An H2 section and the lines up to the next H2.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub heading: String,
    pub normalized: String,
    pub line: usize,
    #[serde(skip)]
    pub body: Vec<SourceLine>,
}

impl Section {
    /// Whether the body holds anything besides blank lines and sub-headings.
    pub fn has_content(&self) -> bool {
        self.body.iter().any(|l| {
            let t = l.text.trim();
            !t.is_empty() && (l.in_code || !t.starts_with('#'))
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Section content
// ─────────────────────────────────────────────────────────────────

/// Who and what a rule document applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextInfo {
    pub applies_to: Option<String>,
    pub level: Option<String>,
    pub audience: Option<String>,
}

/// A fenced code block from the Patterns section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSample {
    pub language: Option<String>,
    pub code: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Patterns {
    pub good: Vec<CodeSample>,
    pub bad: Vec<CodeSample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionEntry {
    pub reason: String,
    pub process: Option<String>,
}

/// A markdown link listed under Related Rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedRef {
    pub label: String,
    pub target: String,
    pub line: usize,
}

/// A parsed rule document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleDocument {
    pub title: Option<String>,
    pub sections: Vec<Section>,
    pub context: ContextInfo,
    pub principles: Vec<String>,
    pub rules: Vec<Rule>,
    pub patterns: Patterns,
    pub decision_framework: Vec<String>,
    pub exceptions: Vec<ExceptionEntry>,
    pub quality_gates: Vec<String>,
    pub related: Vec<RelatedRef>,
    pub malformed_ids: Vec<MalformedRuleId>,
    pub mentions: Vec<RuleMention>,
}
