//! Schema profiles: which sections a document type needs and in what order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::{normalize_heading, SectionKind};
use crate::error::Error;

/// Built-in document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    /// A tiered rules document under `rules/`
    RuleDocument,
    /// A feature specification produced from the feature-spec template
    FeatureSpec,
}

impl ProfileKind {
    pub fn all() -> &'static [ProfileKind] {
        &[ProfileKind::RuleDocument, ProfileKind::FeatureSpec]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ProfileKind::RuleDocument => "rule-document",
            ProfileKind::FeatureSpec => "feature-spec",
        }
    }

    pub fn profile(&self) -> Profile {
        match self {
            ProfileKind::RuleDocument => Profile::rule_document(),
            ProfileKind::FeatureSpec => Profile::feature_spec(),
        }
    }

    fn available() -> String {
        ProfileKind::all()
            .iter()
            .map(|p| p.slug())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProfileKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "rule-document" | "rule" | "rules" => Ok(ProfileKind::RuleDocument),
            "feature-spec" | "feature" | "spec" => Ok(ProfileKind::FeatureSpec),
            _ => Err(Error::UnknownProfile {
                name: s.to_string(),
                available: ProfileKind::available(),
            }),
        }
    }
}

/// One expected section.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub title: String,
    pub required: bool,
    /// Normalized forms accepted for this section, title first
    matches: Vec<String>,
}

impl SectionSpec {
    pub fn new(title: &str, required: bool, aliases: &[&str]) -> Self {
        let mut matches = vec![normalize_heading(title)];
        matches.extend(aliases.iter().map(|a| normalize_heading(a)));
        Self {
            title: title.to_string(),
            required,
            matches,
        }
    }

    pub fn matches(&self, normalized: &str) -> bool {
        self.matches.iter().any(|m| m == normalized)
    }
}

/// The schema a document is validated against.
#[derive(Debug, Clone)]
pub struct Profile {
    pub kind: ProfileKind,
    /// Sections in canonical order
    pub sections: Vec<SectionSpec>,
    /// Whether `RULE-NNN` identifier checks apply
    pub rule_ids: bool,
}

impl Profile {
    /// Context, Core Principles, Rules, Patterns & Anti-Patterns, Decision
    /// Framework and Quality Gates are required; the rest are optional.
    pub fn rule_document() -> Self {
        let sections = SectionKind::all()
            .iter()
            .map(|kind| {
                let required = matches!(
                    kind,
                    SectionKind::Context
                        | SectionKind::CorePrinciples
                        | SectionKind::Rules
                        | SectionKind::Patterns
                        | SectionKind::DecisionFramework
                        | SectionKind::QualityGates
                );
                SectionSpec::new(kind.title(), required, kind.aliases())
            })
            .collect();

        Self {
            kind: ProfileKind::RuleDocument,
            sections,
            rule_ids: true,
        }
    }

    pub fn feature_spec() -> Self {
        Self {
            kind: ProfileKind::FeatureSpec,
            sections: vec![
                SectionSpec::new("Overview", true, &["Summary"]),
                SectionSpec::new("Goals", false, &[]),
                SectionSpec::new("Non-Goals", false, &["Out of Scope"]),
                SectionSpec::new("User Stories", false, &[]),
                SectionSpec::new("Requirements", true, &["Functional Requirements"]),
                SectionSpec::new("Acceptance Criteria", true, &[]),
                SectionSpec::new("Open Questions", false, &[]),
            ],
            rule_ids: false,
        }
    }

    /// Index of the section spec matching a normalized heading.
    pub fn section_index(&self, normalized: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.matches(normalized))
    }

    #[cfg(test)]
    pub fn required_sections(&self) -> impl Iterator<Item = &SectionSpec> {
        self.sections.iter().filter(|s| s.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_document_required_sections() {
        let profile = Profile::rule_document();
        let required: Vec<&str> = profile.required_sections().map(|s| s.title.as_str()).collect();
        assert_eq!(
            required,
            vec![
                "Context",
                "Core Principles",
                "Rules",
                "Patterns & Anti-Patterns",
                "Decision Framework",
                "Quality Gates",
            ]
        );
        assert!(profile.rule_ids);
    }

    #[test]
    fn test_section_index_uses_aliases() {
        let profile = Profile::rule_document();
        let patterns = profile.section_index(&normalize_heading("Patterns and Anti-patterns"));
        assert_eq!(patterns, Some(3));
        assert_eq!(profile.section_index("tldr"), Some(9));
        assert_eq!(profile.section_index("appendix"), None);
    }

    #[test]
    fn test_profile_kind_from_str() {
        assert_eq!("rule-document".parse::<ProfileKind>().unwrap(), ProfileKind::RuleDocument);
        assert_eq!("Feature_Spec".parse::<ProfileKind>().unwrap(), ProfileKind::FeatureSpec);

        let err = "adr".parse::<ProfileKind>().unwrap_err();
        assert!(err.to_string().contains("rule-document, feature-spec"));
    }

    #[test]
    fn test_feature_spec_has_no_rule_ids() {
        let profile = ProfileKind::FeatureSpec.profile();
        assert!(!profile.rule_ids);
        assert_eq!(profile.required_sections().count(), 3);
    }
}
