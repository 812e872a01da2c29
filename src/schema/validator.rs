//! Schema validation of parsed documents.
//!
//! Validation is a pure function of the document, the profile and the
//! options. It reports every problem it finds rather than stopping at the
//! first one.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::debug;

use super::finding::{Finding, FindingKind, Report};
use super::profile::Profile;
use super::resolver::{ReferenceResolver, Resolution};
use crate::document::{RuleDocument, RuleId};

/// Toggles for the optional checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub check_section_order: bool,
    pub check_rule_references: bool,
    pub check_related_links: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_section_order: true,
            check_rule_references: true,
            check_related_links: true,
        }
    }
}

pub struct Validator<'a> {
    profile: Profile,
    options: ValidationOptions,
    resolver: Option<&'a dyn ReferenceResolver>,
}

impl<'a> Validator<'a> {
    pub fn new(profile: Profile, options: ValidationOptions) -> Self {
        Self {
            profile,
            options,
            resolver: None,
        }
    }

    /// Enable Related Rules link checks against `resolver`.
    pub fn with_resolver(mut self, resolver: &'a dyn ReferenceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Validate `doc`. `path` is used for link resolution and is recorded
    /// on the report.
    pub fn validate(&self, doc: &RuleDocument, path: Option<&Path>) -> Report {
        let mut findings = Vec::new();

        if doc.title.is_none() {
            findings.push(Finding::new(
                FindingKind::MissingTitle,
                "Document has no H1 title",
            ));
        }

        self.check_sections(doc, &mut findings);

        if self.profile.rule_ids {
            check_rule_ids(doc, self.options.check_rule_references, &mut findings);
        }

        if self.options.check_related_links {
            if let (Some(resolver), Some(path)) = (self.resolver, path) {
                check_links(doc, resolver, path, &mut findings);
            }
        }

        // Line-less findings first; ties keep detection order.
        findings.sort_by_key(|f| f.line.unwrap_or(0));

        debug!(
            profile = %self.profile.kind,
            findings = findings.len(),
            "Validated document"
        );

        Report {
            path: path.map(Path::to_path_buf),
            profile: self.profile.kind,
            findings,
        }
    }

    fn check_sections(&self, doc: &RuleDocument, findings: &mut Vec<Finding>) {
        // Lines at which each known section appears, keyed by profile index.
        let mut seen: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut order = Vec::new();
        for section in &doc.sections {
            if let Some(idx) = self.profile.section_index(&section.normalized) {
                let lines = seen.entry(idx).or_default();
                if lines.is_empty() {
                    order.push((idx, section.line));
                }
                lines.push(section.line);
            }
        }

        for (idx, spec) in self.profile.sections.iter().enumerate() {
            match seen.get(&idx) {
                None if spec.required => findings.push(Finding::new(
                    FindingKind::MissingSection,
                    format!("Missing required section '{}'", spec.title),
                )),
                Some(lines) if lines.len() > 1 => findings.push(
                    Finding::new(
                        FindingKind::DuplicateSection,
                        format!(
                            "Section '{}' appears {} times (lines {})",
                            spec.title,
                            lines.len(),
                            join_lines(lines)
                        ),
                    )
                    .at(lines[1]),
                ),
                _ => {}
            }
        }

        if self.options.check_section_order {
            let mut furthest: Option<usize> = None;
            for &(idx, line) in &order {
                match furthest {
                    Some(prev) if idx < prev => findings.push(
                        Finding::new(
                            FindingKind::SectionOrder,
                            format!(
                                "Section '{}' should come before '{}'",
                                self.profile.sections[idx].title,
                                self.profile.sections[prev].title
                            ),
                        )
                        .at(line),
                    ),
                    _ => furthest = Some(idx),
                }
            }
        }

        for section in &doc.sections {
            let Some(idx) = self.profile.section_index(&section.normalized) else {
                continue;
            };
            let spec = &self.profile.sections[idx];
            if spec.required && !section.has_content() {
                findings.push(
                    Finding::new(
                        FindingKind::EmptySection,
                        format!("Section '{}' has no content", spec.title),
                    )
                    .at(section.line),
                );
            }
        }
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_rule_ids(doc: &RuleDocument, check_references: bool, findings: &mut Vec<Finding>) {
    for malformed in &doc.malformed_ids {
        findings.push(
            Finding::new(
                FindingKind::MalformedRuleId,
                format!("Malformed rule identifier '{}': {}", malformed.token, malformed.reason),
            )
            .at(malformed.line),
        );
    }

    let mut by_id: BTreeMap<RuleId, Vec<usize>> = BTreeMap::new();
    for rule in &doc.rules {
        by_id.entry(rule.id).or_default().push(rule.line);
    }
    for (id, lines) in &by_id {
        if lines.len() > 1 {
            findings.push(
                Finding::new(
                    FindingKind::DuplicateRuleId,
                    format!(
                        "Duplicate rule identifier {} (lines {})",
                        id,
                        join_lines(lines)
                    ),
                )
                .at(lines[1]),
            );
        }
    }

    for rule in &doc.rules {
        match rule.declared_tier {
            Some(declared) if declared != rule.tier() => findings.push(
                Finding::new(
                    FindingKind::TierMismatch,
                    format!(
                        "{} is listed under '{}' but its number belongs to '{}'",
                        rule.id,
                        declared.heading(),
                        rule.tier().heading()
                    ),
                )
                .at(rule.line),
            ),
            None => findings.push(
                Finding::new(
                    FindingKind::UntieredRule,
                    format!(
                        "{} is not under a tier heading; expected '{}'",
                        rule.id,
                        rule.tier().heading()
                    ),
                )
                .at(rule.line),
            ),
            _ => {}
        }
    }

    if check_references {
        let mut reported = HashSet::new();
        for mention in &doc.mentions {
            if !by_id.contains_key(&mention.id) && reported.insert(mention.id) {
                findings.push(
                    Finding::new(
                        FindingKind::UnknownRuleReference,
                        format!("{} is referenced but not defined", mention.id),
                    )
                    .at(mention.line),
                );
            }
        }
    }
}

fn check_links(
    doc: &RuleDocument,
    resolver: &dyn ReferenceResolver,
    path: &Path,
    findings: &mut Vec<Finding>,
) {
    for link in &doc.related {
        let message = match resolver.resolve(path, &link.target) {
            Resolution::Resolved(_) | Resolution::Skipped => continue,
            Resolution::Missing(_) => {
                format!("Related link '{}' does not resolve to a file", link.target)
            }
            Resolution::OutsideRoot => format!(
                "Related link '{}' points outside the repository",
                link.target
            ),
        };
        findings.push(Finding::new(FindingKind::UnresolvedLink, message).at(link.line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse;
    use crate::schema::finding::Severity;
    use crate::schema::profile::ProfileKind;
    use crate::schema::resolver::MemoryResolver;

    const VALID: &str = r#"# Logging Rules

## Context

- **Applies to**: all services

## Core Principles

1. Logs are structured

## Rules

### Must Have

- **RULE-001**: Use structured fields

### Should Have

- **RULE-101**: Include a request id

### Could Have

- **RULE-201**: Sample debug logs

## Patterns & Anti-Patterns

✅ Good:

```rust
info!(user = %id, "Login");
```

## Decision Framework

1. RULE-001 beats convenience

## Quality Gates

- [ ] No println! in services

## Related Rules

- [Errors](./errors.md)
"#;

    fn validate(text: &str) -> Report {
        Validator::new(Profile::rule_document(), ValidationOptions::default())
            .validate(&parse(text), None)
    }

    fn kinds(report: &Report) -> Vec<FindingKind> {
        report.findings.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_valid_document_passes() {
        let report = validate(VALID);
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert!(report.passed(true));
    }

    #[test]
    fn test_duplicate_id_and_missing_gates_yield_exactly_two_findings() {
        let text = VALID
            .replace("**RULE-101**: Include a request id", "**RULE-001**: Include a request id")
            .replace("### Should Have\n\n", "")
            .replace("## Quality Gates\n\n- [ ] No println! in services\n\n", "");
        let report = validate(&text);

        assert_eq!(
            kinds(&report),
            vec![FindingKind::MissingSection, FindingKind::DuplicateRuleId]
        );
        assert!(report.findings[0].message.contains("Quality Gates"));
        assert!(report.findings[1].message.contains("RULE-001"));
        assert!(!report.passed(false));
    }

    #[test]
    fn test_every_missing_section_reported() {
        let report = validate("# Only a title\n\n## Rules\n\n### Must Have\n\n- RULE-001: x\n");
        let missing: Vec<&str> = report
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::MissingSection)
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(missing.len(), 5);
        assert!(missing[0].contains("'Context'"));
        assert!(missing[4].contains("'Quality Gates'"));
    }

    #[test]
    fn test_missing_title() {
        let report = validate(&VALID.replace("# Logging Rules\n", ""));
        assert_eq!(kinds(&report), vec![FindingKind::MissingTitle]);
    }

    #[test]
    fn test_duplicate_section() {
        let text = format!("{}\n## Context\n\nagain\n", VALID);
        let report = validate(&text);
        assert!(report.has(FindingKind::DuplicateSection));
        assert!(!report.has(FindingKind::MissingSection));
    }

    #[test]
    fn test_section_order_warning() {
        let text = VALID.replace(
            "## Context\n\n- **Applies to**: all services\n\n",
            "",
        ) + "\n## Context\n\n- **Applies to**: all services\n";
        let report = validate(&text);
        assert_eq!(kinds(&report), vec![FindingKind::SectionOrder]);
        assert_eq!(report.findings[0].severity, Severity::Warning);
        assert!(report.passed(false));
        assert!(!report.passed(true));

        let relaxed = Validator::new(
            Profile::rule_document(),
            ValidationOptions {
                check_section_order: false,
                ..Default::default()
            },
        )
        .validate(&parse(&text), None);
        assert!(relaxed.findings.is_empty());
    }

    #[test]
    fn test_empty_required_section() {
        let text = VALID.replace("1. Logs are structured\n", "");
        let report = validate(&text);
        assert_eq!(kinds(&report), vec![FindingKind::EmptySection]);
    }

    #[test]
    fn test_tier_mismatch_and_untiered() {
        let text = VALID
            .replace("**RULE-101**", "**RULE-050**")
            .replace("### Must Have\n\n", "");
        let report = validate(&text);
        assert_eq!(
            kinds(&report),
            vec![FindingKind::UntieredRule, FindingKind::TierMismatch]
        );
        assert!(report.findings[1].message.contains("'Should Have'"));
        assert!(report.findings[1].message.contains("'Must Have'"));
    }

    #[test]
    fn test_malformed_rule_id() {
        let text = VALID.replace("**RULE-201**", "**RULE-21**");
        let report = validate(&text);
        assert_eq!(kinds(&report), vec![FindingKind::MalformedRuleId]);
        assert!(report.findings[0].message.contains("RULE-21"));
    }

    #[test]
    fn test_unknown_reference_reported_once() {
        let text = format!("{}\n## TL;DR\n\nRULE-009 and RULE-009 again\n", VALID);
        let report = validate(&text);
        assert_eq!(kinds(&report), vec![FindingKind::UnknownRuleReference]);
    }

    #[test]
    fn test_feature_spec_skips_rule_checks() {
        let text = "# Export\n\n## Overview\n\nx\n\n## Requirements\n\n- RULE-1 style text\n\n## Acceptance Criteria\n\n- works\n";
        let report = Validator::new(ProfileKind::FeatureSpec.profile(), ValidationOptions::default())
            .validate(&parse(text), None);
        assert!(report.findings.is_empty(), "{:?}", report.findings);
    }

    #[test]
    fn test_related_links_resolved_through_resolver() {
        let doc = parse(VALID);
        let path = Path::new("/repo/rules/logging.md");

        let missing = MemoryResolver::new("/repo");
        let report = Validator::new(Profile::rule_document(), ValidationOptions::default())
            .with_resolver(&missing)
            .validate(&doc, Some(path));
        assert_eq!(kinds(&report), vec![FindingKind::UnresolvedLink]);
        assert_eq!(report.path.as_deref(), Some(path));

        let present = MemoryResolver::new("/repo").with_file("rules/errors.md");
        let report = Validator::new(Profile::rule_document(), ValidationOptions::default())
            .with_resolver(&present)
            .validate(&doc, Some(path));
        assert!(report.findings.is_empty());
    }
}
