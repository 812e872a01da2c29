//! Line-oriented markdown reader for rule documents.
//!
//! Only the structure the schema cares about is recognized: ATX headings,
//! list items, fenced code blocks, inline links and rule identifiers.
//! Everything inside a fenced code block is opaque.

use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use super::types::{
    normalize_heading, CodeSample, ContextInfo, ExceptionEntry, MalformedRuleId, Patterns,
    RelatedRef, Rule, RuleDocument, RuleId, RuleMention, Section, SectionKind, SourceLine, Tier,
};

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ {0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("valid regex"))
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^( *)(?:[-*+]|\d+[.)])\s+(?:\[[ xX]\]\s+)?(.*)$").expect("valid regex")
    })
}

fn rule_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\brule-[a-z]*\d[a-z0-9]*\b").expect("valid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[([^\]]+)\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#).expect("valid regex")
    })
}

fn link_target_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\]\([^)]*\)").expect("valid regex"))
}

fn context_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:[-+]\s+)?(applies\s+to|level|audience)\s*:\s*(.+?)\s*$")
            .expect("valid regex")
    })
}

/// Parse markdown text into a [`RuleDocument`].
///
/// Parsing never fails; anything unrecognized is simply not extracted and
/// left for the validator to report.
pub fn parse(text: &str) -> RuleDocument {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines = split_lines(text);
    let mut doc = RuleDocument::default();

    for line in &lines {
        if line.in_code {
            if let Some(section) = doc.sections.last_mut() {
                section.body.push(line.clone());
            }
            continue;
        }
        match heading(&line.text) {
            Some((1, title)) if doc.title.is_none() => {
                doc.title = Some(title.to_string());
            }
            Some((2, heading)) => {
                doc.sections.push(Section {
                    heading: heading.to_string(),
                    normalized: normalize_heading(heading),
                    line: line.number,
                    body: Vec::new(),
                });
            }
            _ => {
                if let Some(section) = doc.sections.last_mut() {
                    section.body.push(line.clone());
                }
            }
        }
    }

    let mut definition_lines = Vec::new();
    for section in &doc.sections {
        match SectionKind::from_heading(&section.heading) {
            Some(SectionKind::Context) => doc.context = extract_context(&section.body),
            Some(SectionKind::CorePrinciples) => doc.principles = list_items(&section.body),
            Some(SectionKind::Rules) => {
                let (rules, malformed) = extract_rules(&section.body);
                definition_lines.extend(rules.iter().map(|r| r.line));
                definition_lines.extend(malformed.iter().map(|m| m.line));
                doc.rules.extend(rules);
                doc.malformed_ids.extend(malformed);
            }
            Some(SectionKind::Patterns) => doc.patterns = extract_patterns(&section.body),
            Some(SectionKind::DecisionFramework) => {
                doc.decision_framework = list_items(&section.body)
            }
            Some(SectionKind::Exceptions) => doc.exceptions = extract_exceptions(&section.body),
            Some(SectionKind::QualityGates) => doc.quality_gates = list_items(&section.body),
            Some(SectionKind::RelatedRules) => doc.related = extract_links(&section.body),
            _ => {}
        }
    }

    scan_identifiers(&lines, &definition_lines, &mut doc);

    trace!(
        sections = doc.sections.len(),
        rules = doc.rules.len(),
        "Parsed document"
    );
    doc
}

/// Split text into numbered lines, marking fenced code blocks.
fn split_lines(text: &str) -> Vec<SourceLine> {
    let mut out = Vec::new();
    let mut open_fence: Option<Fence> = None;

    for (idx, raw) in text.lines().enumerate() {
        let text = raw.trim_end_matches('\r').to_string();
        let in_code = match open_fence {
            Some(fence) => {
                if fence.closed_by(&text) {
                    open_fence = None;
                }
                true
            }
            None => {
                open_fence = Fence::open(&text);
                open_fence.is_some()
            }
        };
        out.push(SourceLine {
            number: idx + 1,
            text,
            in_code,
        });
    }
    out
}

/// An open code fence: its character and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    /// Three or more backticks or tildes, indented by at most three spaces.
    fn open(line: &str) -> Option<Fence> {
        let trimmed = line.trim_start();
        if line.len() - trimmed.len() > 3 {
            return None;
        }
        let marker = trimmed.chars().next().filter(|c| matches!(*c, '`' | '~'))?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 || (marker == '`' && trimmed[len..].contains('`')) {
            return None;
        }
        Some(Fence { marker, len })
    }

    /// A closing fence uses the same character, is at least as long and
    /// carries no info string.
    fn closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        if line.len() - trimmed.len() > 3 {
            return false;
        }
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && trimmed[run..].trim().is_empty()
    }
}

fn heading(text: &str) -> Option<(usize, &str)> {
    let caps = heading_re().captures(text)?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str().trim();
    if title.is_empty() {
        return None;
    }
    Some((level, title))
}

/// Content of a list item indented by at most one space.
fn top_level_item(text: &str) -> Option<&str> {
    let caps = list_item_re().captures(text)?;
    if caps.get(1)?.as_str().len() > 1 {
        return None;
    }
    caps.get(2).map(|m| m.as_str().trim())
}

fn nested_item(text: &str) -> Option<&str> {
    let caps = list_item_re().captures(text)?;
    if caps.get(1)?.as_str().len() <= 1 {
        return None;
    }
    caps.get(2).map(|m| m.as_str().trim())
}

/// Remove bold/italic/code markers around a fragment.
fn strip_emphasis(text: &str) -> String {
    text.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .trim()
        .to_string()
}

fn list_items(body: &[SourceLine]) -> Vec<String> {
    body.iter()
        .filter(|l| !l.in_code)
        .filter_map(|l| top_level_item(&l.text))
        .map(strip_emphasis)
        .filter(|s| !s.is_empty())
        .collect()
}

fn extract_context(body: &[SourceLine]) -> ContextInfo {
    let mut info = ContextInfo::default();
    for line in body.iter().filter(|l| !l.in_code) {
        let plain = line.text.replace('*', "");
        let Some(caps) = context_field_re().captures(&plain) else {
            continue;
        };
        let value = caps[2].trim().to_string();
        match normalize_heading(&caps[1]).as_str() {
            "applies to" => info.applies_to.get_or_insert(value),
            "level" => info.level.get_or_insert(value),
            _ => info.audience.get_or_insert(value),
        };
    }
    info
}

/// Content after a leading rule token, with separators trimmed.
fn rule_text(after_token: &str) -> String {
    after_token
        .trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, '*' | '_' | '`' | ':' | '-' | '—' | '–' | ')')
        })
        .trim_end_matches(|c: char| c.is_whitespace() || c == '*')
        .to_string()
}

/// Leading rule token of a heading or list item, with the text after it.
fn leading_token(content: &str) -> Option<(String, String)> {
    let stripped = content.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '*' | '_' | '`' | '[' | '(')
    });
    let m = rule_token_re().find(stripped)?;
    if m.start() != 0 {
        return None;
    }
    Some((m.as_str().to_string(), rule_text(&stripped[m.end()..])))
}

fn extract_rules(body: &[SourceLine]) -> (Vec<Rule>, Vec<MalformedRuleId>) {
    let mut rules = Vec::new();
    let mut malformed = Vec::new();
    // (tier, heading level it was declared at)
    let mut current: Option<(Tier, usize)> = None;

    for line in body.iter().filter(|l| !l.in_code) {
        let content = match heading(&line.text) {
            Some((level, text)) => {
                if leading_token(text).is_none() {
                    if let Some(tier) = Tier::from_heading(text) {
                        current = Some((tier, level));
                    } else if current.is_some_and(|(_, tier_level)| level <= tier_level) {
                        current = None;
                    }
                    continue;
                }
                text
            }
            None => match top_level_item(&line.text) {
                Some(item) => item,
                None => continue,
            },
        };

        let Some((token, text)) = leading_token(content) else {
            continue;
        };
        match token.parse::<RuleId>() {
            Ok(id) => rules.push(Rule {
                id,
                declared_tier: current.map(|(tier, _)| tier),
                text,
                line: line.number,
            }),
            Err(reason) => malformed.push(MalformedRuleId {
                token,
                reason,
                line: line.number,
            }),
        }
    }
    (rules, malformed)
}

/// Record identifier tokens outside rule definitions as mentions or
/// malformed identifiers.
fn scan_identifiers(lines: &[SourceLine], definition_lines: &[usize], doc: &mut RuleDocument) {
    for line in lines.iter().filter(|l| !l.in_code) {
        let without_targets = link_target_re().replace_all(&line.text, "]");
        let mut tokens = rule_token_re().find_iter(&without_targets);
        if definition_lines.contains(&line.number) {
            tokens.next();
        }
        for token in tokens {
            match token.as_str().parse::<RuleId>() {
                Ok(id) => doc.mentions.push(RuleMention {
                    id,
                    line: line.number,
                }),
                Err(reason) => doc.malformed_ids.push(MalformedRuleId {
                    token: token.as_str().to_string(),
                    reason,
                    line: line.number,
                }),
            }
        }
    }
    doc.malformed_ids.sort_by_key(|m| m.line);
}

/// Classify a code sample by the text leading up to it: `Some(true)` for a
/// good example, `Some(false)` for an anti-pattern.
fn classify_sample(context: &str) -> Option<bool> {
    if context.contains('✅') {
        return Some(true);
    }
    if context.contains('❌') {
        return Some(false);
    }
    let words: Vec<&str> = context
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let has = |candidates: &[&str]| words.iter().any(|w| candidates.contains(w));
    if has(&["bad", "anti", "don't", "dont", "avoid", "wrong", "never"]) {
        Some(false)
    } else if has(&["good", "do", "correct", "prefer", "preferred", "recommended"]) {
        Some(true)
    } else {
        None
    }
}

fn extract_patterns(body: &[SourceLine]) -> Patterns {
    let mut patterns = Patterns::default();
    let mut context = String::new();
    let mut block: Option<(Fence, CodeSample)> = None;

    for line in body {
        if !line.in_code {
            if !line.text.trim().is_empty() {
                context = line.text.to_lowercase();
            }
            continue;
        }
        match block.take() {
            None => {
                if let Some(fence) = Fence::open(&line.text) {
                    let info = line.text.trim().trim_start_matches(fence.marker).trim();
                    let sample = CodeSample {
                        language: (!info.is_empty()).then(|| info.to_string()),
                        code: String::new(),
                        line: line.number,
                    };
                    block = Some((fence, sample));
                }
            }
            Some((fence, sample)) if fence.closed_by(&line.text) => {
                match classify_sample(&context) {
                    Some(true) => patterns.good.push(sample),
                    Some(false) => patterns.bad.push(sample),
                    None => {}
                }
            }
            Some((fence, mut sample)) => {
                if !sample.code.is_empty() {
                    sample.code.push('\n');
                }
                sample.code.push_str(&line.text);
                block = Some((fence, sample));
            }
        }
    }
    patterns
}

fn extract_exceptions(body: &[SourceLine]) -> Vec<ExceptionEntry> {
    let mut entries: Vec<ExceptionEntry> = Vec::new();
    for line in body.iter().filter(|l| !l.in_code) {
        if let Some(item) = top_level_item(&line.text) {
            let plain = strip_emphasis(item);
            let (reason, process) = split_process(&plain);
            let reason = strip_label(reason, "reason");
            if !reason.is_empty() {
                entries.push(ExceptionEntry { reason, process });
            }
        } else if let Some(item) = nested_item(&line.text) {
            let plain = strip_emphasis(item);
            if let (Some(entry), Some(process)) = (entries.last_mut(), label_value(&plain, "process"))
            {
                entry.process.get_or_insert(process);
            }
        }
    }
    entries
}

fn split_process(text: &str) -> (&str, Option<String>) {
    match text.to_ascii_lowercase().find("process:") {
        Some(idx) => {
            let reason = text[..idx].trim_end_matches(|c: char| {
                c.is_whitespace() || matches!(c, '.' | ';' | ',' | '-' | '—')
            });
            let process = text[idx + "process:".len()..].trim();
            (reason, (!process.is_empty()).then(|| process.to_string()))
        }
        None => (text, None),
    }
}

/// Value of a `Label: value` fragment, matching the label case-insensitively.
fn label_value(text: &str, label: &str) -> Option<String> {
    let head = text.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let value = text[label.len()..].trim_start().strip_prefix(':')?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn strip_label(text: &str, label: &str) -> String {
    label_value(text, label).unwrap_or_else(|| text.trim().to_string())
}

fn extract_links(body: &[SourceLine]) -> Vec<RelatedRef> {
    body.iter()
        .filter(|l| !l.in_code)
        .flat_map(|line| {
            link_re().captures_iter(&line.text).map(move |caps| RelatedRef {
                label: caps[1].trim().to_string(),
                target: caps[2].to_string(),
                line: line.number,
            })
        })
        .collect()
}
