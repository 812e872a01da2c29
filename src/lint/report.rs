//! Text and JSON renderings of a lint run.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::{Report, Severity};

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::invalid_value(s, "output format must be text or json")),
        }
    }
}

/// Aggregate result of a lint run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub checked: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub strict: bool,
    pub reports: Vec<Report>,
}

impl Summary {
    pub fn new(reports: Vec<Report>, strict: bool) -> Self {
        Self {
            checked: reports.len(),
            failed: reports.iter().filter(|r| !r.passed(strict)).count(),
            errors: reports.iter().map(Report::errors).sum(),
            warnings: reports.iter().map(Report::warnings).sum(),
            strict,
            reports,
        }
    }

    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, color: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }
}

/// Human-readable report, one block per document.
pub fn render_text(summary: &Summary, color: bool) -> String {
    let palette = Palette { enabled: color };
    let mut out = String::new();

    for report in &summary.reports {
        let path = report
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<input>".to_string());

        if report.findings.is_empty() {
            let _ = writeln!(out, "{} {}", palette.paint(GREEN, "ok"), path);
            continue;
        }

        let status = if report.passed(summary.strict) {
            palette.paint(YELLOW, "warn")
        } else {
            palette.paint(RED, "FAIL")
        };
        let _ = writeln!(
            out,
            "{} {} ({})",
            status,
            palette.paint(BOLD, &path),
            report.profile
        );

        for finding in &report.findings {
            let location = finding
                .line
                .map(|l| format!("{}:{}", path, l))
                .unwrap_or_else(|| path.clone());
            let severity = match finding.severity {
                Severity::Error => palette.paint(RED, "error"),
                Severity::Warning => palette.paint(YELLOW, "warning"),
            };
            let _ = writeln!(
                out,
                "  {}[{}] {}: {}",
                severity, finding.kind, location, finding.message
            );
        }
    }

    let totals = format!(
        "Checked {} document(s): {} failed, {} error(s), {} warning(s)",
        summary.checked, summary.failed, summary.errors, summary.warnings
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        palette.paint(if summary.passed() { GREEN } else { RED }, &totals)
    );
    out
}

pub fn render_json(summary: &Summary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
