//! Repository lint pass: find documents, pick a profile for each, validate.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, info, warn};

use super::report::Summary;
use crate::config::RulekitConfig;
use crate::document;
use crate::error::{Error, Result};
use crate::schema::{FsResolver, ProfileKind, Report, ValidationOptions, Validator};

/// A compiled `[[lint.targets]]` entry.
#[derive(Debug, Clone)]
struct Target {
    pattern: Pattern,
    profile: ProfileKind,
}

pub struct LintRunner {
    root: PathBuf,
    targets: Vec<Target>,
    exclude: Vec<Pattern>,
    default_profile: ProfileKind,
    profile_override: Option<ProfileKind>,
    strict: bool,
    options: ValidationOptions,
    resolver: FsResolver,
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

impl LintRunner {
    pub fn from_config(
        config: &RulekitConfig,
        profile_override: Option<ProfileKind>,
        strict: bool,
    ) -> Result<Self> {
        let resolver = FsResolver::new(config.root());
        let root = resolver.root().to_path_buf();

        let targets = config
            .lint
            .targets
            .iter()
            .map(|t| {
                Ok(Target {
                    pattern: compile(&t.pattern)?,
                    profile: t.profile.parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let exclude = config
            .lint
            .exclude
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root,
            targets,
            exclude,
            default_profile: config.default_profile()?,
            profile_override,
            strict: strict || config.lint.strict,
            options: config.validation_options(),
            resolver,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the root when it lies inside it.
    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let relative = self.relative(path);
        self.exclude.iter().any(|p| p.matches_path(relative))
    }

    /// Profile for a file: the override, else the first matching target,
    /// else the default profile.
    pub fn profile_for(&self, path: &Path) -> ProfileKind {
        if let Some(profile) = self.profile_override {
            return profile;
        }
        let relative = self.relative(path);
        self.targets
            .iter()
            .find(|t| t.pattern.matches_path(relative))
            .map(|t| t.profile)
            .unwrap_or(self.default_profile)
    }

    /// Expand explicit paths (or the configured targets when `paths` is
    /// empty) into a sorted, de-duplicated list of canonical file paths.
    pub fn discover(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();

        if paths.is_empty() {
            for target in &self.targets {
                let pattern = format!(
                    "{}/{}",
                    Pattern::escape(&self.root.to_string_lossy()),
                    target.pattern.as_str()
                );
                self.collect_glob(&pattern, &mut found)?;
            }
        } else {
            for path in paths {
                if path.is_dir() {
                    let dir = fs::canonicalize(path).map_err(|e| Error::io_read(path, e))?;
                    let pattern = format!("{}/**/*.md", Pattern::escape(&dir.to_string_lossy()));
                    self.collect_glob(&pattern, &mut found)?;
                } else if path.is_file() {
                    let file = fs::canonicalize(path).map_err(|e| Error::io_read(path, e))?;
                    if !self.is_excluded(&file) {
                        found.insert(file);
                    }
                } else {
                    return Err(Error::io_read(
                        path,
                        io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
                    ));
                }
            }
        }

        if found.is_empty() {
            let searched = if paths.is_empty() {
                self.targets
                    .iter()
                    .map(|t| t.pattern.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(Error::NoDocuments { searched });
        }

        debug!(count = found.len(), "Discovered documents");
        Ok(found.into_iter().collect())
    }

    fn collect_glob(&self, pattern: &str, found: &mut BTreeSet<PathBuf>) -> Result<()> {
        let entries = glob::glob(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    let path = fs::canonicalize(&path).unwrap_or(path);
                    if self.is_excluded(&path) {
                        debug!(path = %path.display(), "Excluded");
                    } else {
                        found.insert(path);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable path"),
            }
        }
        Ok(())
    }

    /// Parse and validate a single file.
    pub fn check_file(&self, path: &Path) -> Result<Report> {
        let profile = self.profile_for(path);
        let doc = document::load(path)?;

        let validator = Validator::new(profile.profile(), self.options).with_resolver(&self.resolver);
        let mut report = validator.validate(&doc, Some(path));
        report.path = Some(self.relative(path).to_path_buf());

        debug!(
            path = %path.display(),
            profile = %profile,
            findings = report.findings.len(),
            "Checked document"
        );
        Ok(report)
    }

    pub fn run(&self, paths: &[PathBuf]) -> Result<Summary> {
        let files = self.discover(paths)?;
        let reports = files
            .iter()
            .map(|f| self.check_file(f))
            .collect::<Result<Vec<_>>>()?;

        let summary = Summary::new(reports, self.strict);
        info!(
            checked = summary.checked,
            failed = summary.failed,
            errors = summary.errors,
            warnings = summary.warnings,
            "Lint finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LintTarget;
    use crate::error::ErrorCode;
    use crate::schema::finding::FindingKind;
    use tempfile::TempDir;

    const GOOD_RULE: &str = "# Good\n\n## Context\n\n- Applies to: all\n\n## Core Principles\n\n1. One\n\n## Rules\n\n### Must Have\n\n- RULE-001: one\n\n## Patterns & Anti-Patterns\n\nSee above.\n\n## Decision Framework\n\n1. RULE-001 first\n\n## Quality Gates\n\n- [ ] done\n";
    const GOOD_SPEC: &str = "# Feature\n\n## Overview\n\nx\n\n## Requirements\n\n- y\n\n## Acceptance Criteria\n\n- z\n";

    struct Repo {
        dir: TempDir,
    }

    impl Repo {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn config(&self) -> RulekitConfig {
            let mut config = RulekitConfig::default();
            config.project.root = self.dir.path().to_string_lossy().into_owned();
            config
        }

        fn runner(&self) -> LintRunner {
            LintRunner::from_config(&self.config(), None, false).unwrap()
        }
    }

    fn names(summary: &Summary) -> Vec<String> {
        summary
            .reports
            .iter()
            .map(|r| r.path.as_ref().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_configured_targets_pick_profiles() {
        let repo = Repo::new();
        repo.write("rules/b.md", GOOD_RULE);
        repo.write("rules/nested/a.md", GOOD_RULE);
        repo.write("specs/export.md", GOOD_SPEC);
        repo.write("README.md", "# Not linted\n");

        let summary = repo.runner().run(&[]).unwrap();
        assert_eq!(names(&summary), vec!["rules/b.md", "rules/nested/a.md", "specs/export.md"]);
        assert_eq!(summary.reports[2].profile, ProfileKind::FeatureSpec);
        assert!(summary.passed(), "{:?}", summary.reports);
    }

    #[test]
    fn test_exclude_and_dedupe() {
        let repo = Repo::new();
        let a = repo.write("rules/a.md", GOOD_RULE);
        repo.write("rules/drafts/wip.md", "# WIP\n");

        let mut config = repo.config();
        config.lint.exclude = vec!["rules/drafts/**".to_string()];
        let runner = LintRunner::from_config(&config, None, false).unwrap();

        let files = runner
            .discover(&[repo.dir.path().join("rules"), a.clone(), a])
            .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("rules/a.md"));
    }

    #[test]
    fn test_profile_override_and_default() {
        let repo = Repo::new();
        let other = repo.write("guides/x.md", GOOD_SPEC);

        let runner = repo.runner();
        assert_eq!(runner.profile_for(&runner.root().join("guides/x.md")), ProfileKind::RuleDocument);

        let runner = LintRunner::from_config(&repo.config(), Some(ProfileKind::FeatureSpec), false).unwrap();
        let summary = runner.run(&[other]).unwrap();
        assert!(summary.passed());
    }

    #[test]
    fn test_failing_document_and_strict_mode() {
        let repo = Repo::new();
        let path = repo.write(
            "rules/bad.md",
            &GOOD_RULE.replace("### Must Have\n\n", "").replace("## Quality Gates\n\n- [ ] done\n", ""),
        );

        let summary = repo.runner().run(&[path.clone()]).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(summary.reports[0].has(FindingKind::MissingSection));
        assert!(summary.reports[0].has(FindingKind::UntieredRule));

        let warn_only = repo.write("rules/warn.md", &GOOD_RULE.replace("### Must Have\n\n", ""));
        assert!(repo.runner().run(&[warn_only.clone()]).unwrap().passed());
        let strict = LintRunner::from_config(&repo.config(), None, true).unwrap();
        assert!(!strict.run(&[warn_only]).unwrap().passed());
    }

    #[test]
    fn test_related_links_checked_against_root() {
        let repo = Repo::new();
        repo.write("rules/logging.md", GOOD_RULE);
        let path = repo.write(
            "rules/errors.md",
            &format!("{}\n## Related Rules\n\n- [Logging](./logging.md)\n- [Gone](./gone.md)\n- [Web](https://example.com)\n", GOOD_RULE),
        );

        let summary = repo.runner().run(&[path]).unwrap();
        let findings = &summary.reports[0].findings;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnresolvedLink);
        assert!(findings[0].message.contains("./gone.md"));
    }

    #[test]
    fn test_no_documents() {
        let repo = Repo::new();
        let err = repo.runner().run(&[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoDocuments);
        assert!(err.to_string().contains("rules/**/*.md"));
    }

    #[test]
    fn test_missing_path_and_bad_encoding() {
        let repo = Repo::new();
        let err = repo.runner().run(&[repo.dir.path().join("nope.md")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IoNotFound);

        let path = repo.dir.path().join("latin1.md");
        fs::write(&path, [b'#', b' ', 0xe9, b'\n']).unwrap();
        let err = repo.runner().run(&[path]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DocumentEncoding);
    }

    #[test]
    fn test_invalid_target_pattern() {
        let repo = Repo::new();
        let mut config = repo.config();
        config.lint.targets = vec![LintTarget {
            pattern: "rules/[".into(),
            profile: "rule-document".into(),
        }];
        let err = LintRunner::from_config(&config, None, false).err().unwrap();
        assert_eq!(err.code(), ErrorCode::InvalidPattern);
    }
}
