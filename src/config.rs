//! Configuration for rulekit
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (RULEKIT_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::lint::OutputFormat;
use crate::schema::{ProfileKind, ValidationOptions};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulekitConfig {
    /// Repository layout
    pub project: ProjectSettings,

    /// What `check` lints and how strictly
    pub lint: LintSettings,

    /// Template lookup
    pub templates: TemplateSettings,

    /// Report rendering
    pub output: OutputSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// File the configuration was loaded from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Repository root; lint targets and Related Rules links resolve against it
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintSettings {
    /// Profile for files no target matches
    pub default_profile: String,

    /// Glob patterns of paths to skip
    pub exclude: Vec<String>,

    /// Treat warnings as failures
    pub strict: bool,

    pub check_section_order: bool,
    pub check_rule_references: bool,
    pub check_related_links: bool,

    /// Files to lint when `check` is given no paths
    pub targets: Vec<LintTarget>,
}

/// A glob pattern, relative to the project root, and the profile for its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintTarget {
    pub pattern: String,
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory whose `*.md` files add to or override the bundled templates
    pub dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// text or json
    pub format: String,

    /// Colorize text reports
    pub color: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (unset = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// ─────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
        }
    }
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            default_profile: ProfileKind::RuleDocument.slug().to_string(),
            exclude: Vec::new(),
            strict: false,
            check_section_order: true,
            check_rule_references: true,
            check_related_links: true,
            targets: vec![
                LintTarget {
                    pattern: "rules/**/*.md".to_string(),
                    profile: ProfileKind::RuleDocument.slug().to_string(),
                },
                LintTarget {
                    pattern: "specs/**/*.md".to_string(),
                    profile: ProfileKind::FeatureSpec.slug().to_string(),
                },
            ],
        }
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            dir: "templates".to_string(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            color: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_file_size_mb: 10,
            max_files: 3,
            json_format: false,
        }
    }
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl RulekitConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io_read(path, e))?;
        let mut config: Self = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from("rulekit.toml"),
            PathBuf::from(".rulekit.toml"),
            dirs::config_dir()
                .map(|p| p.join("rulekit").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".rulekit").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `RULEKIT_*` overrides using `lookup` to read variables.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("RULEKIT_ROOT") {
            self.project.root = val;
        }
        if let Some(val) = lookup("RULEKIT_STRICT") {
            if let Some(b) = parse_bool(&val) {
                self.lint.strict = b;
            }
        }
        if let Some(val) = lookup("RULEKIT_DEFAULT_PROFILE") {
            self.lint.default_profile = val;
        }
        if let Some(val) = lookup("RULEKIT_TEMPLATES_DIR") {
            self.templates.dir = val;
        }
        if let Some(val) = lookup("RULEKIT_FORMAT") {
            self.output.format = val;
        }
        if let Some(val) = lookup("RULEKIT_COLOR") {
            if let Some(b) = parse_bool(&val) {
                self.output.color = b;
            }
        }
        if let Some(val) = lookup("RULEKIT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("RULEKIT_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("RULEKIT_LOG_JSON") {
            if let Some(b) = parse_bool(&val) {
                self.logging.json_format = b;
            }
        }
    }

    /// Expand ~ and environment variables in paths
    fn expand_paths(&mut self) {
        self.project.root = expand_path(&self.project.root);
        self.templates.dir = expand_path(&self.templates.dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.project.root.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "project.root",
                "project.root cannot be empty",
            ));
        }

        check_profile("lint.default_profile", &self.lint.default_profile)?;

        for (i, target) in self.lint.targets.iter().enumerate() {
            let field = format!("lint.targets[{}]", i);
            check_pattern(&format!("{}.pattern", field), &target.pattern)?;
            check_profile(&format!("{}.profile", field), &target.profile)?;
        }
        for pattern in &self.lint.exclude {
            check_pattern("lint.exclude", pattern)?;
        }

        if self.output.format.parse::<OutputFormat>().is_err() {
            return Err(Error::config_field_invalid(
                "output.format",
                format!(
                    "Invalid output format '{}'. Must be one of: text, json",
                    self.output.format
                ),
            ));
        }

        if !VALID_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    VALID_LEVELS.join(", ")
                ),
            ));
        }

        if self.logging.max_files == 0 {
            return Err(Error::config_field_invalid(
                "logging.max_files",
                "logging.max_files must be at least 1",
            ));
        }

        Ok(())
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.project.root)
    }

    /// Templates directory, resolved against the project root when relative.
    pub fn templates_dir(&self) -> PathBuf {
        let dir = PathBuf::from(&self.templates.dir);
        if dir.is_absolute() {
            dir
        } else {
            self.root().join(dir)
        }
    }

    pub fn default_profile(&self) -> Result<ProfileKind> {
        self.lint.default_profile.parse()
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.output.format.parse()
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            check_section_order: self.lint.check_section_order,
            check_rule_references: self.lint.check_rule_references,
            check_related_links: self.lint.check_related_links,
        }
    }

    /// Serialize the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn check_profile(field: &str, name: &str) -> Result<()> {
    name.parse::<ProfileKind>()
        .map(|_| ())
        .map_err(|e| Error::config_field_invalid(field, e.to_string()))
}

fn check_pattern(field: &str, pattern: &str) -> Result<()> {
    glob::Pattern::new(pattern).map(|_| ()).map_err(|e| {
        Error::config_field_invalid(field, format!("Invalid glob pattern '{}': {}", pattern, e))
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Write a commented default configuration file and return its path.
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| PathBuf::from("rulekit.toml"));

    if config_path.exists() && !force {
        return Err(Error::OutputExists { path: config_path });
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io_write(parent, e))?;
    }

    fs::write(&config_path, generate_default_config())
        .map_err(|e| Error::io_write(&config_path, e))?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# rulekit configuration

[project]
# Repository root. Lint targets and Related Rules links resolve against it.
root = "."

[lint]
# Profile for files that match no target: rule-document or feature-spec
default_profile = "rule-document"

# Glob patterns of paths to skip
exclude = []

# Fail on warnings as well as errors
strict = false

check_section_order = true
check_rule_references = true
check_related_links = true

# Files checked when `rulekit check` is run without paths
[[lint.targets]]
pattern = "rules/**/*.md"
profile = "rule-document"

[[lint.targets]]
pattern = "specs/**/*.md"
profile = "feature-spec"

[templates]
# Markdown files here add to or override the bundled templates
dir = "templates"

[output]
# text or json
format = "text"
color = true

[logging]
# trace, debug, info, warn, error
level = "warn"

# Log file path (optional)
# file = "~/.rulekit/logs/rulekit.log"

max_file_size_mb = 10
max_files = 3
json_format = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RulekitConfig::default();
        assert_eq!(config.project.root, ".");
        assert_eq!(config.lint.default_profile, "rule-document");
        assert_eq!(config.lint.targets.len(), 2);
        assert_eq!(config.templates.dir, "templates");
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        let env: HashMap<&str, &str> = [
            ("RULEKIT_ROOT", "/repo"),
            ("RULEKIT_STRICT", "true"),
            ("RULEKIT_FORMAT", "json"),
            ("RULEKIT_COLOR", "0"),
            ("RULEKIT_LOG_LEVEL", "debug"),
            ("RULEKIT_LOG_JSON", "yes"),
            ("RULEKIT_DEFAULT_PROFILE", "feature-spec"),
        ]
        .into_iter()
        .collect();

        let mut config = RulekitConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.project.root, "/repo");
        assert!(config.lint.strict);
        assert_eq!(config.output.format, "json");
        assert!(!config.output.color);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.default_profile().unwrap(), ProfileKind::FeatureSpec);
    }

    #[test]
    fn test_env_override_ignores_bad_bools() {
        let mut config = RulekitConfig::default();
        config.apply_overrides_from(|key| (key == "RULEKIT_STRICT").then(|| "maybe".to_string()));
        assert!(!config.lint.strict);
    }

    #[test]
    fn test_validation_unknown_profile() {
        let mut config = RulekitConfig::default();
        config.lint.default_profile = "adr".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigValidation);

        let mut config = RulekitConfig::default();
        config.lint.targets[1].profile = "nope".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_glob() {
        let mut config = RulekitConfig::default();
        config.lint.exclude.push("rules/[".to_string());
        match config.validate().unwrap_err() {
            Error::ConfigValidation { field, .. } => {
                assert_eq!(field.as_deref(), Some("lint.exclude"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validation_invalid_format_and_level() {
        let mut config = RulekitConfig::default();
        config.output.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = RulekitConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = RulekitConfig::default();
        config.logging.file = Some("~/logs/rulekit.log".to_string());
        config.expand_paths();
        assert!(!config.logging.file.unwrap().contains('~'));
    }

    #[test]
    fn test_templates_dir_relative_to_root() {
        let mut config = RulekitConfig::default();
        config.project.root = "/repo".to_string();
        assert_eq!(config.templates_dir(), PathBuf::from("/repo/templates"));

        config.templates.dir = "/shared/templates".to_string();
        assert_eq!(config.templates_dir(), PathBuf::from("/shared/templates"));
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[project]
root = "docs"

[lint]
strict = true
exclude = ["rules/drafts/**"]
check_related_links = false

[[lint.targets]]
pattern = "guides/*.md"
profile = "rule"

[output]
format = "json"
"#;

        let config: RulekitConfig = toml::from_str(config_str).unwrap();
        assert_eq!(config.project.root, "docs");
        assert!(config.lint.strict);
        assert_eq!(config.lint.exclude, vec!["rules/drafts/**"]);
        assert_eq!(
            config.lint.targets,
            vec![LintTarget {
                pattern: "guides/*.md".into(),
                profile: "rule".into()
            }]
        );
        assert!(!config.validation_options().check_related_links);
        assert_eq!(config.output_format().unwrap(), OutputFormat::Json);
        assert_eq!(config.templates.dir, "templates");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: RulekitConfig = toml::from_str(&generate_default_config()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.lint.targets, RulekitConfig::default().lint.targets);
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/rulekit.toml");
        let path_str = path.to_str().unwrap();

        assert_eq!(init_config(Some(path_str), false).unwrap(), path);
        let err = init_config(Some(path_str), false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutputExists);
        assert!(init_config(Some(path_str), true).is_ok());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let err = RulekitConfig::load(Some("/nonexistent/rulekit.toml")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_from_file_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rulekit.toml");
        fs::write(&path, "[lint\nstrict = ").unwrap();
        let err = RulekitConfig::from_file(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }
}
