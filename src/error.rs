//! Error types for rulekit
//!
//! Authoring problems in documents are reported as findings, never as errors.
//! This module covers operational failures only:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for rulekit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Document errors (3xx)
    DocumentEncoding = 300,
    NoDocuments = 301,
    InvalidPattern = 302,
    UnknownProfile = 303,

    // Template errors (4xx)
    TemplateNotFound = 400,
    TemplateSyntax = 401,
    PlaceholdersMissing = 402,
    InvalidValue = 403,
    OutputExists = 404,

    // Lint outcome (5xx)
    LintFailed = 500,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    ///
    /// A failed lint exits with 1 so CI treats it like any other check.
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500 => 1,
            _ => 90,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Explicitly requested configuration file does not exist
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────

    /// File is not valid UTF-8
    #[error("{path} is not valid UTF-8")]
    DocumentEncoding { path: PathBuf },

    /// Nothing matched the requested paths or configured targets
    #[error("No markdown documents found in {searched}")]
    NoDocuments { searched: String },

    /// A glob pattern could not be compiled
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Unknown schema profile '{name}'. Available: {available}")]
    UnknownProfile { name: String, available: String },

    // ─────────────────────────────────────────────────────────────
    // Template Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Template not found: {name}. Available: {available}")]
    TemplateNotFound { name: String, available: String },

    /// Malformed placeholder syntax
    #[error("Template {template} line {line}: {message}")]
    TemplateSyntax {
        template: String,
        line: usize,
        message: String,
    },

    /// One or more placeholders had neither a value nor a default
    #[error("Template {template} is missing values for: {}", names.join(", "))]
    PlaceholdersMissing { template: String, names: Vec<String> },

    /// A `--set` argument or values file entry was not usable
    #[error("Invalid value '{input}': {message}")]
    InvalidValue { input: String, message: String },

    #[error("Output file already exists: {path}")]
    OutputExists { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Lint Outcome
    // ─────────────────────────────────────────────────────────────

    /// Lint finished and at least one document failed
    #[error("{failed} of {checked} document(s) failed validation")]
    LintFailed { failed: usize, checked: usize },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { source, .. } => io_code(source, ErrorCode::IoRead),
            Error::IoWrite { source, .. } => io_code(source, ErrorCode::IoWrite),
            Error::Io(e) => io_code(e, ErrorCode::IoRead),
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InternalError,

            Error::DocumentEncoding { .. } => ErrorCode::DocumentEncoding,
            Error::NoDocuments { .. } => ErrorCode::NoDocuments,
            Error::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            Error::UnknownProfile { .. } => ErrorCode::UnknownProfile,

            Error::TemplateNotFound { .. } => ErrorCode::TemplateNotFound,
            Error::TemplateSyntax { .. } => ErrorCode::TemplateSyntax,
            Error::PlaceholdersMissing { .. } => ErrorCode::PlaceholdersMissing,
            Error::InvalidValue { .. } => ErrorCode::InvalidValue,
            Error::OutputExists { .. } => ErrorCode::OutputExists,

            Error::LintFailed { .. } => ErrorCode::LintFailed,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'rulekit config init' to create a default configuration file.")
            }
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'rulekit config validate' to see details.",
            ),
            Error::ConfigValidation { .. } => {
                Some("Review the configuration file and fix the invalid values.")
            }
            Error::DocumentEncoding { .. } => Some("Re-save the file with UTF-8 encoding."),
            Error::NoDocuments { .. } => Some(
                "Pass files or directories explicitly, or adjust [[lint.targets]] in rulekit.toml.",
            ),
            Error::UnknownProfile { .. } => {
                Some("Use one of the built-in profiles: rule-document, feature-spec.")
            }
            Error::TemplateNotFound { .. } => {
                Some("Run 'rulekit templates list' to see available templates.")
            }
            Error::TemplateSyntax { .. } => Some(
                "Placeholders are written {{ name }} or {{ name | default }}. \
                 Templates cannot contain a literal '{{'.",
            ),
            Error::PlaceholdersMissing { .. } => Some(
                "Supply each value with --set name=value or a --values TOML file. \
                 Run 'rulekit templates placeholders <name>' to list them.",
            ),
            Error::InvalidValue { .. } => Some("Values must be given as name=value."),
            Error::OutputExists { .. } => Some("Use --force to overwrite the existing file."),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}

fn io_code(err: &std::io::Error, fallback: ErrorCode) -> ErrorCode {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
        std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
        _ => fallback,
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoRead {
            path: path.into(),
            source,
        }
    }

    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoWrite {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(input: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidValue {
            input: input.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
