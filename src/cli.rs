//! CLI argument parsing using clap v4

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::lint::OutputFormat;

/// rulekit - lint rule documents and render templates
///
/// Checks markdown rule documents and feature specs against their schema,
/// and renders new documents from templates.
#[derive(Parser, Debug)]
#[command(name = "rulekit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "RULEKIT_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate documents (configured targets when no paths are given)
    Check {
        /// Files or directories to check
        paths: Vec<PathBuf>,

        /// Validate every file against this profile (rule-document, feature-spec)
        #[arg(long)]
        profile: Option<String>,

        /// Report format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Fail on warnings as well as errors
        #[arg(long)]
        strict: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Render a template to stdout or a file
    Render {
        /// Template name or path to a template file
        template: String,

        /// Placeholder value as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// TOML file of placeholder values; --set entries take precedence
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,

        /// Validate the rendered document against the template's profile
        #[arg(long)]
        check: bool,
    },

    /// Print the parsed structure of a document as JSON
    Inspect {
        file: PathBuf,

        /// Also validate against this profile
        #[arg(long)]
        profile: Option<String>,
    },

    /// Template management
    Templates {
        #[command(subcommand)]
        subcommand: TemplatesSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TemplatesSubcommand {
    /// List available templates
    List,

    /// Print a template's source
    Show { name: String },

    /// List a template's placeholders and defaults
    Placeholders { name: String },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Create a default configuration file
    Init {
        /// Where to write the file (default: ./rulekit.toml)
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_defaults() {
        let cli = Cli::parse_from(["rulekit", "check"]);
        match cli.command {
            Commands::Check {
                paths,
                profile,
                format,
                strict,
                no_color,
            } => {
                assert!(paths.is_empty());
                assert!(profile.is_none());
                assert!(format.is_none());
                assert!(!strict);
                assert!(!no_color);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_check_with_options() {
        let cli = Cli::parse_from([
            "rulekit", "check", "rules/a.md", "rules/b", "--format", "json", "--strict", "--profile",
            "feature-spec",
        ]);
        match cli.command {
            Commands::Check {
                paths,
                format,
                strict,
                profile,
                ..
            } => {
                assert_eq!(paths, vec![PathBuf::from("rules/a.md"), PathBuf::from("rules/b")]);
                assert_eq!(format, Some(OutputFormat::Json));
                assert!(strict);
                assert_eq!(profile.as_deref(), Some("feature-spec"));
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_render_repeated_set() {
        let cli = Cli::parse_from([
            "rulekit", "render", "rule", "--set", "title=Logging", "--set", "audience=All", "-o",
            "rules/logging.md", "--check",
        ]);
        match cli.command {
            Commands::Render {
                template,
                set,
                output,
                check,
                force,
                ..
            } => {
                assert_eq!(template, "rule");
                assert_eq!(set, vec!["title=Logging", "audience=All"]);
                assert_eq!(output, Some(PathBuf::from("rules/logging.md")));
                assert!(check);
                assert!(!force);
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["rulekit", "templates", "list", "-vv", "-c", "custom.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        assert!(matches!(
            cli.command,
            Commands::Templates {
                subcommand: TemplatesSubcommand::List
            }
        ));
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["rulekit", "config", "init", "--path", "x.toml", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert_eq!(path.as_deref(), Some("x.toml"));
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_version_command() {
        let cli = Cli::parse_from(["rulekit", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }
}
