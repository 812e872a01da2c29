//! Common test utilities and fixtures

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap()
}

/// A scratch repository the binary runs inside.
///
/// HOME and XDG_CONFIG_HOME point into the scratch directory so a user's
/// own configuration is never picked up.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Copy a fixture file into the repository.
    pub fn add_fixture(&self, fixture_name: &str, relative: &str) -> PathBuf {
        self.write(relative, &fixture(fixture_name))
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("rulekit").unwrap();
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path().join("home"))
            .env("XDG_CONFIG_HOME", self.dir.path().join("home/.config"))
            .env_remove("RUST_LOG");
        for var in [
            "RULEKIT_CONFIG",
            "RULEKIT_ROOT",
            "RULEKIT_STRICT",
            "RULEKIT_DEFAULT_PROFILE",
            "RULEKIT_TEMPLATES_DIR",
            "RULEKIT_FORMAT",
            "RULEKIT_COLOR",
            "RULEKIT_LOG_LEVEL",
            "RULEKIT_LOG_FILE",
            "RULEKIT_LOG_JSON",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_exist() {
        for name in [
            "valid_rule.md",
            "logging.md",
            "broken_rule.md",
            "feature_spec.md",
            "valid_config.toml",
            "invalid_config.toml",
        ] {
            assert!(fixture_path(name).exists(), "missing fixture {}", name);
        }
    }
}
