//! Template lookup: bundled templates plus the configured templates directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::renderer::{Origin, Template};
use crate::document::read_text;
use crate::error::{Error, Result};

const BUNDLED: &[(&str, &str)] = &[
    ("rule", include_str!("../../templates/rule.md")),
    ("feature-spec", include_str!("../../templates/feature-spec.md")),
];

/// Templates available by name.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Template>,
}

impl TemplateRegistry {
    /// Registry holding only the compiled-in templates.
    pub fn bundled() -> Self {
        let templates = BUNDLED
            .iter()
            .map(|(name, source)| (name.to_string(), Template::new(*name, source, Origin::Bundled)))
            .collect();
        Self { templates }
    }

    /// Bundled templates, overridden by every `*.md` file in `dir`.
    ///
    /// A missing directory is not an error.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut registry = Self::bundled();
        let Some(dir) = dir else {
            return Ok(registry);
        };
        if !dir.is_dir() {
            debug!(path = %dir.display(), "Templates directory not found, using bundled templates");
            return Ok(registry);
        }

        let entries = fs::read_dir(dir).map_err(|e| Error::io_read(dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io_read(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = read_text(&path)?;
            let template = Template::new(name, &source, Origin::Directory(path.clone()));
            if registry.templates.insert(name.to_string(), template).is_some() {
                info!(template = name, path = %path.display(), "Directory template overrides bundled one");
            } else {
                debug!(template = name, path = %path.display(), "Loaded template");
            }
        }
        Ok(registry)
    }

    pub fn list(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> String {
        self.templates.keys().cloned().collect::<Vec<_>>().join(", ")
    }

    /// Load `name_or_path` directly when it names an existing file,
    /// otherwise look it up by name.
    pub fn resolve(&self, name_or_path: &str) -> Result<Template> {
        let path = Path::new(name_or_path);
        if path.is_file() {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(name_or_path);
            let source = read_text(path)?;
            return Ok(Template::new(name, &source, Origin::File(path.to_path_buf())));
        }

        self.get(name_or_path)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound {
                name: name_or_path.to_string(),
                available: self.names(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::schema::ProfileKind;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_templates() {
        let registry = TemplateRegistry::bundled();
        assert_eq!(registry.names(), "feature-spec, rule");

        let rule = registry.get("rule").unwrap();
        assert_eq!(rule.kind, Some(ProfileKind::RuleDocument));
        assert_eq!(rule.origin, Origin::Bundled);
        let spec = registry.get("feature-spec").unwrap();
        assert_eq!(spec.kind, Some(ProfileKind::FeatureSpec));
    }

    #[test]
    fn test_bundled_rule_requires_three_values() {
        let rule = TemplateRegistry::bundled().resolve("rule").unwrap();
        let required: Vec<String> = rule
            .placeholders()
            .unwrap()
            .into_iter()
            .filter(|p| p.required())
            .map(|p| p.name)
            .collect();
        assert_eq!(required, vec!["title", "applies_to", "audience"]);
    }

    #[test]
    fn test_directory_overrides_bundled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("rule.md"), "# {{ title }}\n").unwrap();
        fs::write(dir.path().join("adr.md"), "# ADR {{ number }}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = TemplateRegistry::load(Some(dir.path())).unwrap();
        assert_eq!(registry.names(), "adr, feature-spec, rule");
        let rule = registry.get("rule").unwrap();
        assert!(matches!(rule.origin, Origin::Directory(_)));
        assert_eq!(rule.kind, None);
    }

    #[test]
    fn test_missing_directory_uses_bundled() {
        let registry = TemplateRegistry::load(Some(Path::new("/nonexistent/templates"))).unwrap();
        assert_eq!(registry.list().count(), 2);
    }

    #[test]
    fn test_resolve_path_and_unknown_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.md");
        fs::write(&path, "<!-- template: rule-document -->\n# {{ title }}\n").unwrap();

        let registry = TemplateRegistry::bundled();
        let template = registry.resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(template.name, "custom");
        assert_eq!(template.kind, Some(ProfileKind::RuleDocument));

        let err = registry.resolve("adr").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateNotFound);
        assert!(err.to_string().contains("feature-spec, rule"));
    }
}
