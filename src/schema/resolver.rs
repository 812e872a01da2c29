//! Resolution of "Related Rules" link targets.
//!
//! The validator never touches the filesystem itself; callers pass a
//! [`ReferenceResolver`] when link checks should run.

#[cfg(test)]
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Outcome of resolving one link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Target exists inside the repository
    Resolved(PathBuf),
    /// External URL or same-file anchor; not checked
    Skipped,
    /// Target stays inside the repository but does not exist
    Missing(PathBuf),
    /// Target points outside the repository root
    OutsideRoot,
}

pub trait ReferenceResolver {
    /// Resolve `target` as written in the document at `document`.
    fn resolve(&self, document: &Path, target: &str) -> Resolution;
}

pub fn is_external(target: &str) -> bool {
    ["http://", "https://", "mailto:", "ftp://"]
        .iter()
        .any(|scheme| target.starts_with(scheme))
}

/// Lexically normalize `.` and `..` without touching the filesystem.
///
/// Returns `None` when `..` climbs above the start of the path.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Compute the path a target points at, confined to `root`.
fn locate(root: &Path, document_dir: &Path, target: &str) -> Result<PathBuf, Resolution> {
    if is_external(target) || target.starts_with('#') {
        return Err(Resolution::Skipped);
    }
    let path_part = target.split('#').next().unwrap_or(target);
    if path_part.is_empty() {
        return Err(Resolution::Skipped);
    }

    let joined = match path_part.strip_prefix('/') {
        Some(rooted) => root.join(rooted),
        None => document_dir.join(path_part),
    };
    let candidate = normalize(&joined).ok_or(Resolution::OutsideRoot)?;
    if !candidate.starts_with(root) {
        return Err(Resolution::OutsideRoot);
    }
    Ok(candidate)
}

/// Resolves targets against files on disk under a repository root.
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ReferenceResolver for FsResolver {
    fn resolve(&self, document: &Path, target: &str) -> Resolution {
        let parent = document.parent().unwrap_or(Path::new("."));
        let document_dir = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
        match locate(&self.root, &document_dir, target) {
            Ok(path) if path.is_file() => Resolution::Resolved(path),
            Ok(path) => Resolution::Missing(path),
            Err(resolution) => resolution,
        }
    }
}

/// Resolves targets against a fixed set of paths.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    root: PathBuf,
    files: HashSet<PathBuf>,
}

#[cfg(test)]
impl MemoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: HashSet::new(),
        }
    }

    /// Register a file, relative to the root.
    pub fn with_file(mut self, relative: &str) -> Self {
        self.files.insert(self.root.join(relative));
        self
    }
}

#[cfg(test)]
impl ReferenceResolver for MemoryResolver {
    fn resolve(&self, document: &Path, target: &str) -> Resolution {
        let document_dir = document.parent().unwrap_or(&self.root);
        match locate(&self.root, document_dir, target) {
            Ok(path) if self.files.contains(&path) => Resolution::Resolved(path),
            Ok(path) => Resolution::Missing(path),
            Err(resolution) => resolution,
        }
    }
}
