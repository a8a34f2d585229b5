//! Confines file tools to one directory tree.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path '{path}' escapes the workspace")]
    Traversal { path: String },

    #[error("absolute path '{path}' is outside the workspace")]
    OutsideRoot { path: String },

    #[error("empty path")]
    Empty,
}

/// A root directory that tool paths are resolved against.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to a location inside the root.
    ///
    /// Relative paths are joined onto the root. Absolute paths are accepted
    /// only when they already lie under it. Any `..` component is rejected
    /// outright, and an existing target must not reach outside the root
    /// through a symlink.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        if path.trim().is_empty() {
            return Err(PathError::Empty);
        }

        let input = Path::new(path);
        if input.components().any(|c| c == Component::ParentDir) {
            return Err(PathError::Traversal { path: path.into() });
        }

        let joined = if input.is_absolute() {
            if !input.starts_with(&self.root) {
                return Err(PathError::OutsideRoot { path: path.into() });
            }
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        if self.escapes_through_link(&joined) {
            return Err(PathError::Traversal { path: path.into() });
        }

        Ok(joined)
    }

    /// Canonicalize the deepest existing ancestor of `joined`, re-attach
    /// the components that don't exist yet, and test the result against
    /// the canonical root. A dangling symlink on the way counts as escaping.
    fn escapes_through_link(&self, joined: &Path) -> bool {
        let Ok(real_root) = self.root.canonicalize() else {
            return false;
        };

        let mut existing = joined;
        let mut missing: Vec<&OsStr> = Vec::new();
        loop {
            match existing.canonicalize() {
                Ok(mut real) => {
                    real.extend(missing.iter().rev());
                    return !real.starts_with(&real_root);
                }
                Err(_) if existing.symlink_metadata().is_ok() => return true,
                Err(_) => {}
            }
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name);
                    existing = parent;
                }
                _ => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_root() {
        let ws = Workspace::new("/srv/project");
        assert_eq!(
            ws.resolve("src/main.rs").unwrap(),
            PathBuf::from("/srv/project/src/main.rs")
        );
        assert_eq!(
            ws.resolve("./README.md").unwrap(),
            PathBuf::from("/srv/project/./README.md")
        );
    }

    #[test]
    fn parent_components_rejected() {
        let ws = Workspace::new("/srv/project");
        assert!(matches!(ws.resolve("../etc/passwd"), Err(PathError::Traversal { .. })));
        assert!(matches!(ws.resolve("src/../../x"), Err(PathError::Traversal { .. })));
    }

    #[test]
    fn absolute_paths_must_be_inside() {
        let ws = Workspace::new("/srv/project");
        assert!(ws.resolve("/srv/project/a.txt").is_ok());
        assert!(matches!(ws.resolve("/etc/shadow"), Err(PathError::OutsideRoot { .. })));
        assert!(matches!(ws.resolve("/srv/projectile/a"), Err(PathError::OutsideRoot { .. })));
    }

    #[test]
    fn empty_path_rejected() {
        assert_eq!(Workspace::new("/srv").resolve("  "), Err(PathError::Empty));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("escape")).unwrap();

        let ws = Workspace::new(root.path());
        assert!(matches!(ws.resolve("escape"), Err(PathError::Traversal { .. })));
        assert!(matches!(
            ws.resolve("escape/new.txt"),
            Err(PathError::Traversal { .. })
        ));
        assert!(matches!(
            ws.resolve("escape/deeper/new.txt"),
            Err(PathError::Traversal { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_rejected() {
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", root.path().join("dangling")).unwrap();

        let ws = Workspace::new(root.path());
        assert!(matches!(ws.resolve("dangling"), Err(PathError::Traversal { .. })));
    }

    #[test]
    fn new_files_inside_root_allowed() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("src")).unwrap();

        let ws = Workspace::new(root.path());
        assert_eq!(
            ws.resolve("src/new/mod.rs").unwrap(),
            root.path().join("src/new/mod.rs")
        );
    }
}
