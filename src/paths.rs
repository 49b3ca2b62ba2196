// src/paths.rs

//! Containment checks for directive-supplied paths
//!
//! Operation `File` values come from a user-written directive and are
//! resolved against a scratch package tree. A hostile or simply broken
//! directive must never reach outside that tree, so every path is
//! normalized component-by-component before it is joined with the root,
//! and symlinks already present in the tree are chased: a package could
//! ship `etc/link -> /etc/passwd` (dangling or not) and a write through
//! it would otherwise land outside the tree.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Upper bound on symlink hops while resolving a target inside the tree
const MAX_LINK_HOPS: usize = 40;

/// Normalize an untrusted relative path: strips leading separators and `.`
/// components, rejects `..` and empty results.
pub fn sanitize_relative(path: &str) -> Result<PathBuf> {
    let relative = path.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::PathTraversal(path.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(format!(
            "empty path after normalization: '{}'",
            path
        )));
    }

    Ok(normalized)
}

/// Join an untrusted path under the package tree root, guaranteed not to
/// escape it.
///
/// Every component that already exists is inspected with
/// `symlink_metadata`; a symlink (dangling ones included, which
/// `canonicalize` cannot see) is resolved and its target must stay under
/// the root. Components that do not exist yet are covered by the `..`
/// rejection in [`sanitize_relative`].
pub fn join_under_root(root: &Path, path: &str) -> Result<PathBuf> {
    let sanitized = sanitize_relative(path)?;

    // The tree root exists during a run; the lexical fallback keeps the
    // check meaningful for callers probing a root that does not
    let guard_root = root
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexical(root));

    let mut current = guard_root.clone();
    for component in sanitized.components() {
        current.push(component);
        let Ok(meta) = current.symlink_metadata() else {
            // Not created yet; nothing beneath it can exist either
            continue;
        };
        if meta.file_type().is_symlink() {
            let resolved = resolve_link(&current)?;
            if !resolved.starts_with(&guard_root) {
                return Err(Error::PathTraversal(format!(
                    "{} resolves to {} outside {}",
                    current.display(),
                    resolved.display(),
                    root.display()
                )));
            }
            // Keep walking below the real location for directory symlinks
            current = resolved;
        }
    }

    Ok(root.join(sanitized))
}

/// Chase a symlink chain without requiring the final target to exist
fn resolve_link(link: &Path) -> Result<PathBuf> {
    let mut current = link.to_path_buf();
    for _ in 0..MAX_LINK_HOPS {
        let target = fs::read_link(&current)?;
        let resolved = if target.is_absolute() {
            target
        } else {
            current
                .parent()
                .unwrap_or_else(|| Path::new("/"))
                .join(target)
        };
        let resolved = normalize_lexical(&resolved);

        match resolved.symlink_metadata() {
            Ok(meta) if meta.file_type().is_symlink() => current = resolved,
            _ => return Ok(resolved),
        }
    }
    Err(Error::PathTraversal(format!(
        "symlink chain too deep at {}",
        link.display()
    )))
}

/// Squash `.` and `..` components without touching the filesystem
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(c) => out.push(c),
            Component::Prefix(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_normal() {
        assert_eq!(
            sanitize_relative("etc/foo.conf").unwrap(),
            PathBuf::from("etc/foo.conf")
        );
    }

    #[test]
    fn test_sanitize_leading_slashes() {
        assert_eq!(
            sanitize_relative("/etc/foo.conf").unwrap(),
            PathBuf::from("etc/foo.conf")
        );
        assert_eq!(
            sanitize_relative("///usr/bin/foo").unwrap(),
            PathBuf::from("usr/bin/foo")
        );
    }

    #[test]
    fn test_sanitize_curdir_components() {
        assert_eq!(
            sanitize_relative("./etc/./foo").unwrap(),
            PathBuf::from("etc/foo")
        );
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize_relative("..").is_err());
        assert!(sanitize_relative("../etc/passwd").is_err());
        assert!(sanitize_relative("etc/../../passwd").is_err());
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(sanitize_relative("").is_err());
        assert!(sanitize_relative("/").is_err());
        assert!(sanitize_relative("./").is_err());
    }

    #[test]
    fn test_join_under_root() {
        let root = Path::new("/tmp/tree");
        assert_eq!(
            join_under_root(root, "/etc/foo.conf").unwrap(),
            PathBuf::from("/tmp/tree/etc/foo.conf")
        );
        assert!(join_under_root(root, "../outside").is_err());
    }

    #[test]
    fn test_join_rejects_dangling_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let tree = TempDir::new().unwrap();
        fs::create_dir_all(tree.path().join("etc")).unwrap();
        // Target does not exist, so canonicalize alone would miss this
        std::os::unix::fs::symlink(
            outside.path().join("owned-by-package"),
            tree.path().join("etc/link"),
        )
        .unwrap();

        let err = join_under_root(tree.path(), "/etc/link").unwrap_err();
        assert!(matches!(err, Error::PathTraversal(_)));
    }

    #[test]
    fn test_join_rejects_existing_symlink_escape() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("victim"), "data").unwrap();
        let tree = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("victim"), tree.path().join("link"))
            .unwrap();

        assert!(join_under_root(tree.path(), "link").is_err());
    }

    #[test]
    fn test_join_rejects_relative_symlink_escape() {
        let tree = TempDir::new().unwrap();
        fs::create_dir_all(tree.path().join("etc")).unwrap();
        std::os::unix::fs::symlink("../../escape", tree.path().join("etc/link")).unwrap();

        assert!(join_under_root(tree.path(), "etc/link").is_err());
    }

    #[test]
    fn test_join_rejects_path_below_escaping_dir_symlink() {
        let outside = TempDir::new().unwrap();
        let tree = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), tree.path().join("etc")).unwrap();

        assert!(join_under_root(tree.path(), "etc/foo.conf").is_err());
    }

    #[test]
    fn test_join_allows_symlink_within_tree() {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("real"), "x").unwrap();
        std::os::unix::fs::symlink("real", tree.path().join("alias")).unwrap();

        let joined = join_under_root(tree.path(), "alias").unwrap();
        assert_eq!(joined, tree.path().join("alias"));
    }

    #[test]
    fn test_join_allows_dangling_symlink_within_tree() {
        let tree = TempDir::new().unwrap();
        std::os::unix::fs::symlink("not-yet-created", tree.path().join("alias")).unwrap();

        assert!(join_under_root(tree.path(), "alias").is_ok());
    }

    #[test]
    fn test_normalize_lexical() {
        assert_eq!(
            normalize_lexical(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_lexical(Path::new("/a/../..")), PathBuf::from("/"));
    }
}
