// src/run.rs

//! Orchestration of one modification run
//!
//! Stages run strictly in sequence: directive load → acquire → extract →
//! control read → package-name guard → file overlay → patch engine →
//! metadata reconciliation → repack. The first failing stage aborts the
//! run. All mutation happens in per-run scratch directories, so the input
//! archive is never touched and nothing needs rolling back.

use crate::control::ControlRecord;
use crate::directive::{self, Directive};
use crate::error::{Error, Result};
use crate::{metadata, patch, tools};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Inputs of a single run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directive file describing the modifications
    pub directive: PathBuf,
    /// Local archive to modify; fetched via apt-get when absent
    pub archive: Option<PathBuf>,
    /// Where the repacked archive lands
    pub output_dir: PathBuf,
    /// Download cache, shared across runs, append-only
    pub cache_dir: PathBuf,
}

/// Execute a full run; returns the path of the repacked archive
pub fn run(config: &RunConfig) -> Result<PathBuf> {
    let stanzas = directive::parse_file(&config.directive)?;
    let directive = Directive::from_stanzas(&stanzas)?;
    info!(
        "Modifying package '{}' ({} operations)",
        directive.header.package,
        directive.operations.len()
    );

    tools::require("dpkg-deb")?;

    let archive = acquire(config, &directive)?;

    let work = tempfile::tempdir()?;
    let tree = work.path().join("tree");
    info!("Extracting {}", archive.display());
    tools::extract(&archive, &tree)?;
    tools::extract_metadata(&archive, &tree.join("DEBIAN"))?;

    let mut control = ControlRecord::read(&tree.join("DEBIAN/control"))?;
    verify_package_name(&control, &directive)?;

    if let Some(files) = &directive.header.files {
        let overlay = resolve_overlay_dir(&config.directive, files)?;
        info!("Overlaying {}", overlay.display());
        copy_overlay(&overlay, &tree)?;
    }

    patch::apply_operations(&tree, &directive.operations)?;

    metadata::reconcile(&tree, &mut control, &directive.header)?;

    tools::repack(&tree, &config.output_dir)
}

/// The directive must name the package the archive actually contains;
/// a mismatch aborts before any mutation
pub fn verify_package_name(control: &ControlRecord, directive: &Directive) -> Result<()> {
    if control.package() != directive.header.package {
        return Err(Error::Validation(format!(
            "directive is for package '{}' but the archive contains '{}'",
            directive.header.package,
            control.package()
        )));
    }
    Ok(())
}

/// Resolve the archive to modify: a caller-supplied file, or a fetch into
/// the cache
fn acquire(config: &RunConfig, directive: &Directive) -> Result<PathBuf> {
    match &config.archive {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::Usage(format!(
                    "package archive not found: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        None => {
            let scratch = tempfile::tempdir()?;
            tools::require("apt-get")?;
            tools::fetch(&directive.header.package, &config.cache_dir, scratch.path())
        }
    }
}

/// `Files` paths are resolved against the directive file's directory
fn resolve_overlay_dir(directive_path: &Path, files: &Path) -> Result<PathBuf> {
    let resolved = if files.is_absolute() {
        files.to_path_buf()
    } else {
        directive_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(files)
    };
    if !resolved.is_dir() {
        return Err(Error::Validation(format!(
            "'Files' directory does not exist: {}",
            resolved.display()
        )));
    }
    Ok(resolved)
}

/// Copy the overlay directory's contents onto the tree, preserving
/// permissions and recreating symlinks
fn copy_overlay(overlay: &Path, tree: &Path) -> Result<()> {
    for entry in WalkDir::new(overlay).min_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(overlay)
            .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
        let dest = tree.join(rel);
        debug!("Overlay: {}", rel.display());

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            // exists() follows symlinks and reports false for a dangling
            // one; symlink_metadata sees the entry itself
            if dest.symlink_metadata().is_ok() {
                fs::remove_file(&dest)?;
            }
            std::os::unix::fs::symlink(target, &dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_copy_overlay_files_and_dirs() {
        let overlay = TempDir::new().unwrap();
        let tree = TempDir::new().unwrap();
        fs::create_dir_all(overlay.path().join("etc/foo")).unwrap();
        fs::write(overlay.path().join("etc/foo/bar.conf"), "x=1\n").unwrap();

        copy_overlay(overlay.path(), tree.path()).unwrap();

        assert_eq!(
            fs::read_to_string(tree.path().join("etc/foo/bar.conf")).unwrap(),
            "x=1\n"
        );
    }

    #[test]
    fn test_copy_overlay_preserves_mode() {
        let overlay = TempDir::new().unwrap();
        let tree = TempDir::new().unwrap();
        let script = overlay.path().join("script");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        copy_overlay(overlay.path(), tree.path()).unwrap();

        let mode = fs::metadata(tree.path().join("script"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_copy_overlay_recreates_symlinks() {
        let overlay = TempDir::new().unwrap();
        let tree = TempDir::new().unwrap();
        std::os::unix::fs::symlink("target", overlay.path().join("link")).unwrap();

        copy_overlay(overlay.path(), tree.path()).unwrap();

        assert_eq!(
            fs::read_link(tree.path().join("link")).unwrap(),
            PathBuf::from("target")
        );
    }

    #[test]
    fn test_copy_overlay_replaces_dangling_symlink() {
        let overlay = TempDir::new().unwrap();
        let tree = TempDir::new().unwrap();
        // The tree already holds a dangling symlink at the destination
        std::os::unix::fs::symlink("missing-target", tree.path().join("link")).unwrap();
        std::os::unix::fs::symlink("new-target", overlay.path().join("link")).unwrap();

        copy_overlay(overlay.path(), tree.path()).unwrap();

        assert_eq!(
            fs::read_link(tree.path().join("link")).unwrap(),
            PathBuf::from("new-target")
        );
    }

    #[test]
    fn test_resolve_overlay_relative_to_directive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("overlay")).unwrap();
        let directive = dir.path().join("mods.cdeb");

        let resolved = resolve_overlay_dir(&directive, Path::new("overlay")).unwrap();
        assert_eq!(resolved, dir.path().join("overlay"));
    }

    #[test]
    fn test_resolve_overlay_missing_fails() {
        let err = resolve_overlay_dir(Path::new("/tmp/mods.cdeb"), Path::new("no-such-dir"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_acquire_missing_local_archive_fails() {
        let config = RunConfig {
            directive: PathBuf::from("mods.cdeb"),
            archive: Some(PathBuf::from("/no/such/archive.deb")),
            output_dir: PathBuf::from("."),
            cache_dir: PathBuf::from("/tmp/cache"),
        };
        let directive = Directive::from_stanzas(&directive::parse_str("Package: foo\n").unwrap())
            .unwrap();

        let err = acquire(&config, &directive).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }
}
