// src/metadata.rs

//! Metadata reconciliation after the patch engine has run
//!
//! Brings the package's own records in line with the modified tree: bumps
//! the version, prepends the matching changelog entry (then re-reads it to
//! prove the entry landed at exactly the computed version), rewrites
//! `DEBIAN/control` and regenerates the `DEBIAN/md5sums` manifest.

use crate::changelog;
use crate::control::ControlRecord;
use crate::directive::{Header, VERSION_SUFFIX};
use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Compute the modified package's version string
///
/// `1.2-3` with mod version `5` becomes `1.2-3.customdeb5`; an absent
/// `Mod-Version` defaults to `0` upstream of this call.
pub fn compute_version(base: &str, mod_version: &str) -> String {
    format!("{}.{}{}", base, VERSION_SUFFIX, mod_version)
}

/// Reconcile all package metadata in `tree`; returns the new version string
pub fn reconcile(tree: &Path, control: &mut ControlRecord, header: &Header) -> Result<String> {
    let new_version = compute_version(control.version(), &header.mod_version);
    info!("New package version: {}", new_version);

    let changelog_path = changelog::locate(tree, control.package());
    changelog::prepend_entry(&changelog_path, control.package(), &new_version, &header.changes)?;

    // Re-read what actually hit the disk; a changelog that does not lead
    // with the computed version would produce a package whose control
    // version and changelog disagree
    let written = changelog::topmost_version(&changelog_path)?;
    if written != new_version {
        return Err(Error::VersionMismatch {
            expected: new_version,
            found: written,
        });
    }

    control.set_version(&new_version);
    control.write(&tree.join("DEBIAN/control"))?;

    write_md5sums(tree)?;

    Ok(new_version)
}

/// Regenerate `DEBIAN/md5sums` over the payload, excluding the metadata
/// directory itself
pub fn write_md5sums(tree: &Path) -> Result<()> {
    let mut lines = Vec::new();

    for entry in WalkDir::new(tree)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == "DEBIAN"))
    {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(tree)
            .map_err(|_| Error::InvalidPath(entry.path().display().to_string()))?;
        let digest = Md5::digest(fs::read(entry.path())?);
        // dpkg's manifest format: hash, two spaces, path without leading /
        lines.push(format!("{:x}  {}", digest, rel.display()));
    }

    debug!("Writing md5sums manifest ({} files)", lines.len());
    let mut manifest = lines.join("\n");
    if !manifest.is_empty() {
        manifest.push('\n');
    }
    fs::write(tree.join("DEBIAN/md5sums"), manifest)?;
    Ok(())
}
