// src/patch.rs

//! Patch engine: applies validated operations to an extracted package tree
//!
//! Operations run in declaration order against a writable tree root. Each
//! one is self-contained: content, ownership and permissions are read only
//! from the operation itself, never from earlier stanzas. The first failing
//! operation aborts the whole run; the tree is disposable scratch state, so
//! nothing is rolled back.

use crate::directive::{Operation, OwnerSpec};
use crate::error::{Error, Result};
use crate::paths::join_under_root;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::debug;

/// Apply all operations, in order, under the tree root
pub fn apply_operations(root: &Path, operations: &[Operation]) -> Result<()> {
    for op in operations {
        apply_operation(root, op)?;
    }
    Ok(())
}

fn apply_operation(root: &Path, op: &Operation) -> Result<()> {
    let target = join_under_root(root, &op.file)?;
    debug!("Patching {}", target.display());

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    match &op.content {
        Some(content) => {
            fs::write(&target, content)?;
        }
        None => {
            // Touch semantics: a pure ownership/permission change on a file
            // the package does not ship still needs something to chown
            if !target.exists() {
                fs::write(&target, b"")?;
            }
        }
    }

    if let Some((user, group)) = &op.owner {
        let uid = resolve_user(user)?;
        let gid = resolve_group(group)?;
        debug!("Setting owner of {} to {}:{}", op.file, uid, gid);
        std::os::unix::fs::chown(&target, Some(uid), Some(gid))?;
    }

    if let Some(mode) = op.mode {
        debug!("Setting mode of {} to {:o}", op.file, mode);
        // Mode bits are set exactly as given, not merged with existing bits
        fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
    }

    Ok(())
}

/// Resolve an owner spec to a uid
fn resolve_user(spec: &OwnerSpec) -> Result<u32> {
    match spec {
        OwnerSpec::Id(id) => Ok(*id),
        OwnerSpec::Name(name) => nix::unistd::User::from_name(name)
            .ok()
            .flatten()
            .map(|u| u.uid.as_raw())
            .ok_or(Error::OwnerLookup {
                kind: "user",
                name: name.clone(),
            }),
    }
}

/// Resolve an owner spec to a gid
fn resolve_group(spec: &OwnerSpec) -> Result<u32> {
    match spec {
        OwnerSpec::Id(id) => Ok(*id),
        OwnerSpec::Name(name) => nix::unistd::Group::from_name(name)
            .ok()
            .flatten()
            .map(|g| g.gid.as_raw())
            .ok_or(Error::OwnerLookup {
                kind: "group",
                name: name.clone(),
            }),
    }
}
