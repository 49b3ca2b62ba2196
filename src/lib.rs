// src/lib.rs

//! customdeb
//!
//! Rebuilds a Debian binary package with a declarative set of
//! modifications: file contents, ownership, permission bits, plus a
//! matching version bump and changelog entry. The original archive is
//! never touched; all work happens in disposable scratch trees and a new
//! archive is emitted.
//!
//! # Pipeline
//!
//! - `directive`: parse and validate the modification directive
//! - `tools`: acquire the archive (apt-get) and unpack/repack it (dpkg-deb)
//! - `patch`: apply the file operations to the extracted tree
//! - `metadata`: reconcile version, changelog, control record and md5sums
//! - `run`: sequence the stages, fail-fast

pub mod changelog;
pub mod control;
pub mod directive;
mod error;
pub mod metadata;
pub mod patch;
pub mod paths;
pub mod run;
pub mod tools;

pub use control::ControlRecord;
pub use directive::{Directive, Header, Operation, OwnerSpec, Stanza};
pub use error::{Error, Result};
pub use run::{run, RunConfig};
