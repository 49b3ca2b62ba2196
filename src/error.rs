// src/error.rs

//! Central error type for customdeb
//!
//! Every failure is fatal: the run aborts at the point of failure and the
//! caller prints the message and exits non-zero. There is no retry and no
//! partial-success mode.

use std::io;
use thiserror::Error;

/// Errors produced anywhere in the modification pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing command-line arguments, unreadable directive file
    #[error("usage error: {0}")]
    Usage(String),

    /// Malformed directive syntax
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Unknown/missing fields, package-name mismatch, bad field values
    #[error("validation error: {0}")]
    Validation(String),

    /// A user or group name could not be resolved against the system database
    #[error("cannot resolve {kind} '{name}'")]
    OwnerLookup { kind: &'static str, name: String },

    /// A delegated external tool exited non-zero or could not be run
    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// The freshly written changelog does not carry the computed version
    #[error("changelog version mismatch: expected '{expected}', found '{found}'")]
    VersionMismatch { expected: String, found: String },

    /// A directive path would escape the package tree
    #[error("path traversal attempt: {0}")]
    PathTraversal(String),

    /// An otherwise invalid path (empty after normalization, etc.)
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Filesystem operation failure
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an `ExternalTool` error from a tool name and stderr output
    pub fn tool(tool: &str, message: impl Into<String>) -> Self {
        Error::ExternalTool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}
