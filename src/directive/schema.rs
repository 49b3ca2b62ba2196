// src/directive/schema.rs

//! Schema validation for directive stanzas
//!
//! The first stanza of a directive file is the header (package-wide
//! settings); every following stanza describes one file operation. Each
//! stanza kind has a fixed field set, checked by exhaustive matching:
//! unknown fields and missing required fields are both fatal, so a typo in
//! a directive never turns into a silently skipped change.

use crate::directive::parser::Stanza;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Appended between the package version and the Mod-Version value
pub const VERSION_SUFFIX: &str = "customdeb";

/// Changelog text used when the header carries no `Changes` field
pub const DEFAULT_CHANGES: &str = "Package modified with customdeb.";

/// Validated header stanza
#[derive(Debug, Clone)]
pub struct Header {
    /// Name of the package to modify
    pub package: String,
    /// Appended to the version string after the fixed suffix; defaults to "0"
    pub mod_version: String,
    /// Changelog entry text
    pub changes: String,
    /// Optional directory overlaid onto the extracted tree before the
    /// operations run
    pub files: Option<PathBuf>,
}

/// Owner specification of an operation: numeric id or a name resolved
/// against the system database at apply time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSpec {
    Id(u32),
    Name(String),
}

impl OwnerSpec {
    fn parse(token: &str) -> Self {
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            // All-digit tokens are ids; resolution of names is deferred to
            // the patch engine
            match token.parse() {
                Ok(id) => OwnerSpec::Id(id),
                Err(_) => OwnerSpec::Name(token.to_string()),
            }
        } else {
            OwnerSpec::Name(token.to_string())
        }
    }
}

/// Validated operation stanza
#[derive(Debug, Clone)]
pub struct Operation {
    /// Path relative to the package root (leading separator stripped)
    pub file: String,
    /// Full replacement contents, already normalized: one leading blank
    /// line trimmed, exactly one trailing newline
    pub content: Option<String>,
    /// File mode bits, parsed from the octal `Permission` field
    pub mode: Option<u32>,
    /// `Owner` field split into (user, group)
    pub owner: Option<(OwnerSpec, OwnerSpec)>,
}

/// A fully validated directive: one header plus the ordered operations
#[derive(Debug, Clone)]
pub struct Directive {
    pub header: Header,
    pub operations: Vec<Operation>,
}

impl Directive {
    /// Validate a parsed stanza sequence. The first stanza is always the
    /// header.
    pub fn from_stanzas(stanzas: &[Stanza]) -> Result<Self> {
        let (header, operations) = stanzas
            .split_first()
            .ok_or_else(|| Error::Validation("directive has no header stanza".to_string()))?;

        Ok(Directive {
            header: Header::from_stanza(header)?,
            operations: operations
                .iter()
                .map(Operation::from_stanza)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

impl Header {
    pub fn from_stanza(stanza: &Stanza) -> Result<Self> {
        for (name, _) in stanza.fields() {
            match name {
                "Package" | "Mod-Version" | "Changes" | "Files" => {}
                other => {
                    return Err(Error::Validation(format!(
                        "unknown field '{}' in header stanza",
                        other
                    )));
                }
            }
        }

        let package = stanza
            .get("Package")
            .ok_or_else(|| Error::Validation("header stanza is missing 'Package'".to_string()))?
            .to_string();

        Ok(Header {
            package,
            mod_version: stanza.get("Mod-Version").unwrap_or("0").to_string(),
            changes: stanza
                .get("Changes")
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_CHANGES.to_string()),
            files: stanza.get("Files").map(PathBuf::from),
        })
    }
}

impl Operation {
    pub fn from_stanza(stanza: &Stanza) -> Result<Self> {
        for (name, _) in stanza.fields() {
            match name {
                "File" | "Owner" | "Permission" | "Content" => {}
                other => {
                    return Err(Error::Validation(format!(
                        "unknown field '{}' in operation stanza",
                        other
                    )));
                }
            }
        }

        let file = stanza
            .get("File")
            .ok_or_else(|| Error::Validation("operation stanza is missing 'File'".to_string()))?;
        let file = file.strip_prefix('/').unwrap_or(file).to_string();

        let mode = stanza
            .get("Permission")
            .map(|p| {
                u32::from_str_radix(p, 8).map_err(|_| {
                    Error::Validation(format!("'Permission' is not an octal mode: '{}'", p))
                })
            })
            .transpose()?;

        let owner = stanza.get("Owner").map(parse_owner).transpose()?;

        Ok(Operation {
            file,
            content: stanza.get("Content").map(normalize_content),
            mode,
            owner,
        })
    }
}

/// Split an `Owner` value into exactly two whitespace-separated tokens
fn parse_owner(value: &str) -> Result<(OwnerSpec, OwnerSpec)> {
    let mut tokens = value.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(user), Some(group), None) => Ok((OwnerSpec::parse(user), OwnerSpec::parse(group))),
        _ => Err(Error::Validation(format!(
            "'Owner' must be two tokens (user and group), got '{}'",
            value
        ))),
    }
}

/// Normalize a `Content` value: strip one leading blank line if present,
/// then guarantee exactly one trailing newline regardless of how many the
/// source had.
fn normalize_content(value: &str) -> String {
    let body = value.strip_prefix('\n').unwrap_or(value);
    let mut out = body.trim_end_matches('\n').to_string();
    out.push('\n');
    out
}
