// src/control.rs

//! The package's own control record (`DEBIAN/control`)
//!
//! Parsed as an ordered field list so a rewrite changes nothing but the
//! `Version` line: field order, continuation lines (multi-line
//! `Description`) and spacing all survive round-tripping byte-for-byte.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// Ordered control fields of a binary package
#[derive(Debug, Clone)]
pub struct ControlRecord {
    fields: Vec<(String, String)>,
}

impl ControlRecord {
    /// Parse control file text. Continuation lines are kept verbatim,
    /// attached to their field.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                // A binary package control file is a single stanza; stop at
                // the first separator
                break;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                match fields.last_mut() {
                    Some((_, value)) => {
                        value.push('\n');
                        value.push_str(line);
                    }
                    None => {
                        return Err(Error::Validation(
                            "control file starts with a continuation line".to_string(),
                        ));
                    }
                }
                continue;
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    fields.push((name.to_string(), value.trim_start().to_string()));
                }
                None => {
                    return Err(Error::Validation(format!(
                        "malformed control line: '{}'",
                        line
                    )));
                }
            }
        }

        let record = ControlRecord { fields };
        for required in ["Package", "Version"] {
            if record.get(required).is_none() {
                return Err(Error::Validation(format!(
                    "control record is missing '{}'",
                    required
                )));
            }
        }
        Ok(record)
    }

    /// Read the control record from a package tree's metadata directory
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Persist the record back, trailing newline included
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// First line of the named field's value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.split('\n').next().unwrap_or(""))
    }

    pub fn package(&self) -> &str {
        self.get("Package").unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        self.get("Version").unwrap_or_default()
    }

    pub fn architecture(&self) -> Option<&str> {
        self.get("Architecture")
    }

    /// Replace the `Version` field; the only mutation this tool performs on
    /// the control record
    pub fn set_version(&mut self, version: &str) {
        if let Some((_, value)) = self.fields.iter_mut().find(|(n, _)| n == "Version") {
            *value = version.to_string();
        }
    }
}

impl fmt::Display for ControlRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            // Continuation lines already carry their leading space
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}
