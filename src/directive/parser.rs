// src/directive/parser.rs

//! Stanza parser for the modification directive format
//!
//! The directive file is a sequence of blank-line-separated stanzas in a
//! deb822-like syntax, extended with comments:
//!
//! - `Name: value` starts a field; field names are case-sensitive.
//! - A line beginning with a space or tab continues the previous field's
//!   value. Continuations are newline-joined after the single leading
//!   indentation character is removed.
//! - A continuation line consisting solely of `.` contributes a literal
//!   empty line to the value (truly blank lines end the stanza instead).
//! - `#` starts a comment running to end of line; `##` is the escape for a
//!   literal `#`.
//! - A line that is blank after comment stripping ends the current stanza.
//!
//! Stanzas preserve field order and tolerate duplicate field names; lookups
//! return the first occurrence. The schema layer decides which fields are
//! legal where.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// One logical record of the directive file: an ordered list of
/// (field, value) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    fields: Vec<(String, String)>,
}

impl Stanza {
    /// Value of the first field with this name, if any
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, name: String, value: String) {
        self.fields.push((name, value));
    }

    fn append_continuation(&mut self, text: &str) {
        // Caller guarantees at least one field exists
        if let Some((_, value)) = self.fields.last_mut() {
            value.push('\n');
            value.push_str(text);
        }
    }
}

impl fmt::Display for Stanza {
    /// Serialize back to directive syntax. Multi-line values become
    /// continuation lines, empty lines become the `.` marker and literal
    /// `#` characters are doubled, so the output re-parses to an equal
    /// stanza.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            let mut lines = value.split('\n');
            let first = lines.next().unwrap_or("");
            writeln!(f, "{}: {}", name, escape_comment_chars(first))?;
            for line in lines {
                if line.is_empty() {
                    writeln!(f, " .")?;
                } else {
                    writeln!(f, " {}", escape_comment_chars(line))?;
                }
            }
        }
        Ok(())
    }
}

fn escape_comment_chars(s: &str) -> String {
    s.replace('#', "##")
}

/// Strip an unescaped `#` comment from a line, un-doubling `##` escapes
fn strip_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '#' {
            if chars.peek() == Some(&'#') {
                chars.next();
                out.push('#');
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse directive text into an ordered sequence of stanzas.
///
/// The first stanza is the header; the rest describe one operation each.
/// Fails if the input contains no stanza at all, or on any line that is
/// neither a field, a continuation, nor blank.
pub fn parse_str(input: &str) -> Result<Vec<Stanza>> {
    let mut stanzas = Vec::new();
    let mut current = Stanza::default();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line);
        let trimmed = line.trim_end();

        if trimmed.trim().is_empty() {
            // Blank after comment stripping: stanza boundary
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if current.is_empty() {
                return Err(Error::Parse {
                    line: line_no,
                    message: "continuation line with no preceding field".to_string(),
                });
            }
            // Drop the single indentation character; `.` marks a literal
            // empty line inside the value
            let text = &trimmed[1..];
            if text == "." {
                current.append_continuation("");
            } else {
                current.append_continuation(text);
            }
            continue;
        }

        match trimmed.split_once(':') {
            Some((name, value)) if !name.is_empty() && !name.contains(char::is_whitespace) => {
                current.push(name.to_string(), value.trim().to_string());
            }
            _ => {
                return Err(Error::Parse {
                    line: line_no,
                    message: format!("expected 'Field: value', got '{}'", trimmed),
                });
            }
        }
    }

    if !current.is_empty() {
        stanzas.push(current);
    }

    if stanzas.is_empty() {
        return Err(Error::Parse {
            line: 1,
            message: "directive file contains no stanzas".to_string(),
        });
    }

    Ok(stanzas)
}

/// Parse a directive file from disk
pub fn parse_file(path: &Path) -> Result<Vec<Stanza>> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Usage(format!("cannot read directive file {}: {}", path.display(), e)))?;
    parse_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_stanza() {
        let stanzas = parse_str("Package: foo\nMod-Version: 2\n").unwrap();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].get("Package"), Some("foo"));
        assert_eq!(stanzas[0].get("Mod-Version"), Some("2"));
    }

    #[test]
    fn test_blank_line_separates_stanzas() {
        let stanzas = parse_str("Package: foo\n\nFile: /etc/foo.conf\n").unwrap();
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[1].get("File"), Some("/etc/foo.conf"));
    }

    #[test]
    fn test_multiple_blank_lines_collapse() {
        let stanzas = parse_str("Package: foo\n\n\n\nFile: a\n\n").unwrap();
        assert_eq!(stanzas.len(), 2);
    }

    #[test]
    fn test_continuation_newline_joined() {
        let stanzas = parse_str("Field: a\n value continued\n more\n").unwrap();
        assert_eq!(stanzas[0].get("Field"), Some("a\nvalue continued\nmore"));
    }

    #[test]
    fn test_literal_empty_line_marker() {
        let stanzas = parse_str("Content: first\n .\n third\n").unwrap();
        assert_eq!(stanzas[0].get("Content"), Some("first\n\nthird"));
    }

    #[test]
    fn test_comment_stripping() {
        let stanzas = parse_str("Field: value # comment\n").unwrap();
        assert_eq!(stanzas[0].get("Field"), Some("value"));
    }

    #[test]
    fn test_doubled_marker_escapes() {
        let stanzas = parse_str("Field: a ## b\n").unwrap();
        assert_eq!(stanzas[0].get("Field"), Some("a # b"));
    }

    #[test]
    fn test_comment_only_line_is_boundary() {
        // A line that is blank after comment stripping ends the stanza
        let stanzas = parse_str("Package: foo\n# note\nFile: a\n").unwrap();
        assert_eq!(stanzas.len(), 2);
    }

    #[test]
    fn test_continuation_without_field_fails() {
        let err = parse_str(" dangling\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn test_malformed_line_fails() {
        let err = parse_str("Package: foo\nnot a field line\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(parse_str("").is_err());
        assert!(parse_str("\n\n# only comments\n").is_err());
    }

    #[test]
    fn test_duplicate_fields_kept_first_wins() {
        let stanzas = parse_str("File: a\nFile: b\n").unwrap();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].get("File"), Some("a"));
        assert_eq!(stanzas[0].fields().count(), 2);
    }

    #[test]
    fn test_reparse_roundtrip() {
        let input = "Package: foo\nChanges: line one\n .\n with ## marker\n";
        let stanzas = parse_str(input).unwrap();
        let serialized = stanzas[0].to_string();
        let reparsed = parse_str(&serialized).unwrap();
        assert_eq!(stanzas[0], reparsed[0]);
    }

    #[test]
    fn test_value_leading_whitespace_trimmed() {
        let stanzas = parse_str("Field:    spaced\n").unwrap();
        assert_eq!(stanzas[0].get("Field"), Some("spaced"));
    }
}
