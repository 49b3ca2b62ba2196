// src/changelog.rs

//! Debian changelog handling for binary packages
//!
//! Binary packages ship their changelog gzipped under
//! `usr/share/doc/<package>/`. A new topmost entry is prepended for the
//! computed version, and the rewritten file is re-read afterwards so a
//! version that did not land exactly as computed is caught before repack.

use crate::error::{Error, Result};
use chrono::Local;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Target distribution for the new entry; the modified package was never
/// uploaded anywhere
const DISTRIBUTION: &str = "UNRELEASED";

const URGENCY: &str = "medium";

/// Locate the package's changelog inside the tree, or the path where a
/// fresh one should be created
pub fn locate(tree: &Path, package: &str) -> PathBuf {
    let doc_dir = tree.join("usr/share/doc").join(package);
    for candidate in ["changelog.Debian.gz", "changelog.gz"] {
        let path = doc_dir.join(candidate);
        if path.is_file() {
            return path;
        }
    }
    doc_dir.join("changelog.Debian.gz")
}

/// Prepend a new entry for `version` to the gzipped changelog at `path`,
/// creating the file (and its directory) when the package ships none
pub fn prepend_entry(path: &Path, package: &str, version: &str, message: &str) -> Result<()> {
    let existing = if path.is_file() {
        read_gz(path)?
    } else {
        warn!(
            "Package ships no changelog; creating {}",
            path.display()
        );
        String::new()
    };

    let entry = render_entry(package, version, message, &maintainer(), &timestamp());
    debug!("Prepending changelog entry for version {}", version);

    let mut text = entry;
    if !existing.is_empty() {
        text.push('\n');
        text.push_str(&existing);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_gz(path, &text)
}

/// Version declared by the topmost entry of the changelog at `path`
pub fn topmost_version(path: &Path) -> Result<String> {
    let text = read_gz(path)?;
    parse_topmost(&text)
        .map(|(_, version)| version)
        .ok_or_else(|| Error::Validation(format!("no changelog entry found in {}", path.display())))
}

/// Extract (source, version) from the first entry line of changelog text
pub fn parse_topmost(text: &str) -> Option<(String, String)> {
    // Entry lines look like: "foo (1.2-3) unstable; urgency=medium"
    static ENTRY_LINE: OnceLock<Regex> = OnceLock::new();
    let re = ENTRY_LINE.get_or_init(|| Regex::new(r"^(\S+) \(([^()]+)\)").expect("static regex"));
    text.lines()
        .find(|l| !l.trim().is_empty())
        .and_then(|line| re.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// Render one complete changelog entry
pub fn render_entry(
    package: &str,
    version: &str,
    message: &str,
    maintainer: &str,
    date: &str,
) -> String {
    let mut out = format!("{} ({}) {}; urgency={}\n\n", package, version, DISTRIBUTION, URGENCY);
    for (i, line) in message.lines().enumerate() {
        if i == 0 {
            out.push_str("  * ");
        } else {
            out.push_str("    ");
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("\n -- {}  {}\n", maintainer, date));
    out
}

/// Entry author, taken from the usual debchange environment variables
fn maintainer() -> String {
    let name = std::env::var("DEBFULLNAME").unwrap_or_else(|_| "customdeb".to_string());
    let email = std::env::var("DEBEMAIL").unwrap_or_else(|_| "customdeb@localhost".to_string());
    format!("{} <{}>", name, email)
}

fn timestamp() -> String {
    Local::now().format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

fn read_gz(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

fn write_gz(path: &Path, text: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish()?;
    Ok(())
}
