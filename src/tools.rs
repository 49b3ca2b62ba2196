// src/tools.rs

//! Typed wrappers around the external tools the pipeline delegates to
//!
//! Archive handling belongs to `dpkg-deb` and fetching to `apt-get`; this
//! module is the only place that spawns them. Every call uses a structured
//! argument list (never a shell string) and surfaces the tool's stderr in
//! the error on a non-zero exit.

use crate::control::ControlRecord;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Fail early when a required external tool is not on PATH
pub fn require(tool: &str) -> Result<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| Error::tool(tool, "not found on PATH"))
}

/// Run a tool to completion, returning its stdout
fn run(tool: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    debug!("Running {} {:?}", tool, args);
    let mut command = Command::new(tool);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .map_err(|e| Error::tool(tool, format!("failed to run: {}", e)))?;

    if !output.status.success() {
        return Err(Error::tool(
            tool,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Download the latest archive of `package` into the cache directory,
/// reusing a previously cached file with the same name.
///
/// `apt-get download --print-uris` reveals the archive filename without
/// fetching, so a cache hit skips the download entirely. The cache is
/// append-only: an existing file is never overwritten.
pub fn fetch(package: &str, cache_dir: &Path, scratch: &Path) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir)?;

    let uris = run("apt-get", &["download", "--print-uris", package], None)?;
    let filename = parse_download_filename(&uris).ok_or_else(|| {
        Error::tool(
            "apt-get",
            format!("no downloadable archive found for '{}'", package),
        )
    })?;

    let cached = cache_dir.join(&filename);
    if cached.is_file() {
        info!("Using cached archive {}", cached.display());
        return Ok(cached);
    }

    info!("Downloading {}", filename);
    run("apt-get", &["download", package], Some(scratch))?;

    let downloaded = scratch.join(&filename);
    if !downloaded.is_file() {
        return Err(Error::tool(
            "apt-get",
            format!("download did not produce expected file '{}'", filename),
        ));
    }

    // Scratch and cache may live on different filesystems
    fs::copy(&downloaded, &cached)?;
    Ok(cached)
}

/// Filename from the `'uri' filename size checksum` line apt-get prints
fn parse_download_filename(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|l| l.starts_with('\''))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_string)
        .next()
}

/// Unpack the archive's payload into `dest`
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    run(
        "dpkg-deb",
        &[
            "--extract",
            &archive.to_string_lossy(),
            &dest.to_string_lossy(),
        ],
        None,
    )?;
    Ok(())
}

/// Unpack the archive's control area into `dest_subdir`
pub fn extract_metadata(archive: &Path, dest_subdir: &Path) -> Result<()> {
    run(
        "dpkg-deb",
        &[
            "--control",
            &archive.to_string_lossy(),
            &dest_subdir.to_string_lossy(),
        ],
        None,
    )?;
    Ok(())
}

/// Build a new archive from the modified tree.
///
/// The output filename is derived from the reconciled control record, so
/// the caller knows the artifact path without scraping dpkg-deb's stdout.
pub fn repack(tree: &Path, output_dir: &Path) -> Result<PathBuf> {
    let control = ControlRecord::read(&tree.join("DEBIAN/control"))?;
    let filename = format!(
        "{}_{}_{}.deb",
        control.package(),
        control.version(),
        control.architecture().unwrap_or("all")
    );

    fs::create_dir_all(output_dir)?;
    let output = output_dir.join(filename);

    run(
        "dpkg-deb",
        &[
            "--build",
            &tree.to_string_lossy(),
            &output.to_string_lossy(),
        ],
        None,
    )?;

    info!("Built {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let out = run("echo", &["hello"], None).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_run_surfaces_failure() {
        let err = run("false", &[], None).unwrap_err();
        assert!(matches!(err, Error::ExternalTool { .. }));
    }

    #[test]
    fn test_run_missing_tool() {
        let err = run("no-such-tool-zzz", &[], None).unwrap_err();
        assert!(matches!(err, Error::ExternalTool { .. }));
    }

    #[test]
    fn test_parse_download_filename() {
        let output = "'http://deb.example.org/pool/main/f/foo/foo_1.2-3_amd64.deb' \
                      foo_1.2-3_amd64.deb 12345 SHA256:abcdef\n";
        assert_eq!(
            parse_download_filename(output),
            Some("foo_1.2-3_amd64.deb".to_string())
        );
    }

    #[test]
    fn test_parse_download_filename_ignores_chatter() {
        let output = "Reading package lists...\nNOTE: something\n";
        assert_eq!(parse_download_filename(output), None);
    }

    #[test]
    fn test_require_known_tool() {
        assert!(require("sh").is_ok());
        assert!(require("no-such-tool-zzz").is_err());
    }
}
