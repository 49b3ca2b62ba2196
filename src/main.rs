// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use customdeb::{run, RunConfig};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

#[derive(Parser)]
#[command(name = "customdeb")]
#[command(author, version, about = "Rebuild a Debian package with declarative modifications", long_about = None)]
struct Cli {
    /// Directive file describing the modifications
    directive: PathBuf,

    /// Local .deb archive to modify (downloaded via apt-get when omitted)
    deb: Option<PathBuf>,

    /// Directory receiving the repacked archive
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Download cache directory (default: the user cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

/// Set in the re-executed child so elevation is attempted exactly once
const ELEVATION_MARKER: &str = "CUSTOMDEB_UNDER_FAKEROOT";

/// Re-execute under fakeroot when not already privileged.
///
/// Ownership recorded in the package tree has to survive into the repacked
/// archive, which needs root or a faked root. This runs before anything
/// else and never loops: the child carries a marker variable, and a real
/// root process skips elevation entirely.
fn elevate_once() -> Result<()> {
    if nix::unistd::geteuid().is_root() || std::env::var_os(ELEVATION_MARKER).is_some() {
        return Ok(());
    }

    which::which("fakeroot").context(
        "fakeroot is required to record file ownership without running as root; install it or run as root",
    )?;

    let exe = std::env::current_exe().context("cannot locate own executable")?;
    let status = Command::new("fakeroot")
        .arg(exe)
        .args(std::env::args_os().skip(1))
        .env(ELEVATION_MARKER, "1")
        .status()
        .context("failed to re-execute under fakeroot")?;

    std::process::exit(status.code().unwrap_or(1));
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("customdeb")
}

fn main() -> Result<()> {
    elevate_once()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RunConfig {
        directive: cli.directive,
        archive: cli.deb,
        output_dir: cli.output_dir,
        cache_dir: cli.cache_dir.unwrap_or_else(default_cache_dir),
    };
    debug!("Cache dir: {}", config.cache_dir.display());

    let output = run(&config).context("package modification failed")?;
    println!("Wrote {}", output.display());
    Ok(())
}
