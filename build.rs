// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("customdeb")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rebuild a Debian package with declarative modifications")
        .arg(
            Arg::new("directive")
                .required(true)
                .help("Directive file describing the modifications"),
        )
        .arg(Arg::new("deb").help("Local .deb archive to modify (downloaded via apt-get when omitted)"))
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .default_value(".")
                .help("Directory receiving the repacked archive"),
        )
        .arg(
            Arg::new("cache_dir")
                .long("cache-dir")
                .help("Download cache directory"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    if let Err(e) = fs::write(man_dir.join("customdeb.1"), buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
