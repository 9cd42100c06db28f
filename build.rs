// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn location_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("downloads")
            .short('d')
            .long("downloads")
            .value_name("DIR")
            .default_value("downloads")
            .help("Downloads root holding the snapshot, archive cache and expansions"),
    )
    .arg(
        Arg::new("registry_url")
            .long("registry-url")
            .value_name("URL")
            .default_value("https://s3.amazonaws.com/extend.brackets/registry.json")
            .help("Registry document URL"),
    )
    .arg(
        Arg::new("archive_base")
            .long("archive-base")
            .value_name("URL")
            .default_value("https://s3.amazonaws.com/extend.brackets")
            .help("Base URL of per-package archives"),
    )
    .arg(
        Arg::new("archive_ext")
            .long("archive-ext")
            .value_name("EXT")
            .default_value("zip")
            .help("Archive file extension (zip, tar.gz, tgz, tar.xz, tar.zst)"),
    )
    .arg(
        Arg::new("timeout")
            .long("timeout")
            .value_name("SECS")
            .default_value("30")
            .help("HTTP timeout in seconds"),
    )
}

fn build_cli() -> Command {
    Command::new("regsync")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Regsync Contributors")
        .about("Mirror a remote package registry into a local directory")
        .subcommand_required(false)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::Count)
                .help("Increase log verbosity (RUST_LOG takes precedence)"),
        )
        .subcommand(
            location_args(
                Command::new("sync").about("Download changed packages and refresh their expansions"),
            )
            .arg(
                Arg::new("jobs")
                    .short('j')
                    .long("jobs")
                    .default_value("5")
                    .help("Maximum packages updated at once"),
            )
            .arg(
                Arg::new("sequential")
                    .long("sequential")
                    .action(clap::ArgAction::SetTrue)
                    .help("Update one package at a time, in registry order"),
            )
            .arg(
                Arg::new("strict")
                    .long("strict")
                    .action(clap::ArgAction::SetTrue)
                    .help("Exit with an error if any package or the snapshot write failed"),
            ),
        )
        .subcommand(location_args(
            Command::new("plan").about("Show what a sync would do without changing anything"),
        ))
        .subcommand(
            Command::new("status")
                .about("Show the packages recorded in the local snapshot")
                .arg(
                    Arg::new("downloads")
                        .short('d')
                        .long("downloads")
                        .default_value("downloads")
                        .help("Downloads root"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("regsync.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
