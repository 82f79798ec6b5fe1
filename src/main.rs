#![forbid(unsafe_code)]

//! stp: Stale Tree Pruner CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse_from(cli_app::normalize_legacy_flags(std::env::args_os()));
    if let Err(e) = cli_app::run(&args) {
        eprintln!("stp: {e}");
        std::process::exit(e.exit_code());
    }
}
