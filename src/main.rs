#![forbid(unsafe_code)]

//! archive-rotate CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    let status = cli_app::run(&args);
    std::process::exit(i32::from(status.code()));
}
