//! recconv - Inspect and convert classdef record containers.
//!
//! This tool reads records saved from classdef objects in either the text
//! format or Level 5 MAT files, and writes them back out in the other one.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::Args;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp(None)
        .init();

    // Run the appropriate command
    if let Err(e) = run(args) {
        output::print_error(&e);
        std::process::exit(1);
    }
}

/// Main dispatch function.
fn run(args: Args) -> Result<()> {
    // Validate arguments
    args.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

    // Dispatch to appropriate command
    if args.list {
        commands::list::run(&args)
    } else if args.dry_run {
        commands::validate::run(&args)
    } else {
        commands::convert::run(&args)
    }
}
