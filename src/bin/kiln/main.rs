//! Kiln CLI - build generated sources into a loadable module

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("kiln=debug")
    } else {
        EnvFilter::new("kiln=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Names(args) => commands::names::execute(args),
        Commands::Toolchain(args) => commands::toolchain::execute(args),
    }
}
