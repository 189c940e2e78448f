//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kiln::ToolchainKind;

/// Kiln - compile generated C sources into a loadable module
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render templates, build them with a binding file and load the module
    Build(BuildArgs),

    /// Print the generated header and source file names for a module
    Names(NamesArgs),

    /// Show the toolchain that would be used
    Toolchain(ToolchainArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Module name
    pub name: String,

    /// Build directory
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Binding source copied into the build directory
    #[arg(long)]
    pub binding: PathBuf,

    /// Header template rendered to `<name>.gen.h`
    #[arg(long)]
    pub header: PathBuf,

    /// Source template rendered to `<name>.gen.c`
    #[arg(long)]
    pub source: PathBuf,

    /// Debug info level (0-3)
    #[arg(short = 'g', long, default_value_t = 0)]
    pub debug_level: u8,

    /// Optimization level (0-4)
    #[arg(short = 'O', long, default_value_t = 4)]
    pub level: u8,

    /// Preprocessor define (NAME or NAME=VALUE)
    #[arg(short = 'D', long = "define")]
    pub defines: Vec<String>,

    /// Template argument (key=value)
    #[arg(long = "arg", value_parser = parse_key_value)]
    pub template_args: Vec<(String, String)>,

    /// Toolchain to use instead of the platform default
    #[arg(long)]
    pub tc: Option<ToolchainKind>,

    /// Toolchain verbosity (0 = quiet, 1 = commands, 2 = compiler output)
    #[arg(long, default_value_t = 1)]
    pub verbosity: u8,
}

#[derive(Args)]
pub struct NamesArgs {
    /// Module name
    pub name: String,
}

#[derive(Args)]
pub struct ToolchainArgs {
    /// Toolchain to inspect instead of the platform default
    #[arg(long, conflicts_with = "nvcc")]
    pub tc: Option<ToolchainKind>,

    /// Inspect the CUDA toolchain
    #[arg(long)]
    pub nvcc: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", s))
}
