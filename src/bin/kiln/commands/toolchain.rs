//! `kiln toolchain` command

use anyhow::Result;

use crate::cli::ToolchainArgs;
use kiln::{guess_nvcc_toolchain, guess_toolchain, Toolchain};

pub fn execute(args: ToolchainArgs) -> Result<()> {
    let toolchain: Box<dyn Toolchain> = if args.nvcc {
        Box::new(guess_nvcc_toolchain(0, true))
    } else {
        guess_toolchain(0, args.tc)?
    };

    println!("Toolchain:");
    println!();
    println!("  Kind:      {}", toolchain.platform());
    println!("  Compiler:  {}", toolchain.compiler_path().display());
    println!("  Extension: {}", toolchain.extension_suffix());

    let opts = toolchain.options();
    if !opts.cflags.is_empty() {
        println!("  CFLAGS:    {}", opts.cflags.join(" "));
    }
    if !opts.ldflags.is_empty() {
        println!("  LDFLAGS:   {}", opts.ldflags.join(" "));
    }
    if !opts.libraries.is_empty() {
        println!("  Libraries: {}", opts.libraries.join(" "));
    }

    println!();
    println!("Environment:");
    for var in ["CC", "CXX", "NVCC", "CUDA_PATH"] {
        if let Ok(value) = std::env::var(var) {
            println!("  {}={}", var, value);
        }
    }

    Ok(())
}
