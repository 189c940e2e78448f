//! `kiln build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use kiln::builder::{DynamicLoader, TemplateFileGenerator};
use kiln::ops::{build_template_test_with, TemplateBuildOptions};
use kiln::guess_toolchain;

pub fn execute(args: BuildArgs) -> Result<()> {
    let mut toolchain = guess_toolchain(args.verbosity, args.tc)?;
    let generator = TemplateFileGenerator::new(args.header, args.source);

    let opts = TemplateBuildOptions {
        verbose: args.verbosity,
        debug_level: args.debug_level,
        level: args.level,
        defines: (!args.defines.is_empty()).then_some(args.defines),
        generator_args: args.template_args.into_iter().collect(),
    };

    kiln::util::fs::ensure_dir(&args.path)?;

    let module = build_template_test_with(
        toolchain.as_mut(),
        &DynamicLoader,
        &args.name,
        &args.path,
        &args.binding,
        &generator,
        &opts,
    )?;

    println!("Loaded {} from {}", module.name(), module.path().display());
    Ok(())
}
