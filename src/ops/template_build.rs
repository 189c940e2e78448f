//! Build-and-load of generated template modules.
//!
//! The pipeline is linear: generate sources, configure the toolchain, copy the
//! binding file, build, clean intermediates, load. Any stage failing aborts
//! the whole call.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::builder::loader::{DynamicLoader, LoadedModule, ModuleLoader};
use crate::builder::templates::{copy_source, GeneratedSources, GeneratorArgs, SourceGenerator};
use crate::builder::toolchain::{guess_toolchain, Toolchain};

/// Options for [`build_template_test`].
#[derive(Debug, Clone)]
pub struct TemplateBuildOptions {
    /// Toolchain verbosity, applied before building
    pub verbose: u8,
    /// Debug info level (0..=3)
    pub debug_level: u8,
    /// Optimization level (0..=4)
    pub level: u8,
    /// Preprocessor defines; `None` adds nothing
    pub defines: Option<Vec<String>>,
    /// Passed through to the generator untouched
    pub generator_args: GeneratorArgs,
}

impl Default for TemplateBuildOptions {
    fn default() -> Self {
        TemplateBuildOptions {
            verbose: 2,
            debug_level: 0,
            level: 4,
            defines: None,
            generator_args: GeneratorArgs::new(),
        }
    }
}

/// Generate, build and load the module `name` in `path` with the host toolchain.
///
/// `binding_name` is copied into `path` and compiled alongside the generated
/// sources. The module ends up at `path/<name><extension suffix>`. The host
/// toolchain is selected once the generator has run.
pub fn build_template_test<G>(
    name: &str,
    path: &Path,
    binding_name: &Path,
    generator: &G,
    opts: &TemplateBuildOptions,
) -> Result<LoadedModule>
where
    G: SourceGenerator + ?Sized,
{
    let generated = generate_sources(name, path, generator, opts)?;
    let mut toolchain = guess_toolchain(opts.verbose, None)?;
    build_generated(
        toolchain.as_mut(),
        &DynamicLoader,
        name,
        path,
        binding_name,
        generated,
        opts,
    )
}

/// [`build_template_test`] with an explicit toolchain and loader.
///
/// `opts` overrides the toolchain's verbosity and levels.
pub fn build_template_test_with<L, G>(
    toolchain: &mut dyn Toolchain,
    loader: &L,
    name: &str,
    path: &Path,
    binding_name: &Path,
    generator: &G,
    opts: &TemplateBuildOptions,
) -> Result<L::Module>
where
    L: ModuleLoader,
    G: SourceGenerator + ?Sized,
{
    let generated = generate_sources(name, path, generator, opts)?;
    build_generated(toolchain, loader, name, path, binding_name, generated, opts)
}

fn generate_sources<G>(
    name: &str,
    path: &Path,
    generator: &G,
    opts: &TemplateBuildOptions,
) -> Result<GeneratedSources>
where
    G: SourceGenerator + ?Sized,
{
    tracing::debug!("Generating sources for `{}`", name);
    generator
        .generate(name, &path.join(name), &opts.generator_args)
        .with_context(|| format!("generator failed for `{}`", name))
}

fn build_generated<L: ModuleLoader>(
    toolchain: &mut dyn Toolchain,
    loader: &L,
    name: &str,
    path: &Path,
    binding_name: &Path,
    generated: GeneratedSources,
    opts: &TemplateBuildOptions,
) -> Result<L::Module> {
    toolchain.options_mut().verbose = opts.verbose;
    toolchain.with_optimization_level(opts.debug_level, opts.level)?;
    if let Some(defines) = &opts.defines {
        let names: Vec<&str> = defines.iter().map(String::as_str).collect();
        toolchain.add_define(&names);
    }

    let binding_file = binding_name
        .file_name()
        .ok_or_else(|| anyhow!("binding path has no file name: {}", binding_name.display()))?;
    let binding = path.join(binding_file);
    copy_source(binding_name, &binding)?;

    let mut sources = generated.into_paths();
    sources.push(binding);

    let output = path.join(format!("{}{}", name, toolchain.extension_suffix()));

    tracing::debug!(
        "Building {} from {} source(s) with {}",
        output.display(),
        sources.len(),
        toolchain.platform()
    );
    toolchain
        .build(&output, &sources)
        .with_context(|| format!("failed to build `{}`", output.display()))?;
    toolchain.clear_path(path)?;

    let module = loader.load(&output, None)?;
    tracing::info!("Built and loaded {}", output.display());

    Ok(module)
}
