//! Compiling sources into loadable modules.
//!
//! This module holds the toolchain drivers, the generated-source helpers and
//! the dynamic module loader.

pub mod loader;
pub mod templates;
pub mod toolchain;

pub use loader::{load_dynamic_module, DynamicLoader, LoadError, LoadedModule, ModuleLoader};
pub use templates::{
    copy_source, create_template_names, write_templates, GeneratedSources, GeneratorArgs,
    SourceGenerator, TemplateFileGenerator, TemplateNames,
};
pub use toolchain::{
    guess_nvcc_toolchain, guess_toolchain, CommandSpec, CompileOptions, GccToolchain,
    MsvcToolchain, NvccToolchain, Toolchain, ToolchainError, ToolchainKind, ToolchainPlatform,
};
