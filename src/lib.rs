//! Kiln - compile generated C/C++/CUDA sources into a loadable module
//!
//! This crate selects a native toolchain for the host, materializes generated
//! sources under a read-only discipline, builds them into a shared library and
//! loads the result back into the calling process.

pub mod builder;
pub mod ops;
pub mod util;

pub use builder::{
    copy_source, create_template_names, guess_nvcc_toolchain, guess_toolchain,
    load_dynamic_module, write_templates, LoadedModule, Toolchain, ToolchainKind,
};
pub use ops::{build_template_test, TemplateBuildOptions};
