//! High-level operations.

pub mod template_build;

pub use template_build::{build_template_test, build_template_test_with, TemplateBuildOptions};
