//! Command implementations

pub mod build;
pub mod names;
pub mod toolchain;
