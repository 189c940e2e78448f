//! Toolchain error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error selecting, configuring, or running a toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("no default toolchain for platform `{platform}`")]
    UnsupportedPlatform { platform: String },

    #[error("unknown toolchain `{name}` (expected one of: msvc, gcc, clang)")]
    UnknownToolchain { name: String },

    #[error("invalid optimization settings: debug level {debug_level} (max 3), level {level} (max 4)")]
    InvalidOptimizationLevel { debug_level: u8, level: u8 },

    #[error("no compilable sources for `{}`", output.display())]
    NoSources { output: PathBuf },

    #[error("`{command}` failed with exit code {code:?}\n{stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}
