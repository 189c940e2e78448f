//! Toolchain configuration files.
//!
//! Compiler overrides live in two places:
//! - Global: `~/.kiln/toolchain.toml`
//! - Project: `.kiln/toolchain.toml`
//!
//! Project settings take precedence over global ones, field by field.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Toolchain configuration for compiler overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Toolchain settings
    pub toolchain: ToolchainSettings,
}

/// Compiler paths and extra flags applied to every toolchain kiln builds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the GCC C compiler
    pub cc: Option<PathBuf>,

    /// Path to the GCC C++ compiler
    pub cxx: Option<PathBuf>,

    /// Path to clang
    pub clang: Option<PathBuf>,

    /// Path to cl.exe
    pub cl: Option<PathBuf>,

    /// Path to nvcc
    pub nvcc: Option<PathBuf>,

    /// Additional compiler flags
    pub cflags: Vec<String>,

    /// Additional linker flags
    pub ldflags: Vec<String>,

    /// Additional include directories
    pub include_dirs: Vec<PathBuf>,

    /// Library search paths for the link step
    pub library_dirs: Vec<PathBuf>,

    /// Libraries to link (without prefix or extension)
    pub libraries: Vec<String>,
}

impl ToolchainConfig {
    /// Load toolchain configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse toolchain config: {}", path.display()))
    }

    /// Load toolchain configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to load toolchain config from {}: {:#}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainConfig) {
        let ours = &mut self.toolchain;
        let theirs = other.toolchain;

        if theirs.cc.is_some() {
            ours.cc = theirs.cc;
        }
        if theirs.cxx.is_some() {
            ours.cxx = theirs.cxx;
        }
        if theirs.clang.is_some() {
            ours.clang = theirs.clang;
        }
        if theirs.cl.is_some() {
            ours.cl = theirs.cl;
        }
        if theirs.nvcc.is_some() {
            ours.nvcc = theirs.nvcc;
        }
        if !theirs.cflags.is_empty() {
            ours.cflags = theirs.cflags;
        }
        if !theirs.ldflags.is_empty() {
            ours.ldflags = theirs.ldflags;
        }
        if !theirs.include_dirs.is_empty() {
            ours.include_dirs = theirs.include_dirs;
        }
        if !theirs.library_dirs.is_empty() {
            ours.library_dirs = theirs.library_dirs;
        }
        if !theirs.libraries.is_empty() {
            ours.libraries = theirs.libraries;
        }
    }
}

/// Load merged toolchain configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.kiln/toolchain.toml)
/// 2. Global config (~/.kiln/toolchain.toml)
/// 3. Defaults
pub fn load_toolchain_config(global_path: Option<&Path>, project_path: &Path) -> ToolchainConfig {
    let mut config = ToolchainConfig::default();

    if let Some(global) = global_path {
        config.merge(ToolchainConfig::load_or_default(global));
    }

    config.merge(ToolchainConfig::load_or_default(project_path));

    config
}

/// Load the configuration that applies to the current directory.
pub fn load_current_toolchain_config() -> ToolchainConfig {
    let cwd = std::env::current_dir().unwrap_or_default();
    let global = global_toolchain_config_path();
    load_toolchain_config(global.as_deref(), &project_toolchain_config_path(&cwd))
}

/// Get the global kiln config directory (~/.kiln).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".kiln"))
}

/// Get the global toolchain config path (~/.kiln/toolchain.toml).
pub fn global_toolchain_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("toolchain.toml"))
}

/// Get the project toolchain config path (.kiln/toolchain.toml).
pub fn project_toolchain_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".kiln").join("toolchain.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_toolchain_config() {
        let config: ToolchainConfig = toml::from_str(
            r#"
            [toolchain]
            cc = "/usr/bin/gcc-13"
            nvcc = "/usr/local/cuda/bin/nvcc"
            cflags = ["-Wextra"]
            library_dirs = ["/opt/lib"]
            libraries = ["m", "pthread"]
            "#,
        )
        .unwrap();

        assert_eq!(config.toolchain.cc, Some(PathBuf::from("/usr/bin/gcc-13")));
        assert_eq!(
            config.toolchain.nvcc,
            Some(PathBuf::from("/usr/local/cuda/bin/nvcc"))
        );
        assert_eq!(config.toolchain.cflags, vec!["-Wextra"]);
        assert_eq!(config.toolchain.library_dirs, vec![PathBuf::from("/opt/lib")]);
        assert_eq!(config.toolchain.libraries, vec!["m", "pthread"]);
        assert!(config.toolchain.clang.is_none());
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");

        fs::write(
            &global,
            "[toolchain]\ncc = \"/opt/gcc\"\nclang = \"/opt/clang\"\ncflags = [\"-g\"]\nlibraries = [\"m\"]\n",
        )
        .unwrap();
        fs::write(
            &project,
            "[toolchain]\ncc = \"/usr/bin/gcc\"\nlibraries = [\"dl\"]\n",
        )
        .unwrap();

        let config = load_toolchain_config(Some(&global), &project);
        assert_eq!(config.toolchain.cc, Some(PathBuf::from("/usr/bin/gcc")));
        assert_eq!(config.toolchain.clang, Some(PathBuf::from("/opt/clang")));
        assert_eq!(config.toolchain.cflags, vec!["-g"]);
        assert_eq!(config.toolchain.libraries, vec!["dl"]);
    }

    #[test]
    fn test_missing_and_broken_files_fall_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let broken = tmp.path().join("broken.toml");
        fs::write(&broken, "[toolchain\ncc = ").unwrap();

        let config = load_toolchain_config(Some(&broken), &tmp.path().join("missing.toml"));
        assert_eq!(config, ToolchainConfig::default());
    }

    #[test]
    fn test_project_config_path() {
        let path = project_toolchain_config_path(Path::new("/work"));
        assert_eq!(path, Path::new("/work").join(".kiln").join("toolchain.toml"));
    }
}
