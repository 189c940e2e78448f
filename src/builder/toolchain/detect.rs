//! Toolchain selection.

use std::path::PathBuf;

use anyhow::Result;

use crate::util::config::{load_current_toolchain_config, ToolchainConfig};
use crate::util::process::find_executable;

use super::{
    CompileOptions, GccToolchain, MsvcToolchain, NvccToolchain, Toolchain, ToolchainError,
    ToolchainKind,
};

/// Map a platform key (as in `std::env::consts::OS`) to its default toolchain.
pub fn toolchain_for_platform(os: &str) -> Result<ToolchainKind, ToolchainError> {
    match os {
        "windows" => Ok(ToolchainKind::Msvc),
        "linux" => Ok(ToolchainKind::Gcc),
        "macos" => Ok(ToolchainKind::Clang),
        other => Err(ToolchainError::UnsupportedPlatform {
            platform: other.to_string(),
        }),
    }
}

/// Default toolchain for the host this process runs on.
pub fn host_toolchain_kind() -> Result<ToolchainKind, ToolchainError> {
    toolchain_for_platform(std::env::consts::OS)
}

/// Construct a host C toolchain.
///
/// With `tc == None` the kind is inferred from the host platform. Compiler
/// paths and extra flags come from the toolchain config files.
pub fn guess_toolchain(verbose: u8, tc: Option<ToolchainKind>) -> Result<Box<dyn Toolchain>> {
    guess_toolchain_with_config(verbose, tc, &load_current_toolchain_config())
}

/// Like [`guess_toolchain`], with an explicit configuration.
pub fn guess_toolchain_with_config(
    verbose: u8,
    tc: Option<ToolchainKind>,
    config: &ToolchainConfig,
) -> Result<Box<dyn Toolchain>> {
    let kind = match tc {
        Some(kind) => kind,
        None => host_toolchain_kind()?,
    };

    let settings = &config.toolchain;
    let options = CompileOptions::from_settings(verbose, settings);

    let toolchain: Box<dyn Toolchain> = match kind {
        ToolchainKind::Gcc => {
            let cc = resolve_compiler(settings.cc.as_ref(), Some("CC"), &["gcc", "cc"]);
            let mut gcc = GccToolchain::gcc(cc, options);
            if let Some(cxx) = resolve_configured(settings.cxx.as_ref())
                .or_else(|| std::env::var("CXX").ok().map(PathBuf::from))
            {
                gcc.cxx = cxx;
            }
            Box::new(gcc)
        }
        ToolchainKind::Clang => {
            let cc = resolve_compiler(settings.clang.as_ref(), None, &["clang"]);
            Box::new(GccToolchain::clang(cc, options))
        }
        ToolchainKind::Msvc => {
            let cl = resolve_compiler(settings.cl.as_ref(), None, &["cl"]);
            Box::new(MsvcToolchain::from_cl(cl, options))
        }
    };

    tracing::debug!(
        "Selected {} toolchain: {}",
        toolchain.platform(),
        toolchain.compiler_path().display()
    );

    Ok(toolchain)
}

/// Construct the CUDA toolchain.
///
/// `for_extension` selects a module meant for the dynamic loader over a
/// process-level library.
pub fn guess_nvcc_toolchain(verbose: u8, for_extension: bool) -> NvccToolchain {
    guess_nvcc_toolchain_with_config(verbose, for_extension, &load_current_toolchain_config())
}

/// Like [`guess_nvcc_toolchain`], with an explicit configuration.
pub fn guess_nvcc_toolchain_with_config(
    verbose: u8,
    for_extension: bool,
    config: &ToolchainConfig,
) -> NvccToolchain {
    let settings = &config.toolchain;

    let nvcc = resolve_configured(settings.nvcc.as_ref())
        .or_else(|| std::env::var("NVCC").ok().filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(|| find_executable("nvcc"))
        .or_else(|| {
            let path = PathBuf::from(std::env::var("CUDA_PATH").ok()?)
                .join("bin")
                .join(if cfg!(target_os = "windows") { "nvcc.exe" } else { "nvcc" });
            path.exists().then_some(path)
        })
        .unwrap_or_else(|| PathBuf::from("nvcc"));

    tracing::debug!("Selected nvcc toolchain: {}", nvcc.display());

    NvccToolchain::new(
        nvcc,
        for_extension,
        CompileOptions::from_settings(verbose, settings),
    )
}

/// A configured path, if it points at an existing file.
fn resolve_configured(configured: Option<&PathBuf>) -> Option<PathBuf> {
    let path = configured?;
    if path.exists() {
        Some(path.clone())
    } else {
        tracing::warn!("Configured compiler not found: {}", path.display());
        None
    }
}

/// Find a compiler: config, then environment variable, then PATH.
///
/// Falls back to the first candidate name so a missing compiler surfaces as a
/// spawn error when the build runs.
fn resolve_compiler(
    configured: Option<&PathBuf>,
    env_var: Option<&str>,
    candidates: &[&str],
) -> PathBuf {
    if let Some(path) = resolve_configured(configured) {
        return path;
    }

    if let Some(value) = env_var
        .and_then(|var| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
    {
        return PathBuf::from(value);
    }

    candidates
        .iter()
        .find_map(|name| find_executable(name))
        .unwrap_or_else(|| PathBuf::from(candidates[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::ToolchainPlatform;
    use tempfile::TempDir;

    #[test]
    fn test_platform_mapping() {
        assert_eq!(toolchain_for_platform("windows").unwrap(), ToolchainKind::Msvc);
        assert_eq!(toolchain_for_platform("linux").unwrap(), ToolchainKind::Gcc);
        assert_eq!(toolchain_for_platform("macos").unwrap(), ToolchainKind::Clang);
    }

    #[test]
    fn test_unsupported_platform() {
        for os in ["freebsd", "android", "ios", ""] {
            let err = toolchain_for_platform(os).unwrap_err();
            assert!(
                matches!(err, ToolchainError::UnsupportedPlatform { ref platform } if platform == os)
            );
        }
    }

    #[test]
    fn test_explicit_kind_selects_family() {
        let config = ToolchainConfig::default();

        for (kind, platform) in [
            (ToolchainKind::Msvc, ToolchainPlatform::Msvc),
            (ToolchainKind::Gcc, ToolchainPlatform::Gcc),
            (ToolchainKind::Clang, ToolchainPlatform::Clang),
        ] {
            let toolchain = guess_toolchain_with_config(1, Some(kind), &config).unwrap();
            assert_eq!(toolchain.platform(), platform);
            assert_eq!(toolchain.options().verbose, 1);
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_host_default_on_linux() {
        let toolchain = guess_toolchain_with_config(0, None, &ToolchainConfig::default()).unwrap();
        assert_eq!(toolchain.platform(), ToolchainPlatform::Gcc);
    }

    #[test]
    fn test_configured_compiler_and_flags() {
        let tmp = TempDir::new().unwrap();
        let clang = tmp.path().join("clang-17");
        std::fs::write(&clang, "").unwrap();

        let mut config = ToolchainConfig::default();
        config.toolchain.clang = Some(clang.clone());
        config.toolchain.cflags = vec!["-Wextra".to_string()];

        let toolchain =
            guess_toolchain_with_config(0, Some(ToolchainKind::Clang), &config).unwrap();
        assert_eq!(toolchain.compiler_path(), clang.as_path());
        assert_eq!(toolchain.options().cflags, vec!["-Wextra"]);
    }

    #[test]
    fn test_missing_configured_compiler_is_ignored() {
        let mut config = ToolchainConfig::default();
        config.toolchain.cl = Some(PathBuf::from("/nonexistent/cl.exe"));

        let toolchain =
            guess_toolchain_with_config(0, Some(ToolchainKind::Msvc), &config).unwrap();
        assert_ne!(toolchain.compiler_path(), PathBuf::from("/nonexistent/cl.exe").as_path());
    }

    #[test]
    fn test_nvcc_toolchain() {
        let tmp = TempDir::new().unwrap();
        let nvcc = tmp.path().join("nvcc");
        std::fs::write(&nvcc, "").unwrap();

        let mut config = ToolchainConfig::default();
        config.toolchain.nvcc = Some(nvcc.clone());

        let toolchain = guess_nvcc_toolchain_with_config(2, false, &config);
        assert_eq!(toolchain.platform(), ToolchainPlatform::Nvcc);
        assert_eq!(toolchain.nvcc, nvcc);
        assert!(!toolchain.for_extension);
        assert_eq!(toolchain.options().verbose, 2);
    }
}
