//! Toolchain abstraction for C/C++/CUDA compilers.
//!
//! Every compiler family implements [`Toolchain`], which turns a small set of
//! [`CompileOptions`] into compile and link commands. The provided methods on
//! the trait (`build`, `clear_path`, ...) drive those commands, so a family
//! only describes its flags.
//!
//! Compiler lookup priority:
//! 1. Toolchain config file (`.kiln/toolchain.toml` or `~/.kiln/toolchain.toml`)
//! 2. Environment variables (CC, CXX, NVCC)
//! 3. Searching PATH for the conventional compiler name

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;

use crate::util::config::ToolchainSettings;
use crate::util::fs::{ensure_dir, remove_files_with_extensions};
use crate::util::process::ProcessBuilder;

mod detect;
mod errors;
mod gcc;
mod msvc;
mod nvcc;

pub use detect::{
    guess_nvcc_toolchain, guess_nvcc_toolchain_with_config, guess_toolchain,
    guess_toolchain_with_config, host_toolchain_kind, toolchain_for_platform,
};
pub use errors::ToolchainError;
pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;
pub use nvcc::NvccToolchain;

/// Highest accepted debug level.
pub const MAX_DEBUG_LEVEL: u8 = 3;

/// Highest accepted optimization level.
pub const MAX_OPTIMIZATION_LEVEL: u8 = 4;

/// A command to execute, with program, arguments, and environment.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Language of a single source file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    C,
    Cxx,
    Cuda,
}

impl SourceLanguage {
    /// Classify a path. Headers and unknown extensions return `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" => Some(SourceLanguage::C),
            "cc" | "cpp" | "cxx" => Some(SourceLanguage::Cxx),
            "cu" => Some(SourceLanguage::Cuda),
            _ => None,
        }
    }
}

/// Input for a compile step.
#[derive(Debug, Clone)]
pub struct CompileInput {
    /// Source file to compile
    pub source: PathBuf,
    /// Output object file
    pub output: PathBuf,
    /// Language of `source`
    pub lang: SourceLanguage,
}

/// Input for a link step.
#[derive(Debug, Clone)]
pub struct LinkInput {
    /// Object files to link
    pub objects: Vec<PathBuf>,
    /// Output shared library
    pub output: PathBuf,
    /// C++ driver needed (any C++ object present)
    pub cxx: bool,
}

/// Settings shared by every compile and link command of a toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// 0 = quiet, 1 = log commands, 2 = also log compiler output
    pub verbose: u8,
    /// Debug info level (0..=3)
    pub debug_level: u8,
    /// Optimization level (0..=4, 4 = tuned for the build host)
    pub level: u8,
    /// Preprocessor defines (name, optional value)
    pub defines: Vec<(String, Option<String>)>,
    /// Include directories
    pub include_dirs: Vec<PathBuf>,
    /// Additional compiler flags
    pub cflags: Vec<String>,
    /// Additional linker flags
    pub ldflags: Vec<String>,
    /// Library search paths
    pub library_dirs: Vec<PathBuf>,
    /// Libraries to link (without prefix or extension)
    pub libraries: Vec<String>,
}

impl CompileOptions {
    /// Options with the given verbosity and nothing else set.
    pub fn new(verbose: u8) -> Self {
        CompileOptions {
            verbose,
            ..Default::default()
        }
    }

    /// Options seeded from the `[toolchain]` config section.
    pub fn from_settings(verbose: u8, settings: &ToolchainSettings) -> Self {
        CompileOptions {
            verbose,
            cflags: settings.cflags.clone(),
            ldflags: settings.ldflags.clone(),
            include_dirs: settings.include_dirs.clone(),
            library_dirs: settings.library_dirs.clone(),
            libraries: settings.libraries.clone(),
            ..Default::default()
        }
    }

    /// Add a define given as `NAME` or `NAME=VALUE`. Empty names are ignored.
    pub fn add_define(&mut self, define: &str) {
        let (name, value) = match define.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.to_string())),
            None => (define.trim(), None),
        };

        if name.is_empty() {
            tracing::debug!("Ignoring empty define `{}`", define);
            return;
        }

        self.defines.push((name.to_string(), value));
    }
}

/// Family of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPlatform {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Microsoft Visual C++
    Msvc,
    /// NVIDIA CUDA compiler
    Nvcc,
}

impl ToolchainPlatform {
    /// Get the platform name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::Msvc => "msvc",
            ToolchainPlatform::Nvcc => "nvcc",
        }
    }
}

impl fmt::Display for ToolchainPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host C toolchains that can be selected by name or by platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainKind {
    Msvc,
    Gcc,
    Clang,
}

impl ToolchainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainKind::Msvc => "msvc",
            ToolchainKind::Gcc => "gcc",
            ToolchainKind::Clang => "clang",
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolchainKind {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "msvc" => Ok(ToolchainKind::Msvc),
            "gcc" => Ok(ToolchainKind::Gcc),
            "clang" => Ok(ToolchainKind::Clang),
            other => Err(ToolchainError::UnknownToolchain {
                name: other.to_string(),
            }),
        }
    }
}

impl From<ToolchainKind> for ToolchainPlatform {
    fn from(kind: ToolchainKind) -> Self {
        match kind {
            ToolchainKind::Msvc => ToolchainPlatform::Msvc,
            ToolchainKind::Gcc => ToolchainPlatform::Gcc,
            ToolchainKind::Clang => ToolchainPlatform::Clang,
        }
    }
}

/// Trait for toolchain implementations.
///
/// Implementors describe their commands and flags; building, cleaning and
/// option handling come from the provided methods.
pub trait Toolchain: Send + Sync {
    /// Get the toolchain platform.
    fn platform(&self) -> ToolchainPlatform;

    /// Get the compiler driver path.
    fn compiler_path(&self) -> &Path;

    /// Current compile/link settings.
    fn options(&self) -> &CompileOptions;

    /// Mutable access to compile/link settings.
    fn options_mut(&mut self) -> &mut CompileOptions;

    /// Flags derived from the optimization and debug levels.
    fn optimization_flags(&self) -> Vec<String>;

    /// Generate a compile command for one source.
    fn compile_command(&self, input: &CompileInput) -> CommandSpec;

    /// Generate a command linking objects into a loadable shared library.
    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec;

    /// Get the object file extension.
    fn object_extension(&self) -> &str;

    /// Extensions of the intermediate files `clear_path` deletes.
    fn intermediate_extensions(&self) -> &[&str];

    /// Suffix of a loadable module on this host, including the leading dot.
    fn extension_suffix(&self) -> &str {
        std::env::consts::DLL_SUFFIX
    }

    /// Whether this toolchain compiles `path`, and as what.
    fn source_language(&self, path: &Path) -> Option<SourceLanguage> {
        SourceLanguage::from_path(path).filter(|lang| *lang != SourceLanguage::Cuda)
    }

    /// Set debug and optimization levels.
    fn with_optimization_level(&mut self, debug_level: u8, level: u8) -> Result<()> {
        if debug_level > MAX_DEBUG_LEVEL || level > MAX_OPTIMIZATION_LEVEL {
            return Err(ToolchainError::InvalidOptimizationLevel { debug_level, level }.into());
        }

        let opts = self.options_mut();
        opts.debug_level = debug_level;
        opts.level = level;
        Ok(())
    }

    /// Add preprocessor defines (`NAME` or `NAME=VALUE`).
    fn add_define(&mut self, names: &[&str]) {
        let opts = self.options_mut();
        for name in names {
            opts.add_define(name);
        }
    }

    /// Compile `sources` and link them into the shared library `output`.
    ///
    /// Objects are written next to `output`. Inputs this toolchain does not
    /// compile (headers, for instance) are skipped.
    fn build(&self, output: &Path, sources: &[PathBuf]) -> Result<()> {
        let out_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        ensure_dir(out_dir)?;

        let mut objects = Vec::new();
        let mut taken = HashSet::new();
        let mut cxx = false;

        for source in sources {
            let Some(lang) = self.source_language(source) else {
                tracing::debug!("Skipping non-compilable input {}", source.display());
                continue;
            };

            let object = object_path(out_dir, source, self.object_extension(), &mut taken);

            let input = CompileInput {
                source: source.clone(),
                output: object.clone(),
                lang,
            };

            tracing::debug!("Compiling {} -> {}", source.display(), object.display());
            run_command(&self.compile_command(&input), self.options().verbose)?;

            cxx |= lang == SourceLanguage::Cxx;
            objects.push(object);
        }

        if objects.is_empty() {
            return Err(ToolchainError::NoSources {
                output: output.to_path_buf(),
            }
            .into());
        }

        let input = LinkInput {
            objects,
            output: output.to_path_buf(),
            cxx,
        };

        tracing::debug!("Linking {}", output.display());
        run_command(&self.link_shared_command(&input), self.options().verbose)
    }

    /// Delete intermediate build files directly inside `path`.
    fn clear_path(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let removed = remove_files_with_extensions(path, self.intermediate_extensions())?;
        tracing::debug!(
            "Removed {} intermediate file(s) from {}",
            removed.len(),
            path.display()
        );
        Ok(removed)
    }
}

/// Object path for `source` inside `out_dir`, unique among `taken`.
///
/// The first source with a given stem gets `<stem>.<ext>`; later ones
/// (`a/util.c` and `b/util.c`, or `foo.c` and `foo.cpp`) get `<stem>-<n>.<ext>`.
fn object_path(out_dir: &Path, source: &Path, ext: &str, taken: &mut HashSet<String>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut file_name = format!("{}.{}", stem, ext);
    let mut n = 1;
    while !taken.insert(file_name.clone()) {
        file_name = format!("{}-{}.{}", stem, n, ext);
        n += 1;
    }
    out_dir.join(file_name)
}

/// Run a toolchain command, failing on a non-zero exit status.
fn run_command(spec: &CommandSpec, verbose: u8) -> Result<()> {
    let cmd = ProcessBuilder::from_spec(spec);
    let shown = cmd.display_command();

    if verbose >= 1 {
        tracing::info!("{}", shown);
    } else {
        tracing::debug!("{}", shown);
    }

    let output = cmd.exec()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if verbose >= 2 {
        if !stdout.trim().is_empty() {
            tracing::debug!("{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!("{}", stderr.trim_end());
        }
    }

    if !output.status.success() {
        // cl.exe reports diagnostics on stdout
        let diagnostics = if stderr.trim().is_empty() { stdout } else { stderr };
        return Err(ToolchainError::CommandFailed {
            command: shown,
            code: output.status.code(),
            stderr: diagnostics.into_owned(),
        }
        .into());
    }

    Ok(())
}
