//! NVCC (CUDA) toolchain implementation.

use std::path::{Path, PathBuf};

use super::{
    CommandSpec, CompileInput, CompileOptions, LinkInput, SourceLanguage, Toolchain,
    ToolchainPlatform,
};

/// CUDA toolchain driven through nvcc.
#[derive(Debug, Clone)]
pub struct NvccToolchain {
    /// Path to nvcc
    pub nvcc: PathBuf,
    /// Build a module for loading into a host process (`true`), or a
    /// process-level library linked against the shared CUDA runtime (`false`).
    pub for_extension: bool,
    options: CompileOptions,
}

impl NvccToolchain {
    /// Create a new nvcc toolchain.
    pub fn new(nvcc: PathBuf, for_extension: bool, options: CompileOptions) -> Self {
        NvccToolchain {
            nvcc,
            for_extension,
            options,
        }
    }
}

impl Toolchain for NvccToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Nvcc
    }

    fn compiler_path(&self) -> &Path {
        &self.nvcc
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut CompileOptions {
        &mut self.options
    }

    fn optimization_flags(&self) -> Vec<String> {
        let mut flags = vec![format!("-O{}", self.options.level.min(3))];

        if self.options.debug_level > 0 {
            flags.push("-g".to_string());
            flags.push("-lineinfo".to_string());
        }

        flags
    }

    fn source_language(&self, path: &Path) -> Option<SourceLanguage> {
        SourceLanguage::from_path(path)
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.nvcc).arg("-c");
        cmd = cmd.args(self.optimization_flags());

        if !cfg!(target_os = "windows") {
            cmd = cmd.args(["-Xcompiler", "-fPIC"]);
        }

        if input.lang == SourceLanguage::Cxx {
            cmd = cmd.arg("-std=c++17");
        }

        for dir in &self.options.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }

        for (name, value) in &self.options.defines {
            match value {
                Some(v) => cmd = cmd.arg(format!("-D{}={}", name, v)),
                None => cmd = cmd.arg(format!("-D{}", name)),
            }
        }

        cmd = cmd.args(self.options.cflags.iter().cloned());

        cmd = cmd.arg(input.source.display().to_string());
        cmd = cmd.arg("-o");
        cmd = cmd.arg(input.output.display().to_string());

        cmd
    }

    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec {
        let cudart = if self.for_extension { "static" } else { "shared" };

        let mut cmd = CommandSpec::new(&self.nvcc)
            .arg("--shared")
            .args(["-cudart", cudart]);

        cmd = cmd.arg("-o");
        cmd = cmd.arg(input.output.display().to_string());

        for obj in &input.objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        for dir in &self.options.library_dirs {
            cmd = cmd.arg(format!("-L{}", dir.display()));
        }

        for lib in &self.options.libraries {
            cmd = cmd.arg(format!("-l{}", lib));
        }

        cmd = cmd.args(self.options.ldflags.iter().cloned());

        cmd
    }

    fn object_extension(&self) -> &str {
        if cfg!(target_os = "windows") {
            "obj"
        } else {
            "o"
        }
    }

    fn intermediate_extensions(&self) -> &[&str] {
        if cfg!(target_os = "windows") {
            &["obj", "exp", "lib"]
        } else {
            &["o"]
        }
    }
}
