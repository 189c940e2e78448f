//! GCC/Clang toolchain implementation.

use std::path::{Path, PathBuf};

use super::{
    CommandSpec, CompileInput, CompileOptions, LinkInput, SourceLanguage, Toolchain,
    ToolchainPlatform,
};

/// GCC or Clang toolchain (Unix-like systems).
#[derive(Debug, Clone)]
pub struct GccToolchain {
    /// Path to the C compiler
    pub cc: PathBuf,
    /// Path to the C++ compiler
    pub cxx: PathBuf,
    /// Compiler family (gcc or clang)
    pub family: ToolchainPlatform,
    options: CompileOptions,
}

impl GccToolchain {
    /// Create a new GCC-style toolchain.
    pub fn new(cc: PathBuf, cxx: PathBuf, family: ToolchainPlatform, options: CompileOptions) -> Self {
        GccToolchain {
            cc,
            cxx,
            family,
            options,
        }
    }

    /// GCC with the C++ driver inferred from `cc`.
    pub fn gcc(cc: PathBuf, options: CompileOptions) -> Self {
        let cxx = Self::infer_cxx(&cc);
        Self::new(cc, cxx, ToolchainPlatform::Gcc, options)
    }

    /// Clang with the C++ driver inferred from `cc`.
    pub fn clang(cc: PathBuf, options: CompileOptions) -> Self {
        let cxx = Self::infer_cxx(&cc);
        Self::new(cc, cxx, ToolchainPlatform::Clang, options)
    }

    /// Infer C++ compiler path from C compiler path.
    ///
    /// Handles common patterns:
    /// - gcc, x86_64-linux-gnu-gcc-13 -> g++, x86_64-linux-gnu-g++-13
    /// - clang, clang-17 -> clang++, clang++-17
    /// - cc, /usr/bin/cc -> c++, /usr/bin/c++
    pub fn infer_cxx(cc: &Path) -> PathBuf {
        let Some(file_name) = cc.file_name().and_then(|n| n.to_str()) else {
            return cc.to_path_buf();
        };

        let cxx_name = if let Some(idx) = file_name.rfind("gcc") {
            format!("{}g++{}", &file_name[..idx], &file_name[idx + 3..])
        } else if let Some(idx) = file_name.rfind("clang") {
            format!("{}clang++{}", &file_name[..idx], &file_name[idx + 5..])
        } else if file_name == "cc" || file_name.ends_with("-cc") {
            format!("{}++", &file_name[..file_name.len() - 1])
        } else {
            format!("{}++", file_name)
        };

        cc.with_file_name(cxx_name)
    }
}

impl Toolchain for GccToolchain {
    fn platform(&self) -> ToolchainPlatform {
        self.family
    }

    fn compiler_path(&self) -> &Path {
        &self.cc
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut CompileOptions {
        &mut self.options
    }

    fn optimization_flags(&self) -> Vec<String> {
        let mut flags = match self.options.level {
            0..=3 => vec![format!("-O{}", self.options.level)],
            _ => vec!["-O3".to_string(), "-march=native".to_string()],
        };

        if self.options.debug_level > 0 {
            flags.push(format!("-g{}", self.options.debug_level));
        }

        flags
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let compiler = match input.lang {
            SourceLanguage::Cxx => &self.cxx,
            _ => &self.cc,
        };

        let mut cmd = CommandSpec::new(compiler).arg("-c");
        cmd = cmd.args(self.optimization_flags());

        if !cfg!(target_os = "windows") {
            cmd = cmd.arg("-fPIC");
        }
        cmd = cmd.arg("-Wall");

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
        let linker = if input.cxx { &self.cxx } else { &self.cc };
        let mut cmd = CommandSpec::new(linker);

        if cfg!(target_os = "macos") {
            cmd = cmd.args(["-dynamiclib", "-undefined", "dynamic_lookup"]);
        } else {
            cmd = cmd.arg("-shared");
        }

        if self.options.debug_level > 0 {
            cmd = cmd.arg(format!("-g{}", self.options.debug_level));
        }

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
        "o"
    }

    fn intermediate_extensions(&self) -> &[&str] {
        &["o"]
    }
}
