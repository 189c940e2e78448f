//! MSVC toolchain implementation.

use std::path::{Path, PathBuf};

use super::{
    CommandSpec, CompileInput, CompileOptions, LinkInput, SourceLanguage, Toolchain,
    ToolchainPlatform,
};

/// MSVC toolchain (Windows).
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    /// Path to cl.exe (compiler)
    pub cl: PathBuf,
    /// Path to link.exe (linker)
    pub link: PathBuf,
    options: CompileOptions,
}

impl MsvcToolchain {
    /// Create a new MSVC toolchain.
    pub fn new(cl: PathBuf, link: PathBuf, options: CompileOptions) -> Self {
        MsvcToolchain { cl, link, options }
    }

    /// MSVC with link.exe taken from the directory holding `cl`.
    pub fn from_cl(cl: PathBuf, options: CompileOptions) -> Self {
        let sibling = cl.with_file_name("link.exe");
        let link = if sibling.exists() {
            sibling
        } else {
            PathBuf::from("link")
        };
        Self::new(cl, link, options)
    }
}

impl Toolchain for MsvcToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Msvc
    }

    fn compiler_path(&self) -> &Path {
        &self.cl
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut CompileOptions {
        &mut self.options
    }

    fn optimization_flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = match self.options.level {
            0 => vec!["/Od".into()],
            1 => vec!["/O1".into()],
            2 => vec!["/O2".into()],
            3 => vec!["/Ox".into()],
            _ => vec!["/Ox".into(), "/GL".into()],
        };

        if self.options.debug_level > 0 {
            flags.push("/Zi".into());
        }

        flags
    }

    fn compile_command(&self, input: &CompileInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cl);

        // Quiet logo, compile only
        cmd = cmd.arg("/nologo");
        cmd = cmd.arg("/c");
        cmd = cmd.args(self.optimization_flags());
        cmd = cmd.arg("/W3");
        cmd = cmd.arg("/MD");

        if input.lang == SourceLanguage::Cxx {
            cmd = cmd.args(["/TP", "/std:c++17", "/EHsc"]);
        }

        for dir in &self.options.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }

        for (name, value) in &self.options.defines {
            match value {
                Some(v) => cmd = cmd.arg(format!("/D{}={}", name, v)),
                None => cmd = cmd.arg(format!("/D{}", name)),
            }
        }

        cmd = cmd.args(self.options.cflags.iter().cloned());

        cmd = cmd.arg(input.source.display().to_string());
        cmd = cmd.arg(format!("/Fo{}", input.output.display()));

        cmd
    }

    fn link_shared_command(&self, input: &LinkInput) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.link);

        cmd = cmd.arg("/nologo");
        cmd = cmd.arg("/DLL");

        if self.options.level >= 4 {
            cmd = cmd.arg("/LTCG");
        }
        if self.options.debug_level > 0 {
            cmd = cmd.arg("/DEBUG");
        }

        cmd = cmd.arg(format!("/OUT:{}", input.output.display()));

        for obj in &input.objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        for dir in &self.options.library_dirs {
            cmd = cmd.arg(format!("/LIBPATH:{}", dir.display()));
        }

        for lib in &self.options.libraries {
            cmd = cmd.arg(format!("{}.lib", lib));
        }

        cmd = cmd.args(self.options.ldflags.iter().cloned());

        cmd
    }

    fn object_extension(&self) -> &str {
        "obj"
    }

    // Import library and export file are by-products of /DLL.
    fn intermediate_extensions(&self) -> &[&str] {
        &["obj", "exp", "lib", "ilk"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msvc() -> MsvcToolchain {
        MsvcToolchain::new(
            PathBuf::from("cl"),
            PathBuf::from("link"),
            CompileOptions::new(0),
        )
    }

    #[test]
    fn test_msvc_compile_command() {
        let mut toolchain = msvc();
        toolchain.with_optimization_level(1, 2).unwrap();
        toolchain.add_define(&["DEBUG", "VERSION=1"]);

        let input = CompileInput {
            source: PathBuf::from("src/foo.gen.c"),
            output: PathBuf::from("build/foo.gen.obj"),
            lang: SourceLanguage::C,
        };

        let cmd = toolchain.compile_command(&input);
        assert_eq!(cmd.program, PathBuf::from("cl"));
        assert!(cmd.args.contains(&"/nologo".to_string()));
        assert!(cmd.args.contains(&"/c".to_string()));
        assert!(cmd.args.contains(&"/O2".to_string()));
        assert!(cmd.args.contains(&"/Zi".to_string()));
        assert!(cmd.args.contains(&"/DDEBUG".to_string()));
        assert!(cmd.args.contains(&"/DVERSION=1".to_string()));
        assert!(!cmd.args.contains(&"/TP".to_string()));
        assert!(cmd.args.iter().any(|a| a.starts_with("/Fo")));
    }

    #[test]
    fn test_msvc_level_mapping() {
        let mut toolchain = msvc();

        toolchain.with_optimization_level(0, 0).unwrap();
        assert_eq!(toolchain.optimization_flags(), vec!["/Od"]);

        toolchain.with_optimization_level(0, 4).unwrap();
        assert_eq!(toolchain.optimization_flags(), vec!["/Ox", "/GL"]);
    }

    #[test]
    fn test_msvc_link_shared_command() {
        let mut toolchain = msvc();
        toolchain.with_optimization_level(0, 4).unwrap();

        let input = LinkInput {
            objects: vec![PathBuf::from("build/a.obj")],
            output: PathBuf::from("build/foo.dll"),
            cxx: true,
        };

        let cmd = toolchain.link_shared_command(&input);
        assert_eq!(cmd.program, PathBuf::from("link"));
        assert!(cmd.args.contains(&"/DLL".to_string()));
        assert!(cmd.args.contains(&"/LTCG".to_string()));
        assert!(cmd.args.iter().any(|a| a.starts_with("/OUT:")));
    }

    #[test]
    fn test_from_cl_falls_back_to_link_on_path() {
        let toolchain = MsvcToolchain::from_cl(
            PathBuf::from("/nonexistent/bin/cl.exe"),
            CompileOptions::new(0),
        );
        assert_eq!(toolchain.link, PathBuf::from("link"));
    }
}
