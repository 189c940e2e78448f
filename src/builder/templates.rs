//! Generated sources and the read-only discipline around them.
//!
//! Generated headers/sources and copied binding files are left read-only once
//! written, so a stray edit in the build directory fails loudly instead of
//! being clobbered by the next build.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::fs::{overwrite_protected, read_to_string};

/// Suffix of a generated header.
pub const HEADER_SUFFIX: &str = ".gen.h";

/// Suffix of a generated implementation source.
pub const SOURCE_SUFFIX: &str = ".gen.c";

/// Extra keyword arguments handed through to a generator.
pub type GeneratorArgs = BTreeMap<String, String>;

/// File names of the generated header and source for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNames {
    pub header: String,
    pub source: String,
}

impl TemplateNames {
    /// Both names joined onto `dir`, header first.
    pub fn in_dir(&self, dir: &Path) -> [PathBuf; 2] {
        [dir.join(&self.header), dir.join(&self.source)]
    }

    /// Names as a list, header first.
    pub fn to_vec(&self) -> Vec<String> {
        vec![self.header.clone(), self.source.clone()]
    }
}

/// Generated header and source file names for `name`.
pub fn create_template_names(name: &str) -> TemplateNames {
    TemplateNames {
        header: format!("{}{}", name, HEADER_SUFFIX),
        source: format!("{}{}", name, SOURCE_SUFFIX),
    }
}

/// Write each `(text, path)` pair in order, leaving every file read-only.
///
/// Stops at the first failure; files written before it are left intact.
pub fn write_templates<S, P>(sources: &[(S, P)]) -> Result<()>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    for (text, path) in sources {
        let path = path.as_ref();
        overwrite_protected(path, |path| {
            fs::write(path, text.as_ref())
                .with_context(|| format!("failed to write template: {}", path.display()))
        })?;
        tracing::debug!("Wrote {}", path.display());
    }
    Ok(())
}

/// Copy `src` to `dst` under the same read-only discipline.
///
/// Fails without touching either file if `dst` already resolves to `src`.
pub fn copy_source(src: &Path, dst: &Path) -> Result<()> {
    if is_same_file(src, dst)? {
        bail!(
            "cannot copy {} onto itself (destination {})",
            src.display(),
            dst.display()
        );
    }

    overwrite_protected(dst, |dst| {
        fs::copy(src, dst).with_context(|| {
            format!("failed to copy {} to {}", src.display(), dst.display())
        })?;
        Ok(())
    })?;
    tracing::debug!("Copied {} -> {}", src.display(), dst.display());
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> Result<bool> {
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    let a = fs::canonicalize(a).with_context(|| format!("failed to resolve {}", a.display()))?;
    let b = fs::canonicalize(b).with_context(|| format!("failed to resolve {}", b.display()))?;
    Ok(a == b)
}

/// What a generator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedSources {
    Single(PathBuf),
    Many(Vec<PathBuf>),
}

impl GeneratedSources {
    /// Flatten into a list of paths.
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            GeneratedSources::Single(path) => vec![path],
            GeneratedSources::Many(paths) => paths,
        }
    }
}

impl From<PathBuf> for GeneratedSources {
    fn from(path: PathBuf) -> Self {
        GeneratedSources::Single(path)
    }
}

impl From<Vec<PathBuf>> for GeneratedSources {
    fn from(paths: Vec<PathBuf>) -> Self {
        GeneratedSources::Many(paths)
    }
}

/// Produces source files on disk for an artifact.
///
/// `prefix` is the build directory joined with the artifact name; generated
/// files are expected to be derived from it.
pub trait SourceGenerator {
    fn generate(&self, name: &str, prefix: &Path, args: &GeneratorArgs)
        -> Result<GeneratedSources>;
}

impl<F> SourceGenerator for F
where
    F: Fn(&str, &Path, &GeneratorArgs) -> Result<GeneratedSources>,
{
    fn generate(
        &self,
        name: &str,
        prefix: &Path,
        args: &GeneratorArgs,
    ) -> Result<GeneratedSources> {
        self(name, prefix, args)
    }
}

/// Generator that renders a header and a source template from disk.
///
/// `{{name}}` expands to the artifact name and `{{key}}` to the matching
/// generator argument. Unknown placeholders are left as they are.
#[derive(Debug, Clone)]
pub struct TemplateFileGenerator {
    pub header: PathBuf,
    pub source: PathBuf,
}

impl TemplateFileGenerator {
    pub fn new(header: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        TemplateFileGenerator {
            header: header.into(),
            source: source.into(),
        }
    }
}

impl SourceGenerator for TemplateFileGenerator {
    fn generate(
        &self,
        name: &str,
        prefix: &Path,
        args: &GeneratorArgs,
    ) -> Result<GeneratedSources> {
        let dir = prefix.parent().unwrap_or_else(|| Path::new("."));
        let [header_path, source_path] = create_template_names(name).in_dir(dir);

        let header = render(&read_to_string(&self.header)?, name, args);
        let source = render(&read_to_string(&self.source)?, name, args);

        write_templates(&[(header, &header_path), (source, &source_path)])?;

        Ok(GeneratedSources::Single(source_path))
    }
}

/// Expand `{{key}}` placeholders in one pass; substituted text is not rescanned.
fn render(template: &str, name: &str, args: &GeneratorArgs) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = &after[..end];
        match key {
            "name" => out.push_str(name),
            _ => match args.get(key) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{{");
                    out.push_str(key);
                    out.push_str("}}");
                }
            },
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn assert_readonly(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::metadata(path).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o444, "{}", path.display());
    }

    #[cfg(not(unix))]
    fn assert_readonly(path: &Path) {
        assert!(fs::metadata(path).unwrap().permissions().readonly());
    }

    #[test]
    fn test_create_template_names() {
        let names = create_template_names("foo");
        assert_eq!(names.to_vec(), vec!["foo.gen.h", "foo.gen.c"]);
        assert_eq!(names.header, "foo.gen.h");
        assert_eq!(names.source, "foo.gen.c");

        let [h, c] = names.in_dir(Path::new("build"));
        assert_eq!(h, Path::new("build").join("foo.gen.h"));
        assert_eq!(c, Path::new("build").join("foo.gen.c"));
    }

    #[test]
    fn test_write_templates_leaves_readonly() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("foo.gen.c");

        write_templates(&[("int x = 1;\n", &path)]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "int x = 1;\n");
        assert_readonly(&path);
    }

    #[test]
    fn test_write_templates_twice_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("foo.gen.h");

        write_templates(&[("first", &path)]).unwrap();
        write_templates(&[("second", &path)]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert_readonly(&path);
    }

    #[test]
    fn test_write_templates_failure_names_path_and_keeps_siblings() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.gen.h");
        let bad = tmp.path().join("missing-dir").join("bad.gen.c");

        let err = write_templates(&[("ok", &good), ("lost", &bad)]).unwrap_err();

        assert!(format!("{:#}", err).contains("bad.gen.c"));
        assert_eq!(fs::read_to_string(&good).unwrap(), "ok");
        assert_readonly(&good);
        assert!(!bad.exists());
    }

    #[test]
    fn test_copy_source_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("binding.c");
        let dst = tmp.path().join("out").join("binding.c");
        fs::create_dir(tmp.path().join("out")).unwrap();

        let bytes = b"#include <stdio.h>\n\x00\xff\r\n";
        fs::write(&src, bytes).unwrap();

        copy_source(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), bytes);
        assert_readonly(&dst);

        // Copying again over the read-only file still works.
        fs::write(&src, b"changed").unwrap();
        copy_source(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"changed");
        assert_readonly(&dst);
    }

    #[test]
    fn test_copy_source_missing_src() {
        let tmp = TempDir::new().unwrap();
        let err = copy_source(&tmp.path().join("nope.c"), &tmp.path().join("dst.c")).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.c"));
        assert!(!tmp.path().join("dst.c").exists());
    }

    #[test]
    fn test_copy_source_onto_itself_fails_and_keeps_contents() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("binding.c");
        let text = "int answer(void) { return 42; }\n";
        fs::write(&src, text).unwrap();

        let err = copy_source(&src, &tmp.path().join(".").join("binding.c")).unwrap_err();

        assert!(format!("{:#}", err).contains("onto itself"));
        assert_eq!(fs::read_to_string(&src).unwrap(), text);
        assert!(!fs::metadata(&src).unwrap().permissions().readonly());
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_source_through_symlink_fails() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("binding.c");
        let link = tmp.path().join("link.c");
        fs::write(&src, "int x;\n").unwrap();
        std::os::unix::fs::symlink(&src, &link).unwrap();

        assert!(copy_source(&src, &link).is_err());
        assert_eq!(fs::read_to_string(&src).unwrap(), "int x;\n");
    }

    #[test]
    fn test_render_is_single_pass() {
        let mut args = GeneratorArgs::new();
        args.insert("a".to_string(), "{{b}}".to_string());
        args.insert("b".to_string(), "oops".to_string());
        args.insert("n".to_string(), "{{name}}".to_string());

        assert_eq!(
            render("{{a}} {{b}} {{n}} {{name}} {{unknown}} {{open", "vec", &args),
            "{{b}} oops {{name}} vec {{unknown}} {{open"
        );
    }

    #[test]
    fn test_generated_sources_flatten() {
        let single: GeneratedSources = PathBuf::from("a.c").into();
        assert_eq!(single.into_paths(), vec![PathBuf::from("a.c")]);

        let many: GeneratedSources = vec![PathBuf::from("a.c"), PathBuf::from("b.c")].into();
        assert_eq!(many.into_paths().len(), 2);
    }

    #[test]
    fn test_template_file_generator() {
        let tmp = TempDir::new().unwrap();
        let header = tmp.path().join("tmpl.h");
        let source = tmp.path().join("tmpl.c");
        fs::write(&header, "#define {{name}}_WIDTH {{width}}\n").unwrap();
        fs::write(&source, "#include \"{{name}}.gen.h\"\nint {{name}}_{{missing}};\n").unwrap();

        let build = tmp.path().join("build");
        fs::create_dir(&build).unwrap();

        let mut args = GeneratorArgs::new();
        args.insert("width".to_string(), "8".to_string());

        let generator = TemplateFileGenerator::new(&header, &source);
        let out = generator
            .generate("vec", &build.join("vec"), &args)
            .unwrap();

        assert_eq!(out, GeneratedSources::Single(build.join("vec.gen.c")));
        assert_eq!(
            fs::read_to_string(build.join("vec.gen.h")).unwrap(),
            "#define vec_WIDTH 8\n"
        );
        assert_eq!(
            fs::read_to_string(build.join("vec.gen.c")).unwrap(),
            "#include \"vec.gen.h\"\nint vec_{{missing}};\n"
        );
        assert_readonly(&build.join("vec.gen.h"));
    }

    #[test]
    fn test_closure_generator() {
        let generator = |name: &str, prefix: &Path, _: &GeneratorArgs| -> Result<GeneratedSources> {
            Ok(GeneratedSources::Single(prefix.with_file_name(format!("{}.c", name))))
        };

        let out = generator
            .generate("foo", Path::new("build/foo"), &GeneratorArgs::new())
            .unwrap();
        assert_eq!(out, GeneratedSources::Single(PathBuf::from("build/foo.c")));
    }
}
