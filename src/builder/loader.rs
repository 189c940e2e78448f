//! Loading built modules into the running process.
//!
//! A loaded module is an explicit handle owned by the caller. Nothing is
//! registered globally, and loading the same file twice yields two handles.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error loading a compiled module.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid module path `{}`", path.display())]
    InvalidPath { path: PathBuf },

    #[error("failed to load module `{}`", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("module `{module}` has no symbol `{symbol}`")]
    MissingSymbol {
        module: String,
        symbol: String,
        #[source]
        source: libloading::Error,
    },
}

/// Module name derived from a file name: everything before the first `.`.
pub fn module_name_from_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.split('.').next()?;
    (!stem.is_empty()).then(|| stem.to_string())
}

/// A shared library loaded into this process.
///
/// Dropping the handle unloads the library.
#[derive(Debug)]
pub struct LoadedModule {
    name: String,
    path: PathBuf,
    library: libloading::Library,
}

impl LoadedModule {
    /// Logical module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an exported symbol.
    ///
    /// # Safety
    ///
    /// `T` must match the actual type of the exported symbol.
    pub unsafe fn symbol<T>(&self, symbol: &str) -> Result<libloading::Symbol<'_, T>, LoadError> {
        self.library
            .get(symbol.as_bytes())
            .map_err(|source| LoadError::MissingSymbol {
                module: self.name.clone(),
                symbol: symbol.to_string(),
                source,
            })
    }
}

/// Load the module at `extfile`.
///
/// `modulename` defaults to the file name truncated at its first `.`. The
/// library is opened by absolute path so an unrelated module of the same name
/// cannot be picked up instead.
pub fn load_dynamic_module(
    extfile: &Path,
    modulename: Option<&str>,
) -> Result<LoadedModule, LoadError> {
    let name = match modulename {
        Some(name) => name.to_string(),
        None => module_name_from_path(extfile).ok_or_else(|| LoadError::InvalidPath {
            path: extfile.to_path_buf(),
        })?,
    };

    let path = std::path::absolute(extfile).map_err(|_| LoadError::InvalidPath {
        path: extfile.to_path_buf(),
    })?;

    tracing::debug!("Loading module `{}` from {}", name, path.display());

    // SAFETY: running the library's initialisers is inherent to loading a
    // module; the caller asked for exactly this file.
    let library = unsafe { libloading::Library::new(&path) }.map_err(|source| LoadError::Load {
        path: path.clone(),
        source,
    })?;

    Ok(LoadedModule {
        name,
        path,
        library,
    })
}

/// Something that can bring a built module into the process.
pub trait ModuleLoader {
    type Module;

    fn load(&self, path: &Path, name: Option<&str>) -> anyhow::Result<Self::Module>;
}

/// Loader backed by the platform's dynamic library loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicLoader;

impl ModuleLoader for DynamicLoader {
    type Module = LoadedModule;

    fn load(&self, path: &Path, name: Option<&str>) -> anyhow::Result<LoadedModule> {
        Ok(load_dynamic_module(path, name)?)
    }
}
