//! Filesystem utilities.
//!
//! Generated and copied sources are kept read-only between builds. Every write
//! to such a file goes through [`overwrite_protected`], which makes the target
//! writable, runs the write, and puts the read-only bits back on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Mode for a protected file: read for owner, group and other.
#[cfg(unix)]
pub const READ_ONLY_MODE: u32 = 0o444;

/// Mode applied to an existing protected file right before it is overwritten.
#[cfg(unix)]
pub const WRITABLE_MODE: u32 = 0o600;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Leave `path` readable by everyone and writable by nobody.
pub fn make_readonly(path: &Path) -> Result<()> {
    set_mode(path, true)
        .with_context(|| format!("failed to make read-only: {}", path.display()))
}

/// Give the owner write access to `path` again.
pub fn make_writable(path: &Path) -> Result<()> {
    set_mode(path, false)
        .with_context(|| format!("failed to make writable: {}", path.display()))
}

#[cfg(unix)]
fn set_mode(path: &Path, readonly: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if readonly { READ_ONLY_MODE } else { WRITABLE_MODE };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, readonly: bool) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(readonly);
    fs::set_permissions(path, perms)
}

/// Run `op` against a protected file.
///
/// An existing `path` is made writable before `op` runs. Afterwards, if the
/// file exists (whether `op` succeeded or not) it is made read-only again. An
/// error from `op` takes priority over an error restoring the permissions.
pub fn overwrite_protected<T, F>(path: &Path, op: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    if path.exists() {
        make_writable(path)?;
    }

    let result = op(path);

    if !path.exists() {
        return result;
    }

    let restored = make_readonly(path);
    match result {
        Ok(value) => restored.map(|()| value),
        Err(e) => {
            if let Err(restore_err) = restored {
                tracing::warn!("{:#}", restore_err);
            }
            Err(e)
        }
    }
}

/// Remove regular files directly inside `dir` whose extension is one of
/// `extensions`. Subdirectories are left alone.
pub fn remove_files_with_extensions(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("failed to read directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)));

        if matches {
            fs::remove_file(entry.path())
                .with_context(|| format!("failed to remove file: {}", entry.path().display()))?;
            removed.push(entry.path().to_path_buf());
        }
    }

    removed.sort();
    Ok(removed)
}
