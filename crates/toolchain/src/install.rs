//! Placing binaries on disk.
//!
//! Every write goes through a sibling `<name>.new` file that is renamed over
//! the destination, so a half-copied binary never sits at the final path and
//! a running executable can be replaced.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Move `src` to `dest_dir/binary_name` and make it executable.
///
/// The directory is created if missing. A rename is tried first; across
/// filesystems the file is copied instead.
///
/// # Errors
///
/// Returns `Error::Io` (category `Placement`) on filesystem failures.
pub fn place(src: &Path, dest_dir: &Path, binary_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(|e| Error::io(dest_dir, e))?;

    let dest = dest_dir.join(binary_name);
    if let Err(e) = fs::rename(src, &dest) {
        log::debug!("rename {} failed ({e}), copying", src.display());
        copy_into_place(src, &dest)?;
    }

    set_mode(&dest, 0o755)?;
    log::info!("Placed {}", dest.display());
    Ok(dest)
}

/// Keep a copy of an installed binary in the stash directory.
///
/// # Errors
///
/// Returns `Error::Io` on filesystem failures.
pub fn stash(path: &Path, stash_dir: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("cannot stash {}: no file name", path.display())))?;

    fs::create_dir_all(stash_dir).map_err(|e| Error::io(stash_dir, e))?;
    let dest = stash_dir.join(name);
    if dest == path {
        return Ok(dest);
    }

    copy_into_place(path, &dest)?;
    set_mode(&dest, 0o755)?;
    log::debug!("Stashed {} at {}", path.display(), dest.display());
    Ok(dest)
}

/// Locate the executable for `name` among extracted files.
///
/// Tries, in order: a file named exactly `name`, then `name.exe`, then the
/// only executable file in the tree.
#[must_use]
pub fn find_binary(dir: &Path, name: &str) -> Option<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();

    let exe = format!("{name}.exe");
    for wanted in [name, exe.as_str()] {
        if let Some(found) = files.iter().find(|p| p.file_name().is_some_and(|n| n == wanted)) {
            return Some(found.clone());
        }
    }

    let mut executables = files.into_iter().filter(|p| is_executable(p));
    match (executables.next(), executables.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Replace `target` with `new`, keeping the target's permissions.
///
/// Used for self-update: the new binary is written to `<target>.new` and
/// renamed over the running executable.
///
/// # Errors
///
/// Returns `Error::Io` on filesystem failures.
pub fn replace_executable(new: &Path, target: &Path) -> Result<()> {
    let permissions = fs::metadata(target).map(|m| m.permissions()).ok();

    copy_into_place(new, target)?;

    match permissions {
        Some(permissions) => {
            fs::set_permissions(target, permissions).map_err(|e| Error::io(target, e))?;
        }
        None => set_mode(target, 0o755)?,
    }

    log::info!("Replaced {}", target.display());
    Ok(())
}

/// Copy to `<dest>.new`, then rename over `dest`.
fn copy_into_place(src: &Path, dest: &Path) -> Result<()> {
    let staging = staging_path(dest);
    fs::copy(src, &staging).map_err(|e| Error::io(&staging, e))?;
    if let Err(e) = fs::rename(&staging, dest) {
        let _ = fs::remove_file(&staging);
        return Err(Error::io(dest, e));
    }
    Ok(())
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".new");
    dest.with_file_name(name)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}
