//! Archive extraction with path-traversal protection.
//!
//! Archives come from the internet, so every entry name is checked before
//! anything touches the filesystem: absolute paths, `..` components and
//! backslashes abort the extraction with [`Error::UnsafePath`]. The number
//! of bytes written for each file must match its header, otherwise the
//! extraction fails with [`Error::SizeMismatch`].

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How a downloaded artifact must be unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveKind {
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGz,
    /// Plain tarball (`.tar`).
    Tar,
    /// Zip archive (`.zip`).
    Zip,
    /// Single gzip-compressed file (`.gz`).
    Gzip,
    /// Bare binary.
    None,
}

impl ArchiveKind {
    /// Infer the kind from a file name suffix. Case-insensitive.
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else if name.ends_with(".tar") {
            Self::Tar
        } else if name.ends_with(".zip") {
            Self::Zip
        } else if name.ends_with(".gz") {
            Self::Gzip
        } else {
            Self::None
        }
    }

    /// Whether the artifact needs unpacking.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Extract `src` into `dir` according to `kind`.
///
/// Returns the regular files that were written. For [`ArchiveKind::None`]
/// nothing is written and `src` itself is returned.
///
/// # Errors
///
/// Returns an `Archive`-category error for malformed or unsafe archives and
/// `Error::Io` when the target directory cannot be written.
pub fn extract(kind: ArchiveKind, src: &Path, dir: &Path, flat: bool) -> Result<Vec<PathBuf>> {
    log::debug!("Extracting {} ({kind:?}) into {}", src.display(), dir.display());

    let open = || File::open(src).map_err(|e| Error::io(src, e));
    match kind {
        ArchiveKind::TarGz => untar(open()?, dir, true, flat),
        ArchiveKind::Tar => untar(open()?, dir, false, flat),
        ArchiveKind::Zip => {
            let file = open()?;
            let size = file.metadata().map_err(|e| Error::io(src, e))?.len();
            unzip(file, size, dir)
        }
        ArchiveKind::Gzip => {
            let name = src
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = name
                .strip_suffix(".gz")
                .or_else(|| name.strip_suffix(".GZ"))
                .unwrap_or(&name);
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
            let dest = dir.join(stem);
            gunzip(open()?, &dest)?;
            Ok(vec![dest])
        }
        ArchiveKind::None => Ok(vec![src.to_path_buf()]),
    }
}

/// Extract a tarball.
///
/// In flat mode only regular files are written, each under its base name
/// directly in `dir`. Otherwise directories are recreated and symlinks are
/// restored (unix only) when their target stays inside `dir`.
///
/// Modes are preserved. Modification times are preserved but never later
/// than the moment extraction started.
///
/// # Errors
///
/// - `Error::UnsafePath` for absolute, `..` or backslash entry names, or a
///   symlink pointing outside `dir`.
/// - `Error::SizeMismatch` when an entry is shorter than its header says.
/// - `Error::Archive` for corrupt input.
pub fn untar<R: Read>(reader: R, dir: &Path, gzip: bool, flat: bool) -> Result<Vec<PathBuf>> {
    let started = SystemTime::now();
    if gzip {
        untar_entries(GzDecoder::new(reader), dir, flat, started)
    } else {
        untar_entries(reader, dir, flat, started)
    }
}

fn untar_entries<R: Read>(
    reader: R,
    dir: &Path,
    flat: bool,
    started: SystemTime,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut archive = tar::Archive::new(reader);
    let mut written = Vec::new();

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let relative = safe_relative(&name)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().ok();
        let mtime = entry.header().mtime().ok();

        if entry_type.is_dir() {
            if !flat {
                let target = contained(dir, &relative, &name)?;
                fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            }
            continue;
        }

        if entry_type.is_symlink() {
            if !flat {
                let link = entry.link_name_bytes().map(|b| String::from_utf8_lossy(&b).into_owned());
                restore_symlink(dir, &relative, &name, link.as_deref().unwrap_or_default())?;
            }
            continue;
        }

        if !entry_type.is_file() {
            log::debug!("Skipping {name} ({entry_type:?})");
            continue;
        }

        let target = if flat {
            match relative.file_name() {
                Some(base) => dir.join(base),
                None => continue,
            }
        } else {
            contained(dir, &relative, &name)?
        };

        let expected = entry.size();
        let file = write_entry(&mut entry, &target, &name, expected)?;
        finish_file(&file, &target, mode, mtime, started)?;
        written.push(target);
    }

    Ok(written)
}

/// Extract a zip archive.
///
/// `size` is the total archive length; it must match what the reader holds.
/// Directories are preserved and unix modes applied when recorded.
///
/// # Errors
///
/// Same as [`untar`], plus `Error::Archive` when `size` is wrong.
pub fn unzip<R: Read + Seek>(mut reader: R, size: u64, dir: &Path) -> Result<Vec<PathBuf>> {
    let actual = reader.seek(SeekFrom::End(0)).map_err(corrupt)?;
    if actual != size {
        return Err(Error::Archive(format!(
            "zip is {actual} bytes, expected {size}"
        )));
    }
    reader.seek(SeekFrom::Start(0)).map_err(corrupt)?;

    let started = SystemTime::now();
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| Error::Archive(format!("failed to open zip: {e}")))?;

    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::Archive(format!("failed to read zip entry: {e}")))?;

        let name = file.name().to_string();
        let relative = safe_relative(&name)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = contained(dir, &relative, &name)?;
        if file.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            continue;
        }

        let mode = file.unix_mode();
        let expected = file.size();
        let out = write_entry(&mut file, &target, &name, expected)?;
        finish_file(&out, &target, mode, None, started)?;
        written.push(target);
    }

    Ok(written)
}

/// Decompress a single gzip stream into `dest`.
///
/// # Errors
///
/// Returns `Error::Archive` for corrupt input.
pub fn gunzip<R: Read>(reader: R, dest: &Path) -> Result<u64> {
    let mut decoder = GzDecoder::new(reader);
    let mut out = File::create(dest).map_err(|e| Error::io(dest, e))?;
    copy_entry(&mut decoder, &mut out, dest)
}

/// Validate an entry name and turn it into a relative path.
///
/// Returns an empty path for entries naming the archive root (`./`).
fn safe_relative(name: &str) -> Result<PathBuf> {
    let unsafe_path = || Error::UnsafePath {
        entry: name.to_string(),
    };

    if name.contains('\\') || name.starts_with('/') {
        return Err(unsafe_path());
    }

    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path());
            }
        }
    }
    Ok(relative)
}

/// Join `relative` onto `dir`, refusing any path whose parent directories
/// include a symlink already present under `dir`.
fn contained(dir: &Path, relative: &Path, name: &str) -> Result<PathBuf> {
    let mut current = dir.to_path_buf();
    let mut parts = relative.components().peekable();
    while let Some(part) = parts.next() {
        current.push(part);
        if parts.peek().is_some() && is_symlink(&current) {
            return Err(Error::UnsafePath {
                entry: name.to_string(),
            });
        }
    }
    Ok(current)
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink())
}

/// Whether a symlink at `relative` pointing to `target` stays inside the
/// extraction root.
///
/// The target is walked lexically from the link's directory. Passing through
/// a symlink that already exists under `dir` is refused, since its real
/// location is not what the lexical walk assumes.
fn link_stays_inside(dir: &Path, relative: &Path, target: &str) -> bool {
    if target.is_empty() || target.starts_with('/') || target.contains('\\') {
        return false;
    }

    let mut current: Vec<Component<'_>> = relative.components().collect();
    current.pop();
    for component in Path::new(target).components() {
        match component {
            Component::Normal(_) => {
                current.push(component);
                if is_symlink(&dir.join(current.iter().collect::<PathBuf>())) {
                    return false;
                }
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if current.pop().is_none() {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn restore_symlink(dir: &Path, relative: &Path, name: &str, target: &str) -> Result<()> {
    let link = contained(dir, relative, name)?;
    if !link_stays_inside(dir, relative, target) {
        return Err(Error::UnsafePath {
            entry: format!("{name} -> {target}"),
        });
    }

    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    #[cfg(unix)]
    {
        if link.symlink_metadata().is_ok() {
            fs::remove_file(&link).map_err(|e| Error::io(&link, e))?;
        }
        std::os::unix::fs::symlink(target, &link).map_err(|e| Error::io(&link, e))?;
    }

    #[cfg(not(unix))]
    log::debug!("Skipping symlink {name} -> {target}");

    Ok(())
}

fn write_entry(reader: &mut dyn Read, target: &Path, name: &str, expected: u64) -> Result<File> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Never write through a link left by an earlier entry
    if is_symlink(target) {
        fs::remove_file(target).map_err(|e| Error::io(target, e))?;
    }

    let mut file = File::create(target).map_err(|e| Error::io(target, e))?;
    let actual = copy_entry(reader, &mut file, target)?;
    if actual != expected {
        return Err(Error::SizeMismatch {
            entry: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(file)
}

/// Copy an entry body; read failures mean a corrupt archive.
fn copy_entry(reader: &mut dyn Read, out: &mut File, target: &Path) -> Result<u64> {
    let mut buf = [0u8; 16 * 1024];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(corrupt(e)),
        };
        out.write_all(&buf[..n]).map_err(|e| Error::io(target, e))?;
        total += n as u64;
    }
    out.flush().map_err(|e| Error::io(target, e))?;
    Ok(total)
}

fn finish_file(
    file: &File,
    target: &Path,
    mode: Option<u32>,
    mtime: Option<u64>,
    started: SystemTime,
) -> Result<()> {
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode & 0o777))
            .map_err(|e| Error::io(target, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    if let Some(secs) = mtime {
        let modified = (UNIX_EPOCH + Duration::from_secs(secs)).min(started);
        file.set_modified(modified).map_err(|e| Error::io(target, e))?;
    }
    Ok(())
}

fn corrupt(err: io::Error) -> Error {
    Error::Archive(err.to_string())
}
