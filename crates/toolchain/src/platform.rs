//! Platform detection and normalization.
//!
//! Release artifacts are named after whatever `uname` printed on the
//! maintainer's machine, so the engine works with two vocabularies:
//!
//! - **raw** values (`darwin`, `linux`, `mingw64_nt-10.0`, `x86_64`,
//!   `aarch64`, `armv7l`), which is what artifact templates match against.
//! - **canonical** values (`darwin`, `linux`, `windows`, `amd64`, `arm64`,
//!   `arm`, `386`) returned by [`normalize`].
//!
//! Per-tool naming differences (one vendor's `armhf` is another's `armv7`)
//! belong in the tool's template rules, not here.
//!
//! # Example
//!
//! ```
//! use toolchain::platform;
//!
//! let (arch, os) = platform::normalize("x86_64", "Darwin");
//! assert_eq!((arch.as_str(), os.as_str()), ("amd64", "darwin"));
//! ```

use crate::types::Platform;

/// Detect the current platform in the raw vocabulary.
///
/// | Rust target OS/arch | Raw OS        | Raw arch  |
/// |---------------------|---------------|-----------|
/// | macos / aarch64     | darwin        | arm64     |
/// | macos / x86_64      | darwin        | x86_64    |
/// | linux / aarch64     | linux         | aarch64   |
/// | linux / arm         | linux         | armv7l    |
/// | windows / x86_64    | mingw64_nt    | x86_64    |
#[must_use]
pub fn detect() -> Platform {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "mingw64_nt",
        other => other,
    };

    let arch = match (std::env::consts::OS, std::env::consts::ARCH) {
        // uname -m reports arm64 on Apple Silicon
        ("macos", "aarch64") => "arm64",
        (_, "arm") => "armv7l",
        (_, "x86") => "i686",
        (_, other) => other,
    };

    log::debug!("Detected platform {os}/{arch}");
    Platform::new(os, arch)
}

/// Map raw architecture and OS strings to canonical tokens.
///
/// Matching is case-insensitive. Unknown values pass through lowercased.
#[must_use]
pub fn normalize(raw_arch: &str, raw_os: &str) -> (String, String) {
    (normalize_arch(raw_arch), normalize_os(raw_os))
}

/// Canonical OS token for a raw OS string.
#[must_use]
pub fn normalize_os(raw_os: &str) -> String {
    let os = raw_os.trim().to_lowercase();
    if is_windows(&os) {
        return "windows".to_string();
    }
    match os.as_str() {
        "macos" | "osx" => "darwin".to_string(),
        _ => os,
    }
}

/// Raw OS name for a user-supplied OS string.
///
/// Lowercases and maps Apple's marketing names (`macos`, `osx`) onto the
/// `darwin` that release artifacts use. Windows-family names are kept as
/// written so templates can still match their `ming` prefix.
#[must_use]
pub fn raw_os(os: &str) -> String {
    let os = os.trim().to_lowercase();
    match os.as_str() {
        "macos" | "osx" | "mac" => "darwin".to_string(),
        _ => os,
    }
}

/// Canonical architecture token for a raw architecture string.
#[must_use]
pub fn normalize_arch(raw_arch: &str) -> String {
    let arch = raw_arch.trim().to_lowercase();
    let canonical = match arch.as_str() {
        "x86_64" | "amd64" | "x64" => "amd64",
        "aarch64" | "arm64" | "aarch64_be" | "armv8l" => "arm64",
        "armv6l" | "armv7l" | "armv7" | "armhf" | "arm" => "arm",
        "i386" | "i686" | "x86" | "386" => "386",
        _ => return arch,
    };
    canonical.to_string()
}

/// Whether a raw or canonical OS string belongs to the Windows family.
///
/// Git Bash and MSYS report names like `MINGW64_NT-10.0-18362`, so this is a
/// prefix test rather than an equality check.
#[must_use]
pub fn is_windows(os: &str) -> bool {
    let os = os.to_lowercase();
    os == "windows" || os.starts_with("ming") || os.starts_with("msys") || os.starts_with("cygwin")
}

/// Executable suffix for binaries on the given OS.
///
/// Returns ".exe" for the Windows family, empty string otherwise.
#[must_use]
pub fn executable_suffix(os: &str) -> &'static str {
    if is_windows(os) { ".exe" } else { "" }
}
