//! Environment configuration.
//!
//! # Environment Variables
//!
//! - `GETKIT_PROGRESS` - force the download progress bar on or off. Accepts
//!   `1 t T TRUE true True` and `0 f F FALSE false False`; anything else is
//!   an error. Takes precedence over the `--progress` flag.
//! - `GETKIT_HOME` - override the private directory (default `~/.getkit`).
//!   The stash lives in `<home>/bin`.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Environment variable forcing the progress bar on or off.
pub const ENV_PROGRESS: &str = "GETKIT_PROGRESS";

/// Environment variable overriding the private directory.
pub const ENV_HOME: &str = "GETKIT_HOME";

/// Parse a boolean using the accepted spellings.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Progress override from `GETKIT_PROGRESS`, if set.
///
/// # Errors
///
/// Returns `Error::Config` when the variable is set to something that is
/// not a boolean.
pub fn progress_override() -> Result<Option<bool>> {
    progress_from(std::env::var(ENV_PROGRESS).ok().as_deref())
}

fn progress_from(value: Option<&str>) -> Result<Option<bool>> {
    match value {
        None => Ok(None),
        Some(raw) => parse_bool(raw).map(Some).ok_or_else(|| {
            Error::Config(format!("{ENV_PROGRESS}={raw:?} is not a boolean"))
        }),
    }
}

/// Whether to draw a progress bar: the environment override, else `flag`.
///
/// # Errors
///
/// Same as [`progress_override`].
pub fn effective_progress(flag: bool) -> Result<bool> {
    Ok(progress_override()?.unwrap_or(flag))
}

/// The private getkit directory.
///
/// Priority:
/// 1. `GETKIT_HOME` env var
/// 2. `~/.getkit`
///
/// # Errors
///
/// Returns `Error::Config` when no home directory can be determined.
pub fn home_dir() -> Result<PathBuf> {
    home_from(std::env::var(ENV_HOME).ok().as_deref())
}

fn home_from(value: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = value.map(str::trim).filter(|v| !v.is_empty()) {
        let path = expand_path(dir);
        log::debug!("Using home from {}: {}", ENV_HOME, path.display());
        return Ok(path);
    }

    dirs::home_dir()
        .map(|h| h.join(".getkit"))
        .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))
}

/// Directory holding stashed binaries (`<home>/bin`).
///
/// # Errors
///
/// Same as [`home_dir`].
pub fn stash_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join("bin"))
}

/// Where binaries go when no `--path` is given: the stash directory.
///
/// # Errors
///
/// Same as [`home_dir`].
pub fn default_install_dir() -> Result<PathBuf> {
    stash_dir()
}

/// Expand `~` and environment variables in a path.
///
/// Unknown variables are left as written.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_parse_bool_spellings() {
        for yes in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(yes), Some(true), "{yes}");
        }
        for no in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(no), Some(false), "{no}");
        }
        for bad in ["", "yes", "no", "tRUE", "on", " true"] {
            assert_eq!(parse_bool(bad), None, "{bad}");
        }
    }

    #[test]
    fn test_progress_from() {
        assert_eq!(progress_from(None).unwrap(), None);
        assert_eq!(progress_from(Some("false")).unwrap(), Some(false));
        assert_eq!(progress_from(Some("1")).unwrap(), Some(true));

        let err = progress_from(Some("maybe")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(ENV_PROGRESS));
    }

    #[test]
    fn test_effective_progress_env_wins() {
        let original = env::var(ENV_PROGRESS).ok();
        // SAFETY: only this test touches GETKIT_PROGRESS
        unsafe { env::set_var(ENV_PROGRESS, "0") };
        let forced_off = effective_progress(true).unwrap();
        // SAFETY: see above
        unsafe { env::set_var(ENV_PROGRESS, "nope") };
        let invalid = effective_progress(true);
        match original {
            // SAFETY: see above
            Some(v) => unsafe { env::set_var(ENV_PROGRESS, v) },
            None => unsafe { env::remove_var(ENV_PROGRESS) },
        }

        assert!(!forced_off);
        assert!(invalid.is_err());
    }

    #[test]
    fn test_home_from_override() {
        assert_eq!(
            home_from(Some("/opt/getkit")).unwrap(),
            PathBuf::from("/opt/getkit")
        );
    }

    #[test]
    fn test_home_from_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(home_from(Some("~/kit")).unwrap(), home.join("kit"));
    }

    #[test]
    fn test_home_default() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(home_from(None).unwrap(), home.join(".getkit"));
        assert_eq!(home_from(Some("  ")).unwrap(), home.join(".getkit"));
    }

    #[test]
    fn test_stash_dir_is_under_home() {
        let stash = stash_dir().unwrap();
        assert!(stash.ends_with("bin"));
        assert_eq!(default_install_dir().unwrap(), stash);
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/usr/local/bin"), PathBuf::from("/usr/local/bin"));
        assert_eq!(
            expand_path("$GETKIT_SURELY_UNSET_VAR/bin"),
            PathBuf::from("$GETKIT_SURELY_UNSET_VAR/bin")
        );
    }
}
