//! Core types for tool acquisition.
//!
//! This module contains the data structures that flow through the pipeline:
//! the [`ToolDescriptor`] describing how to find a tool's artifacts, the
//! [`Platform`] being targeted, the [`TemplateInput`] handed to artifact
//! templates, and the options/results of an installation.

use crate::archive::ArchiveKind;
use crate::resolver::VersionResolver;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Static description of where one tool's release artifacts live.
///
/// A descriptor is built once (in the catalogue or ad hoc) and lives for the
/// duration of one install command.
///
/// # Example
///
/// ```
/// use toolchain::ToolDescriptor;
/// use toolchain::template::{Binding, Condition, Template};
///
/// let tool = ToolDescriptor::new("faas-cli", "openfaas", "faas-cli")
///     .binary_template(
///         Template::new("{name}{suffix}").bind(
///             Binding::new("suffix")
///                 .when(Condition::has_prefix("os", "ming"), ".exe")
///                 .when(Condition::eq("os", "darwin"), "-darwin")
///                 .otherwise(""),
///         ),
///     );
/// assert_eq!(tool.releases_url(), "https://github.com/openfaas/faas-cli/releases");
/// ```
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Logical tool name, also the catalogue key.
    pub name: String,
    /// Source repository owner.
    pub owner: String,
    /// Source repository name.
    pub repo: String,
    /// One-line description for listings.
    pub description: String,
    /// Pinned version (empty = resolve latest).
    pub version: String,
    /// Template rendering the complete download URL.
    pub url_template: Option<Template>,
    /// Template rendering the artifact file name on a GitHub release.
    pub binary_template: Option<Template>,
    /// Artifact is a bare binary, never an archive.
    pub no_extension: bool,
    /// Extract tarballs flat: regular files only, directories dropped.
    pub flat: bool,
    /// Executable name inside the archive (defaults to `name`).
    pub binary: Option<String>,
    /// Strategy for discovering the latest version.
    pub version_resolver: Option<Arc<dyn VersionResolver>>,
}

impl ToolDescriptor {
    /// Create a descriptor with no templates.
    #[must_use]
    pub fn new(name: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            repo: repo.into(),
            description: String::new(),
            version: String::new(),
            url_template: None,
            binary_template: None,
            no_extension: false,
            flat: false,
            binary: None,
            version_resolver: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Pin a version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the full-URL template.
    #[must_use]
    pub fn url_template(mut self, template: Template) -> Self {
        self.url_template = Some(template);
        self
    }

    /// Set the file-name template.
    #[must_use]
    pub fn binary_template(mut self, template: Template) -> Self {
        self.binary_template = Some(template);
        self
    }

    /// Mark the artifact as a bare binary.
    #[must_use]
    pub fn no_extension(mut self, no_extension: bool) -> Self {
        self.no_extension = no_extension;
        self
    }

    /// Extract tarballs flat instead of recreating their directories.
    ///
    /// Flat extraction also skips symlinks, which suits archives that ship
    /// links next to the binary.
    #[must_use]
    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }

    /// Name of the executable inside the archive.
    #[must_use]
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Use a custom latest-version strategy.
    #[must_use]
    pub fn resolver(mut self, resolver: impl VersionResolver + 'static) -> Self {
        self.version_resolver = Some(Arc::new(resolver));
        self
    }

    /// Executable name without platform suffix.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        self.binary.as_deref().unwrap_or(&self.name)
    }

    /// Link to the project's release listing, used in NotFound hints.
    #[must_use]
    pub fn releases_url(&self) -> String {
        format!("https://github.com/{}/{}/releases", self.owner, self.repo)
    }
}

/// Target platform in the raw vocabulary used by artifact templates.
///
/// # Example
///
/// ```
/// use toolchain::Platform;
///
/// let platform = Platform::new("Darwin", "ARM64");
/// assert_eq!(platform.os, "darwin");
/// assert!(platform.is_darwin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system (e.g., "linux", "darwin", "mingw64_nt-10.0").
    pub os: String,
    /// CPU architecture (e.g., "x86_64", "aarch64", "armv7l").
    pub arch: String,
}

impl Platform {
    /// Create a platform; values are lowercased and `macos`/`osx` become
    /// `darwin`.
    #[must_use]
    pub fn new(os: impl AsRef<str>, arch: impl AsRef<str>) -> Self {
        Self {
            os: crate::platform::raw_os(os.as_ref()),
            arch: arch.as_ref().trim().to_lowercase(),
        }
    }

    /// Check if this platform is macOS.
    #[must_use]
    pub fn is_darwin(&self) -> bool {
        self.os == "darwin"
    }

    /// Check if this platform is Linux.
    #[must_use]
    pub fn is_linux(&self) -> bool {
        self.os == "linux"
    }

    /// Check if this platform belongs to the Windows family.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        crate::platform::is_windows(&self.os)
    }

    /// Executable suffix for this platform.
    #[must_use]
    pub fn executable_suffix(&self) -> &'static str {
        crate::platform::executable_suffix(&self.os)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Values visible to artifact templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInput {
    /// Raw OS.
    pub os: String,
    /// Raw architecture.
    pub arch: String,
    /// Tool name.
    pub name: String,
    /// Version as released (e.g. "v1.2.3").
    pub version: String,
    /// Version with one leading `v` stripped (e.g. "1.2.3").
    pub version_number: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl TemplateInput {
    /// Build the input for a descriptor, platform and resolved version.
    #[must_use]
    pub fn new(tool: &ToolDescriptor, platform: &Platform, version: &str) -> Self {
        Self {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
            name: tool.name.clone(),
            version: version.to_string(),
            version_number: version.strip_prefix('v').unwrap_or(version).to_string(),
            owner: tool.owner.clone(),
            repo: tool.repo.clone(),
        }
    }

    /// Look up a built-in variable by its template name.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&str> {
        match var {
            "os" => Some(&self.os),
            "arch" => Some(&self.arch),
            "name" => Some(&self.name),
            "version" => Some(&self.version),
            "version_number" => Some(&self.version_number),
            "owner" => Some(&self.owner),
            "repo" => Some(&self.repo),
            _ => None,
        }
    }
}

/// A concrete artifact to download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    /// Fully qualified download URL.
    pub url: String,
    /// File name of the artifact (last URL path segment).
    pub file_name: String,
    /// How the artifact must be unpacked.
    pub kind: ArchiveKind,
    /// Final executable name, with `.exe` on Windows.
    pub binary_name: String,
    /// Version the URL was rendered for.
    pub version: String,
}

/// Options for installation.
///
/// # Example
///
/// ```
/// use toolchain::InstallOptions;
///
/// let options = InstallOptions::new()
///     .version("v0.18.0")
///     .install_dir("/usr/local/bin")
///     .stash(false);
///
/// assert_eq!(options.version.as_deref(), Some("v0.18.0"));
/// assert!(!options.stash);
/// ```
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Version to install (None = descriptor pin or latest).
    pub version: Option<String>,
    /// Target OS override (raw vocabulary).
    pub os: Option<String>,
    /// Target architecture override (raw vocabulary).
    pub arch: Option<String>,
    /// Installation directory (None = stash directory).
    pub install_dir: Option<PathBuf>,
    /// Also copy the binary into the stash directory.
    pub stash: bool,
    /// Stash directory override (None = `<home>/bin`).
    pub stash_dir: Option<PathBuf>,
    /// Render a progress bar while downloading.
    pub progress: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            version: None,
            os: None,
            arch: None,
            install_dir: None,
            stash: true,
            stash_dir: None,
            progress: false,
        }
    }
}

impl InstallOptions {
    /// Create new install options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the version to install.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Override the target OS.
    #[must_use]
    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Override the target architecture.
    #[must_use]
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Set the installation directory.
    #[must_use]
    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    /// Enable or disable the stash copy.
    #[must_use]
    pub fn stash(mut self, stash: bool) -> Self {
        self.stash = stash;
        self
    }

    /// Stash into `dir` instead of `<home>/bin`.
    #[must_use]
    pub fn stash_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stash_dir = Some(dir.into());
        self
    }

    /// Enable or disable the progress bar.
    #[must_use]
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Target platform: detected values with overrides applied.
    #[must_use]
    pub fn platform(&self) -> Platform {
        let detected = crate::platform::detect();
        Platform::new(
            self.os.as_deref().unwrap_or(&detected.os),
            self.arch.as_deref().unwrap_or(&detected.arch),
        )
    }
}

/// Result of an installation.
#[derive(Debug, Clone, Serialize)]
pub struct InstallResult {
    /// Tool name.
    pub tool: String,
    /// Version that was installed.
    pub version: String,
    /// URL the artifact came from.
    pub url: String,
    /// Path to the installed binary.
    pub path: PathBuf,
    /// Copy in the stash directory, if one was made.
    pub stash_path: Option<PathBuf>,
    /// Downloaded artifact size in bytes.
    pub size: u64,
}

impl fmt::Display for InstallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} installed at {}",
            self.tool,
            self.version,
            self.path.display()
        )
    }
}
