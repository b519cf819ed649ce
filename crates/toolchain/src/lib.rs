//! # toolchain
//!
//! Pure Rust engine for fetching CLI tools from their release pages.
//!
//! Given a tool name, an optional version and a target OS/architecture, the
//! engine:
//! - Resolves the latest version when none is requested
//! - Renders the artifact URL from the tool's naming rules
//! - Downloads it into a scoped temporary directory
//! - Extracts it if it is an archive (tar, tar.gz, zip, gz)
//! - Places the binary at a deterministic path, optionally stashing a copy
//!
//! ## Example
//!
//! ```no_run
//! use toolchain::{Client, InstallOptions};
//!
//! let client = Client::new();
//!
//! // Install the latest kubectl into ~/.getkit/bin
//! let result = client.install("kubectl", &InstallOptions::default())
//!     .expect("installation failed");
//!
//! println!("Installed {} {} to {}", result.tool, result.version, result.path.display());
//!
//! // Pin a version and install elsewhere
//! client
//!     .install("kind", &InstallOptions::new().version("v0.23.0").install_dir("/usr/local/bin"))
//!     .unwrap();
//! ```
//!
//! ## Platform Detection
//!
//! Templates see the platform the way `uname` reports it:
//!
//! ```
//! use toolchain::platform;
//!
//! let platform = platform::detect();
//! println!("Platform: {platform}");
//! // Output: "darwin/arm64" (on Apple Silicon Mac)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod platform;
pub mod resolver;
pub mod template;
pub mod types;

pub use archive::ArchiveKind;
pub use backend::{Backend, MockBackend};
pub use catalog::Catalog;
pub use download::DownloadResult;
pub use error::{Error, ErrorCategory, Result};
pub use resolver::VersionResolver;
pub use types::{
    InstallOptions, InstallResult, Platform, ResolvedArtifact, TemplateInput, ToolDescriptor,
};

use backend::http::UreqBackend;
use std::path::{Path, PathBuf};

/// Name of the catalogue entry for getkit itself.
pub const SELF_TOOL: &str = "getkit";

/// High-level client running the acquisition pipeline.
///
/// Resolve version → render URL → download → extract → place. Each install
/// runs to completion before the next starts, and owns its temporary files.
///
/// # Example
///
/// ```no_run
/// use toolchain::{Client, InstallOptions};
///
/// let client = Client::new();
///
/// let tool = client.tool("helm").unwrap();
/// let version = client.resolve_version(tool, None).unwrap();
/// let artifact = client.resolve_artifact(tool, &InstallOptions::new().version(&version)).unwrap();
/// println!("{}", artifact.url);
/// ```
pub struct Client {
    catalog: Catalog,
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client with the built-in catalogue and the HTTP backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Catalog::builtin(),
            backend: Box::new(UreqBackend::new()),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            catalog: Catalog::builtin(),
            backend,
        }
    }

    /// Create a client with a custom catalogue and backend.
    #[must_use]
    pub fn with_catalog(catalog: Catalog, backend: Box<dyn Backend>) -> Self {
        Self { catalog, backend }
    }

    /// The tool catalogue.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Look a tool up by exact name.
    pub fn tool(&self, name: &str) -> Result<&ToolDescriptor> {
        self.catalog.get(name)
    }

    // =========================================================================
    // Pipeline stages
    // =========================================================================

    /// Pick the version to install (see [`resolver::resolve_version`]).
    pub fn resolve_version(&self, tool: &ToolDescriptor, requested: Option<&str>) -> Result<String> {
        resolver::resolve_version(tool, requested, self.backend.as_ref())
    }

    /// Resolve the version and render the artifact for the target platform.
    pub fn resolve_artifact(
        &self,
        tool: &ToolDescriptor,
        options: &InstallOptions,
    ) -> Result<ResolvedArtifact> {
        let version = self.resolve_version(tool, options.version.as_deref())?;
        template::resolve(tool, &options.platform(), &version)
    }

    /// Download a resolved artifact.
    pub fn download(
        &self,
        artifact: &ResolvedArtifact,
        tool: &str,
        show_progress: bool,
    ) -> Result<DownloadResult> {
        download::download(self.backend.as_ref(), &artifact.url, tool, show_progress)
    }

    // =========================================================================
    // Installation Operations
    // =========================================================================

    /// Install a catalogue tool.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use toolchain::{Client, InstallOptions};
    ///
    /// let client = Client::new();
    ///
    /// // Install latest
    /// client.install("jq", &InstallOptions::default()).unwrap();
    ///
    /// // Install a specific version for another platform
    /// client
    ///     .install("jq", &InstallOptions::new().version("jq-1.7.1").os("darwin").arch("arm64"))
    ///     .unwrap();
    /// ```
    pub fn install(&self, name: &str, options: &InstallOptions) -> Result<InstallResult> {
        let tool = self.catalog.get(name)?;
        self.install_tool(tool, options)
    }

    /// Install any descriptor, catalogued or not.
    pub fn install_tool(
        &self,
        tool: &ToolDescriptor,
        options: &InstallOptions,
    ) -> Result<InstallResult> {
        let artifact = self.resolve_artifact(tool, options)?;
        let downloaded = self.download(&artifact, &tool.name, options.progress)?;
        let binary = unpack(tool, &artifact, &downloaded)?;

        let install_dir = match &options.install_dir {
            Some(dir) => dir.clone(),
            None => config::default_install_dir()?,
        };
        let path = install::place(&binary, &install_dir, &artifact.binary_name)?;

        let stash_path = if options.stash {
            let stash_dir = match &options.stash_dir {
                Some(dir) => dir.clone(),
                None => config::stash_dir()?,
            };
            if same_dir(&stash_dir, &install_dir) {
                None
            } else {
                Some(install::stash(&path, &stash_dir)?)
            }
        } else {
            None
        };

        log::info!("Installed {} {} at {}", tool.name, artifact.version, path.display());
        Ok(InstallResult {
            tool: tool.name.clone(),
            version: artifact.version,
            url: artifact.url,
            path,
            stash_path,
            size: downloaded.size,
        })
    }

    /// Install several tools one after another, stopping at the first error.
    pub fn install_all<S: AsRef<str>>(
        &self,
        names: &[S],
        options: &InstallOptions,
    ) -> Result<Vec<InstallResult>> {
        // Fail on unknown names before downloading anything
        for name in names {
            self.catalog.get(name.as_ref())?;
        }

        names
            .iter()
            .map(|name| self.install(name.as_ref(), options))
            .collect()
    }

    /// Replace the running executable with the latest getkit release.
    pub fn self_update(&self, options: &InstallOptions) -> Result<InstallResult> {
        let target = std::env::current_exe()
            .map_err(|e| Error::io(PathBuf::from(SELF_TOOL), e))?;
        self.self_update_at(options, &target)
    }

    /// Replace the executable at `target` with the latest getkit release.
    pub fn self_update_at(&self, options: &InstallOptions, target: &Path) -> Result<InstallResult> {
        let tool = self.catalog.get(SELF_TOOL)?;
        let artifact = self.resolve_artifact(tool, options)?;
        let downloaded = self.download(&artifact, &tool.name, options.progress)?;
        let binary = unpack(tool, &artifact, &downloaded)?;

        install::replace_executable(&binary, target)?;

        Ok(InstallResult {
            tool: tool.name.clone(),
            version: artifact.version,
            url: artifact.url,
            path: target.to_path_buf(),
            stash_path: None,
            size: downloaded.size,
        })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of the binary to place: the download itself, the decompressed file
/// for a plain `.gz`, or the executable found after extracting an archive
/// next to the download.
fn unpack(
    tool: &ToolDescriptor,
    artifact: &ResolvedArtifact,
    downloaded: &DownloadResult,
) -> Result<PathBuf> {
    if !artifact.kind.is_archive() {
        return Ok(downloaded.path.clone());
    }

    let dir = downloaded.dir().join("extracted");
    let written = archive::extract(artifact.kind, &downloaded.path, &dir, tool.flat)?;

    // A gzip stream holds exactly one file, whatever it is called
    if artifact.kind == ArchiveKind::Gzip {
        return written.into_iter().next().ok_or_else(|| {
            Error::Archive(format!("{} decompressed to nothing", artifact.file_name))
        });
    }

    install::find_binary(&dir, tool.binary_name()).ok_or_else(|| {
        Error::Archive(format!(
            "{} not found in {}",
            tool.binary_name(),
            artifact.file_name
        ))
    })
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Redirect;
    use crate::template::{Binding, Condition, Template};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    const FAAS_DARWIN: &str =
        "https://github.com/openfaas/faas-cli/releases/download/0.16.36/faas-cli-darwin";

    fn targz(path: &str, content: &[u8], mode: u32) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append(&header, content).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn options(temp: &TempDir) -> InstallOptions {
        InstallOptions::new()
            .os("linux")
            .arch("x86_64")
            .install_dir(temp.path().join("bin"))
            .stash(false)
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new();
        assert!(client.catalog().contains("kubectl"));
    }

    #[test]
    fn test_client_default() {
        let client = Client::default();
        assert!(!client.catalog().is_empty());
    }

    #[test]
    fn test_unknown_tool() {
        let client = Client::with_backend(Box::new(MockBackend::new()));
        let err = client.install("kubctl", &InstallOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownTool { .. }));
    }

    #[test]
    fn test_resolve_artifact_faas_cli_darwin() {
        let client = Client::with_backend(Box::new(MockBackend::new()));
        let tool = client.tool("faas-cli").unwrap();
        let options = InstallOptions::new().version("0.16.36").os("darwin").arch("x86_64");

        let artifact = client.resolve_artifact(tool, &options).unwrap();
        assert_eq!(artifact.url, FAAS_DARWIN);
    }

    #[test]
    fn test_install_bare_binary() {
        let temp = TempDir::new().unwrap();
        let mock = MockBackend::new().with_file(FAAS_DARWIN, b"faas".to_vec());
        let client = Client::with_backend(Box::new(mock));

        let options = InstallOptions::new()
            .version("0.16.36")
            .os("darwin")
            .arch("x86_64")
            .install_dir(temp.path().join("bin"))
            .stash_dir(temp.path().join("stash"));
        let result = client.install("faas-cli", &options).unwrap();

        assert_eq!(result.path, temp.path().join("bin/faas-cli"));
        assert_eq!(fs::read(&result.path).unwrap(), b"faas");
        assert_eq!(result.stash_path, Some(temp.path().join("stash/faas-cli")));
        assert_eq!(result.size, 4);
    }

    #[test]
    fn test_install_resolves_latest_and_extracts() {
        let temp = TempDir::new().unwrap();
        let url = "https://get.helm.sh/helm-v3.15.2-linux-amd64.tar.gz";
        let mock = MockBackend::new()
            .with_redirect(
                "https://github.com/helm/helm/releases/latest",
                "https://github.com/helm/helm/releases/tag/v3.15.2",
            )
            .with_file(url, targz("linux-amd64/helm", b"helm-binary", 0o755));
        let client = Client::with_backend(Box::new(mock));

        let result = client.install("helm", &options(&temp)).unwrap();
        assert_eq!(result.version, "v3.15.2");
        assert_eq!(result.url, url);
        assert_eq!(fs::read(temp.path().join("bin/helm")).unwrap(), b"helm-binary");
        assert!(result.stash_path.is_none());
    }

    #[test]
    fn test_install_archive_without_binary() {
        let temp = TempDir::new().unwrap();
        let url = "https://get.helm.sh/helm-v3.15.2-linux-amd64.tar.gz";
        let mock = MockBackend::new().with_file(url, targz("linux-amd64/README.md", b"docs", 0o644));
        let client = Client::with_backend(Box::new(mock));

        let mut opts = options(&temp);
        opts.version = Some("v3.15.2".to_string());
        let err = client.install("helm", &opts).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }

    #[test]
    fn test_failing_resolver_never_downloads() {
        let temp = TempDir::new().unwrap();
        let mock = MockBackend::new().with_status(
            "https://github.com/kubernetes-sigs/kind/releases/latest",
            Redirect {
                status: 200,
                location: None,
            },
        );
        let recorder = mock.clone();
        let client = Client::with_backend(Box::new(mock));

        let err = client.install("kind", &options(&temp)).unwrap_err();
        assert!(matches!(err, Error::Resolution { status: Some(200), .. }));
        assert_eq!(
            recorder.requests(),
            vec!["HEAD https://github.com/kubernetes-sigs/kind/releases/latest"]
        );
        assert!(!temp.path().join("bin").exists());
    }

    #[test]
    fn test_download_404_is_not_found() {
        let temp = TempDir::new().unwrap();
        let client = Client::with_backend(Box::new(MockBackend::new()));

        let mut opts = options(&temp);
        opts.version = Some("v0.23.0".to_string());
        let err = client.install("kind", &opts).unwrap_err();
        assert!(matches!(err, Error::DownloadNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_install_all_stops_on_unknown_before_downloading() {
        let temp = TempDir::new().unwrap();
        let mock = MockBackend::new();
        let recorder = mock.clone();
        let client = Client::with_backend(Box::new(mock));

        let err = client.install_all(&["kind", "nope"], &options(&temp)).unwrap_err();
        assert!(matches!(err, Error::UnknownTool { .. }));
        assert!(recorder.requests().is_empty());
    }

    #[test]
    fn test_install_all_sequential() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::builder()
            .tool(
                ToolDescriptor::new("one", "acme", "one")
                    .version("1.0.0")
                    .url_template(Template::new("https://example.com/{version}/{name}")),
            )
            .tool(
                ToolDescriptor::new("two", "acme", "two")
                    .version("2.0.0")
                    .url_template(Template::new("https://example.com/{version}/{name}")),
            )
            .build()
            .unwrap();
        let mock = MockBackend::new()
            .with_file("https://example.com/1.0.0/one", b"1".to_vec())
            .with_file("https://example.com/2.0.0/two", b"2".to_vec());
        let recorder = mock.clone();
        let client = Client::with_catalog(catalog, Box::new(mock));

        let results = client.install_all(&["two", "one"], &options(&temp)).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool, "two");
        assert_eq!(
            recorder.requests(),
            vec!["GET https://example.com/2.0.0/two", "GET https://example.com/1.0.0/one"]
        );
    }

    #[test]
    fn test_default_branch_end_to_end() {
        let temp = TempDir::new().unwrap();
        let url = "https://github.com/openfaas/faas-cli/releases/download/0.16.36/faas-cli";
        let mock = MockBackend::new().with_file(url, b"x".to_vec());
        let client = Client::with_backend(Box::new(mock));

        let opts = options(&temp).version("0.16.36").arch("riscv64");
        let result = client.install("faas-cli", &opts).unwrap();
        assert_eq!(result.url, url);
    }

    #[test]
    fn test_windows_binary_gets_exe() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::builder()
            .tool(
                ToolDescriptor::new("tool", "acme", "tool")
                    .version("v1")
                    .no_extension(true)
                    .binary_template(
                        Template::new("{name}{exe}")
                            .bind(Binding::new("exe").when(Condition::has_prefix("os", "ming"), ".exe")),
                    ),
            )
            .build()
            .unwrap();
        let url = "https://github.com/acme/tool/releases/download/v1/tool.exe";
        let mock = MockBackend::new().with_file(url, b"MZ".to_vec());
        let client = Client::with_catalog(catalog, Box::new(mock));

        let opts = options(&temp).os("mingw64_nt-10.0");
        let result = client.install("tool", &opts).unwrap();
        assert_eq!(result.path, temp.path().join("bin/tool.exe"));
    }

    #[test]
    fn test_stash_skipped_when_installing_into_stash() {
        let temp = TempDir::new().unwrap();
        let mock = MockBackend::new().with_file(FAAS_DARWIN, b"faas".to_vec());
        let client = Client::with_backend(Box::new(mock));

        let opts = InstallOptions::new()
            .version("0.16.36")
            .os("darwin")
            .arch("x86_64")
            .install_dir(temp.path())
            .stash_dir(temp.path());
        let result = client.install("faas-cli", &opts).unwrap();
        assert!(result.stash_path.is_none());
    }

    #[test]
    fn test_self_update_replaces_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("getkit");
        fs::write(&target, b"old").unwrap();

        let url = "https://github.com/getkit/getkit/releases/download/0.2.0/getkit";
        let mock = MockBackend::new()
            .with_redirect(
                "https://github.com/getkit/getkit/releases/latest",
                "https://github.com/getkit/getkit/releases/tag/0.2.0",
            )
            .with_file(url, b"new".to_vec());
        let client = Client::with_backend(Box::new(mock));

        let opts = InstallOptions::new().os("linux").arch("x86_64");
        let result = client.self_update_at(&opts, &target).unwrap();
        assert_eq!(result.version, "0.2.0");
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    fn single_tool(tool: ToolDescriptor) -> Catalog {
        Catalog::builder().tool(tool).build().unwrap()
    }

    #[test]
    fn test_install_gzip_binary() {
        let temp = TempDir::new().unwrap();
        let tool = ToolDescriptor::new("tool", "acme", "tool")
            .version("v1.0.0")
            .binary_template(Template::new("{name}-linux-amd64.gz"));
        let url = "https://github.com/acme/tool/releases/download/v1.0.0/tool-linux-amd64.gz";

        let mut body = GzEncoder::new(Vec::new(), Compression::default());
        body.write_all(b"ELF-tool").unwrap();
        let mock = MockBackend::new().with_file(url, body.finish().unwrap());
        let client = Client::with_catalog(single_tool(tool), Box::new(mock));

        let result = client.install("tool", &options(&temp)).unwrap();
        assert_eq!(result.path, temp.path().join("bin/tool"));
        assert_eq!(fs::read(&result.path).unwrap(), b"ELF-tool");
    }

    /// Tarball with the binary plus a link pointing out of the archive.
    fn targz_with_outside_link() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        let mut header = tar::Header::new_gnu();
        header.set_path("tool-1.0/bin/tool").unwrap();
        header.set_size(4);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append(&header, &b"tool"[..]).unwrap();

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_path("tool-1.0/share").unwrap();
        link.set_link_name("../../../usr/share").unwrap();
        link.set_size(0);
        link.set_cksum();
        builder.append(&link, std::io::empty()).unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    fn tarball_tool(flat: bool) -> ToolDescriptor {
        ToolDescriptor::new("tool", "acme", "tool")
            .version("v1.0.0")
            .flat(flat)
            .binary_template(Template::new("{name}-linux-amd64.tar.gz"))
    }

    #[test]
    fn test_flat_tool_skips_links_and_installs() {
        let temp = TempDir::new().unwrap();
        let url = "https://github.com/acme/tool/releases/download/v1.0.0/tool-linux-amd64.tar.gz";
        let mock = MockBackend::new().with_file(url, targz_with_outside_link());
        let client = Client::with_catalog(single_tool(tarball_tool(true)), Box::new(mock));

        let result = client.install("tool", &options(&temp)).unwrap();
        assert_eq!(fs::read(result.path).unwrap(), b"tool");
    }

    #[test]
    fn test_nested_tool_rejects_outside_link() {
        let temp = TempDir::new().unwrap();
        let url = "https://github.com/acme/tool/releases/download/v1.0.0/tool-linux-amd64.tar.gz";
        let mock = MockBackend::new().with_file(url, targz_with_outside_link());
        let client = Client::with_catalog(single_tool(tarball_tool(false)), Box::new(mock));

        let err = client.install("tool", &options(&temp)).unwrap_err();
        assert!(matches!(err, Error::UnsafePath { .. }));
        assert!(!temp.path().join("bin").exists());
    }

    #[test]
    fn test_macos_override_uses_darwin_artifact() {
        let client = Client::with_backend(Box::new(MockBackend::new()));
        let tool = client.tool("faas-cli").unwrap();
        let options = InstallOptions::new().version("0.16.36").os("macOS").arch("x86_64");

        let artifact = client.resolve_artifact(tool, &options).unwrap();
        assert_eq!(artifact.url, FAAS_DARWIN);
    }

    #[test]
    fn test_corrupt_archive_places_nothing() {
        let temp = TempDir::new().unwrap();
        let url = "https://get.helm.sh/helm-v3.15.2-linux-amd64.tar.gz";
        let mut corrupt = GzEncoder::new(Vec::new(), Compression::default());
        corrupt.write_all(b"not a tarball at all").unwrap();
        let mock = MockBackend::new().with_file(url, corrupt.finish().unwrap());
        let client = Client::with_backend(Box::new(mock));

        let mut opts = options(&temp);
        opts.version = Some("v3.15.2".to_string());
        assert!(client.install("helm", &opts).is_err());
        assert!(!temp.path().join("bin").exists());
    }
}
