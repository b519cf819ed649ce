//! Latest-version discovery.
//!
//! A [`VersionResolver`] turns "no version requested" into a concrete
//! release tag. Resolution is a pure function of upstream data at call time:
//! nothing is cached, and two calls may disagree if a release was published
//! in between.
//!
//! Three strategies cover the catalogue:
//!
//! - [`GithubLatest`] sniffs the redirect GitHub issues for
//!   `/releases/latest` (the default for every tool).
//! - [`PlainText`] reads a vendor "current version" file such as
//!   Kubernetes' `stable.txt` or Go's `VERSION` endpoint.
//! - [`NodeChannel`] looks a version up in a Node.js distribution channel.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::ToolDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A strategy for discovering the latest version of a tool.
pub trait VersionResolver: Debug + Send + Sync {
    /// Discover the latest version.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` when upstream does not answer as expected.
    fn latest(&self, backend: &dyn Backend) -> Result<String>;

    /// Free-form parameters this resolver works with (e.g. a channel).
    fn inputs(&self) -> BTreeMap<String, String>;

    /// Turn a caller-supplied version into a concrete one.
    ///
    /// Most strategies take the requested version as-is.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` when a symbolic version cannot be looked up.
    fn pin(&self, requested: &str, _backend: &dyn Backend) -> Result<String> {
        Ok(requested.to_string())
    }
}

/// Pick the version to install.
///
/// Precedence: `requested`, then the descriptor's pinned version, then the
/// descriptor's resolver (default [`GithubLatest`]). Resolver errors are
/// returned unchanged.
///
/// # Errors
///
/// Returns the resolver's error, or `Error::Resolution` if it produced an
/// empty version.
pub fn resolve_version(
    tool: &ToolDescriptor,
    requested: Option<&str>,
    backend: &dyn Backend,
) -> Result<String> {
    let explicit = requested
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| Some(tool.version.trim()).filter(|v| !v.is_empty()));

    let version = match (explicit, &tool.version_resolver) {
        (Some(version), Some(resolver)) => resolver.pin(version, backend)?,
        (Some(version), None) => version.to_string(),
        (None, Some(resolver)) => resolver.latest(backend)?,
        (None, None) => GithubLatest::new(&tool.owner, &tool.repo).latest(backend)?,
    };

    if version.trim().is_empty() {
        return Err(Error::resolution(
            format!("empty version resolved for {}", tool.name),
            None,
        ));
    }

    log::debug!("{} version: {}", tool.name, version);
    Ok(version.trim().to_string())
}

/// Wrap transport failures of a lookup as resolution failures.
fn lookup_failed(url: &str, err: Error) -> Error {
    match err {
        Error::Transport { message, status } => {
            Error::resolution(format!("{url}: {message}"), status)
        }
        Error::DownloadNotFound { .. } => Error::resolution(format!("{url}: HTTP 404"), Some(404)),
        other => other,
    }
}

// =============================================================================
// GitHub latest redirect
// =============================================================================

/// Latest GitHub release, read from the `/releases/latest` redirect.
///
/// The redirect avoids the rate-limited REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubLatest {
    owner: String,
    repo: String,
}

impl GithubLatest {
    /// Resolver for `github.com/{owner}/{repo}`.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// The URL that is expected to redirect.
    #[must_use]
    pub fn latest_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/releases/latest",
            self.owner, self.repo
        )
    }
}

impl VersionResolver for GithubLatest {
    fn latest(&self, backend: &dyn Backend) -> Result<String> {
        let url = self.latest_url();
        let redirect = backend
            .redirect_location(&url)
            .map_err(|e| lookup_failed(&url, e))?;

        if !redirect.is_redirect() {
            return Err(Error::resolution(
                format!(
                    "expected a redirect from {url}, got HTTP {}",
                    redirect.status
                ),
                Some(redirect.status),
            ));
        }

        let location = redirect.location.unwrap_or_default();
        let version = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();

        // A repository without releases redirects to the release listing
        if version.is_empty() || location.trim_end_matches('/').ends_with("/releases") {
            return Err(Error::resolution(
                format!("no release tag in redirect from {url} (location {location:?})"),
                Some(redirect.status),
            ));
        }

        Ok(version.to_string())
    }

    fn inputs(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("owner".to_string(), self.owner.clone()),
            ("repo".to_string(), self.repo.clone()),
        ])
    }
}

// =============================================================================
// Plain-text version file
// =============================================================================

static GO_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"go(\d+\.\d+(?:\.\d+)?)").expect("invalid go version regex"));

static NODE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"node-(v\d+\.\d+\.\d+)-").expect("invalid node version regex"));

/// Version published as a plain-text document.
#[derive(Debug, Clone)]
pub struct PlainText {
    url: String,
    pattern: Option<Regex>,
}

impl PlainText {
    /// The whole trimmed body is the version.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pattern: None,
        }
    }

    /// The version is the first capture group of `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when `pattern` is not a valid regex.
    pub fn with_pattern(url: impl Into<String>, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid version pattern {pattern:?}: {e}")))?;
        Ok(Self::with_regex(url, re))
    }

    fn with_regex(url: impl Into<String>, re: Regex) -> Self {
        Self {
            url: url.into(),
            pattern: Some(re),
        }
    }

    /// Kubernetes' current stable release (`v1.30.2`).
    #[must_use]
    pub fn kubernetes_stable() -> Self {
        Self::new("https://dl.k8s.io/release/stable.txt")
    }

    /// Go's current release, without the `go` prefix (`1.22.4`).
    #[must_use]
    pub fn go() -> Self {
        Self::with_regex("https://go.dev/VERSION?m=text", GO_VERSION.clone())
    }

    /// Extract the version from a fetched body.
    ///
    /// # Errors
    ///
    /// Returns `Error::Resolution` for empty text or when the pattern does
    /// not match.
    pub fn parse(&self, body: &str) -> Result<String> {
        let text = body.trim();
        if text.is_empty() {
            return Err(Error::resolution(format!("{} returned no text", self.url), None));
        }

        let Some(re) = &self.pattern else {
            return Ok(text.to_string());
        };

        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                Error::resolution(
                    format!("no version matching {:?} in {}", re.as_str(), self.url),
                    None,
                )
            })
    }
}

impl VersionResolver for PlainText {
    fn latest(&self, backend: &dyn Backend) -> Result<String> {
        let body = backend
            .fetch_text(&self.url)
            .map_err(|e| lookup_failed(&self.url, e))?;
        self.parse(&body)
    }

    fn inputs(&self) -> BTreeMap<String, String> {
        let mut inputs = BTreeMap::from([("url".to_string(), self.url.clone())]);
        if let Some(re) = &self.pattern {
            inputs.insert("pattern".to_string(), re.as_str().to_string());
        }
        inputs
    }
}

// =============================================================================
// Node.js channel
// =============================================================================

/// Node.js version from a distribution channel listing.
///
/// Hints starting with `latest` (`latest`, `latest-v20.x`, `latest-iron`)
/// are looked up at `https://nodejs.org/download/{channel}/{hint}/`; any other
/// hint is already a concrete version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChannel {
    channel: String,
    hint: String,
}

impl NodeChannel {
    /// Resolver for a channel (`release`, `nightly`, `rc`) and default hint.
    #[must_use]
    pub fn new(channel: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            hint: hint.into(),
        }
    }

    fn lookup(&self, hint: &str, backend: &dyn Backend) -> Result<String> {
        if !hint.starts_with("latest") {
            return Ok(hint.to_string());
        }

        let url = format!("https://nodejs.org/download/{}/{}/", self.channel, hint);
        let listing = backend
            .fetch_text(&url)
            .map_err(|e| lookup_failed(&url, e))?;

        PlainText::with_regex(url, NODE_VERSION.clone()).parse(&listing)
    }
}

impl Default for NodeChannel {
    fn default() -> Self {
        Self::new("release", "latest")
    }
}

impl VersionResolver for NodeChannel {
    fn latest(&self, backend: &dyn Backend) -> Result<String> {
        self.lookup(&self.hint, backend)
    }

    fn inputs(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("channel".to_string(), self.channel.clone()),
            ("version".to_string(), self.hint.clone()),
        ])
    }

    fn pin(&self, requested: &str, backend: &dyn Backend) -> Result<String> {
        self.lookup(requested, backend)
    }
}
