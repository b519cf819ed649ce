//! HTTP backends.
//!
//! The engine needs exactly three things from the network: the target of an
//! unfollowed redirect (latest-release discovery), a small text body
//! (version files) and a streamed artifact. The [`Backend`] trait captures
//! those, with [`http::UreqBackend`] as the real implementation.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use toolchain::backend::{Backend, MockBackend};
//!
//! let mock = MockBackend::new()
//!     .with_redirect(
//!         "https://github.com/kubernetes-sigs/kind/releases/latest",
//!         "https://github.com/kubernetes-sigs/kind/releases/tag/v0.23.0",
//!     )
//!     .with_text("https://dl.k8s.io/release/stable.txt", "v1.30.2\n");
//!
//! let redirect = mock
//!     .redirect_location("https://github.com/kubernetes-sigs/kind/releases/latest")
//!     .unwrap();
//! assert_eq!(redirect.status, 302);
//! assert_eq!(mock.requests().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, PoisonError};

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("getkit/", env!("CARGO_PKG_VERSION"));

/// Response to a request that must not follow redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, if present.
    pub location: Option<String>,
}

impl Redirect {
    /// Whether the response was a 3xx.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// An artifact body being streamed.
pub struct Download {
    /// Response body.
    pub reader: Box<dyn Read + Send>,
    /// Declared body length, when the server sent one.
    pub content_length: Option<u64>,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Backend trait for network access.
///
/// Implementations never retry. Each method performs exactly one request.
pub trait Backend: Send + Sync {
    /// HEAD `url` without following redirects.
    ///
    /// Any status is returned as a [`Redirect`]; only transport failures are
    /// errors.
    fn redirect_location(&self, url: &str) -> Result<Redirect>;

    /// GET `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` for non-2xx responses.
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// GET `url` and return the body as a stream.
    ///
    /// # Errors
    ///
    /// Returns `Error::DownloadNotFound` for 404 and `Error::Transport` for
    /// any other non-2xx response.
    fn open(&self, url: &str) -> Result<Download>;
}

/// Mock backend for testing without network access.
///
/// Responses are keyed by exact URL. Every call is recorded so tests can
/// assert that nothing was downloaded.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    redirects: Arc<Mutex<HashMap<String, Redirect>>>,
    texts: Arc<Mutex<HashMap<String, String>>>,
    files: Arc<Mutex<HashMap<String, (Vec<u8>, Option<u64>)>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer a HEAD of `url` with a 302 to `location`.
    #[must_use]
    pub fn with_redirect(self, url: impl Into<String>, location: impl Into<String>) -> Self {
        self.with_status(
            url,
            Redirect {
                status: 302,
                location: Some(location.into()),
            },
        )
    }

    /// Answer a HEAD of `url` with an arbitrary response.
    #[must_use]
    pub fn with_status(self, url: impl Into<String>, redirect: Redirect) -> Self {
        lock(&self.redirects).insert(url.into(), redirect);
        self
    }

    /// Serve `body` as text at `url`.
    #[must_use]
    pub fn with_text(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        lock(&self.texts).insert(url.into(), body.into());
        self
    }

    /// Serve `data` at `url` with an accurate content length.
    #[must_use]
    pub fn with_file(self, url: impl Into<String>, data: Vec<u8>) -> Self {
        let len = data.len() as u64;
        lock(&self.files).insert(url.into(), (data, Some(len)));
        self
    }

    /// Serve `data` at `url` but declare `content_length`.
    #[must_use]
    pub fn with_file_declaring(
        self,
        url: impl Into<String>,
        data: Vec<u8>,
        content_length: Option<u64>,
    ) -> Self {
        lock(&self.files).insert(url.into(), (data, content_length));
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    fn record(&self, method: &str, url: &str) {
        lock(&self.requests).push(format!("{method} {url}"));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Backend for MockBackend {
    fn redirect_location(&self, url: &str) -> Result<Redirect> {
        self.record("HEAD", url);
        Ok(lock(&self.redirects).get(url).cloned().unwrap_or(Redirect {
            status: 404,
            location: None,
        }))
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        self.record("GET", url);
        lock(&self.texts)
            .get(url)
            .cloned()
            .ok_or_else(|| Error::transport(format!("HTTP 404 for {url}"), Some(404)))
    }

    fn open(&self, url: &str) -> Result<Download> {
        self.record("GET", url);
        let files = lock(&self.files);
        let (data, content_length) = files.get(url).ok_or_else(|| Error::DownloadNotFound {
            url: url.to_string(),
        })?;
        Ok(Download {
            reader: Box::new(Cursor::new(data.clone())),
            content_length: *content_length,
        })
    }
}
