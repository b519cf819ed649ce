//! Blocking HTTP backend built on ureq.

use crate::backend::{Backend, Download, Redirect, USER_AGENT};
use crate::error::{Error, Result};
use std::time::Duration;

/// Timeout for version lookups.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for establishing a download connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Real network backend.
///
/// Uses two agents: one that never follows redirects (latest-release
/// discovery) and one that does (artifact downloads, which GitHub serves
/// from a CDN behind a redirect).
///
/// # Example
///
/// ```no_run
/// use toolchain::backend::Backend;
/// use toolchain::backend::http::UreqBackend;
///
/// let backend = UreqBackend::new();
/// let stable = backend.fetch_text("https://dl.k8s.io/release/stable.txt").unwrap();
/// println!("kubectl stable: {}", stable.trim());
/// ```
pub struct UreqBackend {
    no_redirect: ureq::Agent,
    follow: ureq::Agent,
}

impl UreqBackend {
    /// Create a backend with the default timeouts.
    #[must_use]
    pub fn new() -> Self {
        let no_redirect = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .user_agent(USER_AGENT)
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build();

        // Downloads can take minutes, only the connect phase is bounded
        let follow = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .user_agent(USER_AGENT)
            .http_status_as_error(false)
            .build();

        Self {
            no_redirect: ureq::Agent::new_with_config(no_redirect),
            follow: ureq::Agent::new_with_config(follow),
        }
    }
}

impl Default for UreqBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for UreqBackend {
    fn redirect_location(&self, url: &str) -> Result<Redirect> {
        log::debug!("HEAD {url}");
        let response = self.no_redirect.head(url).call()?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        log::debug!("HEAD {url} -> {status} {location:?}");
        Ok(Redirect { status, location })
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        log::debug!("GET {url}");
        // dl.k8s.io serves stable.txt behind a redirect
        let mut response = self
            .follow
            .get(url)
            .config()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .call()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(
                format!("HTTP {} for {url}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        Ok(response.body_mut().read_to_string()?)
    }

    fn open(&self, url: &str) -> Result<Download> {
        log::debug!("GET {url}");
        let response = self.follow.get(url).call()?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(Error::DownloadNotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::transport(
                format!("HTTP {} for {url}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let headers = response.headers();
        // A transparently decoded body no longer matches the declared length
        let content_length = if headers.contains_key("content-encoding") {
            None
        } else {
            headers
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        Ok(Download {
            reader: Box::new(response.into_body().into_reader()),
            content_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_impl() {
        let _backend = UreqBackend::default();
    }

    #[test]
    fn test_timeouts() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(5));
        assert!(CONNECT_TIMEOUT > REQUEST_TIMEOUT);
    }
}
