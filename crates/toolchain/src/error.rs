//! Error types for tool acquisition.
//!
//! Every failure the engine can produce is an [`Error`] variant, and every
//! variant maps to exactly one [`ErrorCategory`]. Callers use the category to
//! decide what to tell the user: a `NotFound` gets a hint pointing at the
//! project's releases page, a `Template` error is a catalogue bug, and so on.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for toolchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of toolchain errors.
///
/// The engine never retries on its own. Categories exist so the caller can
/// print targeted remediation text instead of a raw error string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No artifact exists for the requested tool/version/platform.
    NotFound,
    /// Malformed artifact template (catalogue authoring bug).
    Template,
    /// Latest-version discovery failed.
    Resolution,
    /// Network-level failure while downloading.
    Transport,
    /// Malformed archive, unsafe entry path or size mismatch.
    Archive,
    /// Filesystem failure while placing the binary.
    Placement,
    /// Invalid environment or catalogue configuration.
    Config,
}

impl ErrorCategory {
    /// Whether re-running the same command might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Resolution)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "No artifact found",
            Self::Template => "Invalid artifact template",
            Self::Resolution => "Version resolution failed",
            Self::Transport => "Network transfer failed",
            Self::Archive => "Invalid archive",
            Self::Placement => "Could not place binary",
            Self::Config => "Invalid configuration",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the project's releases page for the available platforms",
            Self::Template => "The tool definition is broken, please report it",
            Self::Resolution => "Pass --version explicitly to skip latest-version lookup",
            Self::Transport => "Check your internet connection and run the command again",
            Self::Archive => "The download may be corrupted or tampered with, try again",
            Self::Placement => "Check directory permissions or choose another --path",
            Self::Config => "Fix the reported setting and run the command again",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while resolving, downloading or installing a tool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tool's template rendered nothing for this platform.
    #[error("no artifact for {tool} on {os}/{arch}")]
    ArtifactNotFound {
        /// Tool name.
        tool: String,
        /// Target operating system.
        os: String,
        /// Target architecture.
        arch: String,
    },

    /// The release host answered 404 for the artifact URL.
    #[error("artifact not found at {url} (HTTP 404)")]
    DownloadNotFound {
        /// URL that was requested.
        url: String,
    },

    /// The catalogue has no tool with this name.
    #[error("no such tool: {name}")]
    UnknownTool {
        /// Requested name.
        name: String,
        /// Closest known name or a hint, if any.
        suggestion: Option<String>,
    },

    /// A template could not be parsed or referenced an unknown variable.
    #[error("invalid template for {tool}: {message}")]
    Template {
        /// Tool whose template is broken.
        tool: String,
        /// What is wrong with it.
        message: String,
    },

    /// Latest-version discovery failed.
    #[error("version resolution failed: {message}")]
    Resolution {
        /// Error message.
        message: String,
        /// HTTP status code if one was received.
        status: Option<u16>,
    },

    /// Network transfer failed.
    #[error("download failed: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// HTTP status code if one was received.
        status: Option<u16>,
    },

    /// The archive is malformed.
    #[error("invalid archive: {0}")]
    Archive(String),

    /// An archive entry tried to escape the target directory.
    #[error("refusing to extract unsafe path {entry:?}")]
    UnsafePath {
        /// Entry path as stored in the archive.
        entry: String,
    },

    /// An archive entry was shorter or longer than its header declared.
    #[error("size mismatch for {entry}: expected {expected} bytes, wrote {actual}")]
    SizeMismatch {
        /// Entry path.
        entry: String,
        /// Size from the header.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// IO error while writing or placing files.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a resolution error.
    pub fn resolution(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Resolution {
            message: message.into(),
            status,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    /// Create a template error for a tool.
    pub fn template(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ArtifactNotFound { .. }
            | Error::DownloadNotFound { .. }
            | Error::UnknownTool { .. } => ErrorCategory::NotFound,
            Error::Template { .. } => ErrorCategory::Template,
            Error::Resolution { .. } => ErrorCategory::Resolution,
            Error::Transport { .. } => ErrorCategory::Transport,
            Error::Archive(_) | Error::UnsafePath { .. } | Error::SizeMismatch { .. } => {
                ErrorCategory::Archive
            }
            Error::Io { .. } => ErrorCategory::Placement,
            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether this error means "no such artifact".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether re-running the command might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Transport {
                message: format!("HTTP {}", code),
                status: Some(code),
            },
            other => Self::Transport {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
