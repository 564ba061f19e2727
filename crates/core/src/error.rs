//! Error types shared by every brewbump crate.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for brewbump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bumping a formula.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Applying the new value would move the formula to an older version.
    ///
    /// Callers treat this as "nothing to do" rather than a failure.
    #[error("refusing to downgrade {field} from '{current}' to '{proposed}'")]
    #[diagnostic(
        code(brewbump::fields::downgrade),
        help("The formula already points at a newer release")
    )]
    Upgrade {
        /// Field that tripped the guard (`version` or `url`)
        field: String,
        /// Version currently recorded in the formula
        current: String,
        /// Version that would have been written
        proposed: String,
    },

    /// The rewrite left the file untouched.
    #[error("no replacements occurred in '{path}'")]
    #[diagnostic(
        code(brewbump::publish::no_op),
        help("Check that the formula contains the fields being replaced")
    )]
    NoOp {
        /// Path of the file that was not changed
        path: String,
    },

    /// A referenced resource does not exist.
    #[error("{message}")]
    #[diagnostic(code(brewbump::not_found))]
    NotFound {
        /// Description of what was missing
        message: String,
    },

    /// The file path resolved to a directory listing.
    #[error("expected '{path}' to be a file, got a directory")]
    #[diagnostic(code(brewbump::publish::shape))]
    Shape {
        /// The path that was requested
        path: String,
    },

    /// A download returned a non-success HTTP status.
    #[error("HTTP {status} while fetching {url}")]
    #[diagnostic(code(brewbump::download::transport))]
    Transport {
        /// HTTP status code
        status: u16,
        /// Redacted URL that failed
        url: String,
    },

    /// A redirect response carried no `Location` header.
    #[error("HTTP {status} but no Location header from {url}")]
    #[diagnostic(code(brewbump::download::missing_location))]
    MissingLocation {
        /// HTTP status code
        status: u16,
        /// Redacted URL that responded
        url: String,
    },

    /// The redirect chain exceeded the hop limit.
    #[error("too many redirects (limit {limit}) while fetching {url}")]
    #[diagnostic(code(brewbump::download::too_many_redirects))]
    TooManyRedirects {
        /// Maximum number of hops allowed
        limit: usize,
        /// Redacted URL of the last hop
        url: String,
    },

    /// The hosting API rejected a request.
    #[error("{operation} failed: {message}")]
    #[diagnostic(code(brewbump::api))]
    Api {
        /// API operation that failed (e.g. "create ref")
        operation: String,
        /// HTTP status, when the API returned one
        status: Option<u16>,
        /// Error message from the API
        message: String,
    },

    /// Network-level failure before any HTTP status was received.
    #[error("HTTP error: {message}")]
    #[diagnostic(code(brewbump::http))]
    Http {
        /// The error message
        message: String,
    },

    /// A URL could not be parsed.
    #[error("invalid URL '{url}': {reason}")]
    #[diagnostic(code(brewbump::invalid_url))]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// File content could not be decoded.
    #[error("failed to decode file content: {message}")]
    #[diagnostic(code(brewbump::decode))]
    Decode {
        /// The error message
        message: String,
    },

    /// Invalid or missing input configuration.
    #[error("configuration error: {message}")]
    #[diagnostic(code(brewbump::config), help("{help}"))]
    Config {
        /// The error message
        message: String,
        /// Help text for the user
        help: String,
    },

    /// The operation was cancelled while waiting.
    #[error("operation cancelled")]
    #[diagnostic(code(brewbump::cancelled))]
    Cancelled,
}

impl Error {
    /// Create a new downgrade error.
    #[must_use]
    pub fn upgrade(
        field: impl Into<String>,
        current: impl Into<String>,
        proposed: impl Into<String>,
    ) -> Self {
        Self::Upgrade {
            field: field.into(),
            current: current.into(),
            proposed: proposed.into(),
        }
    }

    /// Create a new no-op error.
    #[must_use]
    pub fn no_op(path: impl Into<String>) -> Self {
        Self::NoOp { path: path.into() }
    }

    /// Create a new not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new shape error.
    #[must_use]
    pub fn shape(path: impl Into<String>) -> Self {
        Self::Shape { path: path.into() }
    }

    /// Create a new hosting API error.
    #[must_use]
    pub fn api(operation: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a new network error.
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Create a new invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Whether this error is the downgrade guard tripping.
    #[must_use]
    pub const fn is_upgrade(&self) -> bool {
        matches!(self, Self::Upgrade { .. })
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } | Self::MissingLocation { status, .. } => Some(*status),
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}
