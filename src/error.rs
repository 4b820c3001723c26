use std::fmt;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field, path or key that caused the error (e.g., "digest", "chats.u1.c1")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the url, the offending value)
    pub details: Option<String>,
    /// Source of the error (e.g., "transport", "conversation_store")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Http,
    File,
    Invalid,
    Pull,
    Server,
    Client,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ErrorKind::Network => "network",
            ErrorKind::Http => "http",
            ErrorKind::File => "file",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Pull => "pull",
            ErrorKind::Server => "server",
            ErrorKind::Client => "client",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(tag)
    }
}

/// Unified error type for the client.
///
/// Every variant carries a short machine-readable `reason` and a human-readable
/// `message`. `Display` prints the message verbatim so it can be shown or logged as is.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The exchange never completed (refused, timed out, DNS, cancelled).
    #[error("{message}")]
    Network {
        reason: String,
        message: String,
        context: ErrorContext,
    },

    /// The server answered with a status the operation treats as failure.
    #[error("{message}")]
    Http {
        status: u16,
        reason: String,
        message: String,
        context: ErrorContext,
    },

    /// Local file access or decoding failed.
    #[error("{message}")]
    File {
        reason: String,
        message: String,
        context: ErrorContext,
    },

    /// Caller input was rejected before any network call.
    #[error("{message}")]
    Invalid {
        reason: String,
        message: String,
        context: ErrorContext,
    },

    /// A pull or push stream reported a failure.
    #[error("{message}")]
    Pull {
        reason: String,
        message: String,
        context: ErrorContext,
    },

    /// The server answered 2xx but reported an error in the body.
    #[error("{message}")]
    Server {
        reason: String,
        message: String,
        context: ErrorContext,
    },

    /// The client could not build or send the request.
    #[error("{message}")]
    Client {
        reason: String,
        message: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    Unknown {
        reason: String,
        message: String,
        context: ErrorContext,
    },
}

macro_rules! constructors {
    ($($variant:ident => $plain:ident, $with:ident;)*) => {
        $(
            pub fn $plain(reason: impl Into<String>, msg: impl Into<String>) -> Self {
                Error::$variant {
                    reason: reason.into(),
                    message: msg.into(),
                    context: ErrorContext::new(),
                }
            }

            pub fn $with(
                reason: impl Into<String>,
                msg: impl Into<String>,
                context: ErrorContext,
            ) -> Self {
                Error::$variant {
                    reason: reason.into(),
                    message: msg.into(),
                    context,
                }
            }
        )*
    };
}

impl Error {
    constructors! {
        Network => network, network_with_context;
        File => file, file_with_context;
        Invalid => invalid, invalid_with_context;
        Pull => pull, pull_with_context;
        Server => server, server_with_context;
        Client => client, client_with_context;
        Unknown => unknown, unknown_with_context;
    }

    /// Create an HTTP status error.
    pub fn http(status: u16, reason: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Http {
            status,
            reason: reason.into(),
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn http_with_context(
        status: u16,
        reason: impl Into<String>,
        msg: impl Into<String>,
        context: ErrorContext,
    ) -> Self {
        Error::Http {
            status,
            reason: reason.into(),
            message: msg.into(),
            context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network { .. } => ErrorKind::Network,
            Error::Http { .. } => ErrorKind::Http,
            Error::File { .. } => ErrorKind::File,
            Error::Invalid { .. } => ErrorKind::Invalid,
            Error::Pull { .. } => ErrorKind::Pull,
            Error::Server { .. } => ErrorKind::Server,
            Error::Client { .. } => ErrorKind::Client,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Error::Network { reason, .. }
            | Error::Http { reason, .. }
            | Error::File { reason, .. }
            | Error::Invalid { reason, .. }
            | Error::Pull { reason, .. }
            | Error::Server { reason, .. }
            | Error::Client { reason, .. }
            | Error::Unknown { reason, .. } => reason,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Network { message, .. }
            | Error::Http { message, .. }
            | Error::File { message, .. }
            | Error::Invalid { message, .. }
            | Error::Pull { message, .. }
            | Error::Server { message, .. }
            | Error::Client { message, .. }
            | Error::Unknown { message, .. } => message,
        }
    }

    /// HTTP status, present only for [`Error::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Error::Network { context, .. }
            | Error::Http { context, .. }
            | Error::File { context, .. }
            | Error::Invalid { context, .. }
            | Error::Pull { context, .. }
            | Error::Server { context, .. }
            | Error::Client { context, .. }
            | Error::Unknown { context, .. } => context,
        }
    }

    /// Transport failures are the only retryable category.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network { reason, .. } if reason != "cancelled")
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        let reason = match e.kind() {
            std::io::ErrorKind::NotFound => "enoent",
            std::io::ErrorKind::PermissionDenied => "eacces",
            _ => "io",
        };
        Error::file_with_context(
            reason,
            format!("File error: {}", e),
            ErrorContext::new().with_source("io"),
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::file_with_context(
            "decode",
            format!("Failed to decode JSON document: {}", e),
            ErrorContext::new().with_source("serde_json"),
        )
    }
}

/// Raising adapter: turns a failure value into a panic carrying the same message.
///
/// ```rust,should_panic
/// use ollama_lib_rust::{Error, OrRaise, Result};
///
/// let r: Result<()> = Err(Error::invalid("invalid_digest", "Invalid digest format"));
/// r.or_raise();
/// ```
pub trait OrRaise<T> {
    fn or_raise(self) -> T;
}

impl<T> OrRaise<T> for std::result::Result<T, Error> {
    #[track_caller]
    fn or_raise(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("{}", e.message()),
        }
    }
}
