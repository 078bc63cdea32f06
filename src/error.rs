use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the external model API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("the model API did not answer within {0}s")]
    Timeout(u64),

    #[error("the model API rejected the credentials: {0}")]
    Authentication(String),

    #[error("rate limit or quota exceeded: {0}")]
    RateLimited(String),

    #[error("the model API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unreadable response from the model API: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Timeouts and rate limits are worth another attempt; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Timeout(_) | ApiError::RateLimited(_))
    }
}

/// The model answered, but not with something that maps onto an intent
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("the model asked for an unknown action '{0}'")]
    UnknownTool(String),

    #[error("the model asked for {0} actions at once, expected one")]
    MultipleToolCalls(usize),

    #[error("malformed arguments for '{tool}': {source}")]
    MalformedArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Filesystem failures while executing an intent
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("permission denied: {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no free name for {} in {}", .name, .destination.display())]
    Collision { name: String, destination: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Classify an `io::Error` raised while touching `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => ActionError::PathNotFound(path),
            io::ErrorKind::PermissionDenied => ActionError::PermissionDenied { path, source },
            _ => ActionError::Io { path, source },
        }
    }
}
