//! Error types for routing and dispatch.

use thiserror::Error;

/// Errors raised while compiling a route pattern.
///
/// Pattern compilation happens during application setup; a pattern that
/// fails to compile never reaches the route table, so none of these occur
/// at request time.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The placeholder names a capture kind that does not exist.
    #[error("unknown capture kind `{kind}` in pattern `{pattern}`")]
    UnknownKind { pattern: String, kind: String },

    /// The capture name is not a valid identifier.
    #[error("invalid capture name `{name}` in pattern `{pattern}`")]
    InvalidName { pattern: String, name: String },

    /// Two captures in one pattern share a name.
    #[error("duplicate capture name `{name}` in pattern `{pattern}`")]
    DuplicateName { pattern: String, name: String },

    /// The assembled expression was rejected by the regex engine.
    #[error("pattern `{pattern}` failed to compile")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors surfaced while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler returned a value the coercion layer does not recognize.
    #[error("invalid response shape: {0}")]
    InvalidResponse(String),

    /// Strict attribute lookup on a key that was never set.
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    /// An error raised by handler code, passed through unmodified.
    #[error("handler error: {0}")]
    Handler(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
