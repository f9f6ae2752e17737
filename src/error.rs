//! Unified error type.

use http::StatusCode;

/// Boxed application error, as returned by handler bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout keyway.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by keyway's fallible operations.
///
/// Registration-time variants (`Configuration`, `Cycle`) are raised while a
/// registry is being built. Call-time variants surface to whoever invoked the
/// registry or the façade. Errors produced by handler bodies travel inside
/// [`Error::Handler`] untouched; downcast the source to recover them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or duplicate route key, or invalid adapter configuration.
    #[error("configuration: {0}")]
    Configuration(String),

    /// A registry was nested under itself, directly or through a chain.
    #[error("nesting `{prefix}` would create a cycle")]
    Cycle { prefix: String },

    /// No handler is registered for the key.
    #[error("no handler for `{0}`")]
    NotFound(String),

    /// The façade already has a different active connection.
    #[error("already connected to `{0}`")]
    AlreadyConnected(String),

    /// The façade has no active connection (or not the one named).
    #[error("not connected")]
    NotConnected,

    /// Parameters could not be decoded into the handler's input type.
    #[error("invalid params for `{key}`: {message}")]
    InvalidParams { key: String, message: String },

    /// A value is not plain serializable data.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by a handler body, passed through unmodified.
    #[error(transparent)]
    Handler(BoxError),

    /// The remote side answered with a failure status.
    #[error("remote error {status}: {message}")]
    Remote { status: u16, message: String },

    /// The transport failed before a response was received.
    #[error("transport: {0}")]
    Transport(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns the handler's own error, if this is one.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// HTTP status an adapter should answer with for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidParams { .. } | Self::Serialization(_) => StatusCode::BAD_REQUEST,
            Self::Remote { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("not a super user")]
    struct NotSuperUser;

    #[test]
    fn handler_errors_keep_their_identity() {
        let err = Error::Handler(Box::new(NotSuperUser));
        assert_eq!(err.to_string(), "not a super user");
        assert!(err.handler_error().unwrap().downcast_ref::<NotSuperUser>().is_some());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn statuses() {
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        let invalid = Error::InvalidParams { key: "a".into(), message: "b".into() };
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        let remote = Error::Remote { status: 418, message: "teapot".into() };
        assert_eq!(remote.status().as_u16(), 418);
    }
}
