//! Unified error type.

/// The error type returned by kensa's fallible startup operations.
///
/// Request-level failures (400, 401, 403, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// the failures that stop the process: missing or malformed configuration,
/// and binding to a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing {0}")]
    MissingEnv(&'static str),

    #[error("invalid {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}
