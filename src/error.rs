//! Error types for the card renderer

use crate::payload::ContentType;
use thiserror::Error;

/// Result type alias for rendering and pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a card
#[derive(Error, Debug)]
pub enum Error {
    /// The rendering engine could not be launched. Fatal to the calling
    /// request; the pool does not retry on its own.
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// No surface became available within the configured acquisition timeout
    #[error("Timed out waiting for a render surface after {0}ms")]
    AcquireTimeout(u64),

    /// The pool has been shut down and no longer hands out surfaces
    #[error("Browser pool is shut down")]
    PoolClosed,

    /// The requested content type has no renderer
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// A required identity field is missing from the payload
    #[error("Cannot render {content} card: missing required field `{field}`")]
    MissingField {
        content: ContentType,
        field: &'static str,
    },

    /// The payload could not be turned into markup
    #[error("Content rendering failed: {0}")]
    ContentRender(String),

    /// A card template failed to render
    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    /// Configuring or loading a surface failed
    #[error("Surface operation failed: {0}")]
    Surface(String),

    /// Height measurement or screenshot failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error belongs to the content-rendering class
    /// (missing fields or malformed payload shape).
    pub fn is_content_error(&self) -> bool {
        matches!(self, Error::ContentRender(_) | Error::MissingField { .. })
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Cdp(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("Blocking task failed: {}", err))
    }
}
