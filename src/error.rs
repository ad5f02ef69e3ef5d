//! Error types for kgweave

use thiserror::Error;

/// Result type alias using kgweave's Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A value (field value or filter value) does not match the declared
    /// types of the field.
    #[error("{field} must be of type {expected}, not {found}")]
    Type {
        field: String,
        expected: String,
        found: String,
    },

    /// A malformed argument: bad UUID, invalid filter string, conflicting
    /// options.
    #[error("{0}")]
    Value(String),

    /// The remote store refused the operation.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// The remote store already holds an instance with the same identity.
    #[error("resource already exists: {0}")]
    ResourceExists(String),

    /// A reverse lookup found zero or several candidates.
    #[error("unable to resolve {0}")]
    ResolutionFailure(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{type_name} has no field named '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("no node type registered for '{0}'")]
    UnknownType(String),

    /// A remote document does not have the shape the wire contract promises.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Any other non-success HTTP status.
    #[error("remote error {status}: {body}")]
    Remote { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn value(msg: impl Into<String>) -> Self {
        Error::Value(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn invalid_document(msg: impl Into<String>) -> Self {
        Error::InvalidDocument(msg.into())
    }

    /// Errors that `save` may swallow when the caller opted into tolerant mode.
    pub fn is_tolerable(&self) -> bool {
        matches!(self, Error::Authorization(_) | Error::ResourceExists(_))
    }
}
