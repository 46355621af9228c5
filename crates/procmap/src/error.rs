//! Error types for procmap

use thiserror::Error;

/// Result type alias for engine-internal operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Result type alias for the public mapper entry points
pub type MapResult<T> = Result<T, MapError>;

/// Root causes raised while executing commands or mapping their results
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Cell conversion error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Cursor misuse or a cursor read failure reported by an executor
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// Declared type shape does not fit the requested operation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Mismatch between an entity's declared shape and the operation requested on it.
///
/// These are never retried: they only go away when the type declaration changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{parent}` has no child slot holding `{child}`")]
    NoChildSlot {
        parent: &'static str,
        child: &'static str,
    },

    #[error("`{child}` declares no foreign key towards `{parent}`")]
    MissingForeignKey {
        parent: &'static str,
        child: &'static str,
    },

    #[error("`{child}` declares more than one foreign key towards `{parent}`")]
    AmbiguousForeignKey {
        parent: &'static str,
        child: &'static str,
    },

    #[error("foreign key `{child}.{field}` must be an integer field")]
    ForeignKeyNotInteger {
        child: &'static str,
        field: &'static str,
    },

    #[error("foreign key `{child}.{field}` has no getter")]
    ForeignKeyUnreadable {
        child: &'static str,
        field: &'static str,
    },

    #[error("foreign key target `{parent}.{field}` must be an integer field")]
    ParentKeyNotInteger {
        parent: &'static str,
        field: &'static str,
    },

    #[error("foreign key target `{parent}.{field}` is not a readable field")]
    UnknownParentField {
        parent: &'static str,
        field: &'static str,
    },

    #[error("`{type_name}` has no identity field")]
    MissingIdentity { type_name: &'static str },
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a cursor error
    pub fn cursor(message: impl Into<String>) -> Self {
        Self::Cursor(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

/// The single error kind returned by [`Mapper`](crate::Mapper) and
/// [`AsyncMapper`](crate::AsyncMapper).
///
/// Carries the mapped type and the command that failed; the root cause is
/// available through [`MapError::cause`] and `std::error::Error::source`.
#[derive(Debug, Error)]
#[error("failed to map `{type_name}` from `{command}`: {source}")]
pub struct MapError {
    pub type_name: &'static str,
    pub command: String,
    #[source]
    pub source: OrmError,
}

impl MapError {
    pub fn new(type_name: &'static str, command: impl Into<String>, source: OrmError) -> Self {
        Self {
            type_name,
            command: command.into(),
            source,
        }
    }

    /// The wrapped root cause.
    pub fn cause(&self) -> &OrmError {
        &self.source
    }

    /// Unwrap into the root cause.
    pub fn into_cause(self) -> OrmError {
        self.source
    }

    /// The configuration error behind this failure, if that is what it was.
    pub fn config_error(&self) -> Option<&ConfigError> {
        match &self.source {
            OrmError::Config(e) => Some(e),
            _ => None,
        }
    }

    /// Check if the root cause is a configuration error
    pub fn is_config(&self) -> bool {
        self.source.is_config()
    }
}
