use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid span data: {0}")]
    InvalidSpan(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for span store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Creates a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new invalid span error
    pub fn invalid_span<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSpan(msg.into())
    }

    /// Creates a new invalid query error
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::InvalidSpan(_) | Self::InvalidQuery(_) => "validation",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
