//! Error types for Current

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurrentError>;

#[derive(Error, Debug)]
pub enum CurrentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Federation error: {0}")]
    Federation(#[from] FederationError),

    /// The remote record exists but the local row could not be written.
    #[error("Post was federated as {uri} but could not be stored locally: {source}")]
    FederatedButNotStored {
        uri: String,
        #[source]
        source: DbError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CurrentError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CurrentError::InvalidInput(_) => 3,
            CurrentError::Federation(FederationError::Authentication(_)) => 2,
            CurrentError::FederatedButNotStored { .. } => 4,
            CurrentError::Federation(_) => 1,
            CurrentError::Config(_) => 1,
            CurrentError::Database(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A post with id {0} already exists")]
    DuplicateId(i64),

    #[error("Invalid schema version {0}")]
    InvalidSchemaVersion(i64),
}

#[derive(Error, Debug, Clone)]
pub enum FederationError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{operation} request failed with status code {status}")]
    Rejected { operation: &'static str, status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Content validation failed: {0}")]
    Validation(String),
}
