use crate::QueryFailureStatus;
use crate::jwt::{KeyFileReadError, KeyPairError};

/// Error creating a new [SnowflakeConnector](crate::SnowflakeConnector)
#[derive(thiserror::Error, Debug)]
pub enum NewSnowflakeConnectorError {
    #[error(transparent)]
    KeyPair(#[from] KeyPairError),
    #[error(transparent)]
    ClientBuildError(#[from] reqwest::Error),
}

/// Error creating a new [SnowflakeConnector](crate::SnowflakeConnector) from key paths
#[derive(thiserror::Error, Debug)]
pub enum NewSnowflakeConnectorFromFileError {
    #[error(transparent)]
    KeyFileRead(#[from] KeyFileReadError),
    #[error(transparent)]
    Connector(#[from] NewSnowflakeConnectorError),
}

/// Error opening a session
#[derive(thiserror::Error, Debug)]
pub enum LoginError {
    #[error("could not generate JWT token: {0}")]
    Token(#[from] KeyPairError),
    #[error(transparent)]
    Request(reqwest::Error),
    #[error(transparent)]
    Decode(reqwest::Error),
    #[error("login rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("unknown error with status code: {0}")]
    Unknown(reqwest::StatusCode),
}

/// Error executing a single statement
#[derive(thiserror::Error, Debug)]
pub enum ExecuteError {
    #[error(transparent)]
    Request(reqwest::Error),
    #[error(transparent)]
    Decode(reqwest::Error),
    #[error(transparent)]
    Query(QueryFailureStatus),
    #[error("statement rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("statement {0} is still running, gave up waiting")]
    StillRunning(String),
    #[error("server is busy, status code: {0}")]
    TooManyRequests(reqwest::StatusCode),
    #[error("unknown error with status code: {0}")]
    Unknown(reqwest::StatusCode),
}

/// Error closing a session
#[derive(thiserror::Error, Debug)]
pub enum CloseError {
    #[error(transparent)]
    Request(reqwest::Error),
    #[error("unknown error with status code: {0}")]
    Unknown(reqwest::StatusCode),
}
