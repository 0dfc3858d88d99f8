use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::{fmt, path::Path};

pub use errors::{
    CloseError, ExecuteError, LoginError, NewSnowflakeConnectorError,
    NewSnowflakeConnectorFromFileError,
};
pub use session::{SnowflakeSession, StatementOutcome};

mod errors;
pub mod jwt;
mod session;

/// How the connector proves who it is.
#[derive(Clone)]
pub enum Authenticator {
    /// PEM encoded RSA key pair, used to sign a JWT per session.
    KeyPair {
        public_key: String,
        private_key: String,
    },
    Password(String),
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authenticator::KeyPair { .. } => f.write_str("KeyPair(..)"),
            Authenticator::Password(_) => f.write_str("Password(..)"),
        }
    }
}

#[derive(Debug)]
pub struct SnowflakeConnector {
    base_url: String,
    account_identifier: String,
    user: String,
    authenticator: Authenticator,
    client: reqwest::Client,
}

impl SnowflakeConnector {
    pub fn try_new(
        account_identifier: &str,
        user: &str,
        authenticator: Authenticator,
    ) -> Result<Self, NewSnowflakeConnectorError> {
        if let Authenticator::KeyPair {
            public_key,
            private_key,
        } = &authenticator
        {
            // Surface a broken key now rather than at the first session.
            jwt::create_token(
                public_key,
                private_key,
                &account_identifier.to_ascii_uppercase(),
                &user.to_ascii_uppercase(),
            )?;
        }
        let client = reqwest::Client::builder()
            .default_headers(Self::get_headers())
            .build()?;
        Ok(SnowflakeConnector {
            base_url: format!("https://{account_identifier}.snowflakecomputing.com/"),
            account_identifier: account_identifier.to_owned(),
            user: user.to_owned(),
            authenticator,
            client,
        })
    }
    pub fn try_new_from_file<P: AsRef<Path>>(
        public_key_path: P,
        private_key_path: P,
        account_identifier: &str,
        user: &str,
    ) -> Result<Self, NewSnowflakeConnectorFromFileError> {
        let authenticator = Authenticator::KeyPair {
            public_key: jwt::read_public_key(public_key_path)?,
            private_key: jwt::read_private_key(private_key_path)?,
        };
        Ok(Self::try_new(account_identifier, user, authenticator)?)
    }
    /// Point the connector somewhere other than `{account}.snowflakecomputing.com`,
    /// ex. a private link host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    fn get_headers() -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(3);
        headers.append(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append(ACCEPT, HeaderValue::from_static("application/json"));
        headers.append(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                '/',
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers
    }
}

/// The login endpoint wants the bare account name, without region or cloud suffix.
pub(crate) fn account_name(account_identifier: &str) -> &str {
    account_identifier
        .split('.')
        .next()
        .unwrap_or(account_identifier)
}

/// A unique tag that identifies a SQL statement request
#[derive(serde::Deserialize, Clone, Debug)]
#[serde(transparent)]
pub struct StatementHandle(String);
impl StatementHandle {
    pub fn handle(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// [QueryStatus](https://docs.snowflake.com/en/developer-guide/sql-api/reference#label-sql-api-reference-querystatus)
#[derive(serde::Deserialize, thiserror::Error, Debug)]
#[serde(rename_all = "camelCase")]
#[error("Status for statement {statement_handle}: {message}")]
pub struct QueryStatus {
    message: String,
    statement_handle: StatementHandle,
}

impl QueryStatus {
    pub fn message(&self) -> &str {
        &self.message
    }
    pub fn statement_handle(&self) -> &StatementHandle {
        &self.statement_handle
    }
}

/// [QueryFailureStatus](https://docs.snowflake.com/en/developer-guide/sql-api/reference#label-sql-api-reference-queryfailurestatus)
#[derive(serde::Deserialize, thiserror::Error, Debug)]
#[serde(rename_all = "camelCase")]
#[error("Error for statement {statement_handle}: {message}")]
pub struct QueryFailureStatus {
    code: String,
    sql_state: String,
    message: String,
    statement_handle: StatementHandle,
}

impl QueryFailureStatus {
    pub fn code(&self) -> &str {
        &self.code
    }
    pub fn sql_state(&self) -> &str {
        &self.sql_state
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    pub fn statement_handle(&self) -> &StatementHandle {
        &self.statement_handle
    }
}
