use std::{fmt, time::Duration};

use reqwest::{RequestBuilder, StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::{
    Authenticator, CloseError, ExecuteError, LoginError, QueryStatus, SnowflakeConnector,
    account_name, jwt,
};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Server side limit for one statement, in seconds.
const STATEMENT_TIMEOUT_SECS: u32 = 3600;
/// Enough polls to outlast [STATEMENT_TIMEOUT_SECS].
const MAX_POLLS: u32 = STATEMENT_TIMEOUT_SECS * 2;
/// Session API codes for a statement that is still running.
const QUERY_IN_PROGRESS: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC: &str = "333334";
const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// What the server said about a finished statement.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatementOutcome {
    /// Statement handle (SQL API) or query id (session API).
    pub query_id: Option<String>,
    pub message: Option<String>,
}

enum SessionAuth {
    /// Stateless: each request carries the JWT and the role.
    KeyPair(String),
    /// Token handed out by the login endpoint, bound to the role at login.
    Token(String),
}

/// A session bound to a single role.
///
/// Dropped sessions are not logged out, call [close](Self::close).
pub struct SnowflakeSession<'c> {
    client: &'c reqwest::Client,
    base_url: &'c str,
    role: String,
    auth: SessionAuth,
    sequence_id: u64,
}

impl fmt::Debug for SnowflakeSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeSession")
            .field("base_url", &self.base_url)
            .field("role", &self.role)
            .field("sequence_id", &self.sequence_id)
            .finish_non_exhaustive()
    }
}

impl SnowflakeConnector {
    /// Open a session acting as `role`.
    pub async fn open_session(&self, role: &str) -> Result<SnowflakeSession<'_>, LoginError> {
        let auth = match &self.authenticator {
            Authenticator::KeyPair {
                public_key,
                private_key,
            } => SessionAuth::KeyPair(jwt::create_token(
                public_key,
                private_key,
                &self.account_identifier.to_ascii_uppercase(),
                &self.user.to_ascii_uppercase(),
            )?),
            Authenticator::Password(password) => {
                SessionAuth::Token(self.login(role, password).await?)
            }
        };
        tracing::debug!(role, "opened session");
        Ok(SnowflakeSession {
            client: &self.client,
            base_url: &self.base_url,
            role: role.to_owned(),
            auth,
            sequence_id: 0,
        })
    }

    async fn login(&self, role: &str, password: &str) -> Result<String, LoginError> {
        let request = LoginRequest {
            data: LoginRequestData {
                account_name: account_name(&self.account_identifier),
                login_name: &self.user,
                password,
                client_app_id: env!("CARGO_PKG_NAME"),
                client_app_version: env!("CARGO_PKG_VERSION"),
            },
        };
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = self
            .client
            .post(format!("{}session/v1/login-request", self.base_url))
            .query(&[("roleName", role), ("requestId", request_id.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(LoginError::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoginError::Unknown(status));
        }
        let body = response
            .json::<GeneralResponse<LoginData>>()
            .await
            .map_err(LoginError::Decode)?;
        match body {
            GeneralResponse {
                success: true,
                data: Some(LoginData { token }),
                ..
            } => Ok(token),
            GeneralResponse { code, message, .. } => Err(LoginError::Rejected {
                code: code.unwrap_or_default(),
                message: message.unwrap_or_else(|| "login returned no token".into()),
            }),
        }
    }
}

impl<'c> SnowflakeSession<'c> {
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Run one statement to completion.
    pub async fn execute(&mut self, statement: &str) -> Result<StatementOutcome, ExecuteError> {
        tracing::debug!(role = %self.role, statement, "executing");
        match self.auth {
            SessionAuth::KeyPair(_) => self.execute_sql_api(statement).await,
            SessionAuth::Token(_) => self.execute_query_request(statement).await,
        }
    }

    /// Log the session out. Key-pair sessions hold nothing server side.
    pub async fn close(self) -> Result<(), CloseError> {
        if let SessionAuth::KeyPair(_) = self.auth {
            return Ok(());
        }
        let response = self
            .authorize(self.client.post(format!("{}session", self.base_url)))
            .query(&[("delete", "true")])
            .send()
            .await
            .map_err(CloseError::Request)?;
        match response.status() {
            status if status.is_success() => {
                tracing::debug!(role = %self.role, "closed session");
                Ok(())
            }
            status => Err(CloseError::Unknown(status)),
        }
    }

    async fn execute_sql_api(&self, statement: &str) -> Result<StatementOutcome, ExecuteError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut response = self
            .authorize(self.client.post(format!("{}api/v2/statements", self.base_url)))
            .query(&[("nullable", "false"), ("requestId", request_id.as_str())])
            .json(&StatementRequest {
                statement,
                timeout: STATEMENT_TIMEOUT_SECS,
                role: &self.role,
            })
            .send()
            .await
            .map_err(ExecuteError::Request)?;
        let mut polls = 0;
        loop {
            match response.status() {
                StatusCode::OK => {
                    let body = response
                        .json::<StatementResponse>()
                        .await
                        .map_err(ExecuteError::Decode)?;
                    return Ok(StatementOutcome {
                        query_id: body.statement_handle,
                        message: body.message,
                    });
                }
                StatusCode::ACCEPTED | StatusCode::REQUEST_TIMEOUT => {
                    let status = response
                        .json::<QueryStatus>()
                        .await
                        .map_err(ExecuteError::Decode)?;
                    if polls == MAX_POLLS {
                        return Err(ExecuteError::StillRunning(
                            status.statement_handle().handle().to_owned(),
                        ));
                    }
                    polls += 1;
                    tracing::debug!(
                        handle = %status.statement_handle(),
                        detail = status.message(),
                        "statement still running"
                    );
                    tokio::time::sleep(POLL_INTERVAL).await;
                    response = self
                        .authorize(self.client.get(format!(
                            "{}api/v2/statements/{}",
                            self.base_url,
                            status.statement_handle()
                        )))
                        .send()
                        .await
                        .map_err(ExecuteError::Request)?;
                }
                StatusCode::UNPROCESSABLE_ENTITY => {
                    return Err(ExecuteError::Query(
                        response.json().await.map_err(ExecuteError::Decode)?,
                    ));
                }
                status @ (StatusCode::TOO_MANY_REQUESTS
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT) => {
                    return Err(ExecuteError::TooManyRequests(status));
                }
                status => return Err(ExecuteError::Unknown(status)),
            }
        }
    }

    async fn execute_query_request(
        &mut self,
        statement: &str,
    ) -> Result<StatementOutcome, ExecuteError> {
        self.sequence_id += 1;
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = self
            .authorize(
                self.client
                    .post(format!("{}queries/v1/query-request", self.base_url)),
            )
            .query(&[("requestId", request_id.as_str())])
            .json(&QueryRequest {
                sql_text: statement,
                async_exec: false,
                sequence_id: self.sequence_id,
            })
            .send()
            .await
            .map_err(ExecuteError::Request)?;
        let mut body = query_response(response).await?;
        let mut polls = 0;
        while body.success && in_progress(body.code.as_deref()) {
            let QueryData {
                query_id,
                get_result_url,
            } = body.data.unwrap_or_default();
            let query_id = query_id.unwrap_or_default();
            if polls == MAX_POLLS {
                return Err(ExecuteError::StillRunning(query_id));
            }
            polls += 1;
            let result_url =
                get_result_url.unwrap_or_else(|| format!("/queries/{query_id}/result"));
            tracing::debug!(query_id = %query_id, "statement still running");
            tokio::time::sleep(POLL_INTERVAL).await;
            let response = self
                .authorize(self.client.get(format!(
                    "{}{}",
                    self.base_url,
                    result_url.trim_start_matches('/')
                )))
                .send()
                .await
                .map_err(ExecuteError::Request)?;
            body = query_response(response).await?;
        }
        if !body.success {
            return Err(ExecuteError::Rejected {
                code: body.code.unwrap_or_default(),
                message: body.message.unwrap_or_default(),
            });
        }
        Ok(StatementOutcome {
            query_id: body.data.and_then(|data| data.query_id),
            message: body.message,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            SessionAuth::KeyPair(token) => request
                .bearer_auth(token)
                .header(TOKEN_TYPE_HEADER, "KEYPAIR_JWT"),
            SessionAuth::Token(token) => {
                request.header(AUTHORIZATION, format!("Snowflake Token=\"{token}\""))
            }
        }
    }
}

fn in_progress(code: Option<&str>) -> bool {
    matches!(code, Some(QUERY_IN_PROGRESS | QUERY_IN_PROGRESS_ASYNC))
}

async fn query_response(
    response: reqwest::Response,
) -> Result<GeneralResponse<QueryData>, ExecuteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ExecuteError::Unknown(status));
    }
    response.json().await.map_err(ExecuteError::Decode)
}

#[derive(Serialize, Debug)]
struct LoginRequest<'a> {
    data: LoginRequestData<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginRequestData<'a> {
    account_name: &'a str,
    login_name: &'a str,
    password: &'a str,
    client_app_id: &'a str,
    client_app_version: &'a str,
}

#[derive(Deserialize, Debug)]
struct LoginData {
    token: String,
}

#[derive(Deserialize, Debug)]
struct GeneralResponse<T> {
    success: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    query_id: Option<String>,
    #[serde(default)]
    get_result_url: Option<String>,
}

#[derive(Serialize, Debug)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u32,
    role: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    message: Option<String>,
}
