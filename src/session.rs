//! The seam between the phase runner and Snowflake.

use snowflake_connector::{
    CloseError, ExecuteError, LoginError, SnowflakeConnector, SnowflakeSession,
};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error(transparent)]
    Close(#[from] CloseError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Opens sessions scoped to one role each.
#[allow(async_fn_in_trait)]
pub trait Connect {
    type Session<'c>: Session
    where
        Self: 'c;

    async fn open(&self, role: &str) -> Result<Self::Session<'_>, SessionError>;
}

#[allow(async_fn_in_trait)]
pub trait Session {
    async fn execute(&mut self, statement: &str) -> Result<(), SessionError>;
    async fn close(self) -> Result<(), SessionError>;
}

impl Connect for SnowflakeConnector {
    type Session<'c> = SnowflakeSession<'c>;

    async fn open(&self, role: &str) -> Result<SnowflakeSession<'_>, SessionError> {
        Ok(self.open_session(role).await?)
    }
}

impl Session for SnowflakeSession<'_> {
    async fn execute(&mut self, statement: &str) -> Result<(), SessionError> {
        let outcome = SnowflakeSession::execute(self, statement).await?;
        if let Some(query_id) = outcome.query_id {
            tracing::trace!(query_id = %query_id, "statement finished");
        }
        Ok(())
    }

    async fn close(self) -> Result<(), SessionError> {
        Ok(SnowflakeSession::close(self).await?)
    }
}
