//! Provision a Snowflake account from a directory of CSV tables.
//!
//! Each [Phase] reads its tables, renders one statement per row and runs
//! them in a session opened under the phase's system role.

pub mod config;
pub mod provision;
pub mod records;
pub mod session;
pub mod statements;

pub use config::{ConfigError, Credentials, SetupFiles};
pub use provision::{Phase, ProvisionError, Provisioner};
pub use session::{Connect, Session, SessionError};
