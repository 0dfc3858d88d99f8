use std::path::PathBuf;

use snowflake_connector::{
    Authenticator, NewSnowflakeConnectorError, NewSnowflakeConnectorFromFileError,
    SnowflakeConnector,
};

pub const ACCOUNT_VAR: &str = "SF_ACC";
pub const USER_VAR: &str = "SF_USER";
pub const PASSWORD_VAR: &str = "SF_PW";
pub const PRIVATE_KEY_PATH_VAR: &str = "SF_PRIVATE_KEY_PATH";
pub const PUBLIC_KEY_PATH_VAR: &str = "SF_PUBLIC_KEY_PATH";
pub const URL_VAR: &str = "SF_URL";

/// Database that holds the per-user sandbox schemas.
pub const DEFAULT_SANDBOX_DATABASE: &str = "rda";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),
    #[error(transparent)]
    KeyPair(#[from] NewSnowflakeConnectorFromFileError),
    #[error(transparent)]
    Connector(#[from] NewSnowflakeConnectorError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    KeyPair {
        public_key_path: PathBuf,
        private_key_path: PathBuf,
    },
    Password(String),
}

/// Who to log in as, read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub user: String,
    pub source: CredentialSource,
    pub url: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// A key pair wins over a password when both key paths are present.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let account = get(ACCOUNT_VAR).ok_or(ConfigError::MissingVariable(ACCOUNT_VAR))?;
        let user = get(USER_VAR).ok_or(ConfigError::MissingVariable(USER_VAR))?;
        let source = match (get(PUBLIC_KEY_PATH_VAR), get(PRIVATE_KEY_PATH_VAR)) {
            (Some(public_key_path), Some(private_key_path)) => CredentialSource::KeyPair {
                public_key_path: public_key_path.into(),
                private_key_path: private_key_path.into(),
            },
            _ => CredentialSource::Password(
                get(PASSWORD_VAR).ok_or(ConfigError::MissingVariable(PASSWORD_VAR))?,
            ),
        };
        Ok(Credentials {
            account,
            user,
            source,
            url: get(URL_VAR),
        })
    }

    pub fn connector(&self) -> Result<SnowflakeConnector, ConfigError> {
        let connector = match &self.source {
            CredentialSource::KeyPair {
                public_key_path,
                private_key_path,
            } => SnowflakeConnector::try_new_from_file(
                public_key_path,
                private_key_path,
                &self.account,
                &self.user,
            )?,
            CredentialSource::Password(password) => SnowflakeConnector::try_new(
                &self.account,
                &self.user,
                Authenticator::Password(password.clone()),
            )?,
        };
        Ok(match &self.url {
            Some(url) => connector.with_base_url(url),
            None => connector,
        })
    }
}

/// The directory holding the setup tables, one CSV per table.
#[derive(Debug, Clone)]
pub struct SetupFiles {
    dir: PathBuf,
}

impl SetupFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SetupFiles { dir: dir.into() }
    }
    pub fn table(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.csv", table.file_stem()))
    }
}

impl Default for SetupFiles {
    fn default() -> Self {
        SetupFiles::new(DEFAULT_DATA_DIR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Auth,
    Roles,
    Objects,
    Warehouses,
    Users,
    Monitors,
    MonitorNotifications,
    MonitorTriggers,
    DatabasePrivileges,
    SchemaPrivileges,
    WarehousePrivileges,
    RoleAssignments,
}

impl Table {
    pub fn file_stem(self) -> &'static str {
        match self {
            Table::Auth => "auth_data",
            Table::Roles => "roles_data",
            Table::Objects => "objects_data",
            Table::Warehouses => "vwarehouse_data",
            Table::Users => "users_data",
            Table::Monitors => "rm_1_data",
            Table::MonitorNotifications => "rm_2_data",
            Table::MonitorTriggers => "rm_3_data",
            Table::DatabasePrivileges => "privileges_db_data",
            Table::SchemaPrivileges => "privileges_schemas_data",
            Table::WarehousePrivileges => "privileges_wh_data",
            Table::RoleAssignments => "roles_assignments_data",
        }
    }
}
