use std::{collections::BTreeSet, fmt};

use serde::de::DeserializeOwned;

use crate::{
    config::{SetupFiles, Table, DEFAULT_SANDBOX_DATABASE},
    records::{
        read_table, AuthParameters, AuthRecord, DatabasePrivilegeRecord, LoadError,
        MissingAuthParameter, MonitorRecord, NotifyRecord, ObjectRecord, RoleAssignmentRecord,
        RoleRecord, SchemaPrivilegeRecord, TriggerRecord, UserRecord, WarehousePrivilegeRecord,
        WarehouseRecord,
    },
    session::{Connect, Session, SessionError},
    statements,
};

/// One step of the setup. Phases always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Phase {
    SecurityIntegration,
    Roles,
    Objects,
    Warehouses,
    Users,
    Sandboxes,
    ResourceMonitors,
    Privileges,
    RoleGrants,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::SecurityIntegration,
        Phase::Roles,
        Phase::Objects,
        Phase::Warehouses,
        Phase::Users,
        Phase::Sandboxes,
        Phase::ResourceMonitors,
        Phase::Privileges,
        Phase::RoleGrants,
    ];

    /// The system role every statement of the phase runs under.
    pub fn role(self) -> &'static str {
        match self {
            Phase::SecurityIntegration | Phase::ResourceMonitors => "accountadmin",
            Phase::Roles | Phase::Users => "useradmin",
            Phase::Objects | Phase::Warehouses | Phase::Sandboxes => "sysadmin",
            Phase::Privileges | Phase::RoleGrants => "securityadmin",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::SecurityIntegration => "creating security integration",
            Phase::Roles => "creating roles",
            Phase::Objects => "creating objects",
            Phase::Warehouses => "creating virtual warehouses",
            Phase::Users => "creating users",
            Phase::Sandboxes => "creating sandboxes",
            Phase::ResourceMonitors => "creating resource monitors",
            Phase::Privileges => "creating privileges",
            Phase::RoleGrants => "assigning roles",
        }
    }

    /// 1-based position in the full run.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SecurityIntegration => "security integration",
            Phase::Roles => "roles",
            Phase::Objects => "objects",
            Phase::Warehouses => "warehouses",
            Phase::Users => "users",
            Phase::Sandboxes => "sandboxes",
            Phase::ResourceMonitors => "resource monitors",
            Phase::Privileges => "privileges",
            Phase::RoleGrants => "role grants",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    #[error("{phase}: {source}")]
    Load { phase: Phase, source: LoadError },
    #[error("{phase}: {source}")]
    Auth {
        phase: Phase,
        source: MissingAuthParameter,
    },
    #[error("{phase}: could not open session as {role}: {source}")]
    Open {
        phase: Phase,
        role: &'static str,
        source: SessionError,
    },
    #[error("{phase}: statement failed: {source}\n{statement}")]
    Execute {
        phase: Phase,
        statement: String,
        source: SessionError,
    },
}

/// Runs the setup phases against one account.
#[derive(Debug)]
pub struct Provisioner<C> {
    connector: C,
    files: SetupFiles,
    sandbox_database: String,
}

impl<C> Provisioner<C> {
    pub fn new(connector: C, files: SetupFiles) -> Self {
        Provisioner {
            connector,
            files,
            sandbox_database: DEFAULT_SANDBOX_DATABASE.to_owned(),
        }
    }

    pub fn with_sandbox_database(mut self, sandbox_database: impl Into<String>) -> Self {
        self.sandbox_database = sandbox_database.into();
        self
    }

    /// Read the tables `phase` needs and build its statements in execution order.
    pub fn statements(&self, phase: Phase) -> Result<Vec<String>, ProvisionError> {
        let statements: Vec<String> = match phase {
            Phase::SecurityIntegration => {
                let params: AuthParameters =
                    self.load::<AuthRecord>(phase, Table::Auth)?.into_iter().collect();
                vec![statements::create_security_integration(&params)
                    .map_err(|source| ProvisionError::Auth { phase, source })?]
            }
            Phase::Roles => self
                .load::<RoleRecord>(phase, Table::Roles)?
                .iter()
                .flat_map(|row| {
                    [
                        statements::create_role(&row.role),
                        statements::grant_role_to_role(&row.role, row.parent_role()),
                    ]
                })
                .collect(),
            Phase::Objects => {
                let objects = self.load::<ObjectRecord>(phase, Table::Objects)?;
                statements::unique_databases(&objects)
                    .into_iter()
                    .map(statements::create_database)
                    .chain(
                        objects
                            .iter()
                            .map(|row| statements::create_schema(&row.database, &row.schema)),
                    )
                    .collect()
            }
            Phase::Warehouses => self
                .load::<WarehouseRecord>(phase, Table::Warehouses)?
                .iter()
                .map(statements::create_warehouse)
                .collect(),
            Phase::Users => self
                .load::<UserRecord>(phase, Table::Users)?
                .iter()
                .map(statements::create_user)
                .collect(),
            Phase::Sandboxes => self
                .load::<UserRecord>(phase, Table::Users)?
                .iter()
                .filter(|user| statements::wants_sandbox(user))
                .map(|user| statements::create_sandbox(&self.sandbox_database, &user.username))
                .collect(),
            Phase::ResourceMonitors => {
                let monitors = self.load::<MonitorRecord>(phase, Table::Monitors)?;
                let notifications =
                    self.load::<NotifyRecord>(phase, Table::MonitorNotifications)?;
                let triggers = self.load::<TriggerRecord>(phase, Table::MonitorTriggers)?;
                monitors
                    .iter()
                    .map(|monitor| {
                        statements::create_resource_monitor(
                            monitor,
                            &statements::notify_users(&monitor.monitor_name, &notifications),
                            &statements::triggers(&monitor.monitor_name, &triggers),
                        )
                    })
                    .collect()
            }
            Phase::Privileges => {
                let databases =
                    self.load::<DatabasePrivilegeRecord>(phase, Table::DatabasePrivileges)?;
                let schemas = self.load::<SchemaPrivilegeRecord>(phase, Table::SchemaPrivileges)?;
                let warehouses =
                    self.load::<WarehousePrivilegeRecord>(phase, Table::WarehousePrivileges)?;
                databases
                    .iter()
                    .map(statements::grant_on_database)
                    .chain(schemas.iter().map(statements::grant_on_schema))
                    .chain(warehouses.iter().map(statements::grant_on_warehouse))
                    .collect()
            }
            Phase::RoleGrants => self
                .load::<RoleAssignmentRecord>(phase, Table::RoleAssignments)?
                .iter()
                .map(statements::grant_role_to_user)
                .collect(),
        };
        Ok(statements)
    }

    fn load<T: DeserializeOwned>(
        &self,
        phase: Phase,
        table: Table,
    ) -> Result<Vec<T>, ProvisionError> {
        read_table(&self.files.table(table))
            .map_err(|source| ProvisionError::Load { phase, source })
    }
}

impl<C: Connect> Provisioner<C> {
    /// Run `phases` in canonical order; an empty slice runs all of them.
    /// Stops at the first failure.
    pub async fn run(&self, phases: &[Phase]) -> Result<(), ProvisionError> {
        let selected: BTreeSet<Phase> = if phases.is_empty() {
            Phase::ALL.into_iter().collect()
        } else {
            phases.iter().copied().collect()
        };
        for phase in selected {
            self.run_phase(phase).await?;
        }
        tracing::info!("setup complete");
        Ok(())
    }

    /// Run one phase in its own session. Returns how many statements ran.
    pub async fn run_phase(&self, phase: Phase) -> Result<usize, ProvisionError> {
        let statements = self.statements(phase)?;
        tracing::info!(role = phase.role(), "{} {}", phase.number(), phase.title());
        if statements.is_empty() {
            tracing::info!(%phase, "nothing to do");
            return Ok(0);
        }
        let mut session = self
            .connector
            .open(phase.role())
            .await
            .map_err(|source| ProvisionError::Open {
                phase,
                role: phase.role(),
                source,
            })?;
        let executed = execute_all(&mut session, phase, &statements).await;
        if let Err(error) = session.close().await {
            tracing::warn!(%phase, %error, "could not close session");
        }
        executed?;
        tracing::info!(%phase, count = statements.len(), "phase done");
        Ok(statements.len())
    }
}

/// Stops at the first statement that fails.
async fn execute_all<S: Session>(
    session: &mut S,
    phase: Phase,
    statements: &[String],
) -> Result<(), ProvisionError> {
    for statement in statements {
        tracing::debug!(%phase, statement = statement.as_str(), "executing");
        session
            .execute(statement)
            .await
            .map_err(|source| ProvisionError::Execute {
                phase,
                statement: statement.clone(),
                source,
            })?;
    }
    Ok(())
}
