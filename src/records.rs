//! Rows of the setup tables.
//!
//! Every value stays text; the tables are handed to Snowflake as written.

use std::{collections::HashMap, path::Path};

use serde::{de::DeserializeOwned, Deserialize};

/// Role that receives new roles when a row leaves `Parent_Role` out.
pub const DEFAULT_PARENT_ROLE: &str = "sysadmin";

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("could not open {path}: {source}")]
    Open { path: String, source: csv::Error },
    #[error("{path}, row {row}: {source}")]
    Row {
        path: String,
        row: usize,
        source: csv::Error,
    },
}

/// Read every row of a CSV table with a header line.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let display = || path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: display(),
            source,
        })?;
    reader
        .deserialize()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|source| LoadError::Row {
                path: display(),
                row: index + 1,
                source,
            })
        })
        .collect()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthRecord {
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("auth parameter {0} is missing")]
pub struct MissingAuthParameter(pub String);

/// Flat key/value settings for the security integration.
#[derive(Debug, Clone, Default)]
pub struct AuthParameters(HashMap<String, String>);

impl AuthParameters {
    pub fn get(&self, key: &str) -> Result<&str, MissingAuthParameter> {
        self.0
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| MissingAuthParameter(key.to_owned()))
    }
}

impl FromIterator<AuthRecord> for AuthParameters {
    fn from_iter<I: IntoIterator<Item = AuthRecord>>(iter: I) -> Self {
        AuthParameters(
            iter.into_iter()
                .map(|record| (record.variable, record.value))
                .collect(),
        )
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "Parent_Role", default)]
    pub parent_role: String,
}

impl RoleRecord {
    pub fn parent_role(&self) -> &str {
        if self.parent_role.is_empty() {
            DEFAULT_PARENT_ROLE
        } else {
            &self.parent_role
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    #[serde(rename = "Database")]
    pub database: String,
    #[serde(rename = "Schema")]
    pub schema: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct WarehouseRecord {
    pub name: String,
    #[serde(rename = "Warehouse_Type")]
    pub warehouse_type: String,
    #[serde(rename = "Warehouse_Size")]
    pub warehouse_size: String,
    #[serde(rename = "Max_Cluster_Count")]
    pub max_cluster_count: String,
    #[serde(rename = "Min_Cluster_Count")]
    pub min_cluster_count: String,
    #[serde(rename = "Scaling_Policy")]
    pub scaling_policy: String,
    #[serde(rename = "Auto_Suspend")]
    pub auto_suspend: String,
    #[serde(rename = "Auto_Resume")]
    pub auto_resume: String,
    #[serde(rename = "Initially_Suspended")]
    pub initially_suspended: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    #[serde(rename = "Login_Name")]
    pub login_name: String,
    #[serde(rename = "Display_Name")]
    pub display_name: String,
    #[serde(rename = "First_Name")]
    pub first_name: String,
    #[serde(rename = "Last_Name")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "Must_Change_Password")]
    pub must_change_password: String,
    #[serde(rename = "Default_Warehouse")]
    pub default_warehouse: String,
    #[serde(rename = "Default_Role")]
    pub default_role: String,
    pub sandbox: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonitorRecord {
    #[serde(rename = "Monitor_Name")]
    pub monitor_name: String,
    #[serde(rename = "Credit_Quota")]
    pub credit_quota: String,
    #[serde(rename = "Frequency")]
    pub frequency: String,
    #[serde(rename = "Start_Timestamp")]
    pub start_timestamp: String,
}

/// One user to notify for one monitor.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NotifyRecord {
    #[serde(rename = "Monitor_Name")]
    pub monitor_name: String,
    #[serde(rename = "User")]
    pub user: String,
}

/// One threshold and its action for one monitor.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TriggerRecord {
    #[serde(rename = "Monitor_Name")]
    pub monitor_name: String,
    #[serde(rename = "Percentage")]
    pub percentage: String,
    #[serde(rename = "Action")]
    pub action: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DatabasePrivilegeRecord {
    #[serde(rename = "Privilege")]
    pub privilege: String,
    #[serde(rename = "Database")]
    pub database: String,
    #[serde(rename = "Role")]
    pub role: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SchemaPrivilegeRecord {
    #[serde(rename = "Privilege")]
    pub privilege: String,
    #[serde(rename = "Database")]
    pub database: String,
    #[serde(rename = "Schema")]
    pub schema: String,
    #[serde(rename = "Role")]
    pub role: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WarehousePrivilegeRecord {
    #[serde(rename = "Privilege")]
    pub privilege: String,
    #[serde(rename = "Warehouse_Name")]
    pub warehouse_name: String,
    #[serde(rename = "Role")]
    pub role: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentRecord {
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "User")]
    pub user: String,
}
