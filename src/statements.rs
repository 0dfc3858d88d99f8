//! SQL text for every object the setup tables describe.
//!
//! Values are interpolated as they appear in the tables. Quoting follows
//! Snowflake's DDL: string properties are wrapped in single quotes, while
//! identifiers, numbers, booleans and keywords go in bare.

use std::collections::HashSet;

use crate::records::{
    AuthParameters, DatabasePrivilegeRecord, MissingAuthParameter, MonitorRecord, NotifyRecord,
    ObjectRecord, RoleAssignmentRecord, SchemaPrivilegeRecord, TriggerRecord, UserRecord,
    WarehousePrivilegeRecord, WarehouseRecord,
};

const INDENT: &str = "\n    ";

pub fn create_security_integration(
    params: &AuthParameters,
) -> Result<String, MissingAuthParameter> {
    Ok(format!(
        "create or replace security integration {name}\
         {INDENT}type = {kind}\
         {INDENT}enabled = {enabled}\
         {INDENT}saml2_issuer = '{issuer}'\
         {INDENT}saml2_sso_url = '{sso_url}'\
         {INDENT}saml2_provider = '{provider}'\
         {INDENT}saml2_x509_cert = '{cert}'\
         {INDENT}saml2_sp_initiated_login_page_label = '{label}'\
         {INDENT}saml2_enable_sp_initiated = {sp_initiated}\
         {INDENT}saml2_snowflake_acs_url = '{acs_url}'\
         {INDENT}saml2_snowflake_issuer_url = '{issuer_url}'",
        name = params.get("NAME")?,
        kind = params.get("TYPE")?,
        enabled = params.get("ENABLED")?,
        issuer = params.get("SAML2_ISSUER")?,
        sso_url = params.get("SAML2_SSO_URL")?,
        provider = params.get("SAML2_PROVIDER")?,
        cert = params.get("SAML2_X509_CERT")?,
        label = params.get("SAML2_SP_INITIATED_LOGIN_PAGE_LABEL")?,
        sp_initiated = params.get("SAML2_ENABLE_SP_INITIATED")?,
        acs_url = params.get("SAML2_SNOWFLAKE_ACS_URL")?,
        issuer_url = params.get("SAML2_SNOWFLAKE_ISSUER_URL")?,
    ))
}

pub fn create_role(role: &str) -> String {
    format!("create or replace role {role}")
}

pub fn grant_role_to_role(role: &str, parent: &str) -> String {
    format!("grant role {role} to role {parent}")
}

/// Database names in first-seen order, each once.
pub fn unique_databases(objects: &[ObjectRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();
    objects
        .iter()
        .map(|object| object.database.as_str())
        .filter(|database| seen.insert(*database))
        .collect()
}

pub fn create_database(database: &str) -> String {
    format!("create or replace database {database}")
}

pub fn create_schema(database: &str, schema: &str) -> String {
    format!("create or replace schema {database}.{schema}")
}

pub fn create_warehouse(warehouse: &WarehouseRecord) -> String {
    format!(
        "create or replace warehouse {} with\
         {INDENT}warehouse_type = '{}'\
         {INDENT}warehouse_size = {}\
         {INDENT}max_cluster_count = {}\
         {INDENT}min_cluster_count = {}\
         {INDENT}scaling_policy = {}\
         {INDENT}auto_suspend = {}\
         {INDENT}auto_resume = {}\
         {INDENT}initially_suspended = {}",
        warehouse.name,
        warehouse.warehouse_type,
        warehouse.warehouse_size,
        warehouse.max_cluster_count,
        warehouse.min_cluster_count,
        warehouse.scaling_policy,
        warehouse.auto_suspend,
        warehouse.auto_resume,
        warehouse.initially_suspended,
    )
}

pub fn create_user(user: &UserRecord) -> String {
    format!(
        "create or replace user {}\
         {INDENT}password = '{}'\
         {INDENT}login_name = '{}'\
         {INDENT}display_name = '{}'\
         {INDENT}first_name = '{}'\
         {INDENT}last_name = '{}'\
         {INDENT}email = '{}'\
         {INDENT}must_change_password = {}\
         {INDENT}default_warehouse = {}\
         {INDENT}default_role = {}",
        user.username,
        user.password,
        user.login_name,
        user.display_name,
        user.first_name,
        user.last_name,
        user.email,
        user.must_change_password,
        user.default_warehouse,
        user.default_role,
    )
}

pub fn wants_sandbox(user: &UserRecord) -> bool {
    user.sandbox.eq_ignore_ascii_case("TRUE")
}

pub fn create_sandbox(sandbox_database: &str, username: &str) -> String {
    create_schema(sandbox_database, username)
}

/// Users to notify for `monitor`, comma separated, in table order.
pub fn notify_users(monitor: &str, notifications: &[NotifyRecord]) -> String {
    notifications
        .iter()
        .filter(|row| row.monitor_name == monitor)
        .map(|row| row.user.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// `on N percent do ACTION` for each trigger of `monitor`, space separated.
pub fn triggers(monitor: &str, triggers: &[TriggerRecord]) -> String {
    triggers
        .iter()
        .filter(|row| row.monitor_name == monitor)
        .map(|row| format!("on {} percent do {}", row.percentage, row.action))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Empty `notify_users` or `triggers` leave their clause out.
pub fn create_resource_monitor(
    monitor: &MonitorRecord,
    notify_users: &str,
    triggers: &str,
) -> String {
    let mut statement = format!(
        "create or replace resource monitor {} with\
         {INDENT}credit_quota = {}\
         {INDENT}frequency = {}\
         {INDENT}start_timestamp = {}",
        monitor.monitor_name, monitor.credit_quota, monitor.frequency, monitor.start_timestamp,
    );
    if !notify_users.is_empty() {
        statement.push_str(&format!("{INDENT}notify_users = ({notify_users})"));
    }
    if !triggers.is_empty() {
        statement.push_str(&format!("{INDENT}triggers {triggers}"));
    }
    statement
}

pub fn grant_on_database(grant: &DatabasePrivilegeRecord) -> String {
    format!(
        "grant {} on database {} to role {}",
        grant.privilege, grant.database, grant.role
    )
}

pub fn grant_on_schema(grant: &SchemaPrivilegeRecord) -> String {
    format!(
        "grant {} on schema {}.{} to role {}",
        grant.privilege, grant.database, grant.schema, grant.role
    )
}

pub fn grant_on_warehouse(grant: &WarehousePrivilegeRecord) -> String {
    format!(
        "grant {} on warehouse {} to role {}",
        grant.privilege, grant.warehouse_name, grant.role
    )
}

pub fn grant_role_to_user(assignment: &RoleAssignmentRecord) -> String {
    format!("grant role {} to user {}", assignment.role, assignment.user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::AuthRecord;

    fn object(database: &str, schema: &str) -> ObjectRecord {
        ObjectRecord {
            database: database.into(),
            schema: schema.into(),
        }
    }

    fn monitor() -> MonitorRecord {
        MonitorRecord {
            monitor_name: "MONTHLY_LIMIT".into(),
            credit_quota: "100".into(),
            frequency: "monthly".into(),
            start_timestamp: "immediately".into(),
        }
    }

    fn notify(monitor: &str, user: &str) -> NotifyRecord {
        NotifyRecord {
            monitor_name: monitor.into(),
            user: user.into(),
        }
    }

    fn trigger(monitor: &str, percentage: &str, action: &str) -> TriggerRecord {
        TriggerRecord {
            monitor_name: monitor.into(),
            percentage: percentage.into(),
            action: action.into(),
        }
    }

    fn user(sandbox: &str) -> UserRecord {
        UserRecord {
            username: "JDOE".into(),
            password: "Temp#1234".into(),
            login_name: "jdoe@example.com".into(),
            display_name: "Jane Doe".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jdoe@example.com".into(),
            must_change_password: "TRUE".into(),
            default_warehouse: "ANALYST_WH".into(),
            default_role: "ANALYST".into(),
            sandbox: sandbox.into(),
        }
    }

    #[test]
    fn databases_are_deduplicated_in_order() {
        let objects = vec![
            object("RAW", "SALES"),
            object("ANALYTICS", "MARTS"),
            object("RAW", "HR"),
            object("ANALYTICS", "STAGING"),
        ];
        assert_eq!(unique_databases(&objects), vec!["RAW", "ANALYTICS"]);
    }

    #[test]
    fn monitor_with_two_users_and_one_trigger() {
        let notifications = vec![
            notify("MONTHLY_LIMIT", "JDOE"),
            notify("OTHER", "NOBODY"),
            notify("MONTHLY_LIMIT", "ASMITH"),
        ];
        let trigger_rows = vec![
            trigger("MONTHLY_LIMIT", "90", "suspend"),
            trigger("OTHER", "50", "notify"),
        ];
        let users = notify_users("MONTHLY_LIMIT", &notifications);
        let clauses = triggers("MONTHLY_LIMIT", &trigger_rows);
        assert_eq!(users, "JDOE,ASMITH");
        assert_eq!(clauses, "on 90 percent do suspend");
        assert_eq!(
            create_resource_monitor(&monitor(), &users, &clauses),
            "create or replace resource monitor MONTHLY_LIMIT with\n    \
             credit_quota = 100\n    \
             frequency = monthly\n    \
             start_timestamp = immediately\n    \
             notify_users = (JDOE,ASMITH)\n    \
             triggers on 90 percent do suspend"
        );
    }

    #[test]
    fn triggers_are_space_joined() {
        let rows = vec![
            trigger("MONTHLY_LIMIT", "75", "notify"),
            trigger("MONTHLY_LIMIT", "100", "suspend_immediate"),
        ];
        assert_eq!(
            triggers("MONTHLY_LIMIT", &rows),
            "on 75 percent do notify on 100 percent do suspend_immediate"
        );
    }

    #[test]
    fn monitor_without_users_or_triggers_drops_clauses() {
        let statement = create_resource_monitor(&monitor(), "", "");
        assert!(!statement.contains("notify_users"));
        assert!(!statement.contains("triggers"));
        assert!(statement.ends_with("start_timestamp = immediately"));
    }

    #[test]
    fn user_statement_quotes_strings() {
        let statement = create_user(&user("TRUE"));
        assert!(statement.starts_with("create or replace user JDOE\n"));
        assert!(statement.contains("password = 'Temp#1234'"));
        assert!(statement.contains("display_name = 'Jane Doe'"));
        assert!(statement.contains("must_change_password = TRUE"));
        assert!(statement.ends_with("default_role = ANALYST"));
    }

    #[test]
    fn sandbox_flag() {
        assert!(wants_sandbox(&user("TRUE")));
        assert!(wants_sandbox(&user("true")));
        assert!(!wants_sandbox(&user("FALSE")));
        assert!(!wants_sandbox(&user("")));
        assert_eq!(create_sandbox("rda", "JDOE"), "create or replace schema rda.JDOE");
    }

    #[test]
    fn warehouse_statement() {
        let warehouse = WarehouseRecord {
            name: "ANALYST_WH".into(),
            warehouse_type: "STANDARD".into(),
            warehouse_size: "XSMALL".into(),
            max_cluster_count: "3".into(),
            min_cluster_count: "1".into(),
            scaling_policy: "STANDARD".into(),
            auto_suspend: "60".into(),
            auto_resume: "TRUE".into(),
            initially_suspended: "TRUE".into(),
        };
        let statement = create_warehouse(&warehouse);
        let lines: Vec<&str> = statement.lines().map(str::trim).collect();
        assert_eq!(
            lines,
            vec![
                "create or replace warehouse ANALYST_WH with",
                "warehouse_type = 'STANDARD'",
                "warehouse_size = XSMALL",
                "max_cluster_count = 3",
                "min_cluster_count = 1",
                "scaling_policy = STANDARD",
                "auto_suspend = 60",
                "auto_resume = TRUE",
                "initially_suspended = TRUE",
            ]
        );
    }

    #[test]
    fn security_integration_needs_every_parameter() {
        let mut rows = vec![
            ("NAME", "OKTA_SSO"),
            ("TYPE", "SAML2"),
            ("ENABLED", "TRUE"),
            ("SAML2_ISSUER", "http://www.okta.com/exk1"),
            ("SAML2_SSO_URL", "https://example.okta.com/app/sso/saml"),
            ("SAML2_PROVIDER", "OKTA"),
            ("SAML2_X509_CERT", "MIIC"),
            ("SAML2_SP_INITIATED_LOGIN_PAGE_LABEL", "Okta SSO"),
            ("SAML2_ENABLE_SP_INITIATED", "TRUE"),
            ("SAML2_SNOWFLAKE_ACS_URL", "https://xy12345.snowflakecomputing.com/fed/login"),
            ("SAML2_SNOWFLAKE_ISSUER_URL", "https://xy12345.snowflakecomputing.com"),
        ];
        let params = |rows: &[(&str, &str)]| -> AuthParameters {
            rows.iter()
                .map(|(variable, value)| AuthRecord {
                    variable: variable.to_string(),
                    value: value.to_string(),
                })
                .collect()
        };

        let statement = create_security_integration(&params(&rows)).unwrap();
        assert!(statement.starts_with("create or replace security integration OKTA_SSO\n"));
        assert!(statement.contains("type = SAML2"));
        assert!(statement.contains("saml2_sp_initiated_login_page_label = 'Okta SSO'"));
        assert!(statement
            .ends_with("saml2_snowflake_issuer_url = 'https://xy12345.snowflakecomputing.com'"));

        rows.retain(|(variable, _)| *variable != "SAML2_PROVIDER");
        assert_eq!(
            create_security_integration(&params(&rows)),
            Err(MissingAuthParameter("SAML2_PROVIDER".into()))
        );
    }

    #[test]
    fn grants() {
        assert_eq!(
            grant_on_database(&DatabasePrivilegeRecord {
                privilege: "usage".into(),
                database: "RAW".into(),
                role: "ANALYST".into(),
            }),
            "grant usage on database RAW to role ANALYST"
        );
        assert_eq!(
            grant_on_schema(&SchemaPrivilegeRecord {
                privilege: "create table".into(),
                database: "RAW".into(),
                schema: "SALES".into(),
                role: "LOADER".into(),
            }),
            "grant create table on schema RAW.SALES to role LOADER"
        );
        assert_eq!(
            grant_on_warehouse(&WarehousePrivilegeRecord {
                privilege: "operate".into(),
                warehouse_name: "LOAD_WH".into(),
                role: "LOADER".into(),
            }),
            "grant operate on warehouse LOAD_WH to role LOADER"
        );
        assert_eq!(
            grant_role_to_user(&RoleAssignmentRecord {
                role: "ANALYST".into(),
                user: "JDOE".into(),
            }),
            "grant role ANALYST to user JDOE"
        );
        assert_eq!(
            grant_role_to_role("ANALYST", "sysadmin"),
            "grant role ANALYST to role sysadmin"
        );
    }
}
