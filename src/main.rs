use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use snowflake_provision::{
    config::{DEFAULT_DATA_DIR, DEFAULT_SANDBOX_DATABASE},
    Credentials, Phase, Provisioner, SetupFiles,
};
use tracing_subscriber::EnvFilter;

/// Provision a Snowflake account from CSV tables.
///
/// Credentials come from SF_ACC and SF_USER, plus either SF_PW or
/// SF_PUBLIC_KEY_PATH and SF_PRIVATE_KEY_PATH.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the setup tables
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Database the per-user sandbox schemas are created in
    #[arg(long, default_value = DEFAULT_SANDBOX_DATABASE)]
    sandbox_database: String,
    /// Only run these phases (repeatable); runs every phase by default
    #[arg(long = "phase", value_enum)]
    phases: Vec<Phase>,
    /// More output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let credentials = Credentials::from_env().context("reading credentials")?;
    let connector = credentials
        .connector()
        .context("building Snowflake connector")?;
    tracing::info!(
        account = %credentials.account,
        user = %credentials.user,
        data_dir = %args.data_dir.display(),
        "starting setup"
    );

    Provisioner::new(connector, SetupFiles::new(args.data_dir))
        .with_sandbox_database(args.sandbox_database)
        .run(&args.phases)
        .await
        .context("setup aborted")?;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn phases_parse_in_kebab_case() -> Result<(), clap::Error> {
        let args = Args::try_parse_from([
            "snowflake-provision",
            "--phase",
            "resource-monitors",
            "--phase",
            "role-grants",
            "-vv",
        ])?;
        assert_eq!(args.phases, vec![Phase::ResourceMonitors, Phase::RoleGrants]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.data_dir, PathBuf::from("data"));
        assert_eq!(args.sandbox_database, "rda");
        Ok(())
    }
}
