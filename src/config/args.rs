use clap::Parser;

/// Command-line overrides. Every field is optional so that the resolver can
/// fall back to the environment and then to defaults.
#[derive(Parser, Debug, Default, Clone)]
#[command(
    author,
    version,
    about = "Provision multiple Postgres databases and roles (idempotent sidecar)"
)]
pub struct Args {
    /// Postgres host (env: POSTGRES_HOST)
    #[arg(long)]
    pub host: Option<String>,
    /// Postgres port (env: POSTGRES_PORT, default 5432)
    #[arg(long)]
    pub port: Option<String>,
    /// Superuser name (env: POSTGRES_SUPERUSER, default postgres)
    #[arg(long)]
    pub superuser: Option<String>,
    /// Superuser password (env: POSTGRES_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,
    /// Database list, comma-separated or a JSON array (env: POSTGRES_DBS)
    #[arg(long)]
    pub dbs: Option<String>,
    /// Password shared by every provisioned role (env: POSTGRES_NON_ROOT_PASSWORD)
    #[arg(long = "non-root-password")]
    pub non_root_password: Option<String>,
    /// Seconds to wait for Postgres readiness (env: BOOTSTRAP_TIMEOUT, default 120)
    #[arg(long)]
    pub timeout: Option<String>,
    /// Per-connection connect timeout in seconds (env: BOOTSTRAP_CONNECT_TIMEOUT, default 10)
    #[arg(long = "connect-timeout")]
    pub connect_timeout: Option<String>,
    /// Postgres sslmode (env: POSTGRES_SSLMODE, default prefer)
    #[arg(long)]
    pub sslmode: Option<String>,
    /// Database used for cluster-level statements (env: POSTGRES_MAINTENANCE_DB, default postgres)
    #[arg(long = "maintenance-db")]
    pub maintenance_db: Option<String>,
    /// Plan only; do not apply changes (env: BOOTSTRAP_DRY_RUN)
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Also ALTER ROLE ... PASSWORD for existing roles (env: BOOTSTRAP_ENSURE_PASSWORD)
    #[arg(long = "ensure-password")]
    pub ensure_password: bool,
    /// Skip ownership/grant re-assertion when the server already matches (env: BOOTSTRAP_SKIP_CONVERGED)
    #[arg(long = "skip-converged")]
    pub skip_converged: bool,
    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_without_env() {
        let args = Args::parse_from([
            "pg-bootstrap",
            "--host",
            "db",
            "--dbs",
            "a,b",
            "--dry-run",
            "--non-root-password",
            "pw",
        ]);
        assert_eq!(args.host.as_deref(), Some("db"));
        assert_eq!(args.dbs.as_deref(), Some("a,b"));
        assert_eq!(args.non_root_password.as_deref(), Some("pw"));
        assert!(args.dry_run);
        assert!(!args.ensure_password);
        assert!(args.port.is_none());
    }
}
