// Configuration resolution
//
// - args: command-line overrides (clap)
// - env: environment variable names and the `EnvSource` seam
// - db_list: parsing and validation of the database name list

pub mod args;
pub mod db_list;
pub mod env;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

pub use args::Args;
pub use db_list::{DbList, DbName, MAX_IDENTIFIER_BYTES};
pub use env::{EnvSource, ProcessEnv};

use crate::error::ConfigError;
use crate::model::DesiredEntity;

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_SUPERUSER: &str = "postgres";
pub const DEFAULT_MAINTENANCE_DB: &str = "postgres";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A credential that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building connection parameters and password literals.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(*****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*****")
    }
}

/// libpq `sslmode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    /// Parse a libpq `sslmode` value.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSslMode` for unknown values.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            _ => Err(ConfigError::InvalidSslMode(raw.to_string())),
        }
    }

    #[must_use]
    pub fn requires_tls(self) -> bool {
        matches!(self, SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

/// Whether ownership and grants are re-asserted on databases that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReassertPolicy {
    /// Re-assert on every run, correcting out-of-band drift unconditionally.
    #[default]
    Always,
    /// Re-assert only when the inspected owners differ from the desired role.
    OnDrift,
}

/// Validated settings for one run. Built once, then only borrowed.
#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    pub host: String,
    pub port: u16,
    pub superuser: String,
    #[serde(skip)]
    pub superuser_password: Secret,
    pub databases: DbList,
    #[serde(skip)]
    pub non_root_password: Secret,
    pub sslmode: SslMode,
    pub maintenance_db: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub dry_run: bool,
    pub ensure_password: bool,
    pub reassert: ReassertPolicy,
}

impl Configuration {
    /// Merge CLI overrides, the environment and defaults, in that order of precedence.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` listing every absent required field, or
    /// the first malformed value encountered.
    pub fn resolve(args: &Args, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let host = pick(args.host.as_deref(), env, env::ENV_HOST).map(|h| h.trim().to_string());
        let superuser_password = pick(args.password.as_deref(), env, env::ENV_PASSWORD);
        let dbs = pick(args.dbs.as_deref(), env, env::ENV_DBS);
        let non_root_password = pick(
            args.non_root_password.as_deref(),
            env,
            env::ENV_NON_ROOT_PASSWORD,
        );

        let mut missing = Vec::new();
        if host.is_none() {
            missing.push(format!("host (--host / {})", env::ENV_HOST));
        }
        if superuser_password.is_none() {
            missing.push(format!("password (--password / {})", env::ENV_PASSWORD));
        }
        if dbs.is_none() {
            missing.push(format!("dbs (--dbs / {})", env::ENV_DBS));
        }
        if non_root_password.is_none() {
            missing.push(format!(
                "non-root password (--non-root-password / {})",
                env::ENV_NON_ROOT_PASSWORD
            ));
        }
        let (Some(host), Some(superuser_password), Some(dbs), Some(non_root_password)) =
            (host, superuser_password, dbs, non_root_password)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let port = match pick(args.port.as_deref(), env, env::ENV_PORT) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PORT,
        };
        let timeout_secs = match pick(args.timeout.as_deref(), env, env::ENV_TIMEOUT) {
            Some(raw) => parse_positive("timeout", &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let connect_timeout_secs = match pick(
            args.connect_timeout.as_deref(),
            env,
            env::ENV_CONNECT_TIMEOUT,
        ) {
            Some(raw) => parse_positive("connect-timeout", &raw)?,
            None => DEFAULT_CONNECT_TIMEOUT_SECS,
        };

        let sslmode = match pick(args.sslmode.as_deref(), env, env::ENV_SSLMODE) {
            Some(raw) => SslMode::parse(&raw)?,
            None => SslMode::Prefer,
        };
        if sslmode.requires_tls() {
            return Err(ConfigError::UnsupportedSslMode(sslmode.as_str().to_string()));
        }

        let superuser = pick(args.superuser.as_deref(), env, env::ENV_SUPERUSER)
            .map_or_else(|| DEFAULT_SUPERUSER.to_string(), |s| s.trim().to_string());
        let maintenance_db = pick(args.maintenance_db.as_deref(), env, env::ENV_MAINTENANCE_DB)
            .map_or_else(|| DEFAULT_MAINTENANCE_DB.to_string(), |s| s.trim().to_string());

        let dry_run = flag(args.dry_run, env, env::ENV_DRY_RUN, "dry-run")?;
        let ensure_password = flag(
            args.ensure_password,
            env,
            env::ENV_ENSURE_PASSWORD,
            "ensure-password",
        )?;
        let reassert = if flag(
            args.skip_converged,
            env,
            env::ENV_SKIP_CONVERGED,
            "skip-converged",
        )? {
            ReassertPolicy::OnDrift
        } else {
            ReassertPolicy::Always
        };

        let databases = DbList::parse(&dbs)?;
        if let Some(name) = databases.iter().find(|n| n.as_str() == superuser) {
            return Err(ConfigError::SuperuserInDbList(name.to_string()));
        }

        Ok(Configuration {
            host,
            port,
            superuser,
            superuser_password: Secret::new(superuser_password),
            databases,
            non_root_password: Secret::new(non_root_password),
            sslmode,
            maintenance_db,
            timeout_secs,
            connect_timeout_secs,
            dry_run,
            ensure_password,
            reassert,
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// One desired entity per configured name, in configuration order.
    #[must_use]
    pub fn desired_entities(&self) -> Vec<DesiredEntity> {
        self.databases
            .iter()
            .map(|name| DesiredEntity::new(name.clone(), self.non_root_password.clone()))
            .collect()
    }
}

/// CLI value if present and non-blank, else the env value if non-blank.
fn pick(cli: Option<&str>, env: &dyn EnvSource, key: &str) -> Option<String> {
    cli.map(str::to_string)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env.var(key).filter(|v| !v.trim().is_empty()))
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            field: "port",
            value: raw.to_string(),
        }),
    }
}

fn flag(
    cli: bool,
    env: &dyn EnvSource,
    key: &str,
    field: &'static str,
) -> Result<bool, ConfigError> {
    if cli {
        return Ok(true);
    }
    let Some(raw) = env.var(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { field, value: raw }),
    }
}
