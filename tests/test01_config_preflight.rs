#![cfg(feature = "test-utils")]

use std::collections::HashMap;

use pg_bootstrap::config::env::{ENV_DBS, ENV_HOST, ENV_NON_ROOT_PASSWORD, ENV_PASSWORD};
use pg_bootstrap::error::EXIT_PREFLIGHT_FAILURE;
use pg_bootstrap::prelude::*;
use pg_bootstrap::test_utils::{FakeServer, ManualClock};

/// Resolve then run, the way the binary does.
fn bootstrap(
    args: &Args,
    env: &HashMap<&str, &str>,
    server: &FakeServer,
) -> Result<Outcome, BootstrapError> {
    let cfg = Configuration::resolve(args, env)?;
    let clock = ManualClock::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    rt.block_on(Bootstrap::new(&cfg, server, &clock).run())
}

#[test]
fn test01_missing_fields_fail_before_any_connection() {
    let server = FakeServer::new();
    let env = HashMap::from([(ENV_HOST, "db"), (ENV_DBS, "n8n")]);

    let err = bootstrap(&Args::default(), &env, &server).unwrap_err();

    let BootstrapError::Config(ConfigError::Missing(fields)) = &err else {
        panic!("expected missing config, got {err:?}");
    };
    assert!(fields.iter().any(|f| f.contains(ENV_PASSWORD)));
    assert!(fields.iter().any(|f| f.contains(ENV_NON_ROOT_PASSWORD)));
    assert_eq!(err.exit_code(), EXIT_PREFLIGHT_FAILURE);
    assert_eq!(server.connect_count(), 0);
}

#[test]
fn test01_bad_db_list_fails_before_any_connection() {
    let server = FakeServer::new();
    let env = HashMap::from([
        (ENV_HOST, "db"),
        (ENV_PASSWORD, "root"),
        (ENV_NON_ROOT_PASSWORD, "pw"),
        (ENV_DBS, "n8n,,cloudbeaver"),
    ]);

    let err = bootstrap(&Args::default(), &env, &server).unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::EmptyName(_))
    ));
    assert_eq!(server.connect_count(), 0);
}

#[test]
fn test01_cli_list_overrides_environment() {
    let server = FakeServer::new();
    let env = HashMap::from([
        (ENV_HOST, "db"),
        (ENV_PASSWORD, "root"),
        (ENV_NON_ROOT_PASSWORD, "pw"),
        (ENV_DBS, "from_env"),
    ]);
    let args = Args {
        dbs: Some(r#"["from_cli"]"#.into()),
        ..Args::default()
    };

    let outcome = bootstrap(&args, &env, &server).unwrap();

    assert_eq!(outcome.report.results.len(), 1);
    assert_eq!(outcome.report.results[0].name, "from_cli");
    assert!(server.database("from_cli").is_some());
    assert!(server.database("from_env").is_none());
}

#[test]
fn test01_superuser_in_list_fails_before_any_connection() {
    let server = FakeServer::new();
    let env = HashMap::from([
        (ENV_HOST, "db"),
        (ENV_PASSWORD, "root"),
        (ENV_NON_ROOT_PASSWORD, "pw"),
        (ENV_DBS, "n8n,postgres"),
    ]);
    let args = Args {
        ensure_password: true,
        ..Args::default()
    };

    let err = bootstrap(&args, &env, &server).unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::SuperuserInDbList(ref name)) if name == "postgres"
    ));
    assert_eq!(server.connect_count(), 0);
    assert_eq!(server.role("postgres").unwrap().password.as_deref(), Some("postgres"));
}

#[test]
fn test01_quoted_list_fails_before_any_connection() {
    let server = FakeServer::new();
    let env = HashMap::from([
        (ENV_HOST, "db"),
        (ENV_PASSWORD, "root"),
        (ENV_NON_ROOT_PASSWORD, "pw"),
        (ENV_DBS, r#""n8n""#),
    ]);

    let err = bootstrap(&Args::default(), &env, &server).unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::InvalidDbList(_))
    ));
    assert_eq!(server.connect_count(), 0);
}
