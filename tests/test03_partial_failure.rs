#![cfg(feature = "test-utils")]

use std::collections::HashMap;

use pg_bootstrap::error::EXIT_PARTIAL_FAILURE;
use pg_bootstrap::prelude::*;
use pg_bootstrap::test_utils::{FakeServer, ManualClock};

fn config(dbs: &str) -> Configuration {
    let args = Args {
        host: Some("db".into()),
        password: Some("root".into()),
        dbs: Some(dbs.into()),
        non_root_password: Some("pw".into()),
        ..Args::default()
    };
    Configuration::resolve(&args, &HashMap::<&str, &str>::new()).expect("config")
}

#[test]
fn test03_one_failing_name_does_not_block_the_others() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    server.fail_statement(r#"CREATE DATABASE "beta""#);
    let cfg = config("alpha,beta,gamma");
    let clock = ManualClock::new();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = rt.block_on(Bootstrap::new(&cfg, &server, &clock).run())?;

    assert_eq!(outcome.report.exit_code(), EXIT_PARTIAL_FAILURE);
    let failures = outcome.report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "beta");
    assert!(failures[0].1.contains("CreateDatabase(beta)"));

    for name in ["alpha", "gamma"] {
        assert_eq!(server.database(name).unwrap().owner, name);
    }
    // beta's role transaction committed before the failing CREATE DATABASE
    assert!(server.role("beta").is_some());
    assert!(server.database("beta").is_none());

    let summary = render_summary(&outcome.report);
    assert!(summary.contains("beta: FAILED"));
    assert!(summary.contains("alpha: ok"));
    assert!(summary.contains("gamma: ok"));
    Ok(())
}

#[test]
fn test03_failed_name_converges_on_the_next_run() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    server.refuse_connections_to("beta");
    let cfg = config("alpha,beta");
    let clock = ManualClock::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let first = rt.block_on(Bootstrap::new(&cfg, &server, &clock).run())?;
    assert_eq!(first.report.failures().len(), 1);
    assert_eq!(server.database("beta").unwrap().schema_owner, "pg_database_owner");

    server.clear_faults();
    let second = rt.block_on(Bootstrap::new(&cfg, &server, &clock).run())?;
    assert!(second.report.is_success());
    assert_eq!(server.database("beta").unwrap().schema_owner, "beta");
    Ok(())
}
