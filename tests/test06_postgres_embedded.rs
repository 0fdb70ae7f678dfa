#![cfg(feature = "test-utils-postgres")]

use pg_bootstrap::prelude::*;
use pg_bootstrap::test_utils::postgres::{setup_postgres_embedded, stop_postgres_embedded};

#[test]
fn test06_bootstrap_against_a_real_server() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(async {
        let pg = setup_postgres_embedded().await?;
        let env = pg.env("n8n,cloud_beaver", "app pw 'quoted'");
        let cfg = Configuration::resolve(&Args::default(), &env)?;
        let connector = PgConnector::new(&cfg);
        let clock = TokioClock::new();

        let first = Bootstrap::new(&cfg, &connector, &clock).run().await?;
        assert!(first.report.is_success(), "{:?}", first.report.failures());

        let mut session = connector.connect("n8n").await?;
        let owner = session
            .query(
                "SELECT pg_get_userbyid(nspowner)::text AS owner FROM pg_namespace WHERE nspname = 'public'",
                &[],
            )
            .await?;
        assert_eq!(owner.first().and_then(|r| r.get("owner")).and_then(RowValues::as_text), Some("n8n"));

        // converged: a second run only re-asserts and still succeeds
        let second = Bootstrap::new(&cfg, &connector, &clock).run().await?;
        assert!(second.report.is_success());
        for plan in &second.plans {
            assert!(plan.operations.iter().all(|op| op.kind != pg_bootstrap::model::OperationKind::CreateDatabase));
        }

        stop_postgres_embedded(pg).await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
