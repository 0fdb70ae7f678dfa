//! Applies plans to the server, one database name at a time.
//!
//! A name's operations are split into runs that share an execution scope.
//! Transactional runs commit together or not at all; `CREATE DATABASE` runs
//! on its own in autocommit. The first failure stops that name, rolls back
//! whatever was open and moves on to the next name.

use crate::error::ExecutionError;
use crate::model::{DesiredEntity, ExecutionResult, ExecutionScope, PlannedOperation, TargetPlan};
use crate::statements::{PasswordText, statements};
use crate::transport::{Connector, Session};

pub struct Executor<'a> {
    connector: &'a dyn Connector,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    /// Apply every plan in order. Each name gets its own result whether or
    /// not earlier names failed.
    pub async fn apply_all(
        &self,
        session: &mut dyn Session,
        desired: &[DesiredEntity],
        plans: &[TargetPlan],
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            let Some(entity) = desired.iter().find(|d| d.db_name() == plan.name) else {
                results.push(ExecutionResult::failed(
                    plan.name.clone(),
                    Vec::new(),
                    "no desired entity for planned name",
                ));
                continue;
            };
            let result = self.apply(session, entity, &plan.operations).await;
            match &result.error {
                None => tracing::info!(
                    "{}: {} operation(s) applied",
                    result.name,
                    result.applied.len()
                ),
                Some(err) => tracing::error!("{}: {err}", result.name),
            }
            results.push(result);
        }
        results
    }

    /// Apply one name's operations as a unit of work.
    pub async fn apply(
        &self,
        session: &mut dyn Session,
        desired: &DesiredEntity,
        ops: &[PlannedOperation],
    ) -> ExecutionResult {
        let name = desired.db_name();
        let mut applied = Vec::with_capacity(ops.len());

        for run in ops.chunk_by(|a, b| a.scope() == b.scope()) {
            let outcome = match run[0].scope() {
                ExecutionScope::Cluster => in_transaction(session, desired, run).await,
                ExecutionScope::ClusterAutocommit => {
                    autocommit(session, desired, run, &mut applied).await
                }
                ExecutionScope::Database => self.in_database(desired, run).await,
            };
            match outcome {
                Ok(()) => {
                    // autocommit runs record their own progress
                    if run[0].scope() != ExecutionScope::ClusterAutocommit {
                        applied.extend_from_slice(run);
                    }
                }
                Err(err) => return ExecutionResult::failed(name, applied, err.to_string()),
            }
        }

        ExecutionResult::succeeded(name, applied)
    }

    async fn in_database(
        &self,
        desired: &DesiredEntity,
        run: &[PlannedOperation],
    ) -> Result<(), ExecutionError> {
        let mut db_session =
            self.connector
                .connect(desired.db_name())
                .await
                .map_err(|source| ExecutionError {
                    operation: run[0].clone(),
                    source,
                })?;
        in_transaction(db_session.as_mut(), desired, run).await
    }
}

async fn in_transaction(
    session: &mut dyn Session,
    desired: &DesiredEntity,
    run: &[PlannedOperation],
) -> Result<(), ExecutionError> {
    session.begin().await.map_err(|source| ExecutionError {
        operation: run[0].clone(),
        source,
    })?;

    for op in run {
        if let Err(err) = execute_op(session, desired, op).await {
            if let Err(rollback_err) = session.rollback().await {
                tracing::warn!("rollback after failed {op} also failed: {rollback_err}");
            }
            return Err(err);
        }
    }

    session.commit().await.map_err(|source| ExecutionError {
        operation: run[run.len() - 1].clone(),
        source,
    })
}

async fn autocommit(
    session: &mut dyn Session,
    desired: &DesiredEntity,
    run: &[PlannedOperation],
    applied: &mut Vec<PlannedOperation>,
) -> Result<(), ExecutionError> {
    for op in run {
        execute_op(session, desired, op).await?;
        applied.push(op.clone());
    }
    Ok(())
}

async fn execute_op(
    session: &mut dyn Session,
    desired: &DesiredEntity,
    op: &PlannedOperation,
) -> Result<(), ExecutionError> {
    let password = PasswordText::Reveal(desired.owner_password());
    for sql in statements(op, password) {
        session
            .execute_batch(&sql)
            .await
            .map_err(|source| ExecutionError {
                operation: op.clone(),
                source,
            })?;
    }
    tracing::debug!("{op} executed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbName, Secret};
    use crate::model::OperationKind;
    use crate::test_utils::{FakeServer, StatementKind};

    fn desired(name: &str) -> DesiredEntity {
        DesiredEntity::new(DbName::new(name).unwrap(), Secret::new("s3cret"))
    }

    fn full_plan(name: &str) -> Vec<PlannedOperation> {
        [
            OperationKind::CreateRole,
            OperationKind::AlterRolePassword,
            OperationKind::CreateDatabase,
            OperationKind::GrantSchemaPrivileges,
        ]
        .into_iter()
        .map(|k| PlannedOperation::new(k, name))
        .collect()
    }

    #[tokio::test]
    async fn provisions_role_database_and_grants() {
        let server = FakeServer::new();
        let mut session = server.session("postgres");
        let executor = Executor::new(&server);

        let result = executor
            .apply(session.as_mut(), &desired("app"), &full_plan("app"))
            .await;

        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.applied, full_plan("app"));
        let role = server.role("app").unwrap();
        assert!(role.login);
        assert_eq!(role.password.as_deref(), Some("s3cret"));
        let db = server.database("app").unwrap();
        assert_eq!(db.owner, "app");
        assert_eq!(db.schema_owner, "app");
        assert_eq!(db.grants.len(), 4);

        let recorded = server.recorded();
        for entry in recorded.iter().filter(|r| r.sql.contains("SCHEMA public")) {
            assert_eq!(entry.dbname, "app", "{}", entry.sql);
        }
        let create_db = recorded
            .iter()
            .find(|r| r.sql.starts_with("CREATE DATABASE"))
            .unwrap();
        assert_eq!(create_db.dbname, "postgres");
        assert_eq!(create_db.kind, StatementKind::Execute);
    }

    #[tokio::test]
    async fn failed_role_transaction_leaves_nothing_behind() {
        let server = FakeServer::new();
        server.fail_statement("ALTER ROLE");
        let mut session = server.session("postgres");
        let executor = Executor::new(&server);

        let result = executor
            .apply(session.as_mut(), &desired("app"), &full_plan("app"))
            .await;

        assert!(result.applied.is_empty());
        assert!(result.error.as_deref().unwrap().contains("AlterRolePassword(app)"));
        assert!(server.role("app").is_none());
        assert!(server.database("app").is_none());
    }

    #[tokio::test]
    async fn grant_failure_keeps_committed_work() {
        let server = FakeServer::new();
        server.fail_statement("ON ALL FUNCTIONS");
        let mut session = server.session("postgres");
        let executor = Executor::new(&server);

        let result = executor
            .apply(session.as_mut(), &desired("app"), &full_plan("app"))
            .await;

        assert_eq!(result.applied, full_plan("app")[..3].to_vec());
        assert!(
            result
                .error
                .as_deref()
                .unwrap()
                .contains("GrantSchemaPrivileges(app)")
        );
        // schema ownership change rolled back with the rest of the grant transaction
        assert_eq!(
            server.database("app").unwrap().schema_owner,
            crate::test_utils::fake::DEFAULT_SCHEMA_OWNER
        );
    }

    #[tokio::test]
    async fn unreachable_target_database_is_an_execution_error() {
        let server = FakeServer::new();
        server.refuse_connections_to("app");
        let mut session = server.session("postgres");
        let executor = Executor::new(&server);

        let result = executor
            .apply(session.as_mut(), &desired("app"), &full_plan("app"))
            .await;

        assert_eq!(result.applied.len(), 3);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn later_names_run_after_a_failure() {
        let server = FakeServer::new();
        server.fail_statement(r#"CREATE ROLE "b""#);
        let mut session = server.session("postgres");
        let executor = Executor::new(&server);
        let desired = vec![desired("a"), desired("b"), desired("c")];
        let plans: Vec<TargetPlan> = ["a", "b", "c"]
            .into_iter()
            .map(|n| TargetPlan {
                name: n.to_string(),
                operations: full_plan(n),
            })
            .collect();

        let results = executor.apply_all(session.as_mut(), &desired, &plans).await;

        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[2].is_success());
        assert!(server.database("c").is_some());
    }
}
