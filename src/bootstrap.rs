//! One bootstrap run: wait, inspect, plan, then apply or report.

use crate::config::{Configuration, ReassertPolicy};
use crate::error::BootstrapError;
use crate::executor::Executor;
use crate::inspect::StateInspector;
use crate::model::{DesiredEntity, ExecutionResult, RunReport, TargetPlan};
use crate::readiness::{Clock, ReadinessWaiter};
use crate::reconcile::Reconciler;
use crate::transport::{Connector, Session};

/// Everything decided before any mutation.
#[derive(Debug)]
pub struct Planned {
    pub desired: Vec<DesiredEntity>,
    pub plans: Vec<TargetPlan>,
    /// Names whose inspection failed; they are never planned or applied.
    pub excluded: Vec<ExecutionResult>,
}

#[derive(Debug)]
pub struct Outcome {
    pub plans: Vec<TargetPlan>,
    pub report: RunReport,
}

pub struct Bootstrap<'a> {
    cfg: &'a Configuration,
    connector: &'a dyn Connector,
    clock: &'a dyn Clock,
}

impl<'a> Bootstrap<'a> {
    #[must_use]
    pub fn new(cfg: &'a Configuration, connector: &'a dyn Connector, clock: &'a dyn Clock) -> Self {
        Self {
            cfg,
            connector,
            clock,
        }
    }

    /// Wait for the server and open the maintenance session.
    ///
    /// # Errors
    /// `BootstrapError::Readiness` on timeout, `BootstrapError::Connect` if the
    /// session cannot be opened after the server answered.
    pub async fn connect(&self) -> Result<Box<dyn Session>, BootstrapError> {
        tracing::info!(
            "connecting to {}:{} as {} (timeout={}s, dry_run={})",
            self.cfg.host,
            self.cfg.port,
            self.cfg.superuser,
            self.cfg.timeout_secs,
            self.cfg.dry_run
        );
        let attempts = ReadinessWaiter::new(
            self.connector,
            self.clock,
            &self.cfg.maintenance_db,
            self.cfg.timeout(),
        )
        .wait()
        .await?;
        tracing::info!("postgres is ready after {attempts} attempt(s)");

        self.connector
            .connect(&self.cfg.maintenance_db)
            .await
            .map_err(BootstrapError::Connect)
    }

    /// Inspect and diff every configured name. Read-only.
    pub async fn plan(&self, session: &mut dyn Session) -> Planned {
        let desired = self.cfg.desired_entities();
        let include_schema_owner = self.cfg.reassert == ReassertPolicy::OnDrift;
        let inspections = StateInspector::new(self.connector, include_schema_owner)
            .inspect_all(session, &desired)
            .await;
        let (plans, excluded) = Reconciler::from_config(self.cfg).plan_all(&desired, inspections);
        Planned {
            desired,
            plans,
            excluded,
        }
    }

    /// The full pipeline. In dry-run mode the plan is computed and reported
    /// as if applied, and the server is never written to.
    ///
    /// # Errors
    /// Only preflight failures are errors; per-name failures land in the report.
    pub async fn run(&self) -> Result<Outcome, BootstrapError> {
        let mut session = self.connect().await?;
        let planned = self.plan(session.as_mut()).await;

        let results = if self.cfg.dry_run {
            for plan in &planned.plans {
                for op in &plan.operations {
                    tracing::info!("[dry-run] would apply {op}");
                }
            }
            planned
                .plans
                .iter()
                .map(|p| ExecutionResult::succeeded(p.name.clone(), p.operations.clone()))
                .collect()
        } else {
            Executor::new(self.connector)
                .apply_all(session.as_mut(), &planned.desired, &planned.plans)
                .await
        };

        let report = RunReport {
            dry_run: self.cfg.dry_run,
            results: in_config_order(&planned.desired, results, planned.excluded),
        };
        if report.is_success() {
            tracing::info!("bootstrap complete");
        } else {
            for (name, err) in report.failures() {
                tracing::error!("{name}: {err}");
            }
        }
        Ok(Outcome {
            plans: planned.plans,
            report,
        })
    }
}

fn in_config_order(
    desired: &[DesiredEntity],
    results: Vec<ExecutionResult>,
    excluded: Vec<ExecutionResult>,
) -> Vec<ExecutionResult> {
    let mut pool: Vec<ExecutionResult> = results.into_iter().chain(excluded).collect();
    let mut ordered = Vec::with_capacity(pool.len());
    for entity in desired {
        if let Some(pos) = pool.iter().position(|r| r.name == entity.db_name()) {
            ordered.push(pool.swap_remove(pos));
        }
    }
    ordered.extend(pool);
    ordered
}
