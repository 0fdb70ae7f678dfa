//! Desired vs. actual diffing.
//!
//! Operations for a name are always emitted in this order:
//! `CreateRole`, `AlterRolePassword`, `CreateDatabase`, `ReassignOwnership`,
//! `GrantSchemaPrivileges`. Every operation is additive; nothing here drops
//! or recreates an existing role or database.

use crate::config::{Configuration, ReassertPolicy};
use crate::inspect::Inspection;
use crate::model::{
    ActualEntity, DesiredEntity, ExecutionResult, OperationKind, PlannedOperation, TargetPlan,
};

/// Turns one name's observed state into an ordered plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconciler {
    ensure_password: bool,
    policy: ReassertPolicy,
}

impl Reconciler {
    #[must_use]
    pub fn new(ensure_password: bool, policy: ReassertPolicy) -> Self {
        Self {
            ensure_password,
            policy,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &Configuration) -> Self {
        Self::new(cfg.ensure_password, cfg.reassert)
    }

    /// Operations that converge `actual` onto `desired`.
    #[must_use]
    pub fn plan(&self, desired: &DesiredEntity, actual: &ActualEntity) -> Vec<PlannedOperation> {
        let name = desired.role_name();
        let op = |kind| PlannedOperation::new(kind, name);
        let mut ops = Vec::new();

        if !actual.role_exists {
            ops.push(op(OperationKind::CreateRole));
            ops.push(op(OperationKind::AlterRolePassword));
        } else if self.ensure_password {
            ops.push(op(OperationKind::AlterRolePassword));
        }

        if !actual.db_exists {
            ops.push(op(OperationKind::CreateDatabase));
            ops.push(op(OperationKind::GrantSchemaPrivileges));
            return ops;
        }

        let owner_matches = actual.db_owner.as_deref() == Some(desired.db_name());
        let schema_matches = actual.schema_owner.as_deref() == Some(desired.role_name());
        let (reassign, grant) = match self.policy {
            ReassertPolicy::Always => (true, true),
            ReassertPolicy::OnDrift => (!owner_matches, !owner_matches || !schema_matches),
        };
        if reassign {
            ops.push(op(OperationKind::ReassignOwnership));
        }
        if grant {
            ops.push(op(OperationKind::GrantSchemaPrivileges));
        }
        ops
    }

    /// Plan every successfully inspected name. Names whose inspection failed
    /// are returned as failed results instead.
    #[must_use]
    pub fn plan_all(
        &self,
        desired: &[DesiredEntity],
        inspections: Vec<Inspection>,
    ) -> (Vec<TargetPlan>, Vec<ExecutionResult>) {
        let mut plans = Vec::with_capacity(desired.len());
        let mut excluded = Vec::new();
        for (entity, inspection) in desired.iter().zip(inspections) {
            match inspection.result {
                Ok(actual) => plans.push(TargetPlan {
                    name: entity.db_name().to_string(),
                    operations: self.plan(entity, &actual),
                }),
                Err(err) => excluded.push(ExecutionResult::failed(
                    inspection.name,
                    Vec::new(),
                    err.to_string(),
                )),
            }
        }
        (plans, excluded)
    }
}
