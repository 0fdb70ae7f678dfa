use std::fmt;

use serde::Serialize;

use crate::config::{DbName, Secret};

/// What one database name should look like on the server.
///
/// The role and the database share a single validated name, so
/// `role_name() == db_name()` holds by construction.
#[derive(Debug, Clone)]
pub struct DesiredEntity {
    name: DbName,
    owner_password: Secret,
}

impl DesiredEntity {
    #[must_use]
    pub fn new(name: DbName, owner_password: Secret) -> Self {
        Self {
            name,
            owner_password,
        }
    }

    #[must_use]
    pub fn role_name(&self) -> &str {
        self.name.as_str()
    }

    #[must_use]
    pub fn db_name(&self) -> &str {
        self.name.as_str()
    }

    #[must_use]
    pub fn owner_password(&self) -> &Secret {
        &self.owner_password
    }
}

/// Snapshot of what the server currently holds for one name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActualEntity {
    pub role_exists: bool,
    pub db_exists: bool,
    pub db_owner: Option<String>,
    /// Owner of the `public` schema inside the database. Only read when
    /// drift detection is enabled.
    pub schema_owner: Option<String>,
}

impl ActualEntity {
    /// Nothing exists yet.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Where an operation's statements have to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionScope {
    /// Inside a transaction on the maintenance database.
    Cluster,
    /// On the maintenance database outside any transaction (`CREATE DATABASE`).
    ClusterAutocommit,
    /// Inside a transaction on a session connected to the target database.
    Database,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateRole,
    AlterRolePassword,
    CreateDatabase,
    ReassignOwnership,
    GrantSchemaPrivileges,
}

impl OperationKind {
    #[must_use]
    pub fn scope(self) -> ExecutionScope {
        match self {
            OperationKind::CreateRole
            | OperationKind::AlterRolePassword
            | OperationKind::ReassignOwnership => ExecutionScope::Cluster,
            OperationKind::CreateDatabase => ExecutionScope::ClusterAutocommit,
            OperationKind::GrantSchemaPrivileges => ExecutionScope::Database,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::CreateRole => "CreateRole",
            OperationKind::AlterRolePassword => "AlterRolePassword",
            OperationKind::CreateDatabase => "CreateDatabase",
            OperationKind::ReassignOwnership => "ReassignOwnership",
            OperationKind::GrantSchemaPrivileges => "GrantSchemaPrivileges",
        }
    }
}

/// One idempotent step of a plan. Re-applying it leaves the server unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOperation {
    pub kind: OperationKind,
    pub target: String,
}

impl PlannedOperation {
    #[must_use]
    pub fn new(kind: OperationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }

    #[must_use]
    pub fn scope(&self) -> ExecutionScope {
        self.kind.scope()
    }
}

impl fmt::Display for PlannedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.as_str(), self.target)
    }
}

/// The plan for one database name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    pub name: String,
    pub operations: Vec<PlannedOperation>,
}

/// Outcome of applying one name's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub name: String,
    pub applied: Vec<PlannedOperation>,
    pub error: Option<String>,
}

impl ExecutionResult {
    #[must_use]
    pub fn succeeded(name: impl Into<String>, applied: Vec<PlannedOperation>) -> Self {
        Self {
            name: name.into(),
            applied,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        applied: Vec<PlannedOperation>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            applied,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of one run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub results: Vec<ExecutionResult>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(ExecutionResult::is_success)
    }

    /// Names that failed, with their errors.
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_deref().map(|e| (r.name.as_str(), e)))
            .collect()
    }

    /// Process exit status for this report.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            crate::error::EXIT_PARTIAL_FAILURE
        }
    }
}
