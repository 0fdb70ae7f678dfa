//! Convenient imports for common functionality.
//!
//! This module re-exports the types needed to resolve a configuration,
//! run a bootstrap and render its outcome.

pub use crate::bootstrap::{Bootstrap, Outcome, Planned};
pub use crate::config::{
    Args, Configuration, EnvSource, ProcessEnv, ReassertPolicy, Secret, SslMode,
};
pub use crate::error::{
    BootstrapError, ConfigError, ExecutionError, ReadinessError, SqlError, StateError,
};
pub use crate::executor::Executor;
pub use crate::inspect::StateInspector;
pub use crate::model::{
    ActualEntity, DesiredEntity, ExecutionResult, OperationKind, PlannedOperation, RunReport,
    TargetPlan,
};
pub use crate::postgres::PgConnector;
pub use crate::readiness::{Clock, ReadinessWaiter, TokioClock};
pub use crate::reconcile::Reconciler;
pub use crate::render::{render_plan, render_summary};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::transport::{Connector, Session};
pub use crate::types::RowValues;
