//! Idempotent provisioning of per-application PostgreSQL roles and databases.
//!
//! For every configured name the crate ensures a `LOGIN` role of that name,
//! a database of that name owned by it, and full privileges on the
//! database's `public` schema. A run never drops, revokes or deletes
//! anything, so it is safe to repeat on every container start.
//!
//! ```no_run
//! use pg_bootstrap::prelude::*;
//!
//! # async fn demo() -> Result<(), BootstrapError> {
//! let cfg = Configuration::resolve(&Args::default(), &ProcessEnv)?;
//! let connector = PgConnector::new(&cfg);
//! let clock = TokioClock::new();
//! let outcome = Bootstrap::new(&cfg, &connector, &clock).run().await?;
//! println!("{}", render_summary(&outcome.report));
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod executor;
pub mod inspect;
pub mod model;
pub mod postgres;
pub mod prelude;
pub mod readiness;
pub mod reconcile;
pub mod render;
pub mod results;
pub mod statements;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bootstrap::{Bootstrap, Outcome, Planned};
pub use config::Configuration;
pub use error::{
    BootstrapError, ConfigError, ExecutionError, ReadinessError, SqlError, StateError,
};
pub use model::{ExecutionResult, PlannedOperation, RunReport, TargetPlan};
