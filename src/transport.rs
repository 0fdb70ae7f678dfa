//! The seam between the reconciliation engine and the SQL driver.
//!
//! The engine only ever needs to open a session against a named database,
//! run statements, and read a few catalog rows back. `postgres` provides the
//! `tokio-postgres` implementation; tests use the in-process fake from
//! `test_utils`.

use async_trait::async_trait;

use crate::error::SqlError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Opens sessions against databases on one server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `dbname` with the configured superuser credentials.
    ///
    /// # Errors
    /// Returns `SqlError` when the connection cannot be established.
    async fn connect(&self, dbname: &str) -> Result<Box<dyn Session>, SqlError>;
}

/// A live connection to one database.
#[async_trait]
pub trait Session: Send {
    /// Execute one or more statements without parameters.
    ///
    /// # Errors
    /// Returns `SqlError` if the server rejects any statement.
    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlError>;

    /// Run a parameterized query and collect its rows.
    ///
    /// # Errors
    /// Returns `SqlError` on execution or row conversion failure.
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlError>;

    /// # Errors
    /// Returns `SqlError` if the transaction cannot be started.
    async fn begin(&mut self) -> Result<(), SqlError> {
        self.execute_batch("BEGIN").await
    }

    /// # Errors
    /// Returns `SqlError` if the commit fails.
    async fn commit(&mut self) -> Result<(), SqlError> {
        self.execute_batch("COMMIT").await
    }

    /// # Errors
    /// Returns `SqlError` if the rollback fails.
    async fn rollback(&mut self) -> Result<(), SqlError> {
        self.execute_batch("ROLLBACK").await
    }
}
