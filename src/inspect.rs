//! Read-only snapshot of roles, databases and ownership.

use crate::error::{SqlError, StateError};
use crate::model::{ActualEntity, DesiredEntity};
use crate::transport::{Connector, Session};
use crate::types::RowValues;

pub const ROLE_EXISTS_SQL: &str = "SELECT 1 AS present FROM pg_roles WHERE rolname = $1";
pub const DATABASE_OWNER_SQL: &str =
    "SELECT pg_get_userbyid(datdba)::text AS owner FROM pg_database WHERE datname = $1";
pub const SCHEMA_OWNER_SQL: &str =
    "SELECT pg_get_userbyid(nspowner)::text AS owner FROM pg_namespace WHERE nspname = 'public'";

/// Inspection outcome for one configured name.
#[derive(Debug)]
pub struct Inspection {
    pub name: String,
    pub result: Result<ActualEntity, StateError>,
}

/// Reads the current state of each desired entity without modifying anything.
pub struct StateInspector<'a> {
    connector: &'a dyn Connector,
    include_schema_owner: bool,
}

impl<'a> StateInspector<'a> {
    /// `include_schema_owner` opens a session inside each existing database to
    /// read the owner of schema `public`.
    #[must_use]
    pub fn new(connector: &'a dyn Connector, include_schema_owner: bool) -> Self {
        Self {
            connector,
            include_schema_owner,
        }
    }

    /// Inspect every name in order. A failure for one name is recorded
    /// against that name and does not stop the others.
    pub async fn inspect_all(
        &self,
        session: &mut dyn Session,
        desired: &[DesiredEntity],
    ) -> Vec<Inspection> {
        let mut out = Vec::with_capacity(desired.len());
        for entity in desired {
            let result = self
                .inspect(session, entity)
                .await
                .map_err(|source| StateError {
                    name: entity.db_name().to_string(),
                    source,
                });
            match &result {
                Ok(actual) => tracing::debug!("state of {}: {actual:?}", entity.db_name()),
                Err(err) => tracing::error!("{err}"),
            }
            out.push(Inspection {
                name: entity.db_name().to_string(),
                result,
            });
        }
        out
    }

    /// Inspect a single name.
    ///
    /// # Errors
    /// Returns the first failing catalog query.
    pub async fn inspect(
        &self,
        session: &mut dyn Session,
        desired: &DesiredEntity,
    ) -> Result<ActualEntity, SqlError> {
        let role = RowValues::from(desired.role_name());
        let role_exists = session
            .query(ROLE_EXISTS_SQL, &[role])
            .await?
            .first()
            .and_then(|row| row.get("present"))
            .and_then(RowValues::as_int)
            == Some(1);

        let db = RowValues::from(desired.db_name());
        let owners = session.query(DATABASE_OWNER_SQL, &[db]).await?;
        let db_exists = !owners.is_empty();
        let db_owner = owner_column(&owners)?;

        let schema_owner = if db_exists && self.include_schema_owner {
            let mut db_session = self.connector.connect(desired.db_name()).await?;
            let rows = db_session.query(SCHEMA_OWNER_SQL, &[]).await?;
            owner_column(&rows)?
        } else {
            None
        };

        Ok(ActualEntity {
            role_exists,
            db_exists,
            db_owner,
            schema_owner,
        })
    }
}

fn owner_column(rows: &crate::results::ResultSet) -> Result<Option<String>, SqlError> {
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    match row.get("owner") {
        Some(RowValues::Text(owner)) => Ok(Some(owner.clone())),
        Some(value) if value.is_null() => Ok(None),
        other => Err(SqlError::ResultError(format!(
            "expected text owner column, got {other:?}"
        ))),
    }
}
