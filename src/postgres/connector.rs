use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};

use super::config::pg_config;
use super::params::Params;
use super::query::build_result_set_from_rows;
use crate::config::Configuration;
use crate::error::SqlError;
use crate::results::ResultSet;
use crate::transport::{Connector, Session};
use crate::types::RowValues;

/// Opens superuser sessions with `tokio-postgres`.
pub struct PgConnector {
    config: tokio_postgres::Config,
}

impl PgConnector {
    #[must_use]
    pub fn new(cfg: &Configuration) -> Self {
        Self {
            config: pg_config(cfg, &cfg.maintenance_db),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, dbname: &str) -> Result<Box<dyn Session>, SqlError> {
        let mut cfg = self.config.clone();
        cfg.dbname(dbname);
        tracing::debug!(
            "connect start hosts={:?} db={:?} user={:?}",
            cfg.get_hosts(),
            cfg.get_dbname(),
            cfg.get_user()
        );
        let (client, connection) = cfg.connect(NoTls).await?;
        let db = dbname.to_string();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("connection to {db} closed with error: {e}");
            }
        });
        Ok(Box::new(PgSession { client }))
    }
}

/// A single `tokio-postgres` client.
pub struct PgSession {
    client: Client,
}

#[async_trait]
impl Session for PgSession {
    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlError> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlError> {
        let converted = Params::convert(params);
        let rows = self.client.query(sql, converted.as_refs()).await?;
        build_result_set_from_rows(&rows)
    }
}
