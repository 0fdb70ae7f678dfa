use std::collections::HashMap;

use postgresql_embedded::PostgreSQL;

use crate::config::env;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl EmbeddedPostgres {
    /// Environment that points the resolver at this instance.
    #[must_use]
    pub fn env(&self, dbs: &str, non_root_password: &str) -> HashMap<String, String> {
        HashMap::from([
            (env::ENV_HOST.to_string(), self.host.clone()),
            (env::ENV_PORT.to_string(), self.port.to_string()),
            (env::ENV_SUPERUSER.to_string(), self.user.clone()),
            (env::ENV_PASSWORD.to_string(), self.password.clone()),
            (env::ENV_DBS.to_string(), dbs.to_string()),
            (
                env::ENV_NON_ROOT_PASSWORD.to_string(),
                non_root_password.to_string(),
            ),
            (env::ENV_SSLMODE.to_string(), "disable".to_string()),
            (env::ENV_TIMEOUT.to_string(), "30".to_string()),
        ])
    }
}

/// Set up and start an embedded `PostgreSQL` instance for end-to-end tests.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up or started.
pub async fn setup_postgres_embedded() -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let mut postgresql = PostgreSQL::default();

    // Setup PostgreSQL binaries (bundled, so no download conflicts)
    postgresql.setup().await?;
    postgresql.start().await?;

    let settings = postgresql.settings();
    let host = settings.host.clone();
    let port = settings.port;
    let user = settings.username.clone();
    let password = settings.password.clone();

    tracing::info!("embedded PostgreSQL started on {host}:{port}");

    Ok(EmbeddedPostgres {
        postgresql,
        host,
        port,
        user,
        password,
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub async fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    let _ = postgresql.stop().await;
}
