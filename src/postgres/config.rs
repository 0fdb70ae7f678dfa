use tokio_postgres::config::{SslMode as PgSslMode, TargetSessionAttrs};

use crate::config::{Configuration, SslMode};

const APPLICATION_NAME: &str = "pg-bootstrap";

/// Driver settings for a superuser connection to `dbname`. Only a writable
/// primary is accepted.
#[must_use]
pub fn pg_config(cfg: &Configuration, dbname: &str) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&cfg.host)
        .port(cfg.port)
        .user(&cfg.superuser)
        .password(cfg.superuser_password.expose())
        .dbname(dbname)
        .application_name(APPLICATION_NAME)
        .connect_timeout(cfg.connect_timeout())
        .target_session_attrs(TargetSessionAttrs::ReadWrite)
        .ssl_mode(driver_ssl_mode(cfg.sslmode));
    pg
}

// Modes that demand TLS are rejected during resolution, so only the
// plaintext-capable ones reach this point.
fn driver_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow | SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => PgSslMode::Require,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::Args;

    #[test]
    fn builds_superuser_config_for_target_database() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("POSTGRES_HOST", "db.internal"),
            ("POSTGRES_PORT", "6543"),
            ("POSTGRES_PASSWORD", "super"),
            ("POSTGRES_DBS", "n8n"),
            ("POSTGRES_NON_ROOT_PASSWORD", "shared"),
            ("BOOTSTRAP_CONNECT_TIMEOUT", "3"),
        ]);
        let cfg = Configuration::resolve(&Args::default(), &env).unwrap();
        let pg = pg_config(&cfg, "n8n");
        assert_eq!(pg.get_dbname(), Some("n8n"));
        assert_eq!(pg.get_user(), Some("postgres"));
        assert_eq!(pg.get_ports(), &[6543]);
        assert_eq!(pg.get_password(), Some(&b"super"[..]));
        assert_eq!(pg.get_connect_timeout(), Some(&std::time::Duration::from_secs(3)));
        assert_eq!(pg.get_ssl_mode(), PgSslMode::Prefer);
    }
}
