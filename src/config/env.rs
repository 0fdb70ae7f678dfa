use std::collections::HashMap;

pub const ENV_HOST: &str = "POSTGRES_HOST";
pub const ENV_PORT: &str = "POSTGRES_PORT";
pub const ENV_SUPERUSER: &str = "POSTGRES_SUPERUSER";
pub const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_DBS: &str = "POSTGRES_DBS";
pub const ENV_NON_ROOT_PASSWORD: &str = "POSTGRES_NON_ROOT_PASSWORD";
pub const ENV_SSLMODE: &str = "POSTGRES_SSLMODE";
pub const ENV_MAINTENANCE_DB: &str = "POSTGRES_MAINTENANCE_DB";
pub const ENV_TIMEOUT: &str = "BOOTSTRAP_TIMEOUT";
pub const ENV_CONNECT_TIMEOUT: &str = "BOOTSTRAP_CONNECT_TIMEOUT";
pub const ENV_DRY_RUN: &str = "BOOTSTRAP_DRY_RUN";
pub const ENV_ENSURE_PASSWORD: &str = "BOOTSTRAP_ENSURE_PASSWORD";
pub const ENV_SKIP_CONVERGED: &str = "BOOTSTRAP_SKIP_CONVERGED";

/// Source of environment variables consulted by the resolver.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment. Non-UTF-8 values are treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| (*v).to_string())
    }
}
