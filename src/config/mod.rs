use anyhow::{Result, bail};
use dotenvy::dotenv;
use serde::Deserialize;

/// Which store the application runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL, required for the postgres backend
    pub database_url: Option<String>,
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,
    /// Address the HTTP API listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Postgres
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_run_migrations() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    /// 3. Reject combinations that cannot start
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND is postgres");
        }
        if self.max_connections == 0 {
            bail!("MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::from_iter::<_, Config>(vars).expect("config should deserialize")
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = from_pairs(&[("DATABASE_URL", "postgres://localhost/trainer")]);

        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert_eq!(config.max_connections, 5);
        assert!(config.run_migrations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn postgres_without_url_is_rejected() {
        let config = from_pairs(&[]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn memory_backend_needs_no_url() {
        let config = from_pairs(&[("STORAGE_BACKEND", "memory"), ("MAX_CONNECTIONS", "2")]);

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.max_connections, 2);
        assert!(config.validate().is_ok());
    }
}
