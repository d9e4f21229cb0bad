use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

/// Which physical store backs the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process key-value table. The default, and what the tests run on.
    #[default]
    Memory,
    /// Postgres via sqlx; requires `DATABASE_URL`.
    Postgres,
}

/// Configuration for the service, read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Storage backend selection (`STORAGE_BACKEND=memory|postgres`).
    #[serde(default)]
    pub storage_backend: StorageBackend,

    /// Database connection URL, required for the postgres backend.
    pub database_url: Option<String>,

    /// Fixed caller identity for local development, standing in for the
    /// authorizer claim (`USER_ID_OVERRIDE`).
    pub user_id_override: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Database URL, present only when the postgres backend is configured.
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set for the postgres backend")
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
