//! Configuration management for the Koha sync server

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub storage: Option<StorageConfig>,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub backend: StoreBackend,
    /// Namespace holding this application's sync blobs
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown SYNC_STORE backend: {0}")]
    UnknownBackend(String),

    #[error("Missing environment variable {0}")]
    Missing(&'static str),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8888,
            },
            sync: SyncConfig {
                backend: StoreBackend::Memory,
                namespace: "koha-sync".to_string(),
            },
            storage: None,
            database: DatabaseConfig {
                url: "sqlite:./koha-sync.db".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("SYNC_STORE")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "sqlite" => StoreBackend::Sqlite,
            "s3" => StoreBackend::S3,
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let storage = if backend == StoreBackend::S3 {
            Some(StorageConfig {
                endpoint: required("S3_ENDPOINT")?,
                bucket: required("S3_BUCKET")?,
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            })
        } else {
            None
        };

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("SERVER_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8888),
            },
            sync: SyncConfig {
                backend,
                namespace: lookup("SYNC_NAMESPACE").unwrap_or_else(|| "koha-sync".to_string()),
            },
            storage,
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:./koha-sync.db".to_string()),
            },
        })
    }
}
