use anyhow::Result;
use dotenvy::dotenv;
use service_core::config::Config as CommonConfig;
use std::env;

/// Full configuration: the platform-wide server settings plus what this
/// service needs on top.
#[derive(Clone, Debug)]
pub struct Config {
    pub common: CommonConfig,
    pub database: DatabaseConfig,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let common = CommonConfig::load()?;

        let url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let max_connections = env::var("FINANCE_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let min_connections = env::var("FINANCE_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);

        let log_level =
            env::var("RUST_LOG").unwrap_or_else(|_| "info,finance_service=debug".to_string());

        Ok(Self {
            common,
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
            },
            service_name: "finance-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level,
        })
    }
}
