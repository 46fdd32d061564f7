use bigdecimal::BigDecimal;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::VatRate;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub slow_statement_secs: u64,
}

/// 计价配置: 全局增值税税率
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub vat_rate: BigDecimal,
}

impl PricingConfig {
    pub fn vat(&self) -> Result<VatRate, AppError> {
        VatRate::new(self.vat_rate.clone())
    }
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/vat_ledger";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: 20,
                slow_statement_secs: 5,
            },
            pricing: PricingConfig {
                vat_rate: VatRate::default().rate().clone(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> vat-ledger.toml (可选) -> 环境变量 APP__<SECTION>__<KEY>
    pub fn load() -> Result<Self, AppError> {
        let config = Self::with_defaults()?
            .add_source(File::with_name("vat-ledger").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;
        Self::from_config(config)
    }

    /// 仅含默认值的构建器
    pub fn with_defaults() -> Result<ConfigBuilder<DefaultState>, AppError> {
        let defaults = Self::default();

        Ok(Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default(
                "database.slow_statement_secs",
                defaults.database.slow_statement_secs as i64,
            )?
            .set_default("pricing.vat_rate", defaults.pricing.vat_rate.to_string())?)
    }

    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let loaded: AppConfig = config.try_deserialize()?;
        // 提前校验税率
        loaded.pricing.vat()?;
        Ok(loaded)
    }
}
