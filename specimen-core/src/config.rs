use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "specimen.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct SpecimenConfig {
    pub service: ServiceConfig,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub predictor: PredictorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub operation_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "db".to_string(),
            port: 5432,
            name: "predictions_db".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            operation_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictorConfig {
    pub backend: String,
    /// Fixes the placeholder classifier's sequence; `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SpecimenConfig {
    /// Layered load: defaults, then the TOML file (optional), then
    /// `SPECIMEN__SECTION__KEY` variables, then the `DB_*` variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let http = HttpConfig::default();
        let db = DatabaseConfig::default();

        let builder = Config::builder()
            .set_default("service.log_level", "info")?
            .set_default("http.host", http.host)?
            .set_default("http.port", http.port)?
            .set_default("http.max_upload_bytes", http.max_upload_bytes as u64)?
            .set_default("database.host", db.host)?
            .set_default("database.port", db.port)?
            .set_default("database.name", db.name)?
            .set_default("database.user", db.user)?
            .set_default("database.password", db.password)?
            .set_default("database.max_connections", db.max_connections)?
            .set_default("database.acquire_timeout_secs", db.acquire_timeout_secs)?
            .set_default("database.operation_timeout_ms", db.operation_timeout_ms)?
            .set_default("store.backend", "postgres")?
            .set_default("predictor.backend", "random")?
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            .add_source(
                Environment::with_prefix("SPECIMEN")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("database.host", std::env::var("DB_HOST").ok())?
            .set_override_option("database.name", std::env::var("DB_NAME").ok())?
            .set_override_option("database.user", std::env::var("DB_USER").ok())?
            .set_override_option("database.password", std::env::var("DB_PASSWORD").ok())?;

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, uuid::Uuid::new_v4()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = SpecimenConfig::load(Some("/nonexistent/specimen-config")).unwrap();

        assert_eq!(config.http.port, 8000);
        assert_eq!(config.http.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.predictor.backend, "random");
        assert_eq!(config.predictor.seed, None);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.operation_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let path = write_toml(
            "specimen-config",
            r#"
            [http]
            port = 9100

            [store]
            backend = "memory"

            [predictor]
            backend = "random"
            seed = 42

            [database]
            max_connections = 12
            "#,
        );

        let config = SpecimenConfig::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.http.port, 9100);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.predictor.seed, Some(42));
        assert_eq!(config.database.max_connections, 12);
    }

    #[test]
    fn test_unknown_store_backend_is_rejected() {
        let path = write_toml(
            "specimen-config-bad",
            r#"
            [store]
            backend = "sqlite"
            "#,
        );

        let result = SpecimenConfig::load(path.to_str());
        std::fs::remove_file(&path).ok();

        assert!(result.is_err(), "sqlite is not a supported store backend");
    }
}
