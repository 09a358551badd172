use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct TallyConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

/// Which document store implementation backs the API.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Connection string. Empty means "not configured".
    #[serde(default)]
    pub url: String,
    /// Overrides the database named in `url` when set.
    #[serde(default)]
    pub name: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn url_is_set(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn name_is_set(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl TallyConfig {
    /// Load configuration from an optional TOML file, `TALLY__*` variables and
    /// the conventional `DATABASE_URL` / `DATABASE_NAME` / `PORT` variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::builder(path)?.build()?.try_deserialize()
    }

    /// In-memory configuration with defaults only, for tests and local runs.
    pub fn in_memory() -> Self {
        Self {
            service: ServiceConfig {
                log_level: "info".to_string(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: String::new(),
                name: None,
                max_connections: 5,
            },
            http: HttpConfig::default(),
        }
    }

    fn builder(
        path: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = HttpConfig::default();
        Config::builder()
            .set_default("service.log_level", "info")?
            .set_default("database.backend", "postgres")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("http.host", defaults.host)?
            .set_default("http.port", i64::from(defaults.port))?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("database.name", std::env::var("DATABASE_NAME").ok())?
            .set_override_option("http.port", std::env::var("PORT").ok())
    }
}
