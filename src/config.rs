use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub couchdb: CouchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchConfig {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Create the database and push the bundled design documents on startup.
    pub provision: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for CouchConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5984,
            db: "cv".to_string(),
            username: None,
            password: None,
            provision: true,
        }
    }
}

impl CouchConfig {
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn database_url(&self) -> String {
        format!("{}/{}", self.server_url(), self.db)
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config", "CV")
    }

    /// Defaults, then the optional file `file` (any supported extension),
    /// then `{env_prefix}_*` environment variables.
    pub fn load_from(file: &str, env_prefix: &str) -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name(file).required(false));

        // Environment variables such as CV_COUCHDB_HOST
        config = config.add_source(
            config::Environment::with_prefix(env_prefix)
                .separator("_")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
