use ::config::{Config as Layers, Environment, File, FileFormat};
use anyhow::{Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read as a configuration layer,
/// e.g. `SQLPEEK_HOST`.
pub const ENV_PREFIX: &str = "SQLPEEK";

/// Everything needed to open a connection. Built once at startup and passed
/// down explicitly.
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            user: "root".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 3306,
            database: String::new(),
        }
    }
}

// Keep the password out of `{:?}` so it never lands in a log line.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("user", &self.user)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut ConnectionConfig) {
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
    }
}

impl ConnectionConfig {
    /// Resolves the configuration from defaults, the config file, `SQLPEEK_*`
    /// environment variables and finally `overrides`.
    ///
    /// An explicitly given `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let (file, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::get_config_file_path(), false),
        };
        Self::build(
            &file,
            required,
            Environment::with_prefix(ENV_PREFIX),
            overrides,
        )
    }

    fn build(
        file: &Path,
        required: bool,
        env: Environment,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let defaults = ConnectionConfig::default();
        let layers = Layers::builder()
            .set_default("user", defaults.user)?
            .set_default("password", defaults.password)?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database", defaults.database)?
            .add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file.display()))?;

        let mut config: ConnectionConfig = layers
            .try_deserialize()
            .context("Invalid connection configuration")?;
        overrides.apply(&mut config);
        Ok(config)
    }

    /// The connection target in `user:password@tcp(host:port)/database` form.
    pub fn dsn(&self) -> String {
        format!(
            "{}:{}@tcp({}:{})/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    /// Like [`dsn`](Self::dsn) but with the password masked, for logging.
    pub fn redacted_dsn(&self) -> String {
        let password = if self.password.is_empty() { "" } else { "****" };
        format!(
            "{}:{}@tcp({}:{})/{}",
            self.user, password, self.host, self.port, self.database
        )
    }

    pub fn get_config_file_path() -> PathBuf {
        let mut path = Self::get_home_dir();
        path.push(".sqlpeek");
        path.push("config.toml");
        path
    }

    fn get_home_dir() -> PathBuf {
        home_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}
