//! Runtime configuration.
//!
//! Database settings come from the environment (a `.env` file is loaded by
//! the binary first): either `DATABASE_URL`, or the discrete `DB_HOST`,
//! `DB_PORT`, `DB_NAME`, `DB_USER` and `DB_PASSWORD` variables. An optional
//! YAML file sets the scratch directories and pool sizing:
//!
//! ```yaml
//! resources_dir: /var/lib/health-ingest/resources
//! database_url: postgres://ingest@localhost/saude
//! pool:
//!   max_connections: 2
//!   connection_timeout_secs: 10
//! ```
//!
//! Environment variables win over the file for the database, and CLI flags
//! win over both for the directories.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::db::DatabaseConfig;
use crate::error::ConfigError;
use crate::scratch::Scratch;

pub const DEFAULT_RESOURCES_DIR: &str = "resources";
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Where to find the database.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseSettings {
    Url(String),
    Params {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: String,
    },
}

impl DatabaseSettings {
    /// Resolve settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// Returns `Ok(None)` when neither `DATABASE_URL` nor `DB_HOST` is set.
    /// Once `DB_HOST` is set, `DB_NAME` and `DB_USER` are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            return Ok(Some(DatabaseSettings::Url(url)));
        }
        let Some(host) = lookup("DB_HOST").filter(|host| !host.is_empty()) else {
            return Ok(None);
        };

        let port = match lookup("DB_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    variable: "DB_PORT",
                    value,
                })?,
            None => DEFAULT_DB_PORT,
        };
        let require = |variable: &'static str| {
            lookup(variable).ok_or(ConfigError::MissingVariable { variable })
        };

        Ok(Some(DatabaseSettings::Params {
            host,
            port,
            name: require("DB_NAME")?,
            user: require("DB_USER")?,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
        }))
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn connection_url(&self) -> String {
        match self {
            DatabaseSettings::Url(url) => url.clone(),
            DatabaseSettings::Params {
                host,
                port,
                name,
                user,
                password,
            } => {
                let credentials = if password.is_empty() {
                    encode_userinfo(user)
                } else {
                    format!("{}:{}", encode_userinfo(user), encode_userinfo(password))
                };
                format!("postgres://{}@{}:{}/{}", credentials, host, port, name)
            }
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseSettings::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            DatabaseSettings::Params {
                host, port, name, user, ..
            } => f
                .debug_struct("Params")
                .field("host", host)
                .field("port", port)
                .field("name", name)
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

/// Percent-encode everything outside the URL unreserved set.
fn encode_userinfo(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Shape of the optional YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    resources_dir: Option<PathBuf>,
    sql_dir: Option<PathBuf>,
    database_url: Option<String>,
    pool: Option<DatabaseConfig>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// `None` until a database is configured; only store-backed commands
    /// need one.
    pub database: Option<DatabaseSettings>,
    pub resources_dir: PathBuf,
    pub sql_dir: PathBuf,
    pub pool: DatabaseConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let resources_dir = PathBuf::from(DEFAULT_RESOURCES_DIR);
        Self {
            database: None,
            sql_dir: resources_dir.join("sql"),
            resources_dir,
            pool: DatabaseConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Load from the process environment and an optional YAML file.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(config_path, |name| std::env::var(name).ok())
    }

    /// Load with a custom variable lookup.
    pub fn load_with<F>(config_path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match config_path {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };

        let mut config = IngestConfig::default();
        if let Some(resources_dir) = file.resources_dir {
            config.sql_dir = resources_dir.join("sql");
            config.resources_dir = resources_dir;
        }
        if let Some(sql_dir) = file.sql_dir {
            config.sql_dir = sql_dir;
        }
        if let Some(pool) = file.pool {
            config.pool = pool;
        }
        config.database = DatabaseSettings::from_lookup(lookup)?.or(file.database_url.map(DatabaseSettings::Url));

        tracing::debug!(
            resources = %config.resources_dir.display(),
            sql = %config.sql_dir.display(),
            database_configured = config.database.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Point the scratch layout at `resources_dir`, with `sql/` inside it.
    pub fn with_resources_dir(mut self, resources_dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = resources_dir.into();
        self.sql_dir = self.resources_dir.join("sql");
        self
    }

    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.database
            .as_ref()
            .map(DatabaseSettings::connection_url)
            .ok_or(ConfigError::MissingVariable { variable: "DB_HOST" })
    }

    pub fn scratch(&self) -> Scratch {
        Scratch::new(&self.resources_dir).with_sql_dir(&self.sql_dir)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
