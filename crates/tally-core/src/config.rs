//! Configuration loading and typed config structures for Tally.
//!
//! Configuration comes from an optional YAML file (`tally-config.yaml` by
//! default, or the path in `TALLY_CONFIG`) with environment variables
//! layered on top. Every field has a default, so an empty file or no file
//! at all yields a working single-process setup backed by a local JSON
//! file.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 3000
//! store:
//!   backend: file          # file | memory | dragonfly | postgres
//!   path: data/counter.json
//!   key: "counter:value"
//! reset:
//!   enabled: true
//!   time: "23:00"
//!   utc_offset: "+05:30"
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tally_db::{
    CounterStore, DragonflyStore, FileStore, MemoryStore, PostgresConfig, PostgresStore,
    StoreError,
};

use crate::schedule::{DailySchedule, ScheduleError};

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "TALLY_CONFIG";

/// Config file used when `TALLY_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "tally-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    Env {
        /// The environment variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The reset schedule is malformed.
    #[error("invalid reset schedule: {source}")]
    Schedule {
        /// The underlying schedule error.
        #[from]
        source: ScheduleError,
    },

    /// A backend-specific setting is missing.
    #[error("missing setting: {0}")]
    Missing(&'static str),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TallyConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Storage backend settings.
    #[serde(default)]
    pub store: StoreSettings,

    /// Daily reset settings.
    #[serde(default)]
    pub reset: ResetSettings,
}

impl TallyConfig {
    /// Load from `TALLY_CONFIG` (or `tally-config.yaml`), falling back to
    /// defaults if that file does not exist, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or an environment override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        let mut config = Self::read_file(Path::new(&path))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Read a YAML file without environment overrides. A missing file
    /// yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// or [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override fields from the process environment.
    ///
    /// - `HOST`, `PORT`
    /// - `STORE_BACKEND`, `STORE_PATH`, `COUNTER_KEY`
    /// - `DRAGONFLY_URL`, `DATABASE_URL`
    /// - `RESET_ENABLED`, `RESET_TIME`, `RESET_UTC_OFFSET`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable holds an unparseable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a variable holds an unparseable value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("PORT") {
            self.server.port = parse_env("PORT", val)?;
        }
        if let Some(val) = lookup("STORE_BACKEND") {
            self.store.backend = StoreBackend::parse(&val).ok_or(ConfigError::Env {
                name: "STORE_BACKEND",
                value: val,
            })?;
        }
        if let Some(val) = lookup("STORE_PATH") {
            self.store.path = val;
        }
        if let Some(val) = lookup("COUNTER_KEY") {
            self.store.key = val;
        }
        if let Some(val) = lookup("DRAGONFLY_URL") {
            self.store.dragonfly_url = Some(val);
        }
        if let Some(val) = lookup("DATABASE_URL") {
            self.store.database_url = Some(val);
        }
        if let Some(val) = lookup("RESET_ENABLED") {
            self.reset.enabled = parse_env("RESET_ENABLED", val)?;
        }
        if let Some(val) = lookup("RESET_TIME") {
            self.reset.time = val;
        }
        if let Some(val) = lookup("RESET_UTC_OFFSET") {
            self.reset.utc_offset = val;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_e| ConfigError::Env { name, value })
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which medium holds the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON document on local disk.
    #[default]
    File,
    /// Process memory (lost on restart).
    Memory,
    /// `Dragonfly`/Redis.
    Dragonfly,
    /// `PostgreSQL`.
    Postgres,
}

impl StoreBackend {
    /// Parse a backend name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            "dragonfly" | "redis" => Some(Self::Dragonfly),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreSettings {
    /// Selected backend.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Counter file for the `file` backend.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Stable key naming the counter in `dragonfly` and `postgres`.
    #[serde(default = "default_counter_key")]
    pub key: String,

    /// Redis URL for the `dragonfly` backend.
    #[serde(default)]
    pub dragonfly_url: Option<String>,

    /// Database URL for the `postgres` backend.
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            key: default_counter_key(),
            dragonfly_url: None,
            database_url: None,
        }
    }
}

impl StoreSettings {
    /// Open the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`OpenStoreError::Config`] if the backend's URL is not set,
    /// or [`OpenStoreError::Store`] if connecting fails.
    pub async fn open(&self) -> Result<Arc<CounterStore>, OpenStoreError> {
        let store = match self.backend {
            StoreBackend::Memory => CounterStore::from(MemoryStore::new()),
            StoreBackend::File => CounterStore::from(FileStore::open(&self.path).await?),
            StoreBackend::Dragonfly => {
                let url = self
                    .dragonfly_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DRAGONFLY_URL"))?;
                CounterStore::from(DragonflyStore::connect(url, &self.key).await?)
            }
            StoreBackend::Postgres => {
                let url = self
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let config = PostgresConfig::new(url, &self.key);
                CounterStore::from(PostgresStore::connect(&config).await?)
            }
        };
        tracing::info!(backend = store.name(), "Counter store ready");
        Ok(Arc::new(store))
    }
}

/// Errors from [`StoreSettings::open`].
#[derive(Debug, thiserror::Error)]
pub enum OpenStoreError {
    /// The settings are incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Daily reset settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResetSettings {
    /// Whether the reset scheduler runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local time of day, `HH:MM`.
    #[serde(default = "default_reset_time")]
    pub time: String,

    /// UTC offset of `time`, `+HH:MM` or `-HH:MM`.
    #[serde(default = "default_reset_offset")]
    pub utc_offset: String,
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            time: default_reset_time(),
            utc_offset: default_reset_offset(),
        }
    }
}

impl ResetSettings {
    /// Validate and build the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schedule`] if `time` or `utc_offset` is malformed.
    pub fn schedule(&self) -> Result<DailySchedule, ConfigError> {
        Ok(DailySchedule::parse(&self.time, &self.utc_offset)?)
    }

    /// The schedule to run, or `None` when the reset is disabled. The time
    /// fields are not validated while disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schedule`] if enabled and malformed.
    pub fn active_schedule(&self) -> Result<Option<DailySchedule>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }
        self.schedule().map(Some)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3000
}

fn default_store_path() -> String {
    "data/counter.json".to_owned()
}

fn default_counter_key() -> String {
    "counter:value".to_owned()
}

const fn default_true() -> bool {
    true
}

fn default_reset_time() -> String {
    "23:00".to_owned()
}

fn default_reset_offset() -> String {
    "+05:30".to_owned()
}
