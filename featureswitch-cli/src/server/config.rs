use std::env;

use featureswitch_lib::retry::DEFAULT_ATTEMPTS;
use serde::Deserialize;
use tracing::warn;

/// Top-level featureswitch.toml configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sled,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sled => "sled",
            StorageBackend::Memory => "memory",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "sled" => Some(StorageBackend::Sled),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

// ── Default value functions ──────────────────────────

fn default_port() -> u16 {
    8080
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sled
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_retry_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            hostname: default_hostname(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                warn!(path, error = %e, "failed to parse config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // FSW_PORT
        if let Some(val) = lookup("FSW_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %val, "ignoring invalid FSW_PORT"),
            }
        }

        // FSW_HOSTNAME
        if let Some(val) = lookup("FSW_HOSTNAME") {
            if !val.trim().is_empty() {
                self.server.hostname = val.trim().to_string();
            }
        }

        // FSW_STORAGE
        if let Some(val) = lookup("FSW_STORAGE") {
            match StorageBackend::parse(&val) {
                Some(backend) => self.storage.backend = backend,
                None => warn!(value = %val, "unknown FSW_STORAGE value"),
            }
        }

        // FSW_DATA_DIR
        if let Some(val) = lookup("FSW_DATA_DIR") {
            if !val.trim().is_empty() {
                self.storage.data_dir = val.trim().to_string();
            }
        }

        // FSW_RETRY_ATTEMPTS
        if let Some(val) = lookup("FSW_RETRY_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(attempts) => self.storage.retry_attempts = attempts,
                Err(_) => warn!(value = %val, "ignoring invalid FSW_RETRY_ATTEMPTS"),
            }
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.hostname, self.server.port)
    }
}
