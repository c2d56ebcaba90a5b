//! Configuration manager for the account API.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding `allowed_users`.
pub const ALLOWED_USERS_ENV: &str = "ALLOWED_USERS";
/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Public URL of current instance.
    pub url: String,
    /// Listening port.
    pub port: u16,
    #[serde(skip_deserializing)]
    version: String,
    /// Basic-auth principals, formatted as `user:secret`.
    #[serde(skip_serializing)]
    pub allowed_users: Vec<String>,
    /// Usernames nobody can register.
    #[serde(skip_serializing)]
    pub blocklist: Vec<String>,
    /// Upper bound of every store operation, in milliseconds.
    pub store_timeout_ms: u64,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            url: format!("http://localhost:{DEFAULT_PORT}/"),
            port: DEFAULT_PORT,
            version: VERSION.to_owned(),
            allowed_users: Vec::new(),
            blocklist: crate::validation::DEFAULT_BLOCKLIST
                .iter()
                .map(|word| word.to_string())
                .collect(),
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            postgres: None,
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    /// Crate version running this configuration.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Bound applied to store operations.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the `CONFIG_PATH` variable or the
    /// default location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Path::new(DEFAULT_CONFIG_PATH).to_path_buf(),
        };

        let mut config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file)
            {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        // set app version.
        config.version = VERSION.to_owned();
        config.url = Self::normalize_url(&config.url)?;

        if let Ok(users) = std::env::var(ALLOWED_USERS_ENV) {
            config.allowed_users = parse_principals(&users);
        }

        if config.allowed_users.is_empty() {
            tracing::warn!(
                "no `allowed_users` configured, every request will be rejected"
            );
        }

        Ok(Arc::new(config))
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self::default()
    }
}

/// Split a comma-separated list of `user:secret` principals.
pub fn parse_principals(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|principal| !principal.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_principals() {
        assert_eq!(
            parse_principals("wm:secret, other:pass,,"),
            vec!["wm:secret".to_string(), "other:pass".to_string()]
        );
        assert!(parse_principals("").is_empty());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            Configuration::normalize_url("login.example.org").unwrap(),
            "https://login.example.org/"
        );
        assert_eq!(
            Configuration::normalize_url("http://localhost:3000").unwrap(),
            "http://localhost:3000/"
        );
    }

    #[test]
    fn test_yaml_defaults() {
        let config: Configuration =
            serde_yaml::from_str("name: test\nallowed_users: [\"a:b\"]\n")
                .unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.allowed_users, vec!["a:b".to_string()]);
        assert!(config.blocklist.contains(&"damn".to_string()));
        assert_eq!(config.store_timeout(), Duration::from_millis(5_000));
        assert!(config.postgres.is_none());
    }
}
