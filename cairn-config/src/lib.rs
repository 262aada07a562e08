//! Configuration for Cairn service instances.
//!
//! Settings are layered: files first, then `.env` entries, then the process
//! environment, then explicit overrides. Later layers win.
//!
//! ```rust,no_run
//! use cairn_config::ConfigLoader;
//!
//! # fn main() -> cairn_config::Result<()> {
//! let config = ConfigLoader::new()
//!     .with_file("cairn.toml")?
//!     .with_dotenv(None)?
//!     .with_env("CAIRN")?
//!     .load()?;
//!
//! println!("{} as {}", config.service_name, config.service_instance_name);
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod service;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{FileFormat, FileLoader};
pub use service::{
    DEFAULT_AGENT_URL, DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT, ServiceConfig,
    ServiceConfigBuilder,
};
pub use validation::{ConfigValidator, Validate};

use serde_json::{Map, Value};
use service::RawServiceConfig;
use std::path::Path;

/// Environment prefix used by the `cairn` binary.
pub const ENV_PREFIX: &str = "CAIRN";

/// Layered configuration loader
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    values: Map<String, Value>,
}

impl ConfigLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a TOML or JSON file, format chosen by extension
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        self.with_file_format(path, format)
    }

    /// Merge a file with an explicit format
    pub fn with_file_format(mut self, path: impl AsRef<Path>, format: FileFormat) -> Result<Self> {
        let table = FileLoader::new(format).load_file(path.as_ref())?;
        self.values.extend(table);
        Ok(self)
    }

    /// Merge `CAIRN_*` entries from a `.env` file.
    ///
    /// With no path, a `.env` in the working directory (or a parent) is used if
    /// present and silently skipped otherwise. The process environment is not
    /// modified.
    pub fn with_dotenv(self, path: Option<&Path>) -> Result<Self> {
        let entries = match path {
            Some(path) => dotenvy::from_path_iter(path)
                .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?,
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => iter,
                Err(e) if e.not_found() => return Ok(self),
                Err(e) => return Err(ConfigError::LoadError(e.to_string())),
            },
        };

        let pairs = entries
            .collect::<std::result::Result<Vec<(String, String)>, _>>()
            .map_err(|e| ConfigError::ParseError(format!(".env: {}", e)))?;

        self.with_env_vars(ENV_PREFIX, pairs)
    }

    /// Merge variables from the process environment carrying `prefix`
    pub fn with_env(self, prefix: &str) -> Result<Self> {
        self.with_env_vars(prefix, std::env::vars())
    }

    /// Merge variables from the given pairs carrying `prefix`
    pub fn with_env_vars<I, K, V>(mut self, prefix: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let loaded = EnvLoader::new(Some(prefix.to_string())).load_from(vars);
        for (key, raw) in loaded {
            let value = env::coerce(&key, &raw)?;
            self.values.insert(key, value);
        }
        Ok(self)
    }

    /// Set a single value, overriding every earlier layer
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Set a value only when one is given
    pub fn set_opt<T: Into<Value>>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Merged raw value for a key, if any layer set it
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Apply defaults, normalise sentinels and validate
    pub fn load(self) -> Result<ServiceConfig> {
        let raw: RawServiceConfig = serde_json::from_value(Value::Object(self.values))
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        ServiceConfig::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_layers_override() {
        let config = ConfigLoader::new()
            .set("service_name", "orders")
            .set("port", 5001)
            .with_env_vars(ENV_PREFIX, [("CAIRN_PORT", "6001")])
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.port, Some(6001));
    }

    #[test]
    fn test_unrelated_prefixed_keys_are_ignored() {
        let config = ConfigLoader::new()
            .with_env_vars(
                ENV_PREFIX,
                [("CAIRN_SERVICE_NAME", "orders"), ("CAIRN_LOG_LEVEL", "debug")],
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.service_name, "orders");
    }

    #[test]
    fn test_bad_env_integer_names_key() {
        let err = ConfigLoader::new()
            .with_env_vars(ENV_PREFIX, [("CAIRN_API_VERSION", "v2")])
            .unwrap_err();
        assert!(err.to_string().contains("api_version"));
    }

    #[test]
    fn test_wrong_type_in_file_layer() {
        let err = ConfigLoader::new()
            .set("service_name", "orders")
            .set("port", "high")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_without_matching_variables_adds_nothing() {
        let loader = ConfigLoader::new()
            .set("port", 5001)
            .with_env("CAIRN_UNUSED_PREFIX_4711")
            .unwrap();

        assert_eq!(loader.get("port"), Some(&Value::from(5001)));
        assert!(loader.get("service_name").is_none());
    }

    #[test]
    fn test_set_opt() {
        let loader = ConfigLoader::new()
            .set_opt("hostname", Some("10.0.0.5"))
            .set_opt::<String>("port", None);

        assert_eq!(loader.get("hostname"), Some(&Value::from("10.0.0.5")));
        assert!(loader.get("port").is_none());
    }
}
