// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Settings read as integers from the environment.
const INTEGER_KEYS: &[&str] = &["port", "api_version", "request_timeout_secs"];

/// Settings read as booleans from the environment.
const BOOLEAN_KEYS: &[&str] = &["disable_registration", "disable_service_discovery"];

/// Environment variable loader
///
/// With a prefix of `CAIRN`, the variable `CAIRN_SERVICE_NAME` is exposed as
/// the key `service_name`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Keep the pairs carrying the prefix, keyed by the lower-cased rest
    pub fn load_from<I, K, V>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let key = key.as_ref();
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str())
                        && let Some(trimmed) = rest.strip_prefix('_')
                        && !trimmed.is_empty()
                    {
                        config.insert(trimmed.to_lowercase(), value.into());
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value.into());
                }
            }
        }

        config
    }

}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Convert a raw environment string into the JSON type the setting expects.
pub(crate) fn coerce(key: &str, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();

    if INTEGER_KEYS.contains(&key) {
        return trimmed.parse::<i64>().map(Value::from).map_err(|_| {
            ConfigError::ParseError(format!("{}: expected an integer, got '{}'", key, raw))
        });
    }

    if BOOLEAN_KEYS.contains(&key) {
        return parse_bool(trimmed).map(Value::Bool).ok_or_else(|| {
            ConfigError::ParseError(format!("{}: expected a boolean, got '{}'", key, raw))
        });
    }

    Ok(Value::String(raw.to_string()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
