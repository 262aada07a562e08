// Hosted service configuration

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Default base URL of the discovery agent API.
pub const DEFAULT_AGENT_URL: &str = "http://localhost:8500/v1";

/// Default API version advertised in the registration tags.
pub const DEFAULT_API_VERSION: u32 = 1;

/// Default transport timeout for agent requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration of the running service instance.
///
/// Built once at startup and shared read-only. The discovery layer never
/// writes auto-detected host or port values back into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Logical service name shared by all instances
    pub service_name: String,
    /// Unique name of this running instance
    pub service_instance_name: String,
    /// Advertised host; `None` means detect on first registration
    pub hostname: Option<String>,
    /// Advertised port; `None` means pick one on first registration
    pub port: Option<u16>,
    /// API version advertised as the `v<N>` tag
    pub api_version: u32,
    /// Skip self-registration entirely
    pub disable_registration: bool,
    /// Skip registration and catalog lookups
    pub disable_service_discovery: bool,
    /// Base URL of the agent API, e.g. `http://localhost:8500/v1`
    pub agent_url: String,
    /// Transport timeout applied to each agent request
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// Start building a configuration for the named service
    pub fn builder(service_name: impl Into<String>) -> ServiceConfigBuilder {
        ServiceConfigBuilder::new(service_name)
    }

    /// Whether this instance should register itself.
    pub fn registration_enabled(&self) -> bool {
        !self.disable_registration && !self.disable_service_discovery
    }

    /// Whether catalog lookups are allowed.
    pub fn discovery_enabled(&self) -> bool {
        !self.disable_service_discovery
    }

    pub(crate) fn from_raw(raw: RawServiceConfig) -> Result<Self> {
        let service_name = raw
            .service_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingField("service_name".to_string()))?;

        let service_instance_name = raw
            .service_instance_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| generate_instance_name(&service_name));

        let hostname = raw
            .hostname
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Zero or negative ports are the "pick one for me" sentinel.
        let port = match raw.port {
            Some(p) if p > 0 => {
                ConfigValidator::in_range(p, 1, i64::from(u16::MAX), "port")?;
                Some(p as u16)
            }
            _ => None,
        };

        let api_version = match raw.api_version {
            Some(v) => {
                ConfigValidator::in_range(v, 0, i64::from(u32::MAX), "api_version")?;
                v as u32
            }
            None => DEFAULT_API_VERSION,
        };

        let request_timeout = match raw.request_timeout_secs {
            Some(secs) => {
                ConfigValidator::in_range(secs, 1, 3600, "request_timeout_secs")?;
                Duration::from_secs(secs as u64)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let config = Self {
            service_name,
            service_instance_name,
            hostname,
            port,
            api_version,
            disable_registration: raw.disable_registration.unwrap_or(false),
            disable_service_discovery: raw.disable_service_discovery.unwrap_or(false),
            agent_url: raw
                .agent_url
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string()),
            request_timeout,
        };

        config.validate()?;
        Ok(config)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.service_name, "service_name")?;
        ConfigValidator::not_empty(&self.service_instance_name, "service_instance_name")?;
        ConfigValidator::is_http_url(&self.agent_url, "agent_url")?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn generate_instance_name(service_name: &str) -> String {
    format!("{}-{}", service_name, uuid::Uuid::new_v4().simple())
}

/// Untyped view of the layered sources, before defaults and normalisation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawServiceConfig {
    pub service_name: Option<String>,
    pub service_instance_name: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<i64>,
    pub api_version: Option<i64>,
    pub disable_registration: Option<bool>,
    pub disable_service_discovery: Option<bool>,
    pub agent_url: Option<String>,
    pub request_timeout_secs: Option<i64>,
}

/// Programmatic builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    raw: RawServiceConfig,
}

impl ServiceConfigBuilder {
    fn new(service_name: impl Into<String>) -> Self {
        Self {
            raw: RawServiceConfig {
                service_name: Some(service_name.into()),
                ..RawServiceConfig::default()
            },
        }
    }

    /// Set the instance name (generated when unset)
    pub fn instance_name(mut self, name: impl Into<String>) -> Self {
        self.raw.service_instance_name = Some(name.into());
        self
    }

    /// Set the advertised host
    pub fn hostname(mut self, host: impl Into<String>) -> Self {
        self.raw.hostname = Some(host.into());
        self
    }

    /// Set the advertised port
    pub fn port(mut self, port: u16) -> Self {
        self.raw.port = Some(i64::from(port));
        self
    }

    /// Set the advertised API version
    pub fn api_version(mut self, version: u32) -> Self {
        self.raw.api_version = Some(i64::from(version));
        self
    }

    /// Disable self-registration
    pub fn disable_registration(mut self, disabled: bool) -> Self {
        self.raw.disable_registration = Some(disabled);
        self
    }

    /// Disable registration and catalog lookups
    pub fn disable_service_discovery(mut self, disabled: bool) -> Self {
        self.raw.disable_service_discovery = Some(disabled);
        self
    }

    /// Set the agent API base URL
    pub fn agent_url(mut self, url: impl Into<String>) -> Self {
        self.raw.agent_url = Some(url.into());
        self
    }

    /// Set the per-request transport timeout, rounded down to whole seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.raw.request_timeout_secs = Some(timeout.as_secs() as i64);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServiceConfig> {
        ServiceConfig::from_raw(self.raw)
    }
}
