//! Discovered services and registration handles.

use crate::agent::{AgentCheck, AgentService};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;

static VERSION_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Health reported by the agent for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Passing,
    Warning,
    Critical,
    Unknown,
}

impl HealthStatus {
    /// Parse an agent status string, case-insensitively.
    ///
    /// Anything unrecognised (including `maintenance`) is `Unknown`.
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "passing" => Self::Passing,
            "warning" => Self::Warning,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passing => "passing",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Passing)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable instance from the catalog.
///
/// Derived on every catalog query and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstanceInfo {
    /// Logical service name
    pub service_name: String,
    /// Unique instance id
    pub instance_name: String,
    /// Node owning the instance's health check
    pub node_id: Option<String>,
    /// Health of the instance; `None` when the agent has no check for it
    pub health: Option<HealthStatus>,
    /// Advertised address
    pub address: String,
    /// Advertised port
    pub port: u16,
    /// `http://<address>:<port>/`
    pub base_uri: String,
    /// `<base>api/v<version>/`
    pub api_uri: String,
    /// `<base>status?instanceId=<id>`
    pub status_uri: String,
    /// `<base>swagger/docs/v<version>`
    pub metadata_uri: String,
    /// API version from the first tag, `0` when absent
    pub version: u32,
}

impl ServiceInstanceInfo {
    /// Merge an agent service entry with its health check, if any.
    pub fn from_agent(service: &AgentService, check: Option<&AgentCheck>) -> Self {
        let version = parse_version(service.tags.as_deref());
        let base_uri = base_uri(&service.address, service.port);

        Self {
            service_name: service.service.clone(),
            instance_name: service.id.clone(),
            node_id: check.map(|c| c.node.clone()).filter(|n| !n.is_empty()),
            health: check.map(|c| HealthStatus::parse(&c.status)),
            address: service.address.clone(),
            port: service.port,
            api_uri: format!("{}api/v{}/", base_uri, version),
            status_uri: format!("{}{}", base_uri, status_path(&service.id)),
            metadata_uri: format!("{}swagger/docs/v{}", base_uri, version),
            base_uri,
            version,
        }
    }

    /// Whether the agent reports this instance as passing.
    pub fn is_passing(&self) -> bool {
        self.health.is_some_and(|h| h.is_passing())
    }
}

/// All instances sharing one service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service_name: String,
    pub instances: Vec<ServiceInstanceInfo>,
}

impl ServiceInfo {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            instances: Vec::new(),
        }
    }

    /// Instances the agent reports as passing.
    pub fn passing(&self) -> impl Iterator<Item = &ServiceInstanceInfo> {
        self.instances.iter().filter(|i| i.is_passing())
    }
}

/// Proof that the agent acknowledged a registration.
///
/// Required to deregister; says nothing about current liveness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ServiceRegistration {
    instance_name: String,
}

impl ServiceRegistration {
    pub(crate) fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }
}

/// Extract the API version from the first tag.
///
/// The first run of digits in the first tag wins (`"v2"` is 2); missing tags,
/// tags without digits, and numbers too large for `u32` give 0.
pub fn parse_version(tags: Option<&[String]>) -> u32 {
    tags.and_then(|tags| tags.first())
        .and_then(|tag| VERSION_DIGITS.find(tag))
        .and_then(|digits| digits.as_str().parse().ok())
        .unwrap_or(0)
}

/// `host:port`, bracketing IPv6 literals.
pub(crate) fn authority(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

pub(crate) fn base_uri(host: &str, port: u16) -> String {
    format!("http://{}/", authority(host, port))
}

/// Relative status path polled by the agent's health check.
pub(crate) fn status_path(instance_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(instance_id.as_bytes()).collect();
    format!("status?instanceId={}", encoded)
}

/// Case-insensitive equality for names and ids.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
