//! Agent API contract: wire types and the backend trait.

use crate::error::BackendResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Services known to the agent, keyed by instance id, in response order.
pub type AgentServices = IndexMap<String, AgentService>;

/// Health checks known to the agent, keyed by check id.
pub type AgentChecks = HashMap<String, AgentCheck>;

/// One entry of `GET /agent/services`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Service", alias = "Name")]
    pub service: String,

    #[serde(rename = "Address", default)]
    pub address: String,

    #[serde(rename = "Port", default)]
    pub port: u16,

    /// Absent and `null` both decode as `None`.
    #[serde(rename = "Tags", default)]
    pub tags: Option<Vec<String>>,
}

impl AgentService {
    /// Create a service entry
    pub fn new(
        id: impl Into<String>,
        service: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            address: address.into(),
            port,
            tags: None,
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }
}

/// One entry of `GET /agent/checks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCheck {
    #[serde(rename = "Node", default)]
    pub node: String,

    #[serde(rename = "Status", default)]
    pub status: String,
}

impl AgentCheck {
    pub fn new(node: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            status: status.into(),
        }
    }
}

/// Key under which the agent reports the check of a registered instance.
pub fn health_check_key(instance_id: &str) -> String {
    format!("service:{}", instance_id)
}

/// Body of `PUT /agent/service/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationRequest {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub enable_tag_override: bool,
    pub tags: Vec<String>,
    pub check: HealthCheckDefinition,
}

/// HTTP health check the agent runs against the registered instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheckDefinition {
    /// URL the agent polls
    #[serde(rename = "HTTP")]
    pub http: String,
    /// Poll interval, in agent duration syntax (`10s`)
    pub interval: String,
    /// How long a critical instance survives before the agent removes it
    pub deregister_critical_service_after: String,
}

/// Client for the discovery agent's HTTP API.
///
/// One method per endpoint; every call reports success, rejection or
/// transport failure through [`BackendResult`].
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// `GET /agent/services`
    async fn services(&self) -> BackendResult<AgentServices>;

    /// `GET /agent/checks`
    async fn checks(&self) -> BackendResult<AgentChecks>;

    /// `PUT /agent/service/register`
    async fn register(&self, request: &RegistrationRequest) -> BackendResult<()>;

    /// `PUT /agent/service/deregister/<instance_id>`
    async fn deregister(&self, instance_id: &str) -> BackendResult<()>;
}
