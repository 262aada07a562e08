//! In-memory agent (for testing and local development)

use crate::agent::{
    AgentBackend, AgentCheck, AgentChecks, AgentService, AgentServices, RegistrationRequest,
    health_check_key,
};
use crate::error::{BackendError, BackendResult};
use crate::service::HealthStatus;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// Node name reported for checks created by the in-memory agent.
pub const MEMORY_NODE: &str = "memory";

/// Agent endpoints, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Services,
    Checks,
    Register,
    Deregister,
}

impl Endpoint {
    fn method(&self) -> &'static str {
        match self {
            Endpoint::Services | Endpoint::Checks => "GET",
            Endpoint::Register | Endpoint::Deregister => "PUT",
        }
    }

    fn url(&self, instance_id: Option<&str>) -> String {
        match self {
            Endpoint::Services => "memory://agent/services".to_string(),
            Endpoint::Checks => "memory://agent/checks".to_string(),
            Endpoint::Register => "memory://agent/service/register".to_string(),
            Endpoint::Deregister => format!(
                "memory://agent/service/deregister/{}",
                instance_id.unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone)]
enum Failure {
    Reject { status: u16, message: String },
    Transport(String),
}

#[derive(Debug, Default)]
struct AgentState {
    services: AgentServices,
    checks: AgentChecks,
    failures: HashMap<Endpoint, Failure>,
    calls: HashMap<Endpoint, usize>,
}

/// In-memory agent implementing [`AgentBackend`].
///
/// Registration inserts the service plus a `critical` check, like a real agent
/// before its first successful probe. Failures can be injected per endpoint.
#[derive(Clone, Default)]
pub struct InMemoryAgent {
    state: Arc<RwLock<AgentState>>,
}

impl InMemoryAgent {
    /// Create new in-memory agent
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a service entry
    pub fn insert_service(&self, service: AgentService) {
        self.state
            .write()
            .services
            .insert(service.id.clone(), service);
    }

    /// Add or replace the health check of an instance
    pub fn set_check(&self, instance_id: &str, node: &str, status: &str) {
        self.state
            .write()
            .checks
            .insert(health_check_key(instance_id), AgentCheck::new(node, status));
    }

    /// Change the status of an existing check; returns whether one existed
    pub fn set_check_status(&self, instance_id: &str, status: HealthStatus) -> bool {
        match self.state.write().checks.get_mut(&health_check_key(instance_id)) {
            Some(check) => {
                check.status = status.as_str().to_string();
                true
            }
            None => false,
        }
    }

    /// Look up a registered service by instance id
    pub fn service(&self, instance_id: &str) -> Option<AgentService> {
        self.state.read().services.get(instance_id).cloned()
    }

    /// Number of registered services
    pub fn count(&self) -> usize {
        self.state.read().services.len()
    }

    /// Make `endpoint` answer with an error status
    pub fn reject(&self, endpoint: Endpoint, status: u16, message: impl Into<String>) {
        self.state.write().failures.insert(
            endpoint,
            Failure::Reject {
                status,
                message: message.into(),
            },
        );
    }

    /// Make `endpoint` fail as if the agent were unreachable
    pub fn fail(&self, endpoint: Endpoint, message: impl Into<String>) {
        self.state
            .write()
            .failures
            .insert(endpoint, Failure::Transport(message.into()));
    }

    /// Remove an injected failure
    pub fn heal(&self, endpoint: Endpoint) {
        self.state.write().failures.remove(&endpoint);
    }

    /// Calls made to `endpoint`
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.state.read().calls.get(&endpoint).copied().unwrap_or(0)
    }

    /// Calls made to any endpoint
    pub fn total_calls(&self) -> usize {
        self.state.read().calls.values().sum()
    }

    /// Record a call and return the injected failure, if any.
    fn enter(&self, endpoint: Endpoint, instance_id: Option<&str>) -> BackendResult<()> {
        let mut state = self.state.write();
        *state.calls.entry(endpoint).or_insert(0) += 1;

        match state.failures.get(&endpoint) {
            None => Ok(()),
            Some(Failure::Reject { status, message }) => Err(BackendError::rejected(
                endpoint.method(),
                endpoint.url(instance_id),
                *status,
                message.clone(),
            )),
            Some(Failure::Transport(message)) => Err(BackendError::transport(
                endpoint.method(),
                endpoint.url(instance_id),
                io::Error::new(io::ErrorKind::ConnectionRefused, message.clone()),
            )),
        }
    }
}

#[async_trait]
impl AgentBackend for InMemoryAgent {
    async fn services(&self) -> BackendResult<AgentServices> {
        self.enter(Endpoint::Services, None)?;
        Ok(self.state.read().services.clone())
    }

    async fn checks(&self) -> BackendResult<AgentChecks> {
        self.enter(Endpoint::Checks, None)?;
        Ok(self.state.read().checks.clone())
    }

    async fn register(&self, request: &RegistrationRequest) -> BackendResult<()> {
        self.enter(Endpoint::Register, Some(&request.id))?;

        let service = AgentService {
            id: request.id.clone(),
            service: request.name.clone(),
            address: request.address.clone(),
            port: request.port,
            tags: Some(request.tags.clone()),
        };

        let mut state = self.state.write();
        state.services.insert(service.id.clone(), service);
        state.checks.insert(
            health_check_key(&request.id),
            AgentCheck::new(MEMORY_NODE, HealthStatus::Critical.as_str()),
        );
        Ok(())
    }

    async fn deregister(&self, instance_id: &str) -> BackendResult<()> {
        self.enter(Endpoint::Deregister, Some(instance_id))?;

        let mut state = self.state.write();
        if state.services.shift_remove(instance_id).is_none() {
            return Err(BackendError::rejected(
                "PUT",
                Endpoint::Deregister.url(Some(instance_id)),
                404,
                format!("Unknown service ID {:?}", instance_id),
            ));
        }
        state.checks.remove(&health_check_key(instance_id));
        Ok(())
    }
}
