//! One entry point bundling registration and catalog lookups.

use crate::agent::AgentBackend;
use crate::catalog::ServiceCatalog;
use crate::consul::ConsulAgent;
use crate::error::DiscoveryError;
use crate::registration::{PendingRegistration, ServiceRegistrar};
use crate::resolver::{NetworkProbe, ResolvedEndpoint};
use crate::selector::{InstanceSelector, LoadBalancingStrategy};
use crate::service::{ServiceInfo, ServiceInstanceInfo, ServiceRegistration};
use cairn_config::ServiceConfig;
use std::sync::Arc;

/// Registration and discovery for one service over one agent.
///
/// # Examples
///
/// ```rust,ignore
/// use cairn_discovery::ServiceDiscovery;
/// use cairn_config::ServiceConfig;
///
/// let config = ServiceConfig::builder("orders").port(9000).build()?;
/// let discovery = ServiceDiscovery::connect(config)?;
///
/// let registration = discovery.register().await;
/// let billing = discovery.find_by_name("billing").await;
/// discovery.deregister(registration.as_ref()).await;
/// ```
pub struct ServiceDiscovery<B: AgentBackend + 'static = ConsulAgent> {
    registrar: ServiceRegistrar<B>,
    catalog: ServiceCatalog<B>,
}

impl ServiceDiscovery<ConsulAgent> {
    /// Connect to the agent named by `config.agent_url`.
    pub fn connect(config: ServiceConfig) -> Result<Self, DiscoveryError> {
        let backend = ConsulAgent::from_config(&config)?;
        Ok(Self::new(config, backend))
    }
}

impl<B: AgentBackend + 'static> ServiceDiscovery<B> {
    pub fn new(config: ServiceConfig, backend: B) -> Self {
        let config = Arc::new(config);
        let backend = Arc::new(backend);

        Self {
            registrar: ServiceRegistrar::new(Arc::clone(&config), Arc::clone(&backend)),
            catalog: ServiceCatalog::new(config, backend),
        }
    }

    /// Replace the network probe used for host resolution.
    pub fn with_network_probe(mut self, network: Arc<dyn NetworkProbe>) -> Self {
        self.registrar = self.registrar.with_network_probe(network);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        self.registrar.config()
    }

    pub fn registrar(&self) -> &ServiceRegistrar<B> {
        &self.registrar
    }

    pub fn catalog(&self) -> &ServiceCatalog<B> {
        &self.catalog
    }

    /// Endpoint advertised to the agent, once resolved.
    pub fn endpoint(&self) -> Option<&ResolvedEndpoint> {
        self.registrar.endpoint()
    }

    /// Selector over this catalog.
    pub fn selector(&self, strategy: LoadBalancingStrategy) -> InstanceSelector<B> {
        InstanceSelector::new(self.catalog.clone(), strategy)
    }

    pub async fn prepare_registration(&self) -> PendingRegistration {
        self.registrar.prepare_registration().await
    }

    pub async fn complete_registration(
        &self,
        pending: PendingRegistration,
    ) -> Option<ServiceRegistration> {
        self.registrar.complete_registration(pending).await
    }

    pub async fn register(&self) -> Option<ServiceRegistration> {
        self.registrar.register().await
    }

    pub async fn deregister(&self, registration: Option<&ServiceRegistration>) {
        self.registrar.deregister(registration).await
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceInfo>, DiscoveryError> {
        self.catalog.list_services().await
    }

    pub async fn find_by_name(&self, service_name: &str) -> Option<ServiceInstanceInfo> {
        self.catalog.find_by_name(service_name).await
    }

    pub async fn find_by_instance_name(&self, instance_name: &str) -> Option<ServiceInstanceInfo> {
        self.catalog.find_by_instance_name(instance_name).await
    }
}
