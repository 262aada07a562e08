//! Catalog lookups: every service the agent knows, merged with health.

use crate::agent::{AgentBackend, AgentChecks, AgentServices, health_check_key};
use crate::error::DiscoveryError;
use crate::service::{ServiceInfo, ServiceInstanceInfo, eq_ignore_case};
use cairn_config::ServiceConfig;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Merge a services snapshot with its health checks.
///
/// One [`ServiceInfo`] per service name, in the order names first appear in
/// `services`. Instances without a check carry no health.
pub fn merge_catalog(services: &AgentServices, checks: &AgentChecks) -> Vec<ServiceInfo> {
    let mut buckets: IndexMap<&str, ServiceInfo> = IndexMap::new();

    for service in services.values() {
        let check = checks.get(&health_check_key(&service.id));
        buckets
            .entry(service.service.as_str())
            .or_insert_with(|| ServiceInfo::new(service.service.clone()))
            .instances
            .push(ServiceInstanceInfo::from_agent(service, check));
    }

    buckets.into_values().collect()
}

/// Read-only view of the agent's catalog.
///
/// Every call fetches a fresh snapshot; nothing is cached.
pub struct ServiceCatalog<B: AgentBackend> {
    config: Arc<ServiceConfig>,
    backend: Arc<B>,
}

impl<B: AgentBackend> Clone for ServiceCatalog<B> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: AgentBackend> ServiceCatalog<B> {
    pub fn new(config: Arc<ServiceConfig>, backend: Arc<B>) -> Self {
        Self { config, backend }
    }

    /// List every service and its instances.
    ///
    /// Empty without calling the agent when discovery is disabled. Agent
    /// failures are returned to the caller.
    pub async fn list_services(&self) -> Result<Vec<ServiceInfo>, DiscoveryError> {
        if !self.config.discovery_enabled() {
            warn!("service discovery disabled, catalog is empty");
            return Ok(Vec::new());
        }

        let (services, checks) = tokio::join!(self.backend.services(), self.backend.checks());
        let (services, checks) = (services?, checks?);

        debug!(
            services = services.len(),
            checks = checks.len(),
            "fetched catalog snapshot"
        );
        Ok(merge_catalog(&services, &checks))
    }

    /// First passing instance of `service_name`, matched case-insensitively.
    ///
    /// Agent failures are logged and reported as not found.
    pub async fn find_by_name(&self, service_name: &str) -> Option<ServiceInstanceInfo> {
        self.find_all_by_name(service_name).await.into_iter().next()
    }

    /// Every passing instance of `service_name`, in catalog order.
    ///
    /// Agent failures are logged and reported as no instances.
    pub async fn find_all_by_name(&self, service_name: &str) -> Vec<ServiceInstanceInfo> {
        let Some(services) = self.snapshot("find_by_name", service_name).await else {
            return Vec::new();
        };

        services
            .into_iter()
            .filter(|service| eq_ignore_case(&service.service_name, service_name))
            .flat_map(|service| service.instances)
            .filter(ServiceInstanceInfo::is_passing)
            .collect()
    }

    /// Instance with id `instance_name`, matched case-insensitively, whatever
    /// its health.
    pub async fn find_by_instance_name(&self, instance_name: &str) -> Option<ServiceInstanceInfo> {
        self.snapshot("find_by_instance_name", instance_name)
            .await?
            .into_iter()
            .flat_map(|service| service.instances)
            .find(|instance| eq_ignore_case(&instance.instance_name, instance_name))
    }

    /// Catalog for lookups: `None` when disabled or when the agent failed.
    async fn snapshot(&self, operation: &str, key: &str) -> Option<Vec<ServiceInfo>> {
        if !self.config.discovery_enabled() {
            warn!(operation, key, "service discovery disabled, lookup skipped");
            return None;
        }

        match self.list_services().await {
            Ok(services) => Some(services),
            Err(e) => {
                error!(operation, key, error = %e, "catalog lookup failed");
                None
            }
        }
    }
}
