//! Self-registration with the discovery agent.
//!
//! Registration is split in two phases so the payload (which needs the final
//! host and port) is settled early, while the agent call itself runs in the
//! background until the service is ready to be probed:
//!
//! ```rust,ignore
//! let registrar = ServiceRegistrar::new(config, backend);
//!
//! let pending = registrar.prepare_registration().await;
//! start_http_server(registrar.endpoint()).await?;
//! let registration = registrar.complete_registration(pending).await;
//!
//! // ... on shutdown
//! registrar.deregister(registration.as_ref()).await;
//! ```

use crate::agent::{AgentBackend, HealthCheckDefinition, RegistrationRequest};
use crate::error::{BackendResult, DiscoveryError};
use crate::resolver::{NetworkProbe, ResolvedEndpoint, SystemNetwork, resolve_host, resolve_port};
use crate::service::{ServiceRegistration, status_path};
use cairn_config::ServiceConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often the agent polls the instance's status endpoint.
pub const HEALTH_CHECK_INTERVAL: &str = "10s";

/// How long an instance may stay critical before the agent removes it.
pub const DEREGISTER_CRITICAL_AFTER: &str = "5m";

impl RegistrationRequest {
    /// Build the registration body for this instance at `endpoint`.
    pub fn from_endpoint(config: &ServiceConfig, endpoint: &ResolvedEndpoint) -> Self {
        let instance_id = config.service_instance_name.clone();

        Self {
            check: HealthCheckDefinition {
                http: format!("{}{}", endpoint.base_uri(), status_path(&instance_id)),
                interval: HEALTH_CHECK_INTERVAL.to_string(),
                deregister_critical_service_after: DEREGISTER_CRITICAL_AFTER.to_string(),
            },
            id: instance_id,
            name: config.service_name.clone(),
            address: endpoint.host.clone(),
            port: endpoint.port,
            enable_tag_override: false,
            tags: vec![format!("v{}", config.api_version)],
        }
    }
}

/// Outcome of the first registration phase.
#[derive(Debug)]
pub enum PendingRegistration {
    /// Registration is disabled; nothing was sent.
    Skipped,

    /// The registration call is running in the background.
    InFlight {
        instance_name: String,
        endpoint: ResolvedEndpoint,
        task: JoinHandle<BackendResult<()>>,
    },

    /// The endpoint could not be resolved; nothing was sent.
    Failed(DiscoveryError),
}

impl PendingRegistration {
    /// Whether a registration call was issued.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }
}

/// Registers and deregisters this service instance.
///
/// Registration is best-effort: agent failures are logged and never returned.
pub struct ServiceRegistrar<B: AgentBackend + 'static> {
    config: Arc<ServiceConfig>,
    backend: Arc<B>,
    network: Arc<dyn NetworkProbe>,
    endpoint: OnceCell<ResolvedEndpoint>,
}

impl<B: AgentBackend + 'static> ServiceRegistrar<B> {
    /// Create a registrar probing the system network for its address.
    pub fn new(config: Arc<ServiceConfig>, backend: Arc<B>) -> Self {
        Self {
            config,
            backend,
            network: Arc::new(SystemNetwork),
            endpoint: OnceCell::new(),
        }
    }

    /// Replace the network probe used for host resolution.
    pub fn with_network_probe(mut self, network: Arc<dyn NetworkProbe>) -> Self {
        self.network = network;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Endpoint advertised to the agent, once resolved.
    pub fn endpoint(&self) -> Option<&ResolvedEndpoint> {
        self.endpoint.get()
    }

    /// Resolve host and port, at most once.
    ///
    /// Configured values win. A missing host comes from the network probe; a
    /// missing port is picked from the agent's catalog, so resolving the port
    /// can fail. A failed attempt is retried on the next call.
    pub async fn resolve_endpoint(&self) -> Result<&ResolvedEndpoint, DiscoveryError> {
        self.endpoint
            .get_or_try_init(|| async {
                let host = match self.config.hostname.as_deref() {
                    Some(host) => host.to_string(),
                    None => resolve_host(self.network.as_ref()).await,
                };

                let port = match self.config.port.filter(|port| *port > 0) {
                    Some(port) => port,
                    None => {
                        let services = self.backend.services().await?;
                        resolve_port(&host, &services)?
                    }
                };

                Ok::<_, DiscoveryError>(ResolvedEndpoint::new(host, port))
            })
            .await
    }

    /// First phase: resolve the endpoint and start the registration call.
    pub async fn prepare_registration(&self) -> PendingRegistration {
        if !self.config.registration_enabled() {
            debug!(service = %self.config.service_name, "registration disabled");
            return PendingRegistration::Skipped;
        }

        let endpoint = match self.resolve_endpoint().await {
            Ok(endpoint) => endpoint.clone(),
            Err(e) => return PendingRegistration::Failed(e),
        };

        info!(
            service = %self.config.service_name,
            instance = %self.config.service_instance_name,
            address = %endpoint.host,
            port = endpoint.port,
            "registering service"
        );

        let request = RegistrationRequest::from_endpoint(&self.config, &endpoint);
        let backend = Arc::clone(&self.backend);
        let task = tokio::spawn(async move { backend.register(&request).await });

        PendingRegistration::InFlight {
            instance_name: self.config.service_instance_name.clone(),
            endpoint,
            task,
        }
    }

    /// Second phase: wait for the registration call.
    ///
    /// Returns a handle only when the agent acknowledged the registration.
    pub async fn complete_registration(
        &self,
        pending: PendingRegistration,
    ) -> Option<ServiceRegistration> {
        let (instance_name, endpoint, task) = match pending {
            PendingRegistration::Skipped => {
                warn!(
                    service = %self.config.service_name,
                    "registration disabled, service will not be discoverable"
                );
                return None;
            }
            PendingRegistration::Failed(e) => {
                warn!(
                    instance = %self.config.service_instance_name,
                    error = %e,
                    "failed to resolve service endpoint, registration aborted"
                );
                return None;
            }
            PendingRegistration::InFlight {
                instance_name,
                endpoint,
                task,
            } => (instance_name, endpoint, task),
        };

        let outcome = match task.await {
            Ok(result) => result.map_err(DiscoveryError::from),
            Err(e) => Err(DiscoveryError::Task(e.to_string())),
        };

        match outcome {
            Ok(()) => {
                info!(instance = %instance_name, endpoint = %endpoint, "registered service");
                Some(ServiceRegistration::new(instance_name))
            }
            Err(e) => {
                warn!(instance = %instance_name, error = %e, "failed to register service");
                None
            }
        }
    }

    /// Register in one step.
    pub async fn register(&self) -> Option<ServiceRegistration> {
        let pending = self.prepare_registration().await;
        self.complete_registration(pending).await
    }

    /// Remove a registration from the agent.
    ///
    /// Does nothing without a handle. Failures are logged, never returned.
    pub async fn deregister(&self, registration: Option<&ServiceRegistration>) {
        let Some(registration) = registration else {
            return;
        };
        let instance = registration.instance_name();

        info!(instance = %instance, "deregistering service");
        match self.backend.deregister(instance).await {
            Ok(()) => info!(instance = %instance, "deregistered service"),
            Err(e) => warn!(instance = %instance, error = %e, "failed to deregister service"),
        }
    }
}
