//! Self-registration and service discovery for Cairn
//!
//! This crate registers the running service instance with a Consul-compatible
//! agent and looks up other services through the agent's catalog.
//!
//! ## Features
//!
//! - **Self-Registration** - Two-phase registration with an HTTP health check
//! - **Endpoint Resolution** - Outbound address and next free port on the host
//! - **Catalog Lookups** - Services merged with health, by name or instance id
//! - **Load Balancing** - First, round-robin or random selection
//! - **Backends** - Consul agent over HTTP, or in-memory for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cairn_config::ServiceConfig;
//! use cairn_discovery::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder("orders").build()?;
//!     let discovery = ServiceDiscovery::connect(config)?;
//!
//!     // Settle host and port, start registering in the background
//!     let pending = discovery.prepare_registration().await;
//!     if let Some(endpoint) = discovery.endpoint() {
//!         println!("listening on {}", endpoint);
//!     }
//!     let registration = discovery.complete_registration(pending).await;
//!
//!     // Find a healthy peer
//!     if let Some(billing) = discovery.find_by_name("billing").await {
//!         println!("billing API at {}", billing.api_uri);
//!     }
//!
//!     discovery.deregister(registration.as_ref()).await;
//!     Ok(())
//! }
//! ```
//!
//! ### In-Memory Agent (Testing)
//!
//! ```rust,ignore
//! use cairn_discovery::*;
//!
//! let agent = InMemoryAgent::new();
//! let discovery = ServiceDiscovery::new(config, agent.clone());
//!
//! let registration = discovery.register().await;
//! agent.set_check_status("orders-1", HealthStatus::Passing);
//! ```

pub mod agent;
pub mod catalog;
pub mod consul;
pub mod discovery;
pub mod error;
pub mod memory;
pub mod registration;
pub mod resolver;
pub mod selector;
pub mod service;

pub use agent::{
    AgentBackend, AgentCheck, AgentChecks, AgentService, AgentServices, HealthCheckDefinition,
    RegistrationRequest, health_check_key,
};
pub use catalog::{ServiceCatalog, merge_catalog};
pub use consul::ConsulAgent;
pub use discovery::ServiceDiscovery;
pub use error::{BackendError, BackendResult, DiscoveryError, TransportError};
pub use memory::{Endpoint, InMemoryAgent};
pub use registration::{
    DEREGISTER_CRITICAL_AFTER, HEALTH_CHECK_INTERVAL, PendingRegistration, ServiceRegistrar,
};
pub use resolver::{
    DEFAULT_PORT, LOOPBACK_HOST, NetworkProbe, ResolvedEndpoint, SystemNetwork, resolve_host,
    resolve_port,
};
pub use selector::{InstanceSelector, LoadBalancingStrategy};
pub use service::{
    HealthStatus, ServiceInfo, ServiceInstanceInfo, ServiceRegistration, parse_version,
};
