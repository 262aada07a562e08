// Cairn - client-side service discovery and self-registration
//
// This library registers the running service instance with a Consul-compatible
// agent and resolves other services into healthy, addressable instances.

// Re-export discovery functionality
pub use cairn_discovery::*;

// Re-export configuration
pub use cairn_config;
pub use cairn_config::{ConfigError, ConfigLoader, FileFormat, ServiceConfig};

// Re-export optional crates
#[cfg(feature = "log")]
pub use cairn_log;

/// Prelude for common imports.
///
/// ```
/// use cairn::prelude::*;
/// ```
pub mod prelude {
    pub use cairn_config::{ConfigLoader, ServiceConfig};
    pub use cairn_discovery::{
        AgentBackend, BackendError, BackendResult, ConsulAgent, DiscoveryError, HealthStatus,
        InMemoryAgent, InstanceSelector, LoadBalancingStrategy, PendingRegistration,
        ResolvedEndpoint, ServiceCatalog, ServiceDiscovery, ServiceInfo, ServiceInstanceInfo,
        ServiceRegistrar, ServiceRegistration,
    };
}
