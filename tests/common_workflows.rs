//! Integration tests for common Cairn workflows.
//!
//! These tests drive the facade crate the way a service would at startup,
//! at runtime, and at shutdown.

use cairn::prelude::*;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_layers() {
    let config = ConfigLoader::new()
        .set("service_name", "orders")
        .with_env_vars("CAIRN", [("CAIRN_PORT", "9000"), ("CAIRN_API_VERSION", "2")])
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.service_name, "orders");
    assert_eq!(config.port, Some(9000));
    assert_eq!(config.api_version, 2);
    assert!(config.registration_enabled());
}

// =============================================================================
// Service Lifecycle
// =============================================================================

#[tokio::test]
async fn test_register_discover_deregister() {
    let agent = InMemoryAgent::new();
    let config = ServiceConfig::builder("Orders")
        .instance_name("orders-1")
        .hostname("10.0.0.5")
        .build()
        .unwrap();
    let discovery = ServiceDiscovery::new(config, agent.clone());

    // Startup: settle the endpoint before the server binds
    let pending = discovery.prepare_registration().await;
    let endpoint = discovery.endpoint().cloned().unwrap();
    assert_eq!(endpoint, ResolvedEndpoint::new("10.0.0.5", 5000));

    let registration = discovery.complete_registration(pending).await.unwrap();

    // The agent's first probe succeeds
    agent.set_check_status(registration.instance_name(), HealthStatus::Passing);

    let found = discovery.find_by_name("ORDERS").await.unwrap();
    assert_eq!(found.base_uri, endpoint.base_uri());
    assert_eq!(found.version, 1);

    // Shutdown
    discovery.deregister(Some(&registration)).await;
    assert!(discovery.find_by_instance_name("orders-1").await.is_none());
}

#[tokio::test]
async fn test_colocated_instances_get_distinct_ports() {
    let agent = InMemoryAgent::new();

    let mut ports = Vec::new();
    for id in ["orders-1", "orders-2", "orders-3"] {
        let config = ServiceConfig::builder("Orders")
            .instance_name(id)
            .hostname("10.0.0.5")
            .build()
            .unwrap();
        let discovery = ServiceDiscovery::new(config, agent.clone());

        assert!(discovery.register().await.is_some());
        ports.push(discovery.endpoint().map(|e| e.port).unwrap());
    }

    assert_eq!(ports, [5000, 5001, 5002]);
}

#[tokio::test]
async fn test_round_robin_across_instances() {
    let agent = InMemoryAgent::new();
    for (id, host) in [("orders-1", "10.0.0.5"), ("orders-2", "10.0.0.6")] {
        let config = ServiceConfig::builder("Orders")
            .instance_name(id)
            .hostname(host)
            .port(9000)
            .build()
            .unwrap();
        ServiceDiscovery::new(config, agent.clone()).register().await.unwrap();
        agent.set_check_status(id, HealthStatus::Passing);
    }

    let client = ServiceConfig::builder("web").build().unwrap();
    let catalog = ServiceCatalog::new(Arc::new(client), Arc::new(agent));
    let selector = InstanceSelector::new(catalog, LoadBalancingStrategy::RoundRobin);

    let first = selector.select("orders").await.unwrap();
    let second = selector.select("orders").await.unwrap();
    assert_ne!(first.instance_name, second.instance_name);
}
