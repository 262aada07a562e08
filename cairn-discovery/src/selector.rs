//! Picking one instance among the passing instances of a service.

use crate::agent::AgentBackend;
use crate::catalog::ServiceCatalog;
use crate::service::ServiceInstanceInfo;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Load balancing strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadBalancingStrategy {
    /// Always pick first available
    #[default]
    First,

    /// Round-robin selection
    RoundRobin,

    /// Random selection
    Random,
}

impl FromStr for LoadBalancingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "round-robin" | "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown load balancing strategy: {}", other)),
        }
    }
}

impl fmt::Display for LoadBalancingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::RoundRobin => "round-robin",
            Self::Random => "random",
        })
    }
}

/// Instance selector with load balancing
///
/// `First` gives the same answer as [`ServiceCatalog::find_by_name`].
pub struct InstanceSelector<B: AgentBackend> {
    catalog: ServiceCatalog<B>,
    strategy: LoadBalancingStrategy,
    round_robin_index: AtomicUsize,
}

impl<B: AgentBackend> InstanceSelector<B> {
    /// Create new instance selector
    pub fn new(catalog: ServiceCatalog<B>, strategy: LoadBalancingStrategy) -> Self {
        Self {
            catalog,
            strategy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    pub fn strategy(&self) -> LoadBalancingStrategy {
        self.strategy
    }

    /// Select a passing instance of `service_name`, if any
    pub async fn select(&self, service_name: &str) -> Option<ServiceInstanceInfo> {
        let mut instances = self.catalog.find_all_by_name(service_name).await;
        if instances.is_empty() {
            return None;
        }

        let index = match self.strategy {
            LoadBalancingStrategy::First => 0,
            LoadBalancingStrategy::RoundRobin => {
                self.round_robin_index.fetch_add(1, Ordering::SeqCst) % instances.len()
            }
            LoadBalancingStrategy::Random => rand::rng().random_range(0..instances.len()),
        };

        Some(instances.swap_remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentService;
    use crate::memory::InMemoryAgent;
    use cairn_config::ServiceConfig;
    use std::sync::Arc;

    fn selector(strategy: LoadBalancingStrategy) -> InstanceSelector<InMemoryAgent> {
        let agent = InMemoryAgent::new();
        for (id, port) in [("api-1", 8001), ("api-2", 8002), ("api-3", 8003)] {
            agent.insert_service(AgentService::new(id, "api", "localhost", port));
            agent.set_check(id, "n1", "passing");
        }
        agent.insert_service(AgentService::new("api-4", "api", "localhost", 8004));
        agent.set_check("api-4", "n1", "critical");

        let config = ServiceConfig::builder("client").build().unwrap();
        let catalog = ServiceCatalog::new(Arc::new(config), Arc::new(agent));
        InstanceSelector::new(catalog, strategy)
    }

    #[tokio::test]
    async fn test_first() {
        let selector = selector(LoadBalancingStrategy::First);
        for _ in 0..3 {
            assert_eq!(selector.select("api").await.unwrap().instance_name, "api-1");
        }
    }

    #[tokio::test]
    async fn test_round_robin_skips_unhealthy() {
        let selector = selector(LoadBalancingStrategy::RoundRobin);

        let mut picked = Vec::new();
        for _ in 0..4 {
            picked.push(selector.select("api").await.unwrap().instance_name);
        }
        assert_eq!(picked, ["api-1", "api-2", "api-3", "api-1"]);
    }

    #[tokio::test]
    async fn test_random_picks_passing() {
        let selector = selector(LoadBalancingStrategy::Random);
        for _ in 0..10 {
            let instance = selector.select("api").await.unwrap();
            assert!(instance.is_passing());
        }
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let selector = selector(LoadBalancingStrategy::RoundRobin);
        assert!(selector.select("missing").await.is_none());
    }

    #[test]
    fn test_strategy_parse() {
        let parse = |s: &str| s.parse::<LoadBalancingStrategy>();

        assert_eq!(parse("first"), Ok(LoadBalancingStrategy::First));
        assert_eq!(parse("Round-Robin"), Ok(LoadBalancingStrategy::RoundRobin));
        assert_eq!(parse("random"), Ok(LoadBalancingStrategy::Random));
        assert!(parse("fastest").is_err());
        assert_eq!(LoadBalancingStrategy::RoundRobin.to_string(), "round-robin");
    }
}
