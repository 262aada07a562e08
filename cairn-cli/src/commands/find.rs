//! Find command - pick a passing instance of a service.

use cairn_config::ServiceConfig;
use cairn_discovery::{LoadBalancingStrategy, ServiceDiscovery};

use crate::commands::print_instance;
use crate::error::{CliError, CliResult};

pub async fn run(config: ServiceConfig, name: &str, strategy: LoadBalancingStrategy) -> CliResult<()> {
    let discovery = ServiceDiscovery::connect(config)?;

    match discovery.selector(strategy).select(name).await {
        Some(instance) => {
            print_instance(&instance);
            Ok(())
        }
        None => Err(CliError::NotFound(format!(
            "no passing instance of service '{}'",
            name
        ))),
    }
}
