//! Instance command - show one instance by id.

use cairn_config::ServiceConfig;
use cairn_discovery::ServiceDiscovery;

use crate::commands::print_instance;
use crate::error::{CliError, CliResult};

pub async fn run(config: ServiceConfig, id: &str) -> CliResult<()> {
    let discovery = ServiceDiscovery::connect(config)?;

    let instance = discovery
        .find_by_instance_name(id)
        .await
        .ok_or_else(|| CliError::NotFound(format!("no instance with id '{}'", id)))?;

    print_instance(&instance);
    Ok(())
}
