//! Services command - list the catalog.

use cairn_config::ServiceConfig;
use cairn_discovery::ServiceDiscovery;
use colored::Colorize;

use crate::commands::print_instance;
use crate::error::CliResult;

/// List every service with its instances.
pub async fn run(config: ServiceConfig, json: bool) -> CliResult<()> {
    let discovery = ServiceDiscovery::connect(config)?;
    let services = discovery.list_services().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(());
    }

    if services.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    for service in &services {
        println!();
        println!(
            "{} ({} passing / {})",
            service.service_name.bright_cyan().bold(),
            service.passing().count(),
            service.instances.len()
        );
        for instance in &service.instances {
            print_instance(instance);
        }
    }
    println!();
    Ok(())
}
