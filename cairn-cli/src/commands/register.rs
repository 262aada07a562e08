//! Register command - advertise this instance until interrupted.

use cairn_config::ServiceConfig;
use cairn_discovery::ServiceDiscovery;
use colored::Colorize;
use tracing::info;

use crate::error::CliResult;

/// Register, wait for Ctrl-C, then deregister.
pub async fn run(config: ServiceConfig) -> CliResult<()> {
    let discovery = ServiceDiscovery::connect(config)?;

    let pending = discovery.prepare_registration().await;
    if let Some(endpoint) = discovery.endpoint() {
        println!(
            "  {} {} at {}",
            "Registering".bright_cyan().bold(),
            discovery.config().service_instance_name,
            endpoint.base_uri()
        );
    }

    let Some(registration) = discovery.complete_registration(pending).await else {
        println!("  {} service was not registered", "⚠".yellow());
        return Ok(());
    };

    println!(
        "  {} {} (press Ctrl-C to deregister)",
        "✓".green(),
        registration.instance_name()
    );

    tokio::signal::ctrl_c().await?;
    info!("interrupted, shutting down");

    discovery.deregister(Some(&registration)).await;
    println!("  {} deregistered", "✓".green());
    Ok(())
}
