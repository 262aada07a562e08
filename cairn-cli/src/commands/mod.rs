//! CLI command implementations.

pub mod find;
pub mod instance;
pub mod register;
pub mod services;

use cairn_discovery::ServiceInstanceInfo;
use colored::Colorize;

/// Print one instance as an indented block.
pub(crate) fn print_instance(instance: &ServiceInstanceInfo) {
    let health = match instance.health {
        Some(health) if health.is_passing() => health.to_string().green(),
        Some(health) => health.to_string().yellow(),
        None => "no check".dimmed(),
    };

    println!(
        "  {} {} ({})",
        instance.instance_name.bright_white().bold(),
        instance.service_name.cyan(),
        health
    );
    println!("    {} {}", "Base:".dimmed(), instance.base_uri);
    println!("    {} {}", "API:".dimmed(), instance.api_uri);
    println!("    {} {}", "Status:".dimmed(), instance.status_uri);
    println!("    {} {}", "Docs:".dimmed(), instance.metadata_uri);
    if let Some(node) = &instance.node_id {
        println!("    {} {}", "Node:".dimmed(), node);
    }
}
