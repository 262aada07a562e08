//! Cairn CLI - register this host's service and query the agent catalog.
//!
//! # Commands
//!
//! - `cairn register` - Register, hold until Ctrl-C, then deregister
//! - `cairn services` - List every service in the catalog
//! - `cairn find <name>` - Pick a passing instance of a service
//! - `cairn instance <id>` - Show one instance by id

use cairn_config::{ConfigLoader, ENV_PREFIX, ServiceConfig};
use cairn_discovery::LoadBalancingStrategy;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod error;

use commands::{find, instance, register, services};
use error::CliResult;

/// Cairn - service discovery and self-registration
#[derive(Parser)]
#[command(name = "cairn")]
#[command(version)]
#[command(about = "Register services with and query a Consul-compatible agent")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Sources for the service configuration, applied in this order.
#[derive(Args)]
struct ConfigArgs {
    /// Configuration file (.toml or .json)
    #[arg(long, global = true, env = "CAIRN_CONFIG")]
    config: Option<PathBuf>,

    /// Load variables from this .env file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Agent API base URL
    #[arg(long, global = true)]
    agent_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this instance and hold the registration until Ctrl-C
    Register(RegisterArgs),

    /// List every service known to the agent
    #[command(alias = "ls")]
    Services {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Pick a passing instance of a service
    Find {
        /// Service name (case-insensitive)
        name: String,

        /// How to choose among passing instances
        #[arg(long, default_value_t = LoadBalancingStrategy::First)]
        strategy: LoadBalancingStrategy,
    },

    /// Show an instance by id, whatever its health
    Instance {
        /// Instance id (case-insensitive)
        id: String,
    },
}

#[derive(Args)]
struct RegisterArgs {
    /// Service name
    #[arg(long)]
    service: Option<String>,

    /// Unique instance id
    #[arg(long)]
    instance: Option<String>,

    /// Address to advertise
    #[arg(long)]
    host: Option<String>,

    /// Port to advertise
    #[arg(long)]
    port: Option<u16>,

    /// API version advertised in the tags
    #[arg(long)]
    api_version: Option<u32>,
}

/// Name used for lookups when no service is configured.
const QUERY_SERVICE_NAME: &str = "cairn-cli";

impl ConfigArgs {
    /// Layer file, `.env`, environment and flags into one loader.
    fn loader(&self) -> CliResult<ConfigLoader> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.with_file(path)?;
        }

        Ok(loader
            .with_dotenv(self.env_file.as_deref())?
            .with_env(ENV_PREFIX)?
            .set_opt("agent_url", self.agent_url.clone()))
    }

    /// Configuration for catalog queries, which need no service name.
    fn query_config(&self) -> CliResult<ServiceConfig> {
        let loader = self.loader()?;
        let loader = if loader.get("service_name").is_none() {
            loader.set("service_name", QUERY_SERVICE_NAME)
        } else {
            loader
        };
        Ok(loader.load()?)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut log_config = cairn_log::LogConfig::from_env();
    if cli.verbose {
        log_config = log_config.verbose();
    }
    cairn_log::init(&log_config);

    let result: CliResult<()> = match cli.command {
        Commands::Register(args) => {
            let loader = match cli.config.loader() {
                Ok(loader) => loader,
                Err(e) => exit_with(e),
            };
            let config = loader
                .set_opt("service_name", args.service)
                .set_opt("service_instance_name", args.instance)
                .set_opt("hostname", args.host)
                .set_opt("port", args.port)
                .set_opt("api_version", args.api_version)
                .load();

            match config {
                Ok(config) => register::run(config).await,
                Err(e) => Err(e.into()),
            }
        }

        Commands::Services { json } => match cli.config.query_config() {
            Ok(config) => services::run(config, json).await,
            Err(e) => Err(e),
        },

        Commands::Find { name, strategy } => match cli.config.query_config() {
            Ok(config) => find::run(config, &name, strategy).await,
            Err(e) => Err(e),
        },

        Commands::Instance { id } => match cli.config.query_config() {
            Ok(config) => instance::run(config, &id).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        exit_with(e);
    }
}

fn exit_with(e: error::CliError) -> ! {
    eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
    std::process::exit(1);
}
