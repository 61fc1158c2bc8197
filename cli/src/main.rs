use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

mod commands;
mod utils;

use commands::{config, health, iam, policy, seed, serve};
use utils::{env_paths::EnvPaths, logging, project_root, settings};

/// CMDB auth CLI - Command line interface for the CMDB authorization service
#[derive(Parser)]
#[command(name = "cmdbauth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the authorization HTTP service
    Serve {
        /// Address to bind, overrides the configuration
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overrides the configuration
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed file loaded into the resource database before serving
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Check system health and status
    Health {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Policy inspection commands
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Model registration with the policy authority
    Iam {
        #[command(subcommand)]
        action: IamAction,
    },

    /// Load resource documents into the database
    Seed {
        /// JSON file shaped {"<collection>": [<document>, ...]}
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Compile a policy into the store filter of a resource type
    Compile {
        /// Resource type id, e.g. "host" or "biz"
        #[arg(short = 't', long = "type")]
        resource_type: String,

        /// Policy JSON, or @path to read it from a file
        policy: String,

        /// Seed file used to resolve host paths
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum IamAction {
    /// Register the system, its resource types, selections and actions
    Register {
        /// Callback address the authority pulls resources from
        #[arg(long)]
        host: Option<String>,
    },
    /// Sync the entries generated per custom model
    Sync,
    /// Show whether the system is registered
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve paths from the deployment root when one is found above the
    // current directory
    let current_dir = env::current_dir()?;
    let base = project_root::find_project_root(&current_dir).unwrap_or(current_dir);
    let env_paths = EnvPaths::load_with_base(Some(base))?;

    // Keep the guard alive for the whole run so file logs are flushed
    let _guard = match &cli.command {
        Commands::Serve { .. } => Some(logging::init_server_logging(&env_paths, cli.verbose)?),
        _ => {
            logging::init_console_logging(cli.verbose);
            None
        }
    };

    match cli.command {
        Commands::Serve { host, port, seed } => {
            let loaded = settings::load_settings(&env_paths)?;
            serve::execute(loaded, host, port, seed).await?;
        }
        Commands::Health { format } => {
            let loaded = settings::load_settings(&env_paths)?;
            health::execute(&loaded, format).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                let loaded = settings::load_settings(&env_paths)?;
                config::show(&loaded, format)?;
            }
        },
        Commands::Policy { action } => match action {
            PolicyAction::Compile {
                resource_type,
                policy: source,
                seed,
            } => {
                policy::compile(resource_type, source, seed.as_deref()).await?;
            }
        },
        Commands::Iam { action } => {
            let loaded = settings::load_settings(&env_paths)?;
            match action {
                IamAction::Register { host } => iam::register(&loaded, host).await?,
                IamAction::Sync => iam::sync(&loaded).await?,
                IamAction::Status => iam::status(&loaded).await?,
            }
        }
        Commands::Seed { file } => {
            let loaded = settings::load_settings(&env_paths)?;
            seed::execute(&loaded, &file).await?;
        }
    }

    Ok(())
}
