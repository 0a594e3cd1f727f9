//! Cloud Volume Manager CLI
//!
//! Command surface over the management facade: volume and instance
//! operations against the provider, plus the SSH remote-format driver.
//! Records are printed as JSON.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloud_volume_manager::{remote, CloudManager, Error, ProviderConfig, Result};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Management facade over cloud block-storage and compute APIs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Provider user name
    #[arg(long, env = "OS_USERNAME")]
    os_username: Option<String>,

    /// Provider password
    #[arg(long, env = "OS_PASSWORD")]
    os_password: Option<String>,

    /// Tenant/project name
    #[arg(long, env = "OS_TENANT_NAME")]
    os_tenant_name: Option<String>,

    /// Authority (identity service) URL
    #[arg(long, env = "OS_AUTH_URL")]
    os_auth_url: Option<String>,

    /// YAML credentials file; flags and env vars override its values
    #[arg(long, env = "CVM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Volume operations
    Volume {
        #[command(subcommand)]
        command: VolumeCommand,
    },
    /// Instance operations
    Instance {
        #[command(subcommand)]
        command: InstanceCommand,
    },
}

#[derive(Subcommand, Debug)]
enum VolumeCommand {
    /// List all volumes
    List,

    /// Create a volume
    Create {
        /// Size in provider allocation units
        #[arg(long)]
        size: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Get one volume by id or name (id wins)
    Get {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a volume by id or name
    Delete {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Detach a volume by id or name
    Detach {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Attach a volume to an instance
    Attach {
        /// Device mount point, e.g. /dev/vdb
        #[arg(long)]
        mount_point: String,
        #[arg(long)]
        vol_id: Option<String>,
        #[arg(long)]
        vol_name: Option<String>,
        #[arg(long)]
        ins_id: Option<String>,
        #[arg(long)]
        ins_name: Option<String>,
    },

    /// Format a volume device on a running instance over SSH
    Format {
        /// Device mount point to format, e.g. /dev/vdb
        #[arg(long)]
        mount_point: String,
        /// Private key file for the SSH login
        #[arg(long)]
        key_file: PathBuf,
        /// User name on the instance
        #[arg(long)]
        username: String,
        /// Host address of the instance
        #[arg(long)]
        host: String,
        /// Give up after this many seconds; absent blocks until completion
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum InstanceCommand {
    /// List all instances
    List,

    /// Get one instance by id or name (id wins)
    Get {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Associate a floating address with an instance
    AttachIp {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Disassociate a floating address from an instance
    DetachIp {
        #[arg(long)]
        ip: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = provider_config(&args)?;
    info!("Cloud Volume Manager {}", cloud_volume_manager::VERSION);
    info!("  Authority: {}", config.auth_url);
    info!("  Tenant: {}", config.tenant);

    let manager = CloudManager::connect(config);

    match args.command {
        Command::Volume { command } => run_volume(&manager, command).await,
        Command::Instance { command } => run_instance(&manager, command).await,
    }
}

async fn run_volume(manager: &CloudManager, command: VolumeCommand) -> Result<()> {
    match command {
        VolumeCommand::List => print_json(&manager.volume_list().await?),
        VolumeCommand::Create { size, name, description } => print_json(
            &manager
                .volume_create(size, name.as_deref(), description.as_deref())
                .await?,
        ),
        VolumeCommand::Get { id, name } => {
            print_json(&manager.volume_get(id.as_deref(), name.as_deref()).await?)
        }
        VolumeCommand::Delete { id, name } => {
            manager.volume_delete(id.as_deref(), name.as_deref()).await?;
            info!("volume deleted");
            Ok(())
        }
        VolumeCommand::Detach { id, name } => {
            manager.volume_detach(id.as_deref(), name.as_deref()).await?;
            info!("volume detached");
            Ok(())
        }
        VolumeCommand::Attach {
            mount_point,
            vol_id,
            vol_name,
            ins_id,
            ins_name,
        } => print_json(
            &manager
                .volume_attach(
                    &mount_point,
                    vol_id.as_deref(),
                    vol_name.as_deref(),
                    ins_id.as_deref(),
                    ins_name.as_deref(),
                )
                .await?,
        ),
        VolumeCommand::Format {
            mount_point,
            key_file,
            username,
            host,
            deadline_secs,
        } => {
            let private_key = std::fs::read_to_string(&key_file)?;
            let deadline = deadline_secs.map(Duration::from_secs);
            let output = tokio::task::spawn_blocking(move || {
                remote::format_volume(&host, &username, &private_key, &mount_point, deadline)
            })
            .await
            .map_err(|e| Error::Format {
                reason: format!("format task failed: {e}"),
            })??;
            println!("{output}");
            Ok(())
        }
    }
}

async fn run_instance(manager: &CloudManager, command: InstanceCommand) -> Result<()> {
    match command {
        InstanceCommand::List => print_json(&manager.instance_list().await?),
        InstanceCommand::Get { id, name } => {
            print_json(&manager.instance_get(id.as_deref(), name.as_deref()).await?)
        }
        InstanceCommand::AttachIp { ip, id, name } => {
            manager
                .instance_attach_ip(&ip, id.as_deref(), name.as_deref())
                .await?;
            info!("address {} attached", ip);
            Ok(())
        }
        InstanceCommand::DetachIp { ip, id, name } => {
            manager
                .instance_detach_ip(&ip, id.as_deref(), name.as_deref())
                .await?;
            info!("address {} detached", ip);
            Ok(())
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

fn provider_config(args: &Args) -> Result<ProviderConfig> {
    let mut config = match &args.config {
        Some(path) => ProviderConfig::from_yaml_file(path)?,
        None => ProviderConfig::default(),
    };

    if let Some(username) = &args.os_username {
        config.username = username.clone();
    }
    if let Some(password) = &args.os_password {
        config.password = password.clone();
    }
    if let Some(tenant) = &args.os_tenant_name {
        config.tenant = tenant.clone();
    }
    if let Some(auth_url) = &args.os_auth_url {
        config.auth_url = auth_url.clone();
    }

    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
