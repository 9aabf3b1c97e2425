//! Admin node binary

use clap::{Parser, Subcommand};
use minikv_admin::{AdminNode, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minikv-admind")]
#[command(about = "minikv cluster admin node")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the admin node
    Serve {
        /// Config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Node ID
        #[arg(long)]
        id: Option<String>,

        /// Address this node is known by in the cluster
        #[arg(long)]
        address: Option<String>,

        /// Bind address for admin RPC
        #[arg(long)]
        bind: Option<String>,

        /// Cluster endpoints (comma-separated URLs)
        #[arg(long, value_delimiter = ',')]
        endpoints: Vec<String>,

        /// Shared access key
        #[arg(long, env = "MINIKV_ADMIN_ACCESS_KEY")]
        access_key: Option<String>,

        /// Shared secret key
        #[arg(long, env = "MINIKV_ADMIN_SECRET_KEY", hide_env_values = true)]
        secret_key: Option<String>,

        /// Use https for peer RPC
        #[arg(long)]
        secure: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            id,
            address,
            bind,
            endpoints,
            access_key,
            secret_key,
            secure,
        } => {
            // Load config from file and environment, then override with CLI arguments
            let mut cfg = Config::load(config.as_deref())?;
            if let Some(id) = id {
                cfg.node_id = id;
            }
            if let Some(address) = address {
                cfg.address = address;
            }
            if let Some(bind) = bind {
                cfg.bind_addr = bind.parse()?;
            }
            if !endpoints.is_empty() {
                cfg.endpoints = endpoints;
            }
            if let Some(access_key) = access_key {
                cfg.access_key = access_key;
            }
            if let Some(secret_key) = secret_key {
                cfg.secret_key = secret_key;
            }
            if secure {
                cfg.secure = true;
            }

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| cfg.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let node = AdminNode::new(cfg)?;
            node.serve().await?;
        }
    }

    Ok(())
}
