//! CLI for node admin operations

use clap::{Parser, Subcommand};
use minikv_admin::admin::rpc_client::{AuthConfig, AuthRpcClient};
use minikv_admin::admin::{CommandRunner, RemoteAdminClient};
use minikv_admin::common::{parse_duration, Credential};

#[derive(Parser)]
#[command(name = "minikv-admin")]
#[command(about = "minikv cluster admin CLI")]
#[command(version)]
struct Cli {
    /// Node to talk to (host:port)
    #[arg(long, default_value = "localhost:9000")]
    node: String,

    /// Shared access key
    #[arg(long, env = "MINIKV_ADMIN_ACCESS_KEY")]
    access_key: String,

    /// Shared secret key
    #[arg(long, env = "MINIKV_ADMIN_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Use https
    #[arg(long)]
    secure: bool,

    /// Request timeout
    #[arg(long, default_value = "10s")]
    timeout: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stop the node
    Stop,

    /// Restart the node
    Restart,

    /// List locks held on the node
    Locks {
        /// Bucket
        #[arg(long)]
        bucket: String,

        /// Object prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Only locks held at least this long
        #[arg(long, default_value = "0s")]
        older_than: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let http = AuthRpcClient::http_client(parse_duration(&cli.timeout)?)?;
    let credential = Credential::new(cli.access_key, cli.secret_key);
    let node = RemoteAdminClient::new(AuthRpcClient::new(
        AuthConfig::admin(credential, cli.node, cli.secure),
        http,
    ));

    match cli.command {
        Commands::Stop => {
            node.stop().await?;
            println!("Stop signal sent to {}", node.server_addr());
        }

        Commands::Restart => {
            node.restart().await?;
            println!("Restart signal sent to {}", node.server_addr());
        }

        Commands::Locks {
            bucket,
            prefix,
            older_than,
        } => {
            let min_age = parse_duration(&older_than)?;
            let locks = node.list_locks(&bucket, &prefix, min_age).await?;
            println!("{}", serde_json::to_string_pretty(&locks)?);
        }
    }

    Ok(())
}
