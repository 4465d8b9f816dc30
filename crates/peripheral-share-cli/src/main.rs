//! peripheral-share CLI: run a hub or join one as a spoke.

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use peripheral_share_daemon::{setup, Config, Daemon, DaemonEvent, Role};
use peripheral_share_input::headless::{LogInjection, NullCapture};
use peripheral_share_protocol::TcpTransport;
use peripheral_share_types::Position;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "peripheral-share",
    about = "Share one keyboard and mouse across machines",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for peers and start with control of the shared input.
    Serve {
        /// Port to listen on (overrides the config file).
        #[arg(short, long)]
        port: Option<u16>,

        /// Layout slot of this machine: left, middle or right.
        #[arg(long)]
        position: Option<Position>,
    },

    /// Join a hub at host:port.
    Connect {
        /// Address of the hub (host:port).
        address: String,

        /// Layout slot of this machine: left, middle or right.
        #[arg(long)]
        position: Option<Position>,
    },

    /// Print the default configuration file.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::DefaultConfig = cli.command {
        print!("{}", setup::default_config_toml()?);
        return Ok(());
    }

    let mut config = setup::load_config(cli.config.as_deref())?;
    init_tracing(&config.daemon.log_level);

    match cli.command {
        Commands::Serve { port, position } => {
            if let Some(port) = port {
                config.daemon.port = port;
            }
            if let Some(position) = position {
                config.layout.position = position;
            }
            serve(config).await
        }
        Commands::Connect { address, position } => {
            if let Some(position) = position {
                config.layout.position = position;
            }
            join(config, &address).await
        }
        Commands::DefaultConfig => Ok(()),
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn headless_daemon(config: Config, role: Role) -> Daemon {
    Daemon::new(
        config,
        role,
        Box::new(NullCapture::new()),
        Box::new(LogInjection::new()),
    )
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let bind: SocketAddr = format!("{}:{}", config.daemon.bind, config.daemon.port)
        .parse()
        .with_context(|| format!("invalid bind address {}", config.daemon.bind))?;
    tracing::info!(addr = %bind, name = %config.identity.name, "starting peripheral-share hub");

    let transport = TcpTransport::bind(bind).await?;
    let mut daemon = headless_daemon(config, Role::Hub);
    daemon.attach_listener(transport);
    run_until_ctrl_c(daemon).await
}

async fn join(config: Config, address: &str) -> anyhow::Result<()> {
    let addr = tokio::net::lookup_host(address)
        .await
        .with_context(|| format!("failed to resolve {address}"))?
        .next()
        .with_context(|| format!("no address found for {address}"))?;
    tracing::info!(hub = %addr, name = %config.identity.name, "joining peripheral-share hub");

    let mut daemon = headless_daemon(config, Role::Spoke);
    daemon.connect(addr).await?;
    run_until_ctrl_c(daemon).await
}

async fn run_until_ctrl_c(mut daemon: Daemon) -> anyhow::Result<()> {
    let events: mpsc::Sender<DaemonEvent> = daemon.event_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            let _ = events.send(DaemonEvent::Shutdown).await;
        }
    });

    daemon.run().await?;
    Ok(())
}
