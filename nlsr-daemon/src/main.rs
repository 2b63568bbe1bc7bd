//! NLSR Daemon (`nlsrd`)
//!
//! Bootstraps the router's trust hierarchy and keeps its sequence numbers
//! persisted until it is told to stop.

use clap::Parser;
use nlsr_model::Name;
use nlsr_node::{DataDir, RouterConfig, RouterNode};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nlsrd", version, about = "NLSR trust daemon")]
struct Args {
    /// Network prefix of extracted site and router names
    #[arg(long, default_value = "/ndn")]
    network: Name,

    /// Site name, e.g. /edu/memphis
    #[arg(long)]
    site: Name,

    /// Router name within the site, e.g. /pollux
    #[arg(long)]
    router: Name,

    /// Root key prefix, e.g. /ndn/keys
    #[arg(long)]
    root_prefix: Name,

    /// Directory holding root.cert, site.cert, operator.cert and router.cert
    #[arg(long)]
    cert_dir: Option<PathBuf>,

    /// Base directory for keys and sequence files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    tracing::info!("nlsrd v{} starting...", env!("CARGO_PKG_VERSION"));

    let data_dir = match args.data_dir {
        Some(path) => DataDir::new(path),
        None => DataDir::default_location()
            .ok_or_else(|| anyhow::anyhow!("no configuration directory, pass --data-dir"))?,
    };

    let mut builder = RouterConfig::builder()
        .network(args.network)
        .site_name(args.site)
        .router_name(args.router)
        .root_key_prefix(args.root_prefix);
    if let Some(cert_dir) = args.cert_dir {
        builder = builder.cert_dir(cert_dir);
    }
    let config = builder.build()?;

    let node = RouterNode::start(config, &data_dir).map_err(|e| {
        tracing::error!("Failed to start: {}", e);
        anyhow::anyhow!("{}", e)
    })?;

    let km = node.key_manager();
    tracing::info!("Router: {}", km.router_name());
    tracing::info!("Process certificate: {}", km.process_cert_name());
    tracing::debug!("\n{}", km.store());

    // Bootstrap certificates are installed before this subscription. Events only
    // arrive once a transport feeds neighbour certificates to the node.
    let mut verified = node.subscribe_verified();
    tokio::spawn(async move {
        loop {
            match verified.recv().await {
                Ok(name) => tracing::info!(name = %name, "certificate verified"),
                Err(RecvError::Lagged(n)) => tracing::warn!(missed = n, "verification events dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    tracing::info!("Daemon ready. Press Ctrl+C to stop.");
    shutdown_signal().await?;
    tracing::info!("Shutdown signal received...");

    if let Err(e) = node.shutdown() {
        tracing::error!("Shutdown error: {}", e);
    }

    tracing::info!("Daemon stopped");
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let mut filter = EnvFilter::from_default_env();

    // Only apply defaults if RUST_LOG is not set
    if std::env::var("RUST_LOG").is_err() {
        let level = match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        if let Ok(directive) = level.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
