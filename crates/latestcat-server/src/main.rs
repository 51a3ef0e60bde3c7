//! latest.cat telnet server binary.
//!
//! # Usage
//!
//! ```bash
//! # SSH on 2222 and telnet on 2323
//! latestcat-server
//!
//! # SSH only, custom host key, shorter countdown, own banner
//! latestcat-server --no-telnet --host-key /var/lib/latestcat/host_ed25519 \
//!     --countdown-secs 3 --banner art.txt
//!
//! # Then connect
//! ssh -p 2222 localhost
//! telnet localhost 2323
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use latestcat_app::{Banner, SessionConfig};
use latestcat_lookup::{DEFAULT_ENDPOINT, HttpLookup, LookupConfig};
use latestcat_server::{Server, ServerConfig, ServerError, SshConfig, frontend::ssh};
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// latest.cat over SSH and telnet
#[derive(Parser, Debug)]
#[command(name = "latestcat-server")]
#[command(about = "Find the latest version of any software from your terminal")]
#[command(version)]
struct Args {
    /// Telnet address to bind to
    #[arg(short, long, default_value = "0.0.0.0:2323")]
    bind: String,

    /// Disable the telnet listener
    #[arg(long)]
    no_telnet: bool,

    /// SSH address to bind to
    #[arg(long, default_value = "0.0.0.0:2222")]
    ssh_bind: String,

    /// Disable the SSH listener
    #[arg(long)]
    no_ssh: bool,

    /// SSH host key; an Ed25519 key is generated here if the file is missing
    #[arg(long, default_value = ".ssh/latestcat_ed25519")]
    host_key: PathBuf,

    /// GraphQL endpoint for version lookups
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Lookup request timeout in seconds
    #[arg(long, default_value = "10")]
    lookup_timeout_secs: u64,

    /// Seconds a result stays on screen before the session closes
    #[arg(long, default_value = "5")]
    countdown_secs: u32,

    /// Seconds running sessions get to finish on shutdown
    #[arg(long, default_value = "30")]
    grace_secs: u64,

    /// Replace the stock banner with the art in this file
    #[arg(long)]
    banner: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("latest.cat server starting");

    let banner = match &args.banner {
        Some(path) => load_banner(path)?,
        None => Banner::cat(),
    };

    if args.lookup_timeout_secs == 0 {
        return Err(ServerError::Config("lookup timeout must be at least 1s".to_string()).into());
    }

    let ssh = if args.no_ssh {
        None
    } else {
        Some(SshConfig {
            bind_address: args.ssh_bind,
            host_key: ssh::load_or_create_host_key(&args.host_key)?,
        })
    };

    let lookup = HttpLookup::new(LookupConfig {
        endpoint: args.endpoint,
        timeout: Duration::from_secs(args.lookup_timeout_secs),
    })
    .map_err(ServerError::from)?;
    tracing::info!(endpoint = %lookup.endpoint(), "lookup client ready");

    let config = ServerConfig {
        telnet_address: (!args.no_telnet).then_some(args.bind),
        ssh,
        grace_period: Duration::from_secs(args.grace_secs),
        session: SessionConfig {
            countdown_secs: args.countdown_secs,
            banner,
            ..SessionConfig::default()
        },
        ..ServerConfig::default()
    };

    let server = Server::bind(config, lookup).await?;
    server.run(shutdown_signal()).await?;

    Ok(())
}

fn load_banner(path: &Path) -> Result<Banner, ServerError> {
    let art = std::fs::read_to_string(path)
        .map_err(|source| ServerError::BannerRead { path: path.to_path_buf(), source })?;
    Banner::new(&art).map_err(|source| ServerError::BannerInvalid { path: path.to_path_buf(), source })
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
