use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uplink::{HttpStoreClient, ReplicationEngine, ReplicatorConfig};

/// Replicate time-series points from a local store to a remote one.
#[derive(Parser, Debug)]
#[command(name = "uplink", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "uplink=info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "uplink exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> uplink::Result<()> {
    let config = ReplicatorConfig::load(&cli.config)?;
    info!(
        local = %config.local.endpoint(),
        remote = %config.remote.endpoint(),
        sources = config.sources.len(),
        "configuration loaded"
    );

    let local = Arc::new(HttpStoreClient::new(config.local.clone())?);
    let remote = Arc::new(HttpStoreClient::new(config.remote.clone())?);
    let engine = Arc::new(ReplicationEngine::new(config, local, remote));

    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
                engine.request_stop();
            }
        });
    }

    engine.run().await
}
