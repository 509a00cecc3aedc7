//! breach-server binary: breach lookup HTTP server
//!
//! Run with:
//! ```bash
//! cargo run -p breach-server --bin breach-server -- --config lookup.json --port 3000
//! ```
//! Without `--config`, sources are read from the environment
//! (`EMAIL_HASH_KEY`, `SHARD_DIRS`, `PLAINTEXT_DIR`, `DATABASE_URL`, ...).

use std::net::IpAddr;
use std::path::PathBuf;

use breach_core::LookupConfig;
use breach_server::metrics::init_prometheus_recorder;
use breach_server::ServerBuilder;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "breach-server")]
#[command(about = "Serve breach-corpus lookups")]
struct Args {
    /// JSON config file; falls back to environment variables
    #[arg(long, env = "LOOKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Skip the Prometheus recorder and /metrics endpoint
    #[arg(long)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("breach_server=info".parse()?))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LookupConfig::load(path)?,
        None => LookupConfig::from_env()?,
    };

    let mut builder = ServerBuilder::new(config).addr((args.bind, args.port).into());
    if !args.no_metrics {
        builder = builder.prometheus(init_prometheus_recorder()?);
    }

    let server = builder.build()?;
    tracing::info!("Server ready on {}", server.addr());
    server.run().await?;

    Ok(())
}
