//! One-shot lookup across the configured sources
//!
//! Usage:
//!   EMAIL_HASH_KEY=<hex> SHARD_DIRS=/shards1,/shards2 breach-lookup-cli user@example.com
//!   breach-lookup-cli --config lookup.json user@example.com

use std::path::PathBuf;

use breach_core::{AdmissionConfig, LookupConfig, LookupQuery, SourceConfig};
use breach_server::{build_sources, AdmissionController, LookupService, ShardSource};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "breach-lookup-cli")]
#[command(about = "Look up one email in the breach corpus")]
struct Args {
    /// Email to look up
    email: String,

    /// JSON config file; falls back to environment variables
    #[arg(long, env = "LOOKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Also show which shard files were probed
    #[arg(long)]
    show_shards: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("breach_server=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LookupConfig::load(path)?,
        None => LookupConfig::from_env()?,
    };
    config.validate()?;

    let query = LookupQuery::new(&args.email)?;
    println!("Looking up email: {}", query.canonical);

    if args.show_shards {
        for source in &config.sources {
            if let SourceConfig::Shard { key_hex, base_dirs } = source {
                let shard = ShardSource::new(key_hex, base_dirs.clone())?;
                let key = shard.key_for(&query.canonical);
                println!("Hash: {}", key);
                println!("Shard files:");
                for descriptor in shard.locate(&key).await {
                    println!("  {}", descriptor.path.display());
                }
            }
        }
    }

    // a one-shot lookup is never turned away for host load
    let admission = AdmissionController::system(AdmissionConfig {
        enabled: false,
        ..config.admission.clone()
    });
    let service = LookupService::with_sources(&config, build_sources(&config)?, admission)?;
    let response = service.lookup(&args.email).await?;
    service.shutdown().await;

    println!("Matches:");
    if response.records.is_empty() {
        println!("No records found.");
    } else {
        for record in &response.records {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    }
    if response.failed_sources > 0 {
        eprintln!("{} source(s) failed; results may be incomplete", response.failed_sources);
    }

    Ok(())
}
