use clap::Parser;
use tracing_subscriber::EnvFilter;

use stowage::cli;
use stowage::error::Result;
use stowage::storage::StorageClient;

use stowage::cli::Args;
use stowage::config::load_client_config;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    if let Err(e) = run_app(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = load_client_config()?;
    let client = StorageClient::new(config);
    cli::run(args, client).await?;
    Ok(())
}
