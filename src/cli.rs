use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::storage::constants::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MULTIPART_CHUNKSIZE, DEFAULT_MULTIPART_THRESHOLD,
    DEFAULT_PAGE_SIZE,
};
use crate::storage::{StorageClient, TransferConfig, format_size, parse_size};

#[derive(Parser, Debug)]
#[command(name = "stowage")]
#[command(about = "List, upload, download and delete objects in a bucket")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List object keys under a prefix
    Ls {
        bucket: String,
        #[arg(default_value = "")]
        prefix: String,
        /// Maximum keys requested per round trip
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE as u64, value_parser = clap::value_parser!(u64).range(1..))]
        page_size: u64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },
    /// Upload a local file
    Put {
        bucket: String,
        local: PathBuf,
        key: String,
        /// Files larger than this are uploaded in parts (e.g. 8M)
        #[arg(long, value_parser = parse_size, default_value_t = DEFAULT_MULTIPART_THRESHOLD)]
        multipart_threshold: u64,
        /// Size of each part of a multipart upload (e.g. 8M)
        #[arg(long, value_parser = parse_size, default_value_t = DEFAULT_MULTIPART_CHUNKSIZE as u64)]
        chunk_size: u64,
        /// Parts uploaded concurrently
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
        concurrency: usize,
    },
    /// Download an object to a local file
    Get {
        bucket: String,
        key: String,
        local: PathBuf,
    },
    /// Delete one or more objects
    Rm {
        bucket: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

/// Output format for commands that can render machine-readable results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One key per line
    Human,
    /// Single-line JSON output
    Json,
}

#[derive(Serialize)]
struct ListingOutput<'a> {
    bucket: &'a str,
    prefix: &'a str,
    count: usize,
    keys: &'a [String],
}

pub async fn run(args: Args, client: StorageClient) -> Result<()> {
    match args.command {
        Command::Ls {
            bucket,
            prefix,
            page_size,
            format,
        } => {
            let page_size = usize::try_from(page_size).unwrap_or(usize::MAX);
            let keys = client.list(&bucket, &prefix, page_size).await?;
            match format {
                OutputFormat::Human => {
                    for key in &keys {
                        println!("{key}");
                    }
                }
                OutputFormat::Json => {
                    let output = ListingOutput {
                        bucket: &bucket,
                        prefix: &prefix,
                        count: keys.len(),
                        keys: &keys,
                    };
                    println!("{}", serde_json::to_string(&output)?);
                }
            }
        }
        Command::Put {
            bucket,
            local,
            key,
            multipart_threshold,
            chunk_size,
            concurrency,
        } => {
            let transfer = TransferConfig::default()
                .with_multipart_threshold(multipart_threshold)
                .with_multipart_chunksize(usize::try_from(chunk_size).unwrap_or(usize::MAX))
                .with_max_concurrency(concurrency);
            let report = client.upload(&bucket, &local, &key, &transfer).await?;
            println!(
                "Upload: {} → {bucket}/{} ({})",
                local.display(),
                report.key,
                format_size(report.bytes)
            );
        }
        Command::Get { bucket, key, local } => {
            let bytes = client
                .download(&bucket, &key, &local, &TransferConfig::default())
                .await?;
            println!(
                "Downloaded: {bucket}/{key} → {} ({})",
                local.display(),
                format_size(bytes)
            );
        }
        Command::Rm { bucket, keys } => delete_keys(&client, &bucket, &keys).await?,
    }
    Ok(())
}

/// Delete every key, reporting each failure and continuing with the rest.
async fn delete_keys(client: &StorageClient, bucket: &str, keys: &[String]) -> Result<()> {
    let mut failed_keys = Vec::new();

    for key in keys {
        match client.delete(bucket, key).await {
            Ok(()) => println!("Deleted: {bucket}/{key}"),
            Err(e) => {
                eprintln!("{e}");
                failed_keys.push(key.clone());
            }
        }
    }

    if !failed_keys.is_empty() {
        return Err(Error::PartialDeletion { failed_keys });
    }
    Ok(())
}
