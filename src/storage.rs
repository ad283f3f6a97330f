use crate::error::{EmptyBucketSnafu, Error, InvalidPageSizeSnafu, Result};
use opendal::Operator;
use opendal::layers::{LoggingLayer, TimeoutLayer};
use snafu::ensure;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::fs;

pub mod constants;
mod operations;
pub mod pagination;
pub mod transfer;
mod utils;

use self::constants::{
    DEFAULT_FS_ROOT, DEFAULT_IO_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, MIN_TRANSFER_THROUGHPUT,
};
use self::operations::delete::OpenDalDeleter;
use self::operations::download::OpenDalDownloader;
use self::operations::list::OpenDalLister;
use self::operations::upload::OpenDalUploader;
use self::operations::{Deleter, Downloader, Uploader};
pub use self::pagination::{ContinuationToken, ListPage, PageFailure, PageSource, collect_pages};
pub use self::transfer::{PartLimits, TransferConfig, TransferStrategy, UploadReport};
pub use self::utils::size::{format_size, parse_size};
use crate::wrap_err;

/// Storage provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    S3,
    Oss,
    Fs,
}

impl FromStr for StorageProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "s3" | "aws" | "minio" => Ok(Self::S3),
            "oss" => Ok(Self::Oss),
            "fs" | "local" => Ok(Self::Fs),
            _ => Err(Error::UnsupportedProvider {
                provider: s.to_string(),
            }),
        }
    }
}

impl StorageProvider {
    /// Multipart limits the service enforces, if any.
    pub fn part_limits(self) -> Option<PartLimits> {
        match self {
            Self::S3 | Self::Oss => Some(PartLimits::S3),
            Self::Fs => None,
        }
    }
}

/// Where request signing credentials come from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Let the service SDK resolve credentials from its own environment,
    /// profile and instance-metadata chain.
    Ambient,
    Static {
        access_key_id: String,
        access_key_secret: String,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient => f.write_str("Ambient"),
            Self::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("access_key_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Connection settings shared by every bucket the client talks to.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: StorageProvider,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub credentials: CredentialSource,
    /// Local directory holding one sub-directory per bucket (fs provider only).
    pub root_path: Option<String>,
    /// Upper bound for a whole request.
    pub timeout: Duration,
    /// Upper bound for each read or write step of a request.
    pub io_timeout: Duration,
}

impl ClientConfig {
    fn with_provider(provider: StorageProvider) -> Self {
        Self {
            provider,
            region: None,
            endpoint: None,
            credentials: CredentialSource::Ambient,
            root_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            io_timeout: Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS),
        }
    }

    pub fn s3(region: Option<String>) -> Self {
        Self {
            region,
            ..Self::with_provider(StorageProvider::S3)
        }
    }

    pub fn oss(endpoint: String, access_key_id: String, access_key_secret: String) -> Self {
        Self {
            endpoint: Some(endpoint),
            credentials: CredentialSource::Static {
                access_key_id,
                access_key_secret,
            },
            ..Self::with_provider(StorageProvider::Oss)
        }
    }

    pub fn fs(root_path: String) -> Self {
        Self {
            root_path: Some(root_path),
            ..Self::with_provider(StorageProvider::Fs)
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        self.credentials = CredentialSource::Static {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        };
        self
    }

    pub fn with_timeouts(mut self, timeout: Duration, io_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.io_timeout = io_timeout;
        self
    }

    /// I/O timeout for a step that may move up to `bytes_in_flight` bytes,
    /// never below the configured `io_timeout`.
    pub fn io_timeout_for(&self, bytes_in_flight: u64) -> Duration {
        let needed = Duration::from_secs(bytes_in_flight.div_ceil(MIN_TRANSFER_THROUGHPUT));
        self.io_timeout.max(needed)
    }
}

/// Object store client built on OpenDAL.
///
/// Cloning is cheap; clones share the per-bucket operators, which are built on
/// first use and kept for the lifetime of the client.
#[derive(Clone)]
pub struct StorageClient {
    config: Arc<ClientConfig>,
    operators: Arc<RwLock<HashMap<String, Operator>>>,
}

impl StorageClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
            operators: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn provider(&self) -> StorageProvider {
        self.config.provider
    }

    /// The operator bound to `bucket`, building it on first use.
    pub fn operator(&self, bucket: &str) -> Result<Operator> {
        Ok(self.layered(self.service_operator(bucket)?, self.config.io_timeout))
    }

    /// Like [`StorageClient::operator`], with the I/O timeout stretched to
    /// cover `bytes_in_flight` bytes at the slowest supported throughput.
    fn transfer_operator(&self, bucket: &str, bytes_in_flight: u64) -> Result<Operator> {
        let io_timeout = self.config.io_timeout_for(bytes_in_flight);
        Ok(self.layered(self.service_operator(bucket)?, io_timeout))
    }

    fn layered(&self, operator: Operator, io_timeout: Duration) -> Operator {
        operator
            .layer(
                TimeoutLayer::new()
                    .with_timeout(self.config.timeout)
                    .with_io_timeout(io_timeout),
            )
            .layer(LoggingLayer::default())
    }

    // Cached per bucket without layers; layers are applied per call.
    fn service_operator(&self, bucket: &str) -> Result<Operator> {
        ensure!(!bucket.is_empty(), EmptyBucketSnafu);

        if let Some(operator) = self
            .operators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
        {
            return Ok(operator.clone());
        }

        let mut operators = self
            .operators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(operator) = operators.get(bucket) {
            return Ok(operator.clone());
        }
        let operator = Self::build_operator(&self.config, bucket)?;
        log::debug!(
            "built operator provider={:?} bucket={bucket}",
            self.config.provider
        );
        operators.insert(bucket.to_string(), operator.clone());
        Ok(operator)
    }

    #[allow(unreachable_patterns)]
    fn build_operator(config: &ClientConfig, bucket: &str) -> Result<Operator> {
        let operator = match config.provider {
            #[cfg(feature = "s3")]
            StorageProvider::S3 => {
                let mut builder = opendal::services::S3::default().bucket(bucket);
                if let CredentialSource::Static {
                    access_key_id,
                    access_key_secret,
                } = &config.credentials
                {
                    builder = builder
                        .access_key_id(access_key_id)
                        .secret_access_key(access_key_secret);
                }
                if let Some(region) = &config.region {
                    builder = builder.region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Operator::new(builder)?.finish()
            }

            #[cfg(feature = "oss")]
            StorageProvider::Oss => {
                let mut builder = opendal::services::Oss::default().bucket(bucket);
                if let CredentialSource::Static {
                    access_key_id,
                    access_key_secret,
                } = &config.credentials
                {
                    builder = builder
                        .access_key_id(access_key_id)
                        .access_key_secret(access_key_secret);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Operator::new(builder)?.finish()
            }

            #[cfg(feature = "fs")]
            StorageProvider::Fs => {
                let root =
                    Path::new(config.root_path.as_deref().unwrap_or(DEFAULT_FS_ROOT)).join(bucket);
                let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
                Operator::new(builder)?.finish()
            }

            provider => {
                return Err(Error::UnsupportedProvider {
                    provider: format!("{provider:?} (feature disabled)"),
                });
            }
        };

        Ok(operator)
    }

    /// List every object key under `prefix`, requesting at most `page_size`
    /// keys per round trip.
    ///
    /// Keys come back in the order the service lists them. If any page request
    /// fails the whole listing fails; the error carries the keys gathered from
    /// the pages that succeeded.
    pub async fn list(&self, bucket: &str, prefix: &str, page_size: usize) -> Result<Vec<String>> {
        log::debug!(
            "list provider={:?} bucket={} prefix={} page_size={}",
            self.config.provider,
            bucket,
            prefix,
            page_size
        );
        let mut lister = wrap_err!(
            self.lister(bucket, prefix, page_size),
            ListFailed {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                partial_keys: Vec::new()
            }
        )?;

        let keys = collect_pages(&mut lister)
            .await
            .map_err(|failure| Error::ListFailed {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                partial_keys: failure.partial_keys,
                source: Box::new(failure.source),
            })?;

        log::info!("listed {} key(s) in {bucket}/{prefix}", keys.len());
        Ok(keys)
    }

    /// Request a single listing page, resuming after `token` when given.
    pub async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: usize,
        token: Option<&ContinuationToken>,
    ) -> Result<ListPage> {
        log::debug!(
            "list_page provider={:?} bucket={} prefix={} page_size={} token={:?}",
            self.config.provider,
            bucket,
            prefix,
            page_size,
            token
        );
        let page = async {
            let mut lister = self.lister(bucket, prefix, page_size)?;
            lister.fetch_page(token).await
        };
        wrap_err!(
            page.await,
            ListFailed {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                partial_keys: Vec::new()
            }
        )
    }

    fn lister(&self, bucket: &str, prefix: &str, page_size: usize) -> Result<OpenDalLister> {
        ensure!(page_size >= 1, InvalidPageSizeSnafu);
        let operator = self.operator(bucket)?;
        Ok(OpenDalLister::new(operator, prefix, page_size))
    }

    /// Upload the local file at `local_path` as `key`.
    ///
    /// Files up to `transfer.multipart_threshold` bytes go in one request,
    /// larger ones as a multipart upload. A failed multipart upload is aborted
    /// so no partial object becomes visible.
    pub async fn upload(
        &self,
        bucket: &str,
        local_path: impl AsRef<Path>,
        key: &str,
        transfer: &TransferConfig,
    ) -> Result<UploadReport> {
        let local_path = local_path.as_ref();
        log::debug!(
            "upload provider={:?} bucket={} local_path={} key={}",
            self.config.provider,
            bucket,
            local_path.display(),
            key
        );
        let upload = async {
            let part_limits = self.config.provider.part_limits();
            // A missing file is reported by the uploader itself.
            let size = fs::metadata(local_path)
                .await
                .map(|metadata| metadata.len())
                .unwrap_or_default();
            let operator =
                self.transfer_operator(bucket, transfer.upload_bytes_in_flight(size, part_limits))?;
            let uploader = OpenDalUploader::new(operator).with_part_limits(part_limits);
            uploader.upload(local_path, key, transfer).await
        };
        let report = wrap_err!(
            upload.await,
            UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                local_path: local_path.display().to_string()
            }
        )?;

        log::info!(
            "uploaded {} to {bucket}/{key} ({}, {:?})",
            local_path.display(),
            format_size(report.bytes),
            report.strategy
        );
        Ok(report)
    }

    /// Download `key` into `local_path`, overwriting any existing file.
    ///
    /// A missing object fails with an `ObjectNotFound` cause and leaves
    /// `local_path` untouched.
    pub async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: impl AsRef<Path>,
        transfer: &TransferConfig,
    ) -> Result<u64> {
        let local_path = local_path.as_ref();
        log::debug!(
            "download provider={:?} bucket={} key={} local_path={}",
            self.config.provider,
            bucket,
            key,
            local_path.display()
        );
        let download = async {
            let operator =
                self.transfer_operator(bucket, transfer.download_chunksize as u64)?;
            let downloader = OpenDalDownloader::new(operator);
            downloader.download(key, local_path, transfer).await
        };
        let bytes = wrap_err!(
            download.await,
            DownloadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                local_path: local_path.display().to_string()
            }
        )?;

        log::info!(
            "downloaded {bucket}/{key} to {} ({})",
            local_path.display(),
            format_size(bytes)
        );
        Ok(bytes)
    }

    /// Delete `key`. Deleting a key that does not exist succeeds.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        log::debug!(
            "delete provider={:?} bucket={} key={}",
            self.config.provider,
            bucket,
            key
        );
        let delete = async {
            let deleter = OpenDalDeleter::new(self.operator(bucket)?);
            deleter.delete(key).await
        };
        wrap_err!(
            delete.await,
            DeleteFailed {
                bucket: bucket.to_string(),
                key: key.to_string()
            }
        )?;

        log::info!("deleted {bucket}/{key}");
        Ok(())
    }
}
