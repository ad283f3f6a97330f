use crate::error::{Error, NotAFileSnafu, ObjectChangedSnafu, ObjectNotFoundSnafu, Result};
use crate::storage::transfer::TransferConfig;
use crate::storage::utils::path::{non_empty_parent, partial_download_path};
use opendal::Operator;
use snafu::OptionExt;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Trait for downloading a single object to a local file.
pub trait Downloader {
    /// Download the object stored under `key` to `local_path`, replacing any
    /// existing file there.
    ///
    /// # Arguments
    /// * `key` - Source object key
    /// * `local_path` - Destination file on the local filesystem
    /// * `transfer` - Ranged read size
    ///
    /// # Returns
    /// * `Result<u64>` - Number of bytes written
    async fn download(
        &self,
        key: &str,
        local_path: &Path,
        transfer: &TransferConfig,
    ) -> Result<u64>;
}

/// Implementation of Downloader for OpenDAL Operator.
pub struct OpenDalDownloader {
    operator: Operator,
}

impl OpenDalDownloader {
    /// Create a new downloader with the given OpenDAL operator.
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Size and ETag of `key`, if the service reports one.
    async fn object_version(&self, key: &str) -> Result<(u64, Option<String>)> {
        match self.operator.stat(key).await {
            Ok(meta) => Ok((meta.content_length(), meta.etag().map(str::to_string))),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => ObjectNotFoundSnafu {
                key: key.to_string(),
            }
            .fail(),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the object into `partial` with ranged reads of `chunk_size` bytes.
    ///
    /// With an `etag`, every read is conditional on it so a replaced object
    /// fails the download instead of mixing two versions.
    async fn fetch_into(
        &self,
        key: &str,
        partial: &Path,
        size: u64,
        etag: Option<&str>,
        chunk_size: u64,
    ) -> Result<u64> {
        let mut reader = self.operator.reader_with(key);
        match etag {
            Some(etag) if self.operator.info().full_capability().read_with_if_match => {
                reader = reader.if_match(etag);
            }
            _ => log::debug!("reading {key} without a version check"),
        }
        let reader = reader.await.map_err(|err| read_error(key, err))?;
        let mut file = fs::File::create(partial).await?;

        let mut offset = 0u64;
        while offset < size {
            let end = (offset + chunk_size).min(size);
            let buffer = reader
                .read(offset..end)
                .await
                .map_err(|err| read_error(key, err))?;
            if buffer.is_empty() {
                // The object shrank after it was stat'ed.
                break;
            }
            file.write_all(&buffer.to_bytes()).await?;
            offset += buffer.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(offset)
    }
}

impl Downloader for OpenDalDownloader {
    async fn download(
        &self,
        key: &str,
        local_path: &Path,
        transfer: &TransferConfig,
    ) -> Result<u64> {
        transfer.validate()?;
        let partial = partial_download_path(local_path).context(NotAFileSnafu {
            path: local_path.to_path_buf(),
        })?;

        // Nothing touches the local filesystem until the object is known to exist.
        let (size, etag) = self.object_version(key).await?;

        if let Some(parent) = non_empty_parent(local_path) {
            fs::create_dir_all(parent).await?;
        }

        let written = match self
            .fetch_into(
                key,
                &partial,
                size,
                etag.as_deref(),
                transfer.download_chunksize as u64,
            )
            .await
        {
            Ok(written) => written,
            Err(err) => {
                discard_partial(&partial).await;
                return Err(err);
            }
        };

        if let Err(err) = fs::rename(&partial, local_path).await {
            discard_partial(&partial).await;
            return Err(Error::from(err));
        }
        Ok(written)
    }
}

/// A failed conditional read means the object was replaced mid-download.
fn read_error(key: &str, err: opendal::Error) -> Error {
    if err.kind() == opendal::ErrorKind::ConditionNotMatch {
        return ObjectChangedSnafu {
            key: key.to_string(),
        }
        .build();
    }
    err.into()
}

async fn discard_partial(partial: &Path) {
    if let Err(err) = fs::remove_file(partial).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove {}: {err}", partial.display());
        }
    }
}
