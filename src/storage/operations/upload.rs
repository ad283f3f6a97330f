use crate::error::{LocalFileNotFoundSnafu, NotAFileSnafu, Result};
use crate::storage::transfer::{PartLimits, TransferConfig, TransferStrategy, UploadReport};
use opendal::{Operator, Writer};
use snafu::ensure;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Trait for uploading a local file as a single object.
pub trait Uploader {
    /// Upload the file at `local_path` under `key`.
    ///
    /// # Arguments
    /// * `local_path` - Source file on the local filesystem
    /// * `key` - Destination object key
    /// * `transfer` - Threshold and part settings deciding single vs multipart
    ///
    /// # Returns
    /// * `Result<UploadReport>` - Size and strategy of the finished upload
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        transfer: &TransferConfig,
    ) -> Result<UploadReport>;
}

/// Implementation of Uploader for OpenDAL Operator.
pub struct OpenDalUploader {
    operator: Operator,
    part_limits: Option<PartLimits>,
}

impl OpenDalUploader {
    /// Create a new uploader with the given OpenDAL operator.
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            part_limits: None,
        }
    }

    /// Stretch multipart part sizes to fit the service's limits.
    pub fn with_part_limits(mut self, part_limits: Option<PartLimits>) -> Self {
        self.part_limits = part_limits;
        self
    }

    async fn upload_single(&self, local_path: &Path, key: &str) -> Result<()> {
        let content = fs::read(local_path).await?;
        self.operator.write(key, content).await?;
        Ok(())
    }

    /// Stream the file through a chunked writer; the service assembles the parts.
    async fn upload_multipart(
        &self,
        local_path: &Path,
        key: &str,
        transfer: &TransferConfig,
    ) -> Result<u64> {
        let mut file = fs::File::open(local_path).await?;
        let mut writer = self
            .operator
            .writer_with(key)
            .chunk(transfer.multipart_chunksize)
            .concurrent(transfer.max_concurrency)
            .await?;

        let sent = match pump_parts(&mut file, &mut writer, transfer.multipart_chunksize).await {
            Ok(sent) => sent,
            Err(err) => {
                abort_writer(&mut writer, key).await;
                return Err(err);
            }
        };

        if let Err(err) = writer.close().await {
            abort_writer(&mut writer, key).await;
            return Err(err.into());
        }
        Ok(sent)
    }
}

/// Copy the file into `writer` one part at a time.
async fn pump_parts(file: &mut fs::File, writer: &mut Writer, part_size: usize) -> Result<u64> {
    let mut buffer = vec![0u8; part_size];
    let mut total_bytes = 0u64;

    loop {
        let filled = fill_buffer(file, &mut buffer).await?;
        if filled == 0 {
            break;
        }
        writer.write(buffer[..filled].to_vec()).await?;
        total_bytes += filled as u64;
        log::trace!("sent {total_bytes} byte(s)");
    }

    Ok(total_bytes)
}

/// Read until `buffer` is full or the file ends.
async fn fill_buffer(file: &mut fs::File, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

async fn abort_writer(writer: &mut Writer, key: &str) {
    if let Err(err) = writer.abort().await {
        log::warn!("failed to abort multipart upload of {key}: {err}");
    }
}

impl Uploader for OpenDalUploader {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        transfer: &TransferConfig,
    ) -> Result<UploadReport> {
        transfer.validate()?;
        ensure!(
            local_path.exists(),
            LocalFileNotFoundSnafu {
                path: local_path.to_path_buf()
            }
        );

        let metadata = fs::metadata(local_path).await?;
        ensure!(
            metadata.is_file(),
            NotAFileSnafu {
                path: local_path.to_path_buf()
            }
        );

        let size = metadata.len();
        let transfer = &transfer.fitted_to(size, self.part_limits);
        let strategy = transfer.strategy_for(size);
        let bytes = match strategy {
            TransferStrategy::SinglePart => {
                self.upload_single(local_path, key).await?;
                size
            }
            TransferStrategy::Multipart { parts } => {
                log::debug!("uploading {key} in {parts} part(s)");
                self.upload_multipart(local_path, key, transfer).await?
            }
        };

        Ok(UploadReport {
            key: key.to_string(),
            bytes,
            strategy,
        })
    }
}
