use crate::error::{InvalidConfigValueSnafu, Result};
use crate::storage::constants::{
    DEFAULT_DOWNLOAD_CHUNKSIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_MULTIPART_CHUNKSIZE,
    DEFAULT_MULTIPART_THRESHOLD, S3_MAX_PARTS, S3_MIN_PART_SIZE,
};
use serde::Serialize;
use snafu::ensure;

/// Settings that decide how a file travels to and from the store.
///
/// A file whose size is at most `multipart_threshold` bytes is sent with a
/// single request; anything larger is split into `multipart_chunksize` parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub multipart_threshold: u64,
    pub multipart_chunksize: usize,
    /// Number of parts allowed in flight during a multipart upload.
    pub max_concurrency: usize,
    /// Size of each ranged read while downloading.
    pub download_chunksize: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            multipart_chunksize: DEFAULT_MULTIPART_CHUNKSIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            download_chunksize: DEFAULT_DOWNLOAD_CHUNKSIZE,
        }
    }
}

impl TransferConfig {
    pub fn with_multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = threshold;
        self
    }

    pub fn with_multipart_chunksize(mut self, chunksize: usize) -> Self {
        self.multipart_chunksize = chunksize;
        self
    }

    pub fn with_max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency;
        self
    }

    pub fn with_download_chunksize(mut self, chunksize: usize) -> Self {
        self.download_chunksize = chunksize;
        self
    }

    /// Reject settings that would make a transfer loop forever or never start.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.multipart_chunksize > 0,
            InvalidConfigValueSnafu {
                key: "multipart_chunksize",
                value: self.multipart_chunksize.to_string(),
                reason: "must be greater than zero",
            }
        );
        ensure!(
            self.max_concurrency > 0,
            InvalidConfigValueSnafu {
                key: "max_concurrency",
                value: self.max_concurrency.to_string(),
                reason: "must be greater than zero",
            }
        );
        ensure!(
            self.download_chunksize > 0,
            InvalidConfigValueSnafu {
                key: "download_chunksize",
                value: self.download_chunksize.to_string(),
                reason: "must be greater than zero",
            }
        );
        Ok(())
    }

    /// Settings for a `size`-byte upload with the part size stretched to fit
    /// `limits`.
    ///
    /// The part size is raised to the service minimum, then doubled until the
    /// upload needs no more than the maximum number of parts.
    pub fn fitted_to(&self, size: u64, limits: Option<PartLimits>) -> TransferConfig {
        let Some(limits) = limits else {
            return self.clone();
        };
        let mut part_size = (self.multipart_chunksize as u64).max(limits.min_part_size);
        while size.div_ceil(part_size) > limits.max_parts {
            part_size = part_size.saturating_mul(2);
        }
        if part_size != self.multipart_chunksize as u64 {
            log::debug!(
                "part size raised from {} to {part_size} byte(s) for a {size} byte upload",
                self.multipart_chunksize
            );
        }
        TransferConfig {
            multipart_chunksize: usize::try_from(part_size).unwrap_or(usize::MAX),
            ..self.clone()
        }
    }

    /// Upper bound on the bytes a `size`-byte upload keeps in flight at once.
    pub fn upload_bytes_in_flight(&self, size: u64, limits: Option<PartLimits>) -> u64 {
        if size <= self.multipart_threshold {
            return size;
        }
        let part_size = self.fitted_to(size, limits).multipart_chunksize as u64;
        part_size
            .min(size)
            .saturating_mul(self.max_concurrency as u64)
    }

    /// Pick the upload strategy for a file of `size` bytes.
    pub fn strategy_for(&self, size: u64) -> TransferStrategy {
        if size <= self.multipart_threshold {
            TransferStrategy::SinglePart
        } else {
            TransferStrategy::Multipart {
                parts: size.div_ceil(self.multipart_chunksize as u64),
            }
        }
    }
}

/// Multipart limits a service puts on an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLimits {
    /// Smallest part accepted, except for the last one.
    pub min_part_size: u64,
    pub max_parts: u64,
}

impl PartLimits {
    /// Limits shared by S3 and OSS.
    pub const S3: PartLimits = PartLimits {
        min_part_size: S3_MIN_PART_SIZE,
        max_parts: S3_MAX_PARTS,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStrategy {
    SinglePart,
    Multipart { parts: u64 },
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub key: String,
    pub bytes: u64,
    pub strategy: TransferStrategy,
}
