// Listing related constants
pub const DEFAULT_PAGE_SIZE: usize = 123;

// Transfer related constants
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;
pub const DEFAULT_MULTIPART_CHUNKSIZE: usize = 8 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_DOWNLOAD_CHUNKSIZE: usize = 8 * 1024 * 1024;

// Multipart limits enforced by S3 and OSS
pub const S3_MIN_PART_SIZE: u64 = 5 * 1024 * 1024;
pub const S3_MAX_PARTS: u64 = 10_000;

// Suffix of the temporary file a download streams into before it is renamed
pub const PARTIAL_DOWNLOAD_SUFFIX: &str = ".part";

// Request limits applied to every operator
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 10;
// Transfers stretch the I/O timeout so a link this slow (bytes per second) still completes
pub const MIN_TRANSFER_THROUGHPUT: u64 = 256 * 1024;

// Provider defaults
pub const DEFAULT_FS_ROOT: &str = "./storage";
pub const DEFAULT_MINIO_ENDPOINT: &str = "http://localhost:9000";
pub const DEFAULT_MINIO_REGION: &str = "us-east-1";
pub const DEFAULT_OSS_ENDPOINT: &str = "https://oss-cn-hangzhou.aliyuncs.com";
