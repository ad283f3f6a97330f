use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Environment variable '{key}' is required but not found"))]
    MissingEnvVar { key: String },

    #[snafu(display("Unsupported storage provider: {provider}"))]
    UnsupportedProvider { provider: String },

    #[snafu(display("Invalid value '{value}' for '{key}': {reason}"))]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[snafu(display("Bucket name must not be empty"))]
    EmptyBucket,

    #[snafu(display("Page size must be at least 1"))]
    InvalidPageSize,

    #[snafu(display("Local file does not exist: {}", path.display()))]
    LocalFileNotFound { path: PathBuf },

    #[snafu(display("Not a regular file: {}", path.display()))]
    NotAFile { path: PathBuf },

    #[snafu(display("Object not found: {key}"))]
    ObjectNotFound { key: String },

    #[snafu(display("Object changed while it was being downloaded: {key}"))]
    ObjectChanged { key: String },

    #[snafu(display("Access denied: {source}"))]
    PermissionDenied { source: opendal::Error },

    #[snafu(display("Partial deletion failure: {} key(s) failed to delete: {}", failed_keys.len(), failed_keys.join(", ")))]
    PartialDeletion { failed_keys: Vec<String> },

    #[snafu(display("Failed to list '{bucket}/{prefix}' after {} key(s): {source}", partial_keys.len()))]
    ListFailed {
        bucket: String,
        prefix: String,
        partial_keys: Vec<String>,
        source: Box<Error>,
    },

    #[snafu(display("Failed to upload '{local_path}' to '{bucket}/{key}': {source}"))]
    UploadFailed {
        bucket: String,
        key: String,
        local_path: String,
        source: Box<Error>,
    },

    #[snafu(display("Failed to download '{bucket}/{key}' to '{local_path}': {source}"))]
    DownloadFailed {
        bucket: String,
        key: String,
        local_path: String,
        source: Box<Error>,
    },

    #[snafu(display("Failed to delete '{bucket}/{key}': {source}"))]
    DeleteFailed {
        bucket: String,
        key: String,
        source: Box<Error>,
    },

    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display("OpenDAL error: {source}"))]
    OpenDal { source: opendal::Error },

    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },
}

impl Error {
    /// The innermost error, skipping the per-operation wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::ListFailed { source, .. }
            | Error::UploadFailed { source, .. }
            | Error::DownloadFailed { source, .. }
            | Error::DeleteFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the failure was caused by a missing remote object.
    pub fn is_not_found(&self) -> bool {
        match self.root_cause() {
            Error::ObjectNotFound { .. } => true,
            Error::OpenDal { source } => source.kind() == opendal::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Whether the service rejected the request for lack of permissions.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.root_cause(), Error::PermissionDenied { .. })
    }
}

impl From<opendal::Error> for Error {
    fn from(error: opendal::Error) -> Self {
        match error.kind() {
            opendal::ErrorKind::PermissionDenied => Error::PermissionDenied { source: error },
            _ => Error::OpenDal { source: error },
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io { source: error }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json { source: error }
    }
}
