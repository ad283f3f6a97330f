use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::storage::constants::{
    DEFAULT_FS_ROOT, DEFAULT_IO_TIMEOUT_SECS, DEFAULT_MINIO_ENDPOINT, DEFAULT_MINIO_REGION,
    DEFAULT_OSS_ENDPOINT, DEFAULT_TIMEOUT_SECS,
};
use crate::storage::{ClientConfig, StorageProvider};

/// Load client configuration from environment variables
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(|key| env::var(key).ok())
}

/// Load client configuration through `lookup`, which returns the value of a
/// variable or `None` when it is unset.
pub fn load_client_config_from<F>(lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let provider_str = lookup("STORAGE_PROVIDER").unwrap_or_else(|| "s3".to_string());
    let provider = StorageProvider::from_str(&provider_str)?;

    let config = match provider {
        StorageProvider::S3 if provider_str.eq_ignore_ascii_case("minio") => {
            load_minio_config(&lookup)?
        }
        StorageProvider::S3 => load_s3_config(&lookup),
        StorageProvider::Oss => load_oss_config(&lookup)?,
        StorageProvider::Fs => load_fs_config(&lookup),
    };

    let timeout = duration_secs(&lookup, "STORAGE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
    let io_timeout = duration_secs(&lookup, "STORAGE_IO_TIMEOUT_SECS", DEFAULT_IO_TIMEOUT_SECS)?;
    Ok(config.with_timeouts(timeout, io_timeout))
}

// First variable among `keys` that is set and non-empty.
fn first_var<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}

fn required_var<F>(lookup: &F, keys: &[&str]) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_var(lookup, keys).ok_or_else(|| Error::MissingEnvVar {
        key: keys.join(" or "),
    })
}

fn duration_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = first_var(lookup, &[key]) else {
        return Ok(Duration::from_secs(default));
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        Ok(_) => Err(Error::InvalidConfigValue {
            key: key.to_string(),
            value,
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(Error::InvalidConfigValue {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }),
    }
}

/// Load AWS S3 configuration. Credentials fall back to the SDK's own chain
/// unless both key variables are set.
fn load_s3_config<F>(lookup: &F) -> ClientConfig
where
    F: Fn(&str) -> Option<String>,
{
    let region = first_var(lookup, &["STORAGE_REGION", "AWS_DEFAULT_REGION", "AWS_REGION"]);
    let mut config = ClientConfig::s3(region);

    if let Some(endpoint) = first_var(lookup, &["STORAGE_ENDPOINT"]) {
        config = config.with_endpoint(endpoint);
    }

    let access_key_id = first_var(lookup, &["STORAGE_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"]);
    let access_key_secret = first_var(
        lookup,
        &["STORAGE_ACCESS_KEY_SECRET", "AWS_SECRET_ACCESS_KEY"],
    );
    if let (Some(id), Some(secret)) = (access_key_id, access_key_secret) {
        config = config.with_static_credentials(id, secret);
    }

    config
}

/// Load MinIO configuration (S3 protocol with static keys)
fn load_minio_config<F>(lookup: &F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let access_key_id = required_var(lookup, &["STORAGE_ACCESS_KEY_ID", "MINIO_ACCESS_KEY"])?;
    let access_key_secret =
        required_var(lookup, &["STORAGE_ACCESS_KEY_SECRET", "MINIO_SECRET_KEY"])?;
    let region = first_var(lookup, &["STORAGE_REGION", "MINIO_DEFAULT_REGION"])
        .unwrap_or_else(|| DEFAULT_MINIO_REGION.to_string());
    let endpoint = first_var(lookup, &["STORAGE_ENDPOINT", "MINIO_ENDPOINT"])
        .unwrap_or_else(|| DEFAULT_MINIO_ENDPOINT.to_string());

    Ok(ClientConfig::s3(Some(region))
        .with_endpoint(endpoint)
        .with_static_credentials(access_key_id, access_key_secret))
}

/// Load OSS (Alibaba Cloud) configuration
fn load_oss_config<F>(lookup: &F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let access_key_id = required_var(lookup, &["STORAGE_ACCESS_KEY_ID", "OSS_ACCESS_KEY_ID"])?;
    let access_key_secret =
        required_var(lookup, &["STORAGE_ACCESS_KEY_SECRET", "OSS_ACCESS_KEY_SECRET"])?;
    let endpoint = first_var(lookup, &["STORAGE_ENDPOINT", "OSS_ENDPOINT"])
        .unwrap_or_else(|| DEFAULT_OSS_ENDPOINT.to_string());

    let mut config = ClientConfig::oss(endpoint, access_key_id, access_key_secret);
    config.region = first_var(lookup, &["STORAGE_REGION", "OSS_REGION"]);
    Ok(config)
}

/// Load filesystem configuration (for local use and testing)
fn load_fs_config<F>(lookup: &F) -> ClientConfig
where
    F: Fn(&str) -> Option<String>,
{
    let root_path =
        first_var(lookup, &["STORAGE_ROOT_PATH"]).unwrap_or_else(|| DEFAULT_FS_ROOT.to_string());
    ClientConfig::fs(root_path)
}
