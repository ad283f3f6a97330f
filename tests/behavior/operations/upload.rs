use crate::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use stowage::error::{Error, Result};
use stowage::storage::{StorageClient, TransferConfig, TransferStrategy};
use tokio::fs;

// S3 rejects parts smaller than 5 MiB, except the last one.
const PART_SIZE: usize = 5 * 1024 * 1024;

pub fn tests(client: &StorageClient, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        client,
        test_upload_single_part_round_trip,
        test_upload_multipart_round_trip,
        test_upload_exact_threshold_is_single_part,
        test_upload_missing_local_file
    ));

    tests.extend(async_trials!(client, e2e_test_put_command_uploads_file));
}

fn multipart_config() -> TransferConfig {
    TransferConfig::default()
        .with_multipart_threshold(PART_SIZE as u64)
        .with_multipart_chunksize(PART_SIZE)
        .with_max_concurrency(4)
}

async fn test_upload_single_part_round_trip(client: StorageClient) -> Result<()> {
    let (source, content) = TEST_FIXTURE.new_local_file(64 * 1024);
    let key = TEST_FIXTURE.new_key();

    let report = client
        .upload(&TEST_BUCKET, &source, &key, &TransferConfig::default())
        .await?;
    assert_eq!(report.strategy, TransferStrategy::SinglePart);

    let target = TEST_FIXTURE.new_local_path();
    client
        .download(&TEST_BUCKET, &key, &target, &TransferConfig::default())
        .await?;
    assert_eq!(fs::read(&target).await?, content);
    Ok(())
}

async fn test_upload_multipart_round_trip(client: StorageClient) -> Result<()> {
    let (source, content) = TEST_FIXTURE.new_local_file(2 * PART_SIZE + 4321);
    let key = TEST_FIXTURE.new_key();

    let report = client
        .upload(&TEST_BUCKET, &source, &key, &multipart_config())
        .await?;
    assert_eq!(report.strategy, TransferStrategy::Multipart { parts: 3 });
    assert_eq!(report.bytes, content.len() as u64);

    let target = TEST_FIXTURE.new_local_path();
    client
        .download(&TEST_BUCKET, &key, &target, &TransferConfig::default())
        .await?;
    assert_eq!(fs::read(&target).await?, content);
    Ok(())
}

async fn test_upload_exact_threshold_is_single_part(client: StorageClient) -> Result<()> {
    let (source, content) = TEST_FIXTURE.new_local_file(PART_SIZE);
    let key = TEST_FIXTURE.new_key();

    let report = client
        .upload(&TEST_BUCKET, &source, &key, &multipart_config())
        .await?;

    assert_eq!(report.strategy, TransferStrategy::SinglePart);
    let stored = client.operator(&TEST_BUCKET)?.read(&key).await?;
    assert_eq!(stored.to_vec(), content);
    Ok(())
}

async fn test_upload_missing_local_file(client: StorageClient) -> Result<()> {
    let source = TEST_FIXTURE.new_local_path();
    let key = TEST_FIXTURE.new_key();

    let err = client
        .upload(&TEST_BUCKET, &source, &key, &TransferConfig::default())
        .await
        .expect_err("upload of a missing file should fail");

    assert!(matches!(err, Error::UploadFailed { .. }), "got {err}");
    assert!(matches!(err.root_cause(), Error::LocalFileNotFound { .. }));
    assert!(!client.operator(&TEST_BUCKET)?.exists(&key).await?);
    Ok(())
}

async fn e2e_test_put_command_uploads_file(client: StorageClient) -> Result<()> {
    let (source, content) = TEST_FIXTURE.new_local_file(1024);
    let key = TEST_FIXTURE.new_key();

    stowage_cmd()
        .arg("put")
        .arg(TEST_BUCKET.as_str())
        .arg(&source)
        .arg(&key)
        .assert()
        .success()
        .stdout(predicate::str::contains("Upload"));

    let uploaded = client.operator(&TEST_BUCKET)?.read(&key).await?;
    assert_eq!(uploaded.to_vec(), content);
    Ok(())
}
