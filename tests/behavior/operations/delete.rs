use crate::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use stowage::error::Result;
use stowage::storage::StorageClient;

pub fn tests(client: &StorageClient, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        client,
        test_delete_single_object,
        test_delete_twice,
        test_delete_non_existent_key,
        test_delete_leaves_siblings
    ));

    tests.extend(async_trials!(client, e2e_test_rm_command_deletes_keys));
}

async fn test_delete_single_object(client: StorageClient) -> Result<()> {
    let key = TEST_FIXTURE.new_key();
    let op = client.operator(&TEST_BUCKET)?;
    op.write(&key, TEST_FIXTURE.new_content(1..1024)).await?;

    client.delete(&TEST_BUCKET, &key).await?;

    let result = op.stat(&key).await;
    assert!(
        matches!(result, Err(ref e) if e.kind() == opendal::ErrorKind::NotFound),
        "object should be gone, got {result:?}"
    );
    Ok(())
}

async fn test_delete_twice(client: StorageClient) -> Result<()> {
    let key = TEST_FIXTURE.new_key();
    client
        .operator(&TEST_BUCKET)?
        .write(&key, TEST_FIXTURE.new_content(1..64))
        .await?;

    client.delete(&TEST_BUCKET, &key).await?;
    client.delete(&TEST_BUCKET, &key).await?;

    Ok(())
}

async fn test_delete_non_existent_key(client: StorageClient) -> Result<()> {
    let key = TEST_FIXTURE.new_key();

    // Deleting a key that was never written is not an error.
    client.delete(&TEST_BUCKET, &key).await?;

    Ok(())
}

async fn test_delete_leaves_siblings(client: StorageClient) -> Result<()> {
    let prefix = TEST_FIXTURE.new_prefix();
    let op = client.operator(&TEST_BUCKET)?;
    let doomed = TEST_FIXTURE.new_key_under(&prefix, "a.txt");
    let kept = TEST_FIXTURE.new_key_under(&prefix, "b.txt");
    op.write(&doomed, TEST_FIXTURE.new_content(1..64)).await?;
    op.write(&kept, TEST_FIXTURE.new_content(1..64)).await?;

    client.delete(&TEST_BUCKET, &doomed).await?;

    let keys = client.list(&TEST_BUCKET, &prefix, 10).await?;
    assert_eq!(keys, vec![kept]);
    Ok(())
}

async fn e2e_test_rm_command_deletes_keys(client: StorageClient) -> Result<()> {
    let op = client.operator(&TEST_BUCKET)?;
    let first = TEST_FIXTURE.new_key();
    let second = TEST_FIXTURE.new_key();
    op.write(&first, TEST_FIXTURE.new_content(1..64)).await?;
    op.write(&second, TEST_FIXTURE.new_content(1..64)).await?;

    stowage_cmd()
        .arg("rm")
        .arg(TEST_BUCKET.as_str())
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted").count(2));

    assert!(!op.exists(&first).await?);
    assert!(!op.exists(&second).await?);
    Ok(())
}
