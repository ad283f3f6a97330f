use crate::*;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use stowage::error::Result;
use stowage::storage::StorageClient;

pub fn tests(client: &StorageClient, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        client,
        test_list_pages_of_two_return_every_key,
        test_list_is_independent_of_page_size,
        test_list_empty_prefix,
        test_list_page_resumes_from_token,
        test_list_with_special_chars
    ));

    tests.extend(async_trials!(
        client,
        e2e_test_ls_command_prints_keys,
        e2e_test_ls_command_json_output
    ));
}

/// Write `count` small objects under a fresh prefix and return the prefix and
/// the keys in the order the service lists them.
async fn stage_objects(client: &StorageClient, count: usize) -> Result<(String, Vec<String>)> {
    let prefix = TEST_FIXTURE.new_prefix();
    let op = client.operator(&TEST_BUCKET)?;

    let mut keys = Vec::new();
    for i in 0..count {
        let key = TEST_FIXTURE.new_key_under(&prefix, &format!("logs/{i:02}.log"));
        op.write(&key, TEST_FIXTURE.new_content(10..200)).await?;
        keys.push(key);
    }
    keys.sort();

    Ok((prefix, keys))
}

async fn test_list_pages_of_two_return_every_key(client: StorageClient) -> Result<()> {
    let (prefix, expected) = stage_objects(&client, 5).await?;

    let keys = client.list(&TEST_BUCKET, &prefix, 2).await?;

    assert_eq!(keys, expected);
    Ok(())
}

async fn test_list_is_independent_of_page_size(client: StorageClient) -> Result<()> {
    let (prefix, expected) = stage_objects(&client, 7).await?;

    for page_size in [1, 3, 7, 1000] {
        let keys = client.list(&TEST_BUCKET, &prefix, page_size).await?;
        assert_eq!(keys, expected, "page_size={page_size}");
    }
    Ok(())
}

async fn test_list_empty_prefix(client: StorageClient) -> Result<()> {
    let prefix = TEST_FIXTURE.new_prefix();

    let keys = client.list(&TEST_BUCKET, &prefix, 10).await?;

    assert!(keys.is_empty(), "fresh prefix should be empty, found {keys:?}");
    Ok(())
}

async fn test_list_page_resumes_from_token(client: StorageClient) -> Result<()> {
    let (prefix, expected) = stage_objects(&client, 5).await?;

    let first = client.list_page(&TEST_BUCKET, &prefix, 3, None).await?;
    assert_eq!(first.keys, expected[..3].to_vec());
    let token = first.next_token.expect("first page should not be the last");

    let second = client
        .list_page(&TEST_BUCKET, &prefix, 3, Some(&token))
        .await?;
    assert_eq!(second.keys, expected[3..].to_vec());
    assert!(second.is_last());

    Ok(())
}

async fn test_list_with_special_chars(client: StorageClient) -> Result<()> {
    let prefix = TEST_FIXTURE.new_prefix();
    let op = client.operator(&TEST_BUCKET)?;
    let names = [
        "file with spaces.txt",
        "file-with-dashes.txt",
        "file_with_underscores.txt",
        "file.with.dots.txt",
    ];

    let mut expected = Vec::new();
    for name in names {
        let key = TEST_FIXTURE.new_key_under(&prefix, name);
        op.write(&key, TEST_FIXTURE.new_content(50..200)).await?;
        expected.push(key);
    }
    expected.sort();

    let keys = client.list(&TEST_BUCKET, &prefix, 2).await?;

    assert_eq!(keys, expected);
    Ok(())
}

async fn e2e_test_ls_command_prints_keys(client: StorageClient) -> Result<()> {
    let (prefix, expected) = stage_objects(&client, 5).await?;

    let mut assert = stowage_cmd()
        .arg("ls")
        .arg(TEST_BUCKET.as_str())
        .arg(&prefix)
        .arg("--page-size")
        .arg("2")
        .assert()
        .success();
    for key in &expected {
        assert = assert.stdout(predicate::str::contains(key.as_str()));
    }

    Ok(())
}

async fn e2e_test_ls_command_json_output(client: StorageClient) -> Result<()> {
    let (prefix, _) = stage_objects(&client, 3).await?;

    stowage_cmd()
        .arg("ls")
        .arg(TEST_BUCKET.as_str())
        .arg(&prefix)
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":3"));

    Ok(())
}
