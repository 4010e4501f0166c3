mod common;

use common::get_test_template;
use futures_util::StreamExt;
use minio_template::transport::Operation;
use minio_template::BucketFilter;
use regex::Regex;
use tokio;

#[tokio::main]
#[test]
async fn test_ensure_bucket() {
    let (template, transport) = get_test_template();

    assert!(!template.is_bucket("test-bucket").await);
    assert!(template.ensure_bucket("test-bucket", false).await);
    assert!(template.ensure_bucket("test-bucket", false).await);
    assert!(template.is_bucket("test-bucket").await);
    assert_eq!(transport.calls(Operation::CreateBucket), 1);

    assert!(template.ensure_bucket("test-locked", true).await);
    assert_eq!(transport.is_object_lock("test-locked"), Some(true));

    // invalid names never reach the service
    assert!(!template.ensure_bucket("Test_Bucket", false).await);
    assert_eq!(transport.calls(Operation::CreateBucket), 2);
}

#[tokio::main]
#[test]
async fn test_ensure_bucket_failure() {
    let (template, transport) = get_test_template();

    transport.fail_operation(Operation::CreateBucket);
    assert!(!template.ensure_bucket("test-bucket", false).await);
    assert!(!template.is_bucket("test-bucket").await);

    transport.clear_failures();
    transport.fail_operation(Operation::HeadBucket);
    assert!(!template.ensure_bucket("test-bucket", false).await);
    assert!(!template.is_bucket("test-bucket").await);
    assert_eq!(transport.calls(Operation::CreateBucket), 1);
}

#[tokio::main]
#[test]
async fn test_buckets() {
    let (template, transport) = get_test_template();
    for name in ["root-1", "root-2", "root-12-old", "other"] {
        assert!(template.ensure_bucket(name, false).await);
    }

    let all: Vec<String> = template
        .buckets(BucketFilter::All)
        .map(|b| b.name)
        .collect()
        .await;
    assert_eq!(all, vec!["other", "root-1", "root-12-old", "root-2"]);

    let names: Vec<String> = template
        .buckets(BucketFilter::names(["root-1", "missing", "other"]))
        .map(|b| b.name)
        .collect()
        .await;
    assert_eq!(names, vec!["other", "root-1"]);

    let calls = transport.calls(Operation::ListBuckets);
    let none: Vec<_> = template
        .buckets(BucketFilter::names(Vec::<String>::new()))
        .collect()
        .await;
    assert!(none.is_empty());
    assert_eq!(transport.calls(Operation::ListBuckets), calls);

    let pattern = Regex::new("root-[0-9]+").unwrap();
    let matched: Vec<String> = template
        .buckets(BucketFilter::Pattern(pattern))
        .map(|b| b.name)
        .collect()
        .await;
    assert_eq!(matched, vec!["root-1", "root-2"]);

    let predicate = BucketFilter::predicate(|b| b.name.ends_with("-old"));
    let old: Vec<String> = template.buckets(predicate).map(|b| b.name).collect().await;
    assert_eq!(old, vec!["root-12-old"]);

    let bucket = template.bucket_of("root-1").await.unwrap();
    assert_eq!(bucket.name, "root-1");
    assert!(bucket.creation_time.is_some());
    assert!(template.bucket_of("missing").await.is_none());

    transport.fail_operation(Operation::ListBuckets);
    let failed: Vec<_> = template.buckets(BucketFilter::All).collect().await;
    assert!(failed.is_empty());
    assert!(template.bucket_of("root-1").await.is_none());
}

#[tokio::main]
#[test]
async fn test_buckets_is_lazy() {
    let (template, transport) = get_test_template();
    let stream = template.buckets(BucketFilter::All);
    assert_eq!(transport.calls(Operation::ListBuckets), 0);
    drop(stream);
    assert_eq!(transport.calls(Operation::ListBuckets), 0);
}
