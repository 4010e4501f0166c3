mod common;

use std::time::Duration;

use bytes::Bytes;
use common::{get_test_template, get_test_template_with};
use futures_util::StreamExt;
use minio_template::errors::Result;
use minio_template::transport::{read_all, MemoryTransport, Operation};
use minio_template::{ContentResource, MetaData, SaveOutcome};
use tokio;

const BUCKET: &str = "test-object";

#[tokio::main]
#[test]
async fn test_save_and_stat() -> Result<()> {
    let (template, _) = get_test_template();
    let meta = MetaData::from([("color", "red")]);

    // the bucket is created on demand
    assert!(template.save_bytes("dir/hello.txt", BUCKET, "hello minio", Some(&meta)).await);
    assert!(template.is_bucket(BUCKET).await);
    assert!(template.is_item("dir/hello.txt", BUCKET).await);

    let status = template.stat("dir/hello.txt", BUCKET).await;
    assert!(status.is_file());
    assert_eq!(status.content_size, 11);
    assert_eq!(status.content_type(), "text/plain");
    assert_eq!(status.meta_data.get("x-amz-meta-color"), Some("red"));
    assert_eq!(status.etag.as_deref(), Some("1738ebfeeab21fef70b0622d63af59d3"));
    assert!(status.creation_time.is_some());

    assert_eq!(template.meta_of("dir/hello.txt", BUCKET).await?, meta);

    let body = read_all(template.stream("dir/hello.txt", BUCKET).await?).await?;
    assert_eq!(body, Bytes::from_static(b"hello minio"));
    Ok(())
}

#[tokio::main]
#[test]
async fn test_save_rejected() {
    let (template, transport) = get_test_template();

    let empty = ContentResource::from_bytes("empty.txt", Bytes::new());
    let outcome = template.save_outcome("empty.txt", BUCKET, &empty, None).await;
    assert!(matches!(outcome, SaveOutcome::Rejected));
    assert_eq!(transport.calls(Operation::PutObject), 0);

    let resource = ContentResource::from_bytes("a.txt", "a");
    assert!(!template.save("a.txt", "Invalid_Bucket", &resource, None).await);

    transport.fail_operation(Operation::PutObject);
    let outcome = template.save_outcome("a.txt", BUCKET, &resource, None).await;
    assert!(matches!(outcome, SaveOutcome::Failed(_)));
    assert!(!template.is_item("a.txt", BUCKET).await);
}

#[tokio::main]
#[test]
async fn test_save_without_metadata() {
    let (template, transport) = get_test_template();
    transport.fail_operation(Operation::CopyObject);

    let resource = ContentResource::from_bytes("a.txt", "a");
    let meta = MetaData::from([("color", "red")]);
    let outcome = template.save_outcome("a.txt", BUCKET, &resource, Some(&meta)).await;
    match outcome {
        SaveOutcome::StoredWithoutMetadata(err) => {
            assert_eq!(err.operation(), Some(Operation::CopyObject))
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // the body is there, the metadata is not
    let status = template.stat("a.txt", BUCKET).await;
    assert!(status.is_file());
    assert!(status.meta_data.is_empty());
    assert!(!template.save("a.txt", BUCKET, &resource, Some(&meta)).await);

    // empty metadata needs no copy
    assert!(template.save("a.txt", BUCKET, &resource, Some(&MetaData::new())).await);
}

#[tokio::main]
#[test]
async fn test_missing_object() {
    let (template, transport) = get_test_template();
    assert!(!template.is_item("none.txt", BUCKET).await);
    let status = template.stat("none.txt", BUCKET).await;
    assert!(!status.is_file());
    assert_eq!(status.content_size, 0);
    assert_eq!(status.content_type(), "application/octet-stream");

    let err = template.meta_of("none.txt", BUCKET).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!template.delete("none.txt", BUCKET).await);
    assert!(!template.copy("none.txt", BUCKET, "copy.txt", BUCKET, None).await);
    assert!(!template.set_meta("none.txt", BUCKET, &MetaData::from([("a", "b")]), true).await);
    assert!(template.stream("none.txt", BUCKET).await.is_err());

    // a failing service reads as absent, but meta_of escalates
    assert!(template.ensure_bucket(BUCKET, false).await);
    assert!(template.save_bytes("a.txt", BUCKET, "a", None).await);
    transport.fail_operation(Operation::HeadObject);
    assert!(!template.is_item("a.txt", BUCKET).await);
    assert!(!template.stat("a.txt", BUCKET).await.is_file());
    let err = template.meta_of("a.txt", BUCKET).await.unwrap_err();
    assert_eq!(err.operation(), Some(Operation::HeadObject));
}

#[tokio::main]
#[test]
async fn test_delete() {
    let (template, transport) = get_test_template();
    for key in ["a", "b", "c"] {
        assert!(template.save_bytes(key, BUCKET, key.to_owned(), None).await);
    }
    assert!(template.delete("a", BUCKET).await);
    assert!(!template.is_item("a", BUCKET).await);
    assert!(!template.delete("a", BUCKET).await);

    transport.fail_operation(Operation::DeleteObject);
    assert!(!template.delete("b", BUCKET).await);
    assert!(template.is_item("b", BUCKET).await);
}

#[tokio::main]
#[test]
async fn test_delete_all() {
    let (template, transport) = get_test_template();
    for key in ["a", "b", "c", "d"] {
        assert!(template.save_bytes(key, BUCKET, key.to_owned(), None).await);
    }

    // b is refused, a and c stay removed
    transport.reject_key_delete("b");
    assert!(!template.delete_all(["a", "b", "c"], BUCKET).await);
    assert!(!template.is_item("a", BUCKET).await);
    assert!(template.is_item("b", BUCKET).await);
    assert!(!template.is_item("c", BUCKET).await);

    transport.clear_failures();
    assert!(template.delete_all(vec!["b", "d", "b"], BUCKET).await);
    assert!(!template.is_item("b", BUCKET).await);
    assert!(!template.is_item("d", BUCKET).await);

    assert!(template.delete_all(Vec::<String>::new(), BUCKET).await);

    transport.fail_operation(Operation::DeleteObjects);
    assert!(!template.delete_all(["x"], BUCKET).await);
}

#[tokio::main]
#[test]
async fn test_copy() -> Result<()> {
    let (template, _) = get_test_template();
    let meta = MetaData::from([("color", "red"), ("size", "10")]);
    assert!(template.save_bytes("a.json", BUCKET, "{}", Some(&meta)).await);
    assert!(template.ensure_bucket("test-copy", false).await);

    assert!(template.copy("a.json", BUCKET, "b.json", "test-copy", None).await);
    let status = template.stat("b.json", "test-copy").await;
    assert_eq!(status.meta_data, meta);
    assert_eq!(status.content_type(), "application/json");

    let replaced = MetaData::from([("owner", "dean")]);
    assert!(template.copy("a.json", BUCKET, "c.json", BUCKET, Some(&replaced)).await);
    assert_eq!(template.meta_of("c.json", BUCKET).await?, replaced);
    assert_eq!(template.stat("c.json", BUCKET).await.content_type(), "application/json");

    // the destination bucket is not created
    assert!(!template.copy("a.json", BUCKET, "a.json", "test-missing", None).await);
    Ok(())
}

#[tokio::main]
#[test]
async fn test_set_meta() -> Result<()> {
    let (template, transport) = get_test_template();
    let meta = MetaData::from([("color", "red"), ("size", "10")]);
    assert!(template.save_bytes("a.txt", BUCKET, "text", Some(&meta)).await);

    let update = MetaData::from([("color", "blue"), ("owner", "dean")]);
    assert!(template.set_meta("a.txt", BUCKET, &update, true).await);
    let stored = template.meta_of("a.txt", BUCKET).await?;
    assert_eq!(stored.get("color"), Some("blue"));
    assert_eq!(stored.get("size"), Some("10"));
    assert_eq!(stored.get("owner"), Some("dean"));

    assert!(template.set_meta("a.txt", BUCKET, &update, false).await);
    assert_eq!(template.meta_of("a.txt", BUCKET).await?, update);
    assert_eq!(template.stat("a.txt", BUCKET).await.content_type(), "text/plain");

    transport.fail_operation(Operation::CopyObject);
    assert!(!template.set_meta("a.txt", BUCKET, &meta, false).await);
    Ok(())
}

#[tokio::main]
#[test]
async fn test_metadata_escaping() -> Result<()> {
    let (template, _) = get_test_template();
    let meta = MetaData::from([("Path", "a/b c")]);
    assert!(template.save_bytes("a.txt", BUCKET, "text", Some(&meta)).await);
    let stored = template.meta_of("a.txt", BUCKET).await?;
    assert_eq!(stored.get("x-amz-meta-path"), Some("a%2Fb%20c"));
    assert_eq!(stored.get_decoded("path").as_deref(), Some("a/b c"));
    Ok(())
}

#[tokio::main]
#[test]
async fn test_items() -> Result<()> {
    let (template, transport) = get_test_template_with(MemoryTransport::new().with_page_size(2));
    for key in ["a.txt", "dir/b.txt", "dir/c.txt", "dir/sub/d.txt", "e.txt"] {
        assert!(template.save_bytes(key, BUCKET, key.to_owned(), None).await);
    }

    let items: Vec<_> = template.items(BUCKET, false, None).collect().await;
    let names: Vec<(&str, bool)> = items.iter().map(|i| (i.name.as_str(), i.file)).collect();
    assert_eq!(names, vec![("a.txt", true), ("dir/", false), ("e.txt", true)]);
    assert_eq!(items[1].content_size, 0);
    assert!(items[1].last_modified.is_none());
    assert!(items[1].meta().await?.is_empty());
    assert!(!items[1].stat().await.is_file());

    let items: Vec<_> = template.items(BUCKET, true, Some("dir/")).collect().await;
    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["dir/b.txt", "dir/c.txt", "dir/sub/d.txt"]);
    assert!(transport.calls(Operation::ListObjects) >= 3);

    let item = &items[0];
    assert_eq!(item.text().await?, "dir/b.txt");
    assert_eq!(item.stat().await.content_type(), "text/plain");
    assert_eq!(item.content_size, 9);
    assert_eq!(item.etag, item.stat().await.etag);

    let items: Vec<_> = template.items(BUCKET, false, Some("dir/")).collect().await;
    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["dir/b.txt", "dir/c.txt", "dir/sub/"]);

    transport.fail_operation(Operation::ListObjects);
    let items: Vec<_> = template.items(BUCKET, true, None).collect().await;
    assert!(items.is_empty());
    Ok(())
}

#[tokio::main]
#[test]
async fn test_items_is_lazy() {
    let (template, transport) = get_test_template_with(MemoryTransport::new().with_page_size(1));
    for key in ["a", "b", "c"] {
        assert!(template.save_bytes(key, BUCKET, key.to_owned(), None).await);
    }
    let mut items = template.items(BUCKET, true, None);
    assert_eq!(transport.calls(Operation::ListObjects), 0);
    let first = items.next().await.unwrap();
    assert_eq!(first.name, "a");
    assert_eq!(transport.calls(Operation::ListObjects), 1);
}

#[tokio::main]
#[test]
async fn test_presigned_url() {
    let (template, transport) = get_test_template();
    assert!(template.save_bytes("dir/a b.txt", BUCKET, "a", None).await);
    let url = template
        .presigned_url("dir/a b.txt", BUCKET, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(url, "memory://localhost/test-object/dir/a%20b.txt?X-Amz-Expires=60");

    transport.fail_operation(Operation::PresignGetObject);
    assert!(template
        .presigned_url("dir/a b.txt", BUCKET, Duration::from_secs(60))
        .await
        .is_none());
}

#[tokio::main]
#[test]
async fn test_identity() {
    let (template, _) = get_test_template();
    assert_eq!(template.name_of(), "memory");
    assert_eq!(template.server_of(), "memory://localhost");
    assert_eq!(template.region_of(), "us-east-1");

    let (template, _) = get_test_template_with(MemoryTransport::new().with_region("eu-west-1"));
    assert_eq!(template.region_of(), "eu-west-1");
}
