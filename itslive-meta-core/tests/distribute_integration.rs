use std::path::Path;

use itslive_meta_core::contract::MockStorageClient;
use itslive_meta_core::distribute::{distribute, DestinationSpec};
use itslive_meta_core::PublishError;

const FILES: [&str; 3] = ["/tmp/G1.stac.json", "/tmp/G1.nc.premet", "/tmp/G1.nc.spatial"];

fn files() -> Vec<&'static Path> {
    FILES.iter().map(|f| Path::new(*f)).collect()
}

fn storage_expecting(uploads: usize, bucket: &'static str, prefix: &'static str) -> MockStorageClient {
    let mut storage = MockStorageClient::new();
    storage
        .expect_upload()
        .withf(move |_path: &Path, b: &str, p: &str| b == bucket && p == prefix)
        .times(uploads)
        .returning(|_, _, _| Ok(()));
    storage
}

#[tokio::test]
async fn upload_count_matches_fully_specified_destinations() {
    let cases = [
        // (bucket, bucket_prefix, publish_bucket, archived, published)
        (None, "", None, 0, 0),
        (Some("archive"), "", None, 0, 0),
        (Some("archive"), "jobs/1", None, 3, 0),
        (None, "", Some("pub"), 0, 3),
        (Some("archive"), "jobs/1", Some("pub"), 3, 3),
        (Some("archive"), "", Some("pub"), 0, 3),
    ];

    for (bucket, bucket_prefix, publish_bucket, archived, published) in cases {
        let spec = DestinationSpec {
            bucket: bucket.map(str::to_string),
            bucket_prefix: bucket_prefix.to_string(),
            publish_bucket: publish_bucket.map(str::to_string),
            publish_prefix: "granules".to_string(),
            stac_items_endpoint: None,
        };
        let archival = storage_expecting(archived, "archive", "jobs/1");
        let publish = storage_expecting(published, "pub", "granules");

        let report = distribute(&files(), &spec, &archival, Some(&publish))
            .await
            .expect("distribution should succeed");
        assert_eq!(report.archived, archived, "spec: {spec:?}");
        assert_eq!(report.published, published, "spec: {spec:?}");
    }
}

#[tokio::test]
async fn publish_uploads_never_use_archival_client() {
    let spec = DestinationSpec {
        publish_bucket: Some("pub".into()),
        publish_prefix: String::new(),
        ..Default::default()
    };
    let mut archival = MockStorageClient::new();
    archival.expect_upload().never();
    let publish = storage_expecting(3, "pub", "");

    let report = distribute(&files(), &spec, &archival, Some(&publish))
        .await
        .unwrap();
    assert_eq!(report.published, 3);
}

#[tokio::test]
async fn publish_without_publish_client_is_rejected() {
    let spec = DestinationSpec {
        publish_bucket: Some("pub".into()),
        ..Default::default()
    };
    let archival = MockStorageClient::new();
    let err = distribute(&files(), &spec, &archival, None::<&MockStorageClient>)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::InvalidArgument(_)));
}

#[tokio::test]
async fn upload_failure_names_destination_and_artifact() {
    let spec = DestinationSpec {
        bucket: Some("archive".into()),
        bucket_prefix: "jobs/1".into(),
        publish_bucket: Some("pub".into()),
        ..Default::default()
    };
    let mut archival = MockStorageClient::new();
    archival
        .expect_upload()
        .times(1)
        .returning(|_, _, _| Err("access denied".into()));
    let mut publish = MockStorageClient::new();
    publish.expect_upload().never();

    let err = distribute(&files(), &spec, &archival, Some(&publish))
        .await
        .unwrap_err();
    match err {
        PublishError::UploadFailed {
            destination,
            artifact,
            source,
        } => {
            assert_eq!(destination, "s3://archive/jobs/1/");
            assert_eq!(artifact, "/tmp/G1.stac.json");
            assert!(source.to_string().contains("access denied"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
