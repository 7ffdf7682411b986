//! Upload-and-publish fan-out for one set of local files.
//!
//! Two independent destinations:
//! - archival: `bucket` + `bucket_prefix`, uploaded with the ambient credentials.
//!   Active only when both are non-empty.
//! - publish: `publish_bucket` + `publish_prefix`, uploaded with the
//!   publish-scoped client. Active whenever the bucket is set; an empty prefix
//!   means the bucket root.
//!
//! With neither configured, distribution is a no-op.

use std::path::Path;

use tracing::info;

use crate::contract::StorageClient;
use crate::error::{PublishError, Result};

/// Where artifacts go. Presence of a field activates that destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationSpec {
    pub bucket: Option<String>,
    pub bucket_prefix: String,
    pub publish_bucket: Option<String>,
    pub publish_prefix: String,
    pub stac_items_endpoint: Option<String>,
}

/// A fully specified bucket + prefix pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
}

impl Target<'_> {
    fn describe(&self) -> String {
        if self.prefix.is_empty() {
            format!("s3://{}/", self.bucket)
        } else {
            format!("s3://{}/{}/", self.bucket, self.prefix.trim_matches('/'))
        }
    }
}

impl DestinationSpec {
    /// Archival target, if both bucket and prefix are non-empty.
    pub fn archival_target(&self) -> Option<Target<'_>> {
        match self.bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() && !self.bucket_prefix.is_empty() => Some(Target {
                bucket,
                prefix: &self.bucket_prefix,
            }),
            _ => None,
        }
    }

    /// Publish target, if a publish bucket is set.
    pub fn publish_target(&self) -> Option<Target<'_>> {
        match self.publish_bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() => Some(Target {
                bucket,
                prefix: &self.publish_prefix,
            }),
            _ => None,
        }
    }

    /// Same destinations with the catalog endpoint and archival destination removed.
    pub fn publish_only(&self, publish_prefix: impl Into<String>) -> Self {
        DestinationSpec {
            bucket: None,
            bucket_prefix: String::new(),
            publish_bucket: self.publish_bucket.clone(),
            publish_prefix: publish_prefix.into(),
            stac_items_endpoint: None,
        }
    }

    /// Same destinations with only the archival destination kept.
    pub fn archival_only(&self) -> Self {
        DestinationSpec {
            bucket: self.bucket.clone(),
            bucket_prefix: self.bucket_prefix.clone(),
            ..Default::default()
        }
    }
}

/// Upload counts per destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionReport {
    pub archived: usize,
    pub published: usize,
}

/// Uploads every file to each active destination.
///
/// `publish` must be the client built from the publish credential pair. It is
/// only required when a publish bucket is configured.
pub async fn distribute<A, P>(
    files: &[&Path],
    destinations: &DestinationSpec,
    archival: &A,
    publish: Option<&P>,
) -> Result<DistributionReport>
where
    A: StorageClient + ?Sized,
    P: StorageClient + ?Sized,
{
    let mut report = DistributionReport::default();

    if let Some(target) = destinations.archival_target() {
        info!(destination = %target.describe(), files = files.len(), "Uploading metadata files");
        for file in files {
            upload_one(archival, file, target).await?;
            report.archived += 1;
        }
    }

    if let Some(target) = destinations.publish_target() {
        let publish = publish.ok_or_else(|| {
            PublishError::InvalidArgument(format!(
                "publish bucket {} configured without a publish-scoped storage client",
                target.bucket
            ))
        })?;
        info!(destination = %target.describe(), files = files.len(), "Publishing metadata files");
        for file in files {
            upload_one(publish, file, target).await?;
            report.published += 1;
        }
    }

    Ok(report)
}

async fn upload_one<S>(client: &S, file: &Path, target: Target<'_>) -> Result<()>
where
    S: StorageClient + ?Sized,
{
    client
        .upload(file, target.bucket, target.prefix)
        .await
        .map_err(|source| PublishError::UploadFailed {
            destination: target.describe(),
            artifact: file.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archival_requires_bucket_and_prefix() {
        let spec = DestinationSpec {
            bucket: Some("archive".into()),
            ..Default::default()
        };
        assert!(spec.archival_target().is_none());

        let spec = DestinationSpec {
            bucket: Some("archive".into()),
            bucket_prefix: "jobs/1".into(),
            ..Default::default()
        };
        assert_eq!(
            spec.archival_target(),
            Some(Target {
                bucket: "archive",
                prefix: "jobs/1"
            })
        );
    }

    #[test]
    fn publish_accepts_empty_prefix() {
        let spec = DestinationSpec {
            publish_bucket: Some("pub".into()),
            ..Default::default()
        };
        let target = spec.publish_target().unwrap();
        assert_eq!(target.prefix, "");
        assert_eq!(target.describe(), "s3://pub/");
    }

    #[test]
    fn empty_bucket_names_do_not_activate_destinations() {
        let spec = DestinationSpec {
            bucket: Some(String::new()),
            bucket_prefix: "p".into(),
            publish_bucket: Some(String::new()),
            ..Default::default()
        };
        assert!(spec.archival_target().is_none());
        assert!(spec.publish_target().is_none());
    }
}
