//! S3 object storage (via `object_store`) for the two credential domains.
//!
//! The archival destination and granule listing use the ambient AWS
//! environment. Publish uploads use an explicit key pair read from
//! `PUBLISH_ACCESS_KEY_ID` / `PUBLISH_SECRET_ACCESS_KEY`; that pair is its own
//! type and is never merged with the ambient credential chain.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, info, instrument};

use crate::config::StorageConfig;
use crate::contract::{BoxError, StorageClient};
use crate::error::{PublishError, Result};

pub const PUBLISH_ACCESS_KEY_ID_ENV: &str = "PUBLISH_ACCESS_KEY_ID";
pub const PUBLISH_SECRET_ACCESS_KEY_ENV: &str = "PUBLISH_SECRET_ACCESS_KEY";

/// Access key pair scoped to the publish destination.
#[derive(Clone)]
pub struct PublishCredentials {
    access_key_id: String,
    secret_access_key: String,
}

impl PublishCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let read = |variable: &'static str| {
            std::env::var(variable)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(PublishError::MissingCredentials { variable })
        };
        Ok(Self::new(
            read(PUBLISH_ACCESS_KEY_ID_ENV)?,
            read(PUBLISH_SECRET_ACCESS_KEY_ENV)?,
        ))
    }
}

impl fmt::Debug for PublishCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
enum CredentialDomain {
    Ambient,
    Publish(PublishCredentials),
}

/// S3 client bound to one credential domain. A store is built per bucket.
#[derive(Debug, Clone)]
pub struct S3Storage {
    domain: CredentialDomain,
    config: StorageConfig,
}

impl S3Storage {
    /// Client using the caller's ambient AWS credentials.
    pub fn ambient(config: StorageConfig) -> Self {
        Self {
            domain: CredentialDomain::Ambient,
            config,
        }
    }

    /// Client using only the publish-scoped key pair.
    pub fn publish(credentials: PublishCredentials, config: StorageConfig) -> Self {
        Self {
            domain: CredentialDomain::Publish(credentials),
            config,
        }
    }

    fn domain_name(&self) -> &'static str {
        match self.domain {
            CredentialDomain::Ambient => "ambient",
            CredentialDomain::Publish(_) => "publish",
        }
    }

    fn store(&self, bucket: &str) -> Result<AmazonS3, BoxError> {
        let mut builder = match &self.domain {
            CredentialDomain::Ambient => AmazonS3Builder::from_env(),
            CredentialDomain::Publish(creds) => AmazonS3Builder::new()
                .with_access_key_id(&creds.access_key_id)
                .with_secret_access_key(&creds.secret_access_key),
        }
        .with_bucket_name(bucket);

        if let Some(region) = self
            .config
            .region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
        {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if self.config.allow_http {
            builder = builder.with_allow_http(true);
        }

        Ok(builder.build()?)
    }
}

/// Key for `file_name` under `prefix`.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// Splits `s3://bucket/key` into its bucket and key.
pub fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

#[async_trait]
impl StorageClient for S3Storage {
    #[instrument(skip(self), fields(domain = self.domain_name()))]
    async fn upload(&self, local_path: &Path, bucket: &str, prefix: &str) -> Result<(), BoxError> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("{} has no usable file name", local_path.display()))?;
        let key = object_key(prefix, file_name);
        let data = Bytes::from(tokio::fs::read(local_path).await?);
        debug!(size = data.len(), key = %key, "Writing object");

        self.store(bucket)?
            .put(&ObjectPath::from(key.as_str()), data.into())
            .await?;
        info!(key = %key, "Uploaded to s3://{}/{}", bucket, key);
        Ok(())
    }

    #[instrument(skip(self), fields(domain = self.domain_name()))]
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BoxError> {
        let store = self.store(bucket)?;
        let prefix_path = ObjectPath::from(prefix.trim_matches('/'));
        let location = if prefix.trim_matches('/').is_empty() {
            None
        } else {
            Some(&prefix_path)
        };

        let mut keys = Vec::new();
        let mut stream = store.list(location);
        while let Some(meta) = stream.try_next().await? {
            keys.push(meta.location.to_string());
        }
        keys.sort();
        Ok(keys)
    }

    #[instrument(skip(self), fields(domain = self.domain_name()))]
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, BoxError> {
        let result = self.store(bucket)?.get(&ObjectPath::from(key)).await?;
        let bytes = result.bytes().await?;
        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }
}
