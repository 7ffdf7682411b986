//! Granule references and the "first granule in bucket" resolver.
//!
//! Resolution does not trust the storage backend's listing order: keys are
//! sorted lexicographically (byte order) before the first eligible one is
//! picked, so the same listing always yields the same granule.

use std::fmt;

use tracing::{debug, info};

use crate::contract::StorageClient;
use crate::error::{PublishError, Result};

/// Key suffixes of files this pipeline (or a previous run of it) writes next to granules.
pub const SIDECAR_SUFFIXES: &[&str] = &[".stac.json", ".premet", ".spatial", ".ndjson"];

/// URI of one granule's data location, e.g. `s3://bucket/path/to/granule.nc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GranuleReference(String);

impl GranuleReference {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Builds `s3://<bucket>/<key>`.
    pub fn from_bucket_key(bucket: &str, key: &str) -> Self {
        Self(format!("s3://{}/{}", bucket, key.trim_start_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path portion of the URI (everything after `scheme://host`), without the leading slash.
    pub fn key(&self) -> &str {
        let rest = match self.0.split_once("://") {
            Some((_, rest)) => match rest.split_once('/') {
                Some((_, path)) => path,
                None => "",
            },
            None => self.0.as_str(),
        };
        rest.trim_start_matches('/')
    }

    /// Parent "directory" of the granule's key; empty when the granule sits at the bucket root.
    ///
    /// A trailing slash is ignored, so `s3://b/granules/G1/` has parent `granules`.
    pub fn parent_prefix(&self) -> &str {
        parent_of_key(self.key())
    }

    /// Filesystem-safe directory name unique to this granule.
    ///
    /// `/` becomes `_`; `%`, `_` and `:` are percent-escaped first, so two
    /// distinct URIs never share a directory.
    pub fn work_dir_name(&self) -> String {
        let mut name = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            match c {
                '%' => name.push_str("%25"),
                '_' => name.push_str("%5F"),
                ':' => name.push_str("%3A"),
                '/' => name.push('_'),
                other => name.push(other),
            }
        }
        name
    }
}

impl fmt::Display for GranuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parent "directory" of an object key; empty for root-level keys.
pub fn parent_of_key(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) => parent.trim_start_matches('/'),
        None => "",
    }
}

/// Whether `key` names granule data rather than a directory marker or a metadata sidecar.
pub fn is_eligible_granule_key(key: &str) -> bool {
    !key.is_empty()
        && !key.ends_with('/')
        && !SIDECAR_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

/// Picks the lexicographically first eligible key.
pub fn select_granule<I, K>(bucket: &str, keys: I) -> Option<GranuleReference>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    keys.into_iter()
        .filter(|k| is_eligible_granule_key(k.as_ref()))
        .min_by(|a, b| a.as_ref().cmp(b.as_ref()))
        .map(|k| GranuleReference::from_bucket_key(bucket, k.as_ref()))
}

/// Lists `bucket/prefix` and returns the first eligible granule.
pub async fn resolve_granule<S>(storage: &S, bucket: &str, prefix: &str) -> Result<GranuleReference>
where
    S: StorageClient + ?Sized,
{
    if bucket.is_empty() {
        return Err(PublishError::InvalidArgument(
            "a bucket is required to resolve a granule".to_string(),
        ));
    }

    let keys = storage
        .list_keys(bucket, prefix)
        .await
        .map_err(|source| PublishError::Storage {
            bucket: bucket.to_string(),
            source,
        })?;
    debug!(bucket, prefix, listed = keys.len(), "Listed candidate granule keys");

    match select_granule(bucket, &keys) {
        Some(granule) => {
            info!(bucket, prefix, granule = %granule, "Resolved granule from bucket");
            Ok(granule)
        }
        None => Err(PublishError::NotFound {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }),
    }
}
