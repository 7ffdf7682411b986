//! # contract: interfaces to the pipeline's external collaborators
//!
//! The orchestration in this crate never talks to S3, the STAC API or the
//! metadata generator directly. It goes through the three traits below, so
//! production clients and test mocks are interchangeable.
//!
//! - [`StorageClient`]: upload a local file, list keys, fetch an object.
//! - [`MetadataProducer`]: turn one granule into a [`MetadataArtifactSet`] on local disk.
//! - [`CatalogTransport`]: the two STAC transaction requests (create and replace).
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`; enable the `test-export-mocks`
//!   feature (on by default) to use `MockStorageClient` and friends from
//!   integration tests or dependent crates.
//!
//! ## Errors
//! - Collaborators return boxed errors. Callers wrap them into
//!   [`crate::error::PublishError`] with the granule/destination context.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use mockall::automock;

use crate::error::{PublishError, Result};
use crate::granule::GranuleReference;

/// Boxed error returned by collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The three local files produced for one granule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataArtifactSet {
    /// STAC item JSON; its top-level `id` is the catalog key.
    pub stac_item: PathBuf,
    /// NSIDC premet descriptor.
    pub premet: PathBuf,
    /// NSIDC spatial descriptor.
    pub spatial: PathBuf,
}

impl MetadataArtifactSet {
    /// All artifact files, STAC item first.
    pub fn files(&self) -> [&Path; 3] {
        [&self.stac_item, &self.premet, &self.spatial]
    }

    /// Reads the STAC item back from disk.
    pub fn read_stac_item(&self) -> Result<serde_json::Value> {
        let raw = std::fs::read_to_string(&self.stac_item)
            .map_err(|e| PublishError::io(&self.stac_item, e))?;
        serde_json::from_str(&raw).map_err(|e| PublishError::Json {
            path: self.stac_item.clone(),
            source: e,
        })
    }
}

/// Raw reply from the STAC catalog. Non-2xx statuses are not errors at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    pub status: u16,
    pub body: String,
}

/// Object storage access scoped to one credential domain.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload `local_path` to `bucket` as `<prefix>/<file name>` (or `<file name>` for an empty prefix).
    async fn upload(&self, local_path: &Path, bucket: &str, prefix: &str) -> Result<(), BoxError>;

    /// List every key under `prefix`, in the backend's listing order.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BoxError>;

    /// Fetch a whole object.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, BoxError>;
}

/// The metadata generation engine.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MetadataProducer: Send + Sync {
    /// Generate the STAC item and NSIDC descriptors for `granule`, writing them under `work_dir`.
    async fn generate(
        &self,
        granule: &GranuleReference,
        work_dir: &Path,
    ) -> Result<MetadataArtifactSet, BoxError>;
}

/// STAC transaction requests. Each call is attempted exactly once.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// `POST <items_endpoint>` with the item as JSON body.
    async fn create_item(
        &self,
        items_endpoint: &str,
        api_token: &str,
        item: &serde_json::Value,
    ) -> Result<CatalogResponse, BoxError>;

    /// `PUT <item_url>` with the item as JSON body.
    async fn update_item(
        &self,
        item_url: &str,
        api_token: &str,
        item: &serde_json::Value,
    ) -> Result<CatalogResponse, BoxError>;
}
