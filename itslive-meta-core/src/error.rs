//! Error taxonomy for the publish/ingest pipeline.
//!
//! Every failure aborts the current granule (and, in bulk mode, the whole
//! batch). Variants carry enough context (granule, destination, endpoint) for
//! an operator to resume with a narrowed batch window.

use std::path::PathBuf;

use crate::contract::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The caller supplied insufficient parameters to resolve a granule or destination.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Granule resolution found no eligible object.
    #[error("no eligible granule found under s3://{bucket}/{prefix}")]
    NotFound { bucket: String, prefix: String },

    #[error("failed to upload {artifact} to {destination}: {source}")]
    UploadFailed {
        destination: String,
        artifact: String,
        #[source]
        source: BoxError,
    },

    #[error(
        "invalid STAC items endpoint {endpoint}; expected something like \
         https://<STAC_API>/collections/<COLLECTION>/items"
    )]
    InvalidEndpoint { endpoint: String },

    #[error("missing credentials: environment variable {variable} is not set")]
    MissingCredentials { variable: &'static str },

    /// The item already exists and the caller did not opt into updating it.
    #[error("STAC item {item_id} already exists at {endpoint}")]
    CatalogConflict { item_id: String, endpoint: String },

    #[error("STAC request to {url} failed with HTTP {status}: {body}")]
    CatalogRequestFailed {
        url: String,
        status: u16,
        body: String,
    },

    #[error("STAC request to {url} could not be sent: {source}")]
    CatalogUnreachable {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("metadata generation failed for {granule}: {source}")]
    Producer {
        granule: String,
        #[source]
        source: BoxError,
    },

    #[error("object storage request against bucket {bucket} failed: {source}")]
    Storage {
        bucket: String,
        #[source]
        source: BoxError,
    },

    #[error("manifest {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = PublishError> = std::result::Result<T, E>;

impl PublishError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn manifest(path: impl Into<String>, message: impl Into<String>) -> Self {
        PublishError::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }
}
