//! Single-granule pipeline: resolve → generate → distribute → catalog ingest.

use std::path::PathBuf;

use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::contract::{CatalogTransport, MetadataArtifactSet, MetadataProducer, StorageClient};
use crate::distribute::{distribute, DestinationSpec, DistributionReport};
use crate::error::{PublishError, Result};
use crate::granule::{resolve_granule, GranuleReference};
use crate::stac::{api_token_from_env, ensure_items_endpoint, upsert, CatalogOutcome, STAC_API_TOKEN_ENV};

/// The collaborators a pipeline run talks to.
///
/// `storage` carries the ambient credentials (listing, archival uploads,
/// manifest reads). `publish_storage` is the publish-scoped client and is
/// only needed when a publish bucket is configured.
pub struct Collaborators<'a, S: ?Sized, M: ?Sized, C: ?Sized> {
    pub storage: &'a S,
    pub publish_storage: Option<&'a S>,
    pub producer: &'a M,
    pub catalog: &'a C,
}

// Manual impls: derive would require S, M, C themselves to be Copy.
impl<S: ?Sized, M: ?Sized, C: ?Sized> Clone for Collaborators<'_, S, M, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized, M: ?Sized, C: ?Sized> Copy for Collaborators<'_, S, M, C> {}

/// Inputs of a single-granule run.
#[derive(Debug, Clone, Default)]
pub struct MetaRequest {
    /// Explicit granule; when absent the first granule under `destinations.bucket` is used.
    pub granule_uri: Option<String>,
    /// `publish_prefix` is ignored and derived from the granule URI instead.
    pub destinations: DestinationSpec,
    pub stac_exists_ok: bool,
    pub stac_api_token: Option<String>,
}

impl MetaRequest {
    /// Fills `stac_api_token` from `STAC_API_TOKEN`.
    pub fn with_env_token(mut self) -> Self {
        self.stac_api_token = api_token_from_env();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaReport {
    pub granule: GranuleReference,
    pub artifacts: MetadataArtifactSet,
    pub distribution: DistributionReport,
    pub catalog: Option<CatalogOutcome>,
}

/// Picks the explicit granule or resolves one from the bucket.
pub async fn determine_granule<S>(
    granule_uri: Option<&str>,
    bucket: Option<&str>,
    bucket_prefix: &str,
    storage: &S,
) -> Result<GranuleReference>
where
    S: StorageClient + ?Sized,
{
    match (granule_uri, bucket) {
        (Some(uri), _) if !uri.is_empty() => Ok(GranuleReference::new(uri)),
        (_, Some(bucket)) if !bucket.is_empty() => {
            resolve_granule(storage, bucket, bucket_prefix).await
        }
        _ => Err(PublishError::InvalidArgument(
            "must provide a granule URI or a bucket".to_string(),
        )),
    }
}

/// Working directory for one granule's artifacts.
pub fn granule_work_dir(config: &PipelineConfig, granule: &GranuleReference) -> PathBuf {
    config.output_dir.join(granule.work_dir_name())
}

/// Runs the whole single-granule pipeline.
pub async fn run_meta<S, M, C>(
    config: &PipelineConfig,
    request: &MetaRequest,
    collab: Collaborators<'_, S, M, C>,
) -> Result<MetaReport>
where
    S: StorageClient + ?Sized,
    M: MetadataProducer + ?Sized,
    C: CatalogTransport + ?Sized,
{
    let destinations = &request.destinations;

    // Catalog preconditions are checked before any work is done.
    if let Some(endpoint) = &destinations.stac_items_endpoint {
        ensure_items_endpoint(endpoint)?;
        if request.stac_api_token.is_none() {
            return Err(PublishError::MissingCredentials {
                variable: STAC_API_TOKEN_ENV,
            });
        }
    }

    let granule = determine_granule(
        request.granule_uri.as_deref(),
        destinations.bucket.as_deref(),
        &destinations.bucket_prefix,
        collab.storage,
    )
    .await?;
    info!(granule = %granule, "Processing itslive metadata");

    let work_dir = granule_work_dir(config, &granule);
    let artifacts = collab
        .producer
        .generate(&granule, &work_dir)
        .await
        .map_err(|source| {
            error!(granule = %granule, error = %source, "Metadata generation failed");
            PublishError::Producer {
                granule: granule.to_string(),
                source,
            }
        })?;

    let targets = DestinationSpec {
        publish_prefix: granule.parent_prefix().to_string(),
        ..destinations.clone()
    };
    let distribution = distribute(
        &artifacts.files(),
        &targets,
        collab.storage,
        collab.publish_storage,
    )
    .await?;

    let catalog = match &destinations.stac_items_endpoint {
        Some(endpoint) => {
            let item = artifacts.read_stac_item()?;
            let outcome = upsert(
                collab.catalog,
                &item,
                endpoint,
                request.stac_api_token.as_deref(),
                request.stac_exists_ok,
            )
            .await?;
            Some(outcome)
        }
        None => None,
    };

    Ok(MetaReport {
        granule,
        artifacts,
        distribution,
        catalog,
    })
}
