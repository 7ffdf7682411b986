/// # itslive-meta CLI Interface (Module)
///
/// Command parsing and orchestration glue for the `itslive-meta` binary.
/// All pipeline logic (resolution, generation, fanout, catalog upsert,
/// bulk export) lives in [`itslive_meta_core`]; this module only turns
/// arguments and environment into requests and real collaborators.
///
/// ## Subcommands
/// - `meta`: one granule, optionally archived, published and upserted into a STAC catalog.
/// - `bulk-meta`: a window of a parquet manifest, exported as one NDJSON file.
///
/// Secrets are never flags: `STAC_API_TOKEN` and the `PUBLISH_*` key pair
/// are read from the environment when the corresponding feature is requested.
use crate::args::{nullable_index, nullable_string, string_is_true, NullableIndex, NullableString};
use crate::load_config::load_or_default;
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use itslive_meta_core::batch::{run_batch, BulkCollaborators, BulkRequest};
use itslive_meta_core::catalog_http::HttpCatalog;
use itslive_meta_core::config::PipelineConfig;
use itslive_meta_core::distribute::DestinationSpec;
use itslive_meta_core::manifest::BatchWindow;
use itslive_meta_core::pipeline::{run_meta, Collaborators, MetaRequest};
use itslive_meta_core::producer::CommandProducer;
use itslive_meta_core::storage::{PublishCredentials, S3Storage};
use std::path::PathBuf;

/// CLI for itslive-meta: generate and publish ITS_LIVE granule metadata.
#[derive(Parser, Debug)]
#[clap(
    name = "itslive-meta",
    version,
    about = "Generate ITS_LIVE granule metadata, publish it to S3 and a STAC catalog"
)]
pub struct Cli {
    /// Optional YAML settings file (output directory, producer command, S3 connection)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate metadata for a single granule
    Meta(MetaArgs),
    /// Generate metadata for a window of a granule manifest and export it as NDJSON
    BulkMeta(BulkMetaArgs),
}

#[derive(Args, Debug, Clone)]
pub struct MetaArgs {
    /// AWS S3 bucket HyP3 uses for content upload
    #[clap(long, value_parser = nullable_string, default_value = "None")]
    pub bucket: NullableString,

    /// Add a bucket prefix to product(s)
    #[clap(long, default_value = "")]
    pub bucket_prefix: String,

    /// S3 URI of the granule; resolved from --bucket/--bucket-prefix when unset
    #[clap(long, value_parser = nullable_string, default_value = "None")]
    pub granule_uri: NullableString,

    /// Additionally publish the metadata files to this bucket under the granule's prefix
    #[clap(long, value_parser = nullable_string, default_value = "None")]
    pub publish_bucket: NullableString,

    /// STAC items endpoint, e.g. https://host/collections/<id>/items
    #[clap(long, value_parser = nullable_string, default_value = "None")]
    pub stac_items_endpoint: NullableString,

    /// Update the STAC item when it already exists
    #[clap(long, value_parser = string_is_true, action = ArgAction::Set, default_value = "false")]
    pub stac_exists_ok: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BulkMetaArgs {
    /// AWS S3 bucket HyP3 uses for content upload
    #[clap(long, value_parser = nullable_string, default_value = "None")]
    pub bucket: NullableString,

    /// Add a bucket prefix to product(s)
    #[clap(long, default_value = "")]
    pub bucket_prefix: String,

    /// Parquet manifest with `bucket` and `key` columns, local path or s3:// URI
    #[clap(long)]
    pub granules_parquet: String,

    /// First manifest row to process
    #[clap(long, value_parser = nullable_index, default_value = "0")]
    pub start_idx: NullableIndex,

    /// Manifest row to stop before; runs to the end when unset
    #[clap(long, value_parser = nullable_index, default_value = "None")]
    pub stop_idx: NullableIndex,

    /// Keep per-granule metadata files on disk
    #[clap(long)]
    pub keep: bool,

    /// Publish each granule's metadata files to this bucket under the granule's prefix
    #[clap(long, value_parser = nullable_string, default_value = "None")]
    pub publish_bucket: NullableString,
}

impl MetaArgs {
    pub fn into_request(self) -> MetaRequest {
        MetaRequest {
            granule_uri: self.granule_uri.0,
            destinations: DestinationSpec {
                bucket: self.bucket.0,
                bucket_prefix: self.bucket_prefix,
                publish_bucket: self.publish_bucket.0,
                stac_items_endpoint: self.stac_items_endpoint.0,
                ..Default::default()
            },
            stac_exists_ok: self.stac_exists_ok,
            stac_api_token: None,
        }
        .with_env_token()
    }
}

impl BulkMetaArgs {
    pub fn into_request(self) -> Result<BulkRequest> {
        let window = BatchWindow::new(self.start_idx.0.unwrap_or(0), self.stop_idx.0)?;
        Ok(BulkRequest {
            manifest: self.granules_parquet,
            window,
            destinations: DestinationSpec {
                bucket: self.bucket.0,
                bucket_prefix: self.bucket_prefix,
                publish_bucket: self.publish_bucket.0,
                ..Default::default()
            },
            keep: self.keep,
        })
    }
}

/// Builds the publish-side client only when a publish bucket was requested.
fn publish_storage(config: &PipelineConfig, publish_bucket: Option<&str>) -> Result<Option<S3Storage>> {
    match publish_bucket {
        Some(_) => {
            let credentials = PublishCredentials::from_env()?;
            Ok(Some(S3Storage::publish(credentials, config.storage.clone())))
        }
        None => Ok(None),
    }
}

async fn meta(config: &PipelineConfig, args: MetaArgs) -> Result<()> {
    let request = args.into_request();
    tracing::info!(command = "meta", granule_uri = ?request.granule_uri, "Starting metadata generation");

    let storage = S3Storage::ambient(config.storage.clone());
    let publish = publish_storage(config, request.destinations.publish_bucket.as_deref())?;
    let producer = CommandProducer::new(config.producer.clone());
    let catalog = HttpCatalog::new();
    let collab = Collaborators {
        storage: &storage,
        publish_storage: publish.as_ref(),
        producer: &producer,
        catalog: &catalog,
    };

    match run_meta(config, &request, collab).await {
        Ok(report) => {
            tracing::info!(
                command = "meta",
                granule = %report.granule,
                archived = report.distribution.archived,
                published = report.distribution.published,
                catalog = ?report.catalog,
                "Metadata generation complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "meta", error = %e, "Metadata generation failed");
            Err(e.into())
        }
    }
}

async fn bulk_meta(config: &PipelineConfig, args: BulkMetaArgs) -> Result<()> {
    let request = args.into_request()?;
    tracing::info!(
        command = "bulk-meta",
        manifest = %request.manifest,
        window = %request.window.label(),
        "Starting bulk metadata generation"
    );

    let storage = S3Storage::ambient(config.storage.clone());
    let publish = publish_storage(config, request.destinations.publish_bucket.as_deref())?;
    let producer = CommandProducer::new(config.producer.clone());
    let collab = BulkCollaborators {
        storage: &storage,
        publish_storage: publish.as_ref(),
        producer: &producer,
    };

    match run_batch(config, &request, collab).await {
        Ok(report) => {
            tracing::info!(
                command = "bulk-meta",
                export = %report.export.display(),
                rows = report.rows,
                uploaded = report.uploaded,
                "Bulk metadata generation complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "bulk-meta", error = %e, "Bulk metadata generation failed");
            Err(e.into())
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_or_default(cli.config.as_deref())?;
    config.trace_loaded();

    match cli.command {
        Commands::Meta(args) => meta(&config, args).await,
        Commands::BulkMeta(args) => bulk_meta(&config, args).await,
    }
}
