//! Bulk mode: replay the pipeline over a window of a granule manifest.
//!
//! Rows are processed strictly in manifest order, one at a time. Each row's
//! STAC item is appended to a single NDJSON export and its artifacts are
//! published; the export itself goes to the archival destination at the end.
//! The first failing row aborts the run; resume with a window starting at
//! that row.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::contract::{MetadataArtifactSet, MetadataProducer, StorageClient};
use crate::distribute::{distribute, DestinationSpec};
use crate::error::{PublishError, Result};
use crate::granule::parent_of_key;
use crate::manifest::{load_manifest, BatchWindow};
use crate::ndjson::{export_path, NdjsonWriter};
use crate::pipeline::granule_work_dir;

/// Inputs of a bulk run.
#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    /// Local path or `s3://` URI of the Parquet manifest.
    pub manifest: String,
    pub window: BatchWindow,
    /// Archival bucket/prefix receive the NDJSON export; the publish bucket receives per-row artifacts.
    pub destinations: DestinationSpec,
    /// Keep per-row artifacts on disk instead of deleting them after publishing.
    pub keep: bool,
}

/// What a bulk run talks to. Bulk mode never calls the catalog.
pub struct BulkCollaborators<'a, S: ?Sized, M: ?Sized> {
    pub storage: &'a S,
    pub publish_storage: Option<&'a S>,
    pub producer: &'a M,
}

impl<S: ?Sized, M: ?Sized> Clone for BulkCollaborators<'_, S, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized, M: ?Sized> Copy for BulkCollaborators<'_, S, M> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub export: PathBuf,
    pub rows: usize,
    pub uploaded: bool,
}

/// Owns one row's working directory and artifacts; removes them on drop unless retained.
pub struct ArtifactGuard {
    work_dir: PathBuf,
    artifacts: Option<MetadataArtifactSet>,
    retain: bool,
}

impl ArtifactGuard {
    pub fn acquire(work_dir: impl Into<PathBuf>, retain: bool) -> Self {
        Self {
            work_dir: work_dir.into(),
            artifacts: None,
            retain,
        }
    }

    pub fn hold(&mut self, artifacts: MetadataArtifactSet) -> &MetadataArtifactSet {
        self.artifacts.insert(artifacts)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.retain {
            return;
        }
        if let Some(artifacts) = &self.artifacts {
            for file in artifacts.files() {
                match std::fs::remove_file(file) {
                    Ok(()) => debug!(file = %file.display(), "Removed artifact"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(file = %file.display(), error = %e, "Failed to remove artifact"),
                }
            }
        }
        match std::fs::remove_dir_all(&self.work_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.work_dir.display(), error = %e, "Failed to remove work dir"),
        }
    }
}

/// Runs the bulk pipeline over `request.window` of the manifest.
pub async fn run_batch<S, M>(
    config: &PipelineConfig,
    request: &BulkRequest,
    collab: BulkCollaborators<'_, S, M>,
) -> Result<BatchReport>
where
    S: StorageClient + ?Sized,
    M: MetadataProducer + ?Sized,
{
    let rows = load_manifest(&request.manifest, collab.storage).await?;
    let range = request.window.range(rows.len());
    let total = range.len();
    let export = export_path(&config.output_dir, &request.manifest, &request.window);
    info!(
        manifest = %request.manifest,
        window = %request.window.label(),
        rows = total,
        export = %export.display(),
        "Starting bulk metadata run"
    );

    let mut writer = NdjsonWriter::create(&export)?;

    for (position, row_index) in range.enumerate() {
        let row = &rows[row_index];
        let granule = row.granule();
        info!(
            row = row_index,
            position = position + 1,
            total,
            granule = %granule,
            "Processing manifest row"
        );

        let mut guard = ArtifactGuard::acquire(granule_work_dir(config, &granule), request.keep);
        let generated = collab
            .producer
            .generate(&granule, guard.work_dir())
            .await
            .map_err(|source| {
                error!(row = row_index, granule = %granule, error = %source, "Metadata generation failed");
                PublishError::Producer {
                    granule: granule.to_string(),
                    source,
                }
            })?;
        let artifacts = guard.hold(generated);

        let item = artifacts.read_stac_item()?;
        writer.append(&item)?;

        let targets = request.destinations.publish_only(parent_of_key(&row.key));
        distribute(
            &artifacts.files(),
            &targets,
            collab.storage,
            collab.publish_storage,
        )
        .await
        .inspect_err(|e| error!(row = row_index, granule = %granule, error = %e, "Row distribution failed"))?;
    }

    let lines = writer.lines();
    let export = writer.finish()?;
    info!(export = %export.display(), lines, "Finished NDJSON export");

    let archival = request.destinations.archival_only();
    let uploaded = archival.archival_target().is_some();
    if uploaded {
        distribute(
            &[export.as_path()],
            &archival,
            collab.storage,
            None::<&S>,
        )
        .await?;
    } else {
        info!(export = %export.display(), "No archival destination configured; export kept locally");
    }

    Ok(BatchReport {
        export,
        rows: total,
        uploaded,
    })
}
