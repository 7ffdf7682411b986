//! Granule manifests (Parquet, `bucket` + `key` columns) and index windows over them.

use std::ops::Range;
use std::path::Path;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::contract::StorageClient;
use crate::error::{PublishError, Result};
use crate::granule::GranuleReference;
use crate::storage::parse_s3_uri;

/// One manifest row: a single granule's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub bucket: String,
    pub key: String,
}

impl ManifestRow {
    pub fn granule(&self) -> GranuleReference {
        GranuleReference::from_bucket_key(&self.bucket, &self.key)
    }
}

/// Half-open row range `[start, stop)`; `stop: None` runs to the end of the manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchWindow {
    pub start: usize,
    pub stop: Option<usize>,
}

impl BatchWindow {
    pub fn new(start: usize, stop: Option<usize>) -> Result<Self> {
        match stop {
            Some(stop) if stop < start => Err(PublishError::InvalidArgument(format!(
                "stop index {stop} is before start index {start}"
            ))),
            _ => Ok(Self { start, stop }),
        }
    }

    /// Row indices selected from a manifest of `len` rows, clamped to the manifest.
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = self.start.min(len);
        let stop = self.stop.unwrap_or(len).clamp(start, len);
        start..stop
    }

    /// `<start>-<stop>` with `end` for an open window, used in export file names.
    pub fn label(&self) -> String {
        match self.stop {
            Some(stop) => format!("{}-{}", self.start, stop),
            None => format!("{}-end", self.start),
        }
    }
}

/// File stem of a manifest location (local path or `s3://` URI).
pub fn manifest_stem(location: &str) -> String {
    Path::new(location)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("manifest")
        .to_string()
}

/// Reads a manifest from a local path or an `s3://bucket/key` URI.
pub async fn load_manifest<S>(location: &str, storage: &S) -> Result<Vec<ManifestRow>>
where
    S: StorageClient + ?Sized,
{
    let bytes = match parse_s3_uri(location) {
        Some((bucket, key)) => {
            storage
                .fetch(bucket, key)
                .await
                .map_err(|source| PublishError::Storage {
                    bucket: bucket.to_string(),
                    source,
                })?
        }
        None => Bytes::from(
            tokio::fs::read(location)
                .await
                .map_err(|e| PublishError::io(location, e))?,
        ),
    };

    let rows = parse_manifest(bytes, location)?;
    info!(manifest = location, rows = rows.len(), "Loaded granule manifest");
    Ok(rows)
}

/// Decodes Parquet bytes into manifest rows, preserving row order.
pub fn parse_manifest(bytes: Bytes, location: &str) -> Result<Vec<ManifestRow>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(|e| PublishError::manifest(location, format!("parquet reader init failed: {e}")))?
        .build()
        .map_err(|e| PublishError::manifest(location, format!("parquet reader build failed: {e}")))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| PublishError::manifest(location, format!("parquet read batch failed: {e}")))?;
        let buckets = col_string(&batch, "bucket", location)?;
        let keys = col_string(&batch, "key", location)?;

        for i in 0..batch.num_rows() {
            let row = rows.len();
            if buckets.is_null(i) || keys.is_null(i) {
                return Err(PublishError::manifest(
                    location,
                    format!("row {row} has a null bucket or key"),
                ));
            }
            rows.push(ManifestRow {
                bucket: buckets.value(i).to_string(),
                key: keys.value(i).to_string(),
            });
        }
    }
    Ok(rows)
}

fn col_string(batch: &RecordBatch, name: &str, location: &str) -> Result<StringArray> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|e| PublishError::manifest(location, format!("missing column '{name}': {e}")))?;

    let utf8 = cast(batch.column(idx).as_ref(), &DataType::Utf8).map_err(|e| {
        PublishError::manifest(location, format!("column '{name}' is not a string column: {e}"))
    })?;

    utf8.as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| PublishError::manifest(location, format!("column '{name}' is not StringArray")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_selects_half_open_range() {
        let w = BatchWindow::new(5, Some(10)).unwrap();
        assert_eq!(w.range(100), 5..10);
        assert_eq!(w.label(), "5-10");
    }

    #[test]
    fn open_window_runs_to_end() {
        let w = BatchWindow::new(2, None).unwrap();
        assert_eq!(w.range(7), 2..7);
        assert_eq!(w.label(), "2-end");
    }

    #[test]
    fn window_is_clamped_to_manifest() {
        assert_eq!(BatchWindow::new(5, Some(50)).unwrap().range(8), 5..8);
        assert_eq!(BatchWindow::new(20, None).unwrap().range(8), 8..8);
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(matches!(
            BatchWindow::new(10, Some(5)),
            Err(PublishError::InvalidArgument(_))
        ));
    }

    #[test]
    fn stem_drops_directory_and_extension() {
        assert_eq!(
            manifest_stem("s3://its-live-data/test-space/stac/granules_to_recrop.parquet"),
            "granules_to_recrop"
        );
        assert_eq!(manifest_stem("./local/rows.parquet"), "rows");
    }
}
