//! Newline-delimited JSON export of STAC items.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{PublishError, Result};
use crate::manifest::{manifest_stem, BatchWindow};

/// `<output_dir>/<manifest stem>_<window label>.ndjson`
pub fn export_path(output_dir: &Path, manifest_location: &str, window: &BatchWindow) -> PathBuf {
    output_dir.join(format!(
        "{}_{}.ndjson",
        manifest_stem(manifest_location),
        window.label()
    ))
}

/// Re-encodes a (possibly pretty-printed) JSON document as a single compact line.
pub fn compact_line(item: &serde_json::Value) -> String {
    // serde_json escapes newlines inside strings, so the compact form never contains one.
    item.to_string()
}

/// Streaming NDJSON writer; one item per line, in append order.
pub struct NdjsonWriter {
    path: PathBuf,
    out: BufWriter<File>,
    lines: usize,
}

impl NdjsonWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| PublishError::io(&path, e))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn append(&mut self, item: &serde_json::Value) -> Result<()> {
        let line = compact_line(item);
        writeln!(self.out, "{line}").map_err(|e| PublishError::io(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flushes and closes the file, returning its path.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.out
            .flush()
            .map_err(|e| PublishError::io(&self.path, e))?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn pretty_item_becomes_one_line_and_round_trips() {
        let item = json!({
            "id": "G1",
            "properties": {"description": "line one\nline two"},
            "bbox": [1.0, 2.0, 3.0, 4.0]
        });
        let pretty = serde_json::to_string_pretty(&item).unwrap();
        assert!(pretty.contains('\n'));

        let reparsed: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        let line = compact_line(&reparsed);
        assert!(!line.contains('\n'));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&line).unwrap(), item);
    }

    #[test]
    fn item_from_disk_keeps_key_order_and_exact_coordinates() {
        let dir = tempdir().unwrap();
        let stac_item = dir.path().join("G1.stac.json");
        std::fs::write(
            &stac_item,
            "{\n  \"type\": \"Feature\",\n  \"stac_version\": \"1.0.0\",\n  \"id\": \"G1\",\n  \"bbox\": [\n    -123.23539463148379,\n    58.1\n  ]\n}\n",
        )
        .unwrap();
        let artifacts = crate::contract::MetadataArtifactSet {
            stac_item,
            premet: dir.path().join("G1.nc.premet"),
            spatial: dir.path().join("G1.nc.spatial"),
        };

        let item = artifacts.read_stac_item().unwrap();
        assert_eq!(
            compact_line(&item),
            r#"{"type":"Feature","stac_version":"1.0.0","id":"G1","bbox":[-123.23539463148379,58.1]}"#
        );
        assert_eq!(item["bbox"][0].as_f64(), Some(-123.23539463148379));
    }

    #[test]
    fn export_name_encodes_window() {
        let path = export_path(
            Path::new("/work"),
            "s3://b/granules.parquet",
            &BatchWindow::new(5, Some(10)).unwrap(),
        );
        assert_eq!(path, PathBuf::from("/work/granules_5-10.ndjson"));
    }

    #[test]
    fn writer_preserves_append_order() {
        let dir = tempdir().unwrap();
        let mut writer = NdjsonWriter::create(dir.path().join("out.ndjson")).unwrap();
        for id in ["a", "b", "c"] {
            writer.append(&json!({ "id": id })).unwrap();
        }
        assert_eq!(writer.lines(), 3);
        let path = writer.finish().unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let ids: Vec<String> = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
