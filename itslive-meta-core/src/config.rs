use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Settings shared by every pipeline run. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Local working directory for generated artifacts and NDJSON exports.
    pub output_dir: PathBuf,
    pub producer: ProducerConfig,
    pub storage: StorageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            producer: ProducerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            output_dir = %self.output_dir.display(),
            producer = %self.producer.program,
            region = self.storage.region.as_deref().unwrap_or("<env>"),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

/// External metadata generator invocation.
///
/// `{uri}` and `{output_dir}` in `args` are replaced per granule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            program: "itslive-metagen".to_string(),
            args: vec![
                "--url".to_string(),
                "{uri}".to_string(),
                "--output".to_string(),
                "{output_dir}".to_string(),
            ],
        }
    }
}

/// S3 connection settings; credentials are never part of this file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Falls back to `AWS_REGION` when unset.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
    pub allow_http: bool,
}
