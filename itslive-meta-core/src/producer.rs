//! [`MetadataProducer`] backed by an external metadata generator program.
//!
//! The program is run once per granule with `{uri}` / `{output_dir}`
//! substituted into its argument template. Afterwards the working directory
//! must contain exactly one `*.stac.json`, one `*.premet` and one `*.spatial`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::ProducerConfig;
use crate::contract::{BoxError, MetadataArtifactSet, MetadataProducer};
use crate::granule::GranuleReference;

pub const STAC_ITEM_SUFFIX: &str = ".stac.json";
pub const PREMET_SUFFIX: &str = ".premet";
pub const SPATIAL_SUFFIX: &str = ".spatial";

pub struct CommandProducer {
    config: ProducerConfig,
}

impl CommandProducer {
    pub fn new(config: ProducerConfig) -> Self {
        Self { config }
    }

    fn render_args(&self, granule: &GranuleReference, work_dir: &Path) -> Vec<String> {
        let dir = work_dir.display().to_string();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{uri}", granule.as_str()).replace("{output_dir}", &dir))
            .collect()
    }
}

#[async_trait]
impl MetadataProducer for CommandProducer {
    async fn generate(
        &self,
        granule: &GranuleReference,
        work_dir: &Path,
    ) -> Result<MetadataArtifactSet, BoxError> {
        tokio::fs::create_dir_all(work_dir).await?;
        let args = self.render_args(granule, work_dir);
        info!(granule = %granule, program = %self.config.program, "Generating metadata");
        debug!(?args, "Producer arguments");

        let output = Command::new(&self.config.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| format!("failed to start {}: {e}", self.config.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(granule = %granule, status = %output.status, "Metadata producer failed");
            return Err(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            )
            .into());
        }

        locate_artifacts(work_dir)
    }
}

/// Finds the three artifacts in `dir` by suffix.
pub fn locate_artifacts(dir: &Path) -> Result<MetadataArtifactSet, BoxError> {
    let mut stac_item = Vec::new();
    let mut premet = Vec::new();
    let mut spatial = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(STAC_ITEM_SUFFIX) {
            stac_item.push(path);
        } else if name.ends_with(PREMET_SUFFIX) {
            premet.push(path);
        } else if name.ends_with(SPATIAL_SUFFIX) {
            spatial.push(path);
        }
    }

    Ok(MetadataArtifactSet {
        stac_item: exactly_one(stac_item, STAC_ITEM_SUFFIX, dir)?,
        premet: exactly_one(premet, PREMET_SUFFIX, dir)?,
        spatial: exactly_one(spatial, SPATIAL_SUFFIX, dir)?,
    })
}

fn exactly_one(mut found: Vec<PathBuf>, suffix: &str, dir: &Path) -> Result<PathBuf, BoxError> {
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(format!("no *{suffix} file produced in {}", dir.display()).into()),
        n => Err(format!("{n} *{suffix} files found in {}, expected one", dir.display()).into()),
    }
}
