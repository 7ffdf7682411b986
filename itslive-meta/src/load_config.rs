/// `load_config` module: loads the optional YAML settings file into a [`PipelineConfig`].
///
/// The file only carries non-secret settings (working directory, producer
/// command, S3 connection). Credentials always come from the environment:
/// `STAC_API_TOKEN`, `PUBLISH_ACCESS_KEY_ID` / `PUBLISH_SECRET_ACCESS_KEY`,
/// and the ambient `AWS_*` chain.
///
/// Every section is optional; missing keys fall back to [`PipelineConfig::default`].
///
/// # Errors
/// Failures use `anyhow::Error` with the offending path, surfaced at the CLI boundary.
use anyhow::Result;
use itslive_meta_core::config::PipelineConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }

    match serde_yaml::from_str::<PipelineConfig>(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!(
                "Failed to parse config YAML {:?}: {e}",
                path_ref
            ))
        }
    }
}

/// Loads `path` when given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No config file given, using defaults");
            Ok(PipelineConfig::default())
        }
    }
}
