/// `load_config` module: builds the [`RenderConfig`] from defaults, an optional YAML file and the environment.
///
/// Precedence, lowest first:
/// 1. Built-in defaults (`docs/`, the public PlantUML server, PNG, 30s timeout)
/// 2. Keys present in the YAML file, when one is given
/// 3. Environment overrides: `PLANTUML_SERVER_URL`, `PLANTUML_DOCS_DIR`, `PLANTUML_TIMEOUT_SECS`
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use plantuml_render_core::config::{EncoderKind, ImageFormat, RenderConfig};
use plantuml_render_core::validate::ErrorMarkers;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const ENV_SERVER_URL: &str = "PLANTUML_SERVER_URL";
pub const ENV_DOCS_DIR: &str = "PLANTUML_DOCS_DIR";
pub const ENV_TIMEOUT_SECS: &str = "PLANTUML_TIMEOUT_SECS";

/// YAML side of the configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub source_directory: Option<PathBuf>,
    pub source_extension: Option<String>,
    pub server_base_url: Option<String>,
    pub image_format: Option<ImageFormat>,
    pub request_timeout_secs: Option<u64>,
    pub encoder: Option<EncoderKind>,
    pub error_markers: Option<ErrorMarkers>,
}

impl FileConfig {
    fn apply(self, mut config: RenderConfig) -> RenderConfig {
        if let Some(dir) = self.source_directory {
            config = config.with_source_directory(dir);
        }
        if let Some(ext) = self.source_extension {
            config.source_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(url) = self.server_base_url {
            config = config.with_server_base_url(url);
        }
        if let Some(format) = self.image_format {
            config = config.with_image_format(format);
        }
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(encoder) = self.encoder {
            config = config.with_encoder(encoder);
        }
        if let Some(markers) = self.error_markers {
            config = config.with_error_markers(markers);
        }
        config
    }
}

/// Loads the effective configuration. `path` is optional: with no file the
/// defaults (plus environment) are used.
pub fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    let mut config = RenderConfig::default();

    if let Some(path_ref) = path {
        info!(config_path = ?path_ref, "Loading configuration from file");
        let content = fs::read_to_string(path_ref).map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
        })?;

        let file: FileConfig = if content.trim().is_empty() {
            FileConfig::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                anyhow::anyhow!("Failed to parse config YAML: {e}")
            })?
        };
        info!(config_path = ?path_ref, "Parsed config YAML successfully");
        config = file.apply(config);
    }

    apply_env(config)
}

fn apply_env(mut config: RenderConfig) -> Result<RenderConfig> {
    if let Ok(url) = std::env::var(ENV_SERVER_URL) {
        info!(server_base_url = %url, "Server URL overridden from env");
        config = config.with_server_base_url(url);
    }
    if let Ok(dir) = std::env::var(ENV_DOCS_DIR) {
        info!(source_directory = %dir, "Source directory overridden from env");
        config = config.with_source_directory(dir);
    }
    if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
        let secs = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {raw:?}"))?;
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}
