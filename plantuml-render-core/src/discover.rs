use std::path::{Path, PathBuf};
use std::io::ErrorKind;
use tracing::{debug, error, info, warn};

use crate::config::{ImageFormat, RenderConfig};
use crate::error::RenderError;

/// Lists the diagram sources directly inside the configured directory.
///
/// Non-recursive and sorted so runs process files in a stable order. A
/// directory that does not exist holds no sources; any other listing error
/// is returned.
pub fn discover_sources(config: &RenderConfig) -> Result<Vec<PathBuf>, RenderError> {
    let dir = &config.source_directory;
    debug!(path = %dir.display(), extension = %config.source_extension, "Scanning for diagram sources");

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %dir.display(), "Source directory does not exist, nothing to render");
            return Ok(Vec::new());
        }
        Err(e) => {
            error!(error = ?e, path = %dir.display(), "Failed to read source directory");
            return Err(RenderError::Discovery {
                path: dir.clone(),
                source: e,
            });
        }
    };

    let mut sources = Vec::new();
    for entry_res in entries {
        let entry = entry_res.map_err(|e| RenderError::Discovery {
            path: dir.clone(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if has_extension(&path, &config.source_extension) {
            sources.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non-diagram file");
        }
    }
    sources.sort();

    info!(count = sources.len(), path = %dir.display(), "Discovered diagram sources");
    Ok(sources)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == extension)
        .unwrap_or(false)
}

/// `docs/a.plantuml` -> `docs/a.png`
pub fn output_path_for(source: &Path, format: ImageFormat) -> PathBuf {
    source.with_extension(format.as_str())
}
