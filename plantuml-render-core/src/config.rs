use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::validate::ErrorMarkers;

pub const DEFAULT_SOURCE_DIRECTORY: &str = "docs";
pub const DEFAULT_SOURCE_EXTENSION: &str = "plantuml";
pub const DEFAULT_SERVER_BASE_URL: &str = "https://www.plantuml.com/plantuml";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Image format requested from the server. Also decides the output file
/// extension and the signature used to recognise a real render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    /// Path segment on the server and file extension on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How diagram text is turned into the encoded string embedded in URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// Ask the server's `/coder` endpoint.
    #[default]
    Remote,
    /// Deflate and encode in-process.
    Local,
}

/// Everything the renderer needs, passed in explicitly at startup.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub source_directory: PathBuf,
    pub source_extension: String,
    /// Stored without a trailing slash.
    pub server_base_url: String,
    pub image_format: ImageFormat,
    pub request_timeout: Duration,
    pub encoder: EncoderKind,
    pub error_markers: ErrorMarkers,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let image_format = ImageFormat::default();
        Self {
            source_directory: PathBuf::from(DEFAULT_SOURCE_DIRECTORY),
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            server_base_url: DEFAULT_SERVER_BASE_URL.to_string(),
            image_format,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            encoder: EncoderKind::default(),
            error_markers: ErrorMarkers::for_format(image_format),
        }
    }
}

impl RenderConfig {
    pub fn with_source_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_directory = dir.into();
        self
    }

    pub fn with_server_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.server_base_url = normalise_base_url(url.as_ref());
        self
    }

    /// Switches format and resets the error markers to that format's defaults.
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self.error_markers = ErrorMarkers::for_format(format);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderKind) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_error_markers(mut self, markers: ErrorMarkers) -> Self {
        self.error_markers = markers;
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            source_directory = %self.source_directory.display(),
            source_extension = %self.source_extension,
            server_base_url = %self.server_base_url,
            image_format = %self.image_format,
            request_timeout_secs = self.request_timeout.as_secs(),
            encoder = ?self.encoder,
            "Loaded RenderConfig"
        );
        debug!(?self, "RenderConfig loaded (full debug)");
    }
}

pub fn normalise_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_server() {
        let config = RenderConfig::default();
        assert_eq!(config.source_directory, PathBuf::from("docs"));
        assert_eq!(config.source_extension, "plantuml");
        assert_eq!(config.server_base_url, "https://www.plantuml.com/plantuml");
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.encoder, EncoderKind::Remote);
    }

    #[test]
    fn base_url_loses_trailing_slashes() {
        let config = RenderConfig::default().with_server_base_url("http://localhost:8080/plantuml//");
        assert_eq!(config.server_base_url, "http://localhost:8080/plantuml");
    }

    #[test]
    fn switching_format_resets_markers() {
        let config = RenderConfig::default().with_image_format(ImageFormat::Svg);
        assert_eq!(config.error_markers, ErrorMarkers::for_format(ImageFormat::Svg));
    }
}
