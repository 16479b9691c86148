//! Encoders and classification of the encoded-URL strings they return.
//!
//! The server has answered with three URL shapes over time:
//! - `…/plantumll<enc>`: the marker with its final letter doubled
//! - `…/plantuml<enc>`: the marker glued to the encoded text
//! - `…/plantuml/png/<enc>`: already the image path
//!
//! [`classify_encoded_url`] maps a string onto [`EncodedUrl`] once, so the
//! rest of the pipeline matches on a variant instead of re-inspecting
//! substrings.

use async_trait::async_trait;
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::Engine;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::{debug, error, info};

use crate::config::ImageFormat;
use crate::contract::{EncodeError, Encoder};
use crate::fetch::build_client;

const PLANTUML_ALPHABET: Alphabet =
    match Alphabet::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("invalid PlantUML alphabet"),
    };

/// PlantUML's base64 variant. Groups are always emitted whole, so input is
/// zero-padded to a multiple of three before encoding.
pub const PLANTUML_ENGINE: GeneralPurpose = GeneralPurpose::new(&PLANTUML_ALPHABET, NO_PAD);

/// Shape of an encoded-URL string, with the encoded suffix already split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedUrl {
    DoubleMarker(String),
    SingleMarker(String),
    ImagePath(String),
    Unrecognized,
}

impl EncodedUrl {
    pub fn suffix(&self) -> Option<&str> {
        match self {
            EncodedUrl::DoubleMarker(s) | EncodedUrl::SingleMarker(s) | EncodedUrl::ImagePath(s) => {
                Some(s.as_str())
            }
            EncodedUrl::Unrecognized => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EncodedUrl::DoubleMarker(_) => "double-marker",
            EncodedUrl::SingleMarker(_) => "single-marker",
            EncodedUrl::ImagePath(_) => "image-path",
            EncodedUrl::Unrecognized => "unrecognized",
        }
    }
}

/// Last path segment of the server URL, e.g. `plantuml`.
fn service_marker(server_base_url: &str) -> Option<&str> {
    server_base_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|m| !m.is_empty() && !m.contains(':'))
}

fn without_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

/// Splits the encoded suffix off an encoder's URL.
///
/// The URL must start with the configured server URL (the scheme may
/// differ); only what follows it is inspected, so a host that happens to
/// contain the marker cannot match. Deterministic: a given shape always
/// takes the same branch. An empty suffix, or one containing a path
/// separator, counts as unrecognised.
pub fn classify_encoded_url(url: &str, server_base_url: &str, format: ImageFormat) -> EncodedUrl {
    if !url.starts_with("http") {
        return EncodedUrl::Unrecognized;
    }
    let base = without_scheme(server_base_url.trim_end_matches('/'));
    let Some(rest) = without_scheme(url).strip_prefix(base) else {
        return EncodedUrl::Unrecognized;
    };

    let image_path = format!("/{format}/");
    let doubled = service_marker(server_base_url).and_then(|marker| marker.chars().last());

    let shape = if let Some(enc) = rest.strip_prefix(image_path.as_str()) {
        EncodedUrl::ImagePath(enc.to_string())
    } else if let Some(enc) = doubled.and_then(|last| rest.strip_prefix(last)) {
        EncodedUrl::DoubleMarker(enc.to_string())
    } else {
        EncodedUrl::SingleMarker(rest.to_string())
    };

    match shape.suffix() {
        Some(s) if s.is_empty() || s.contains('/') => EncodedUrl::Unrecognized,
        _ => shape,
    }
}

/// Raw deflate followed by PlantUML's base64 variant.
pub fn deflate_and_encode(text: &str) -> Result<String, std::io::Error> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(text.as_bytes())?;
    let mut compressed = encoder.finish()?;
    while compressed.len() % 3 != 0 {
        compressed.push(0);
    }
    Ok(PLANTUML_ENGINE.encode(&compressed))
}

/// Encodes in-process; no network round-trip.
pub struct LocalEncoder {
    server_base_url: String,
    format: ImageFormat,
}

impl LocalEncoder {
    pub fn new(server_base_url: impl Into<String>, format: ImageFormat) -> Self {
        Self {
            server_base_url: server_base_url.into(),
            format,
        }
    }
}

#[async_trait]
impl Encoder for LocalEncoder {
    async fn encode(&self, source: &str) -> Result<String, EncodeError> {
        let encoded = deflate_and_encode(source)?;
        debug!(len = encoded.len(), "Encoded diagram locally");
        Ok(format!("{}/{}/{}", self.server_base_url, self.format, encoded))
    }
}

/// Asks the server's `/coder` endpoint for the encoded form.
pub struct RemoteEncoder {
    client: reqwest::Client,
    server_base_url: String,
    format: ImageFormat,
}

impl RemoteEncoder {
    pub fn new(
        server_base_url: impl Into<String>,
        format: ImageFormat,
        timeout: std::time::Duration,
    ) -> Result<Self, EncodeError> {
        Ok(Self {
            client: build_client(timeout)?,
            server_base_url: server_base_url.into(),
            format,
        })
    }
}

#[async_trait]
impl Encoder for RemoteEncoder {
    async fn encode(&self, source: &str) -> Result<String, EncodeError> {
        let url = format!("{}/coder", self.server_base_url);
        info!(url = %url, "Requesting encoded diagram from server");

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(source.to_string())
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Failed to reach encoding endpoint");
                e
            })?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            error!(status = %status, url = %url, "Encoding endpoint returned error");
            return Err(format!("encoding endpoint returned status {status}").into());
        }

        let encoded = text.trim();
        if encoded.starts_with("http") {
            Ok(encoded.to_string())
        } else {
            Ok(format!("{}/{}/{}", self.server_base_url, self.format, encoded))
        }
    }
}
