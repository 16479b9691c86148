//! Pure predicates deciding whether a response is a usable render.
//!
//! The server answers broken encodings with an *image* of an error message,
//! often with a success status, so the signature alone is not enough: the
//! body is also scanned for known error markers. The marker set is a
//! best-effort allowlist built from observed failures and can be replaced
//! through [`crate::config::RenderConfig::with_error_markers`].

use serde::{Deserialize, Serialize};

use crate::config::ImageFormat;
use crate::contract::FetchResult;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Substrings that mark a rendered error page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarkers {
    /// Matched byte-for-byte.
    #[serde(default)]
    pub exact: Vec<String>,
    /// Matched against the ASCII-lowercased body.
    #[serde(default)]
    pub case_insensitive: Vec<String>,
}

impl ErrorMarkers {
    pub fn for_format(format: ImageFormat) -> Self {
        let exact = vec!["HUFFMAN".to_string(), "bad URL".to_string()];
        match format {
            ImageFormat::Png => Self {
                exact,
                case_insensitive: vec!["encoding".to_string()],
            },
            // An XML prolog carries `encoding="UTF-8"`.
            ImageFormat::Svg => Self {
                exact,
                case_insensitive: Vec::new(),
            },
        }
    }

    pub fn found_in(&self, body: &[u8]) -> Option<&str> {
        if let Some(m) = self
            .exact
            .iter()
            .find(|m| contains(body, m.as_bytes()))
        {
            return Some(m.as_str());
        }
        if self.case_insensitive.is_empty() {
            return None;
        }
        let lowered = body.to_ascii_lowercase();
        self.case_insensitive
            .iter()
            .find(|m| contains(&lowered, m.to_ascii_lowercase().as_bytes()))
            .map(|m| m.as_str())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub fn has_image_signature(body: &[u8], format: ImageFormat) -> bool {
    match format {
        ImageFormat::Png => body.starts_with(&PNG_SIGNATURE),
        ImageFormat::Svg => {
            let start = body
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(body.len());
            let body = &body[start..];
            body.starts_with(b"<?xml") || body.starts_with(b"<svg")
        }
    }
}

/// How a single response is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Valid,
    /// Image bytes, but a failing status or an error marker.
    SuspectedEncodingIssue,
    /// Success status without image bytes, e.g. an HTML error page.
    NonImageSuccess,
    NonSuccessStatus,
}

pub fn classify_response(
    result: &FetchResult,
    format: ImageFormat,
    markers: &ErrorMarkers,
) -> ResponseClass {
    let signature = has_image_signature(&result.body, format);
    let marker = markers.found_in(&result.body).is_some();
    match (signature, result.is_success(), marker) {
        (true, true, false) => ResponseClass::Valid,
        (true, _, _) => ResponseClass::SuspectedEncodingIssue,
        (false, true, _) => ResponseClass::NonImageSuccess,
        (false, false, _) => ResponseClass::NonSuccessStatus,
    }
}

pub fn is_acceptable(result: &FetchResult, format: ImageFormat, markers: &ErrorMarkers) -> bool {
    classify_response(result, format, markers) == ResponseClass::Valid
}
