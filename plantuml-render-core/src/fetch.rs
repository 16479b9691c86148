use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::ImageFormat;
use crate::contract::{FetchError, FetchResult, ImageFetcher};

/// Path segment asking the server to decode the suffix with its alternate scheme.
pub const ALTERNATE_ENCODING_MARKER: &str = "~1";

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// A fully built image URL for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub url: String,
    pub alternate: bool,
}

impl CandidateUrl {
    /// `{base}/{format}/{suffix}`
    pub fn primary(base: &str, format: ImageFormat, suffix: &str) -> Self {
        Self {
            url: format!("{base}/{format}/{suffix}"),
            alternate: false,
        }
    }

    /// `{base}/{format}/~1{suffix}`
    pub fn alternate(base: &str, format: ImageFormat, suffix: &str) -> Self {
        Self {
            url: format!("{base}/{format}/{ALTERNATE_ENCODING_MARKER}{suffix}"),
            alternate: true,
        }
    }
}

/// [`ImageFetcher`] backed by reqwest, with a fixed per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        debug!(url = %url, "Fetching image");
        let resp = self.client.get(url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, timeout = e.is_timeout(), "Image request failed");
            e
        })?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?.to_vec();

        debug!(url = %url, status, size = body.len(), "Image response received");
        Ok(FetchResult {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_differ_only_by_marker() {
        let base = "https://www.plantuml.com/plantuml";
        let primary = CandidateUrl::primary(base, ImageFormat::Png, "SyfFKj2r");
        let alternate = CandidateUrl::alternate(base, ImageFormat::Png, "SyfFKj2r");

        assert_eq!(primary.url, "https://www.plantuml.com/plantuml/png/SyfFKj2r");
        assert_eq!(alternate.url, "https://www.plantuml.com/plantuml/png/~1SyfFKj2r");
        assert!(!primary.alternate);
        assert!(alternate.alternate);
    }
}
