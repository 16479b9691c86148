#![allow(unused)]

//! # contract: seams between the renderer and the PlantUML server
//!
//! Two async traits cover every network round-trip the renderer makes:
//! - [`Encoder`] turns diagram text into the server's encoded-URL string.
//! - [`ImageFetcher`] performs a single GET and hands back status and bytes.
//!
//! Both are annotated for `mockall` so tests can script the server's
//! behaviour without a network. Errors are boxed trait objects; the
//! renderer only needs to log them and move on to the next file.

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Error type for the [`Encoder`] trait.
pub type EncodeError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for the [`ImageFetcher`] trait. Transport failures and
/// timeouts only; an HTTP error status is still a [`FetchResult`].
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Raw response of one image request, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResult {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Produces the encoded-URL string for a diagram.
///
/// The exact URL prefix depends on the encoder and the server version; the
/// renderer classifies it with [`crate::encoding::classify_encoded_url`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode the full diagram source text.
    async fn encode(&self, source: &str) -> Result<String, EncodeError>;
}

/// Fetches one candidate image URL.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError>;
}
