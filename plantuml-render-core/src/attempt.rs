//! Two-attempt fetch: the primary candidate, then at most one retry with
//! the alternate-encoding marker.
//!
//! ```text
//! NotAttempted --valid--> Accepted
//!      |
//!      +--rejected--> PrimaryAttempted --valid--> Accepted (alternate)
//!                           |
//!                           +--rejected--> RetryAttempted --> Exhausted
//! ```
//!
//! Every transition is a plain value; validation lives in [`crate::validate`].

use std::fmt;
use tracing::{info, warn};

use crate::config::ImageFormat;
use crate::contract::ImageFetcher;
use crate::fetch::CandidateUrl;
use crate::validate::{classify_response, ErrorMarkers, ResponseClass};

/// Why one attempt did not produce an acceptable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Rejected {
        class: ResponseClass,
        status: u16,
        content_type: Option<String>,
    },
    Transport(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Rejected {
                class,
                status,
                content_type,
            } => {
                let ct = content_type.as_deref().unwrap_or("N/A");
                match class {
                    ResponseClass::SuspectedEncodingIssue => {
                        write!(f, "error image or bad status (status {status}, Content-Type: {ct})")
                    }
                    ResponseClass::NonImageSuccess => {
                        write!(f, "response is not an image (status {status}, Content-Type: {ct})")
                    }
                    ResponseClass::NonSuccessStatus | ResponseClass::Valid => {
                        write!(f, "status {status} (Content-Type: {ct})")
                    }
                }
            }
            AttemptFailure::Transport(e) => write!(f, "request failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    NotAttempted,
    PrimaryAttempted {
        primary: AttemptFailure,
    },
    RetryAttempted {
        primary: AttemptFailure,
        retry: AttemptFailure,
    },
    Accepted {
        body: Vec<u8>,
        used_alternate: bool,
    },
    Exhausted {
        primary: AttemptFailure,
        retry: AttemptFailure,
    },
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Accepted { .. } | FetchState::Exhausted { .. })
    }
}

/// Drives [`FetchState`] for one encoded diagram.
pub struct FetchAttempts<'a, F: ImageFetcher + ?Sized> {
    fetcher: &'a F,
    base_url: &'a str,
    format: ImageFormat,
    markers: &'a ErrorMarkers,
    suffix: &'a str,
    state: FetchState,
    requests: usize,
}

impl<'a, F: ImageFetcher + ?Sized> FetchAttempts<'a, F> {
    pub fn new(
        fetcher: &'a F,
        base_url: &'a str,
        format: ImageFormat,
        markers: &'a ErrorMarkers,
        suffix: &'a str,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            format,
            markers,
            suffix,
            state: FetchState::NotAttempted,
            requests: 0,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn requests_made(&self) -> usize {
        self.requests
    }

    /// Advances one transition. Terminal states stay put.
    pub async fn step(&mut self) {
        let current = std::mem::replace(&mut self.state, FetchState::NotAttempted);
        self.state = match current {
            FetchState::NotAttempted => {
                let candidate = CandidateUrl::primary(self.base_url, self.format, self.suffix);
                match self.attempt(&candidate).await {
                    Ok(body) => FetchState::Accepted {
                        body,
                        used_alternate: false,
                    },
                    Err(primary) => FetchState::PrimaryAttempted { primary },
                }
            }
            FetchState::PrimaryAttempted { primary } => {
                warn!(reason = %primary, "Primary fetch rejected, retrying with alternate encoding marker");
                let candidate = CandidateUrl::alternate(self.base_url, self.format, self.suffix);
                match self.attempt(&candidate).await {
                    Ok(body) => FetchState::Accepted {
                        body,
                        used_alternate: true,
                    },
                    Err(retry) => FetchState::RetryAttempted { primary, retry },
                }
            }
            FetchState::RetryAttempted { primary, retry } => FetchState::Exhausted { primary, retry },
            terminal => terminal,
        };
    }

    pub fn into_state(self) -> FetchState {
        self.state
    }

    /// Steps until accepted or exhausted.
    pub async fn run(mut self) -> FetchState {
        while !self.state.is_terminal() {
            self.step().await;
        }
        self.state
    }

    async fn attempt(&mut self, candidate: &CandidateUrl) -> Result<Vec<u8>, AttemptFailure> {
        self.requests += 1;
        info!(url = %candidate.url, alternate = candidate.alternate, "Fetching candidate image URL");
        let result = self
            .fetcher
            .fetch(&candidate.url)
            .await
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        match classify_response(&result, self.format, self.markers) {
            ResponseClass::Valid => Ok(result.body),
            class => Err(AttemptFailure::Rejected {
                class,
                status: result.status,
                content_type: result.content_type,
            }),
        }
    }
}
