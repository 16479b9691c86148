//! Batch renderer: discover → encode → fetch with fallback → write.
//!
//! Files are handled one after the other and independently. A failure for
//! one file is logged, printed and recorded in the [`RenderReport`], then
//! the batch moves on. A missing source directory is an empty batch; only
//! a directory that exists but cannot be listed stops the run.
//!
//! # Navigation
//! - Main entrypoint: [`Renderer::render_all`]
//! - Single file: [`Renderer::render_file`]

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::attempt::{FetchAttempts, FetchState};
use crate::config::RenderConfig;
use crate::contract::{Encoder, ImageFetcher};
use crate::discover::{discover_sources, output_path_for};
use crate::encoding::{classify_encoded_url, EncodedUrl};
use crate::error::RenderError;
use crate::fetch::ALTERNATE_ENCODING_MARKER;

/// Result of the whole batch, in processing order.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub files: Vec<FileReport>,
}

impl RenderReport {
    pub fn rendered(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Rendered { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.rendered()
    }
}

#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug)]
pub enum FileOutcome {
    Rendered { bytes: u64, used_alternate: bool },
    Failed { reason: String },
}

/// A diagram source read from disk.
#[derive(Debug, Clone)]
pub struct DiagramSource {
    pub path: PathBuf,
    pub text: String,
}

impl DiagramSource {
    pub fn read(path: &Path) -> Result<Self, RenderError> {
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }
}

pub struct Renderer<E, F> {
    config: RenderConfig,
    encoder: E,
    fetcher: F,
}

impl<E, F> Renderer<E, F>
where
    E: Encoder,
    F: ImageFetcher,
{
    pub fn new(config: RenderConfig, encoder: E, fetcher: F) -> Self {
        Self {
            config,
            encoder,
            fetcher,
        }
    }

    /// Renders every discovered source. Per-file failures land in the report.
    pub async fn render_all(&self) -> Result<RenderReport, RenderError> {
        info!("[RENDER] Starting diagram rendering");
        let sources = discover_sources(&self.config)?;

        if sources.is_empty() {
            info!(path = %self.config.source_directory.display(), "[RENDER] No diagram sources found");
            println!(
                "No .{} files found in '{}/'.",
                self.config.source_extension,
                self.config.source_directory.display()
            );
            return Ok(RenderReport::default());
        }

        println!("Found {} diagram(s) to render...", sources.len());

        let mut report = RenderReport::default();
        for source in sources {
            println!("Rendering '{}'...", source.display());
            let output = output_path_for(&source, self.config.image_format);
            let outcome = match self.render_file(&source).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(path = %source.display(), error = %e, "[RENDER][ERROR] Failed to render diagram");
                    println!(" -> Error: Could not render '{}': {}", source.display(), e);
                    FileOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.files.push(FileReport {
                source,
                output,
                outcome,
            });
        }

        info!(
            rendered = report.rendered(),
            failed = report.failed(),
            "[RENDER] Diagram rendering finished"
        );
        Ok(report)
    }

    /// Renders one source file. Nothing is written unless a response passed
    /// validation, and any stale output is gone either way.
    pub async fn render_file(&self, path: &Path) -> Result<FileOutcome, RenderError> {
        let source = DiagramSource::read(path)?;
        let output = output_path_for(path, self.config.image_format);

        remove_stale_output(&output)?;

        let encoded_url = self.encoder.encode(&source.text).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "Encoding failed");
            RenderError::Encode(e.to_string())
        })?;

        let shape = classify_encoded_url(
            &encoded_url,
            &self.config.server_base_url,
            self.config.image_format,
        );
        debug!(path = %path.display(), shape = shape.kind(), "Classified encoded URL");
        let suffix = match &shape {
            EncodedUrl::Unrecognized => {
                let shown: String = encoded_url.chars().take(100).collect();
                warn!(path = %path.display(), url = %shown, "Unrecognised encoded URL shape");
                println!(" -> Warning: Could not extract encoded part from URL: {shown}");
                return Err(RenderError::UnrecognizedEncoding(shown));
            }
            other => other.suffix().unwrap_or_default(),
        };

        let mut attempts = FetchAttempts::new(
            &self.fetcher,
            &self.config.server_base_url,
            self.config.image_format,
            &self.config.error_markers,
            suffix,
        );

        while !attempts.state().is_terminal() {
            attempts.step().await;
            if let FetchState::PrimaryAttempted { primary } = attempts.state() {
                println!(" -> Detected {primary}, retrying with {ALTERNATE_ENCODING_MARKER} header...");
            }
        }

        match attempts.into_state() {
            FetchState::Accepted {
                body,
                used_alternate,
            } => {
                std::fs::write(&output, &body).map_err(|e| {
                    error!(path = %output.display(), error = ?e, "Failed to write rendered image");
                    RenderError::io(&output, e)
                })?;
                let bytes = std::fs::metadata(&output)
                    .map(|m| m.len())
                    .unwrap_or(body.len() as u64);
                let note = if used_alternate {
                    format!(" with {ALTERNATE_ENCODING_MARKER} header")
                } else {
                    String::new()
                };
                println!(
                    " -> Successfully created '{}' ({} bytes){}",
                    output.display(),
                    bytes,
                    note
                );
                info!(path = %output.display(), bytes, used_alternate, "Rendered diagram");
                Ok(FileOutcome::Rendered {
                    bytes,
                    used_alternate,
                })
            }
            FetchState::Exhausted { primary, retry } => {
                warn!(path = %path.display(), primary = %primary, retry = %retry, "No valid image after retry");
                println!(" -> Warning: Failed after retry: {retry}");
                Err(RenderError::Exhausted(format!("primary: {primary}; retry: {retry}")))
            }
            state => Err(RenderError::Exhausted(format!("fetch stopped in state {state:?}"))),
        }
    }
}

fn remove_stale_output(output: &Path) -> Result<(), RenderError> {
    if output.exists() {
        std::fs::remove_file(output).map_err(|e| {
            error!(path = %output.display(), error = ?e, "Failed to remove stale output");
            RenderError::io(output, e)
        })?;
        debug!(path = %output.display(), "Removed stale output");
    }
    Ok(())
}
