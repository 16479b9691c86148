///
/// This module implements the CLI for plantuml-render: argument parsing and
/// the async `run` entrypoint shared by `main` and the integration tests.
///
/// All rendering logic lives in the [`plantuml-render-core`] crate; this
/// module builds the configuration, picks the encoder and hands over.
///
/// Invoked with no arguments it renders every `docs/*.plantuml` file.
///
/// [`plantuml-render-core`]: ../../plantuml-render-core/
use crate::load_config::load_config;
use anyhow::Result;
use clap::Parser;
use plantuml_render_core::config::{EncoderKind, RenderConfig};
use plantuml_render_core::contract::Encoder;
use plantuml_render_core::encoding::{LocalEncoder, RemoteEncoder};
use plantuml_render_core::fetch::HttpFetcher;
use plantuml_render_core::render::Renderer;
use std::path::PathBuf;

/// Render PlantUML sources to images via a PlantUML server.
#[derive(Parser, Debug, Default)]
#[clap(
    name = "plantuml-render",
    version,
    about = "Render docs/*.plantuml diagrams to images via a PlantUML server"
)]
pub struct Cli {
    /// Optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the diagram sources (overrides config and env)
    #[clap(long)]
    pub dir: Option<PathBuf>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(dir) = cli.dir {
        config = config.with_source_directory(dir);
    }
    config.trace_loaded();

    let fetcher = HttpFetcher::new(config.request_timeout)
        .map_err(|e| anyhow::Error::msg(format!("Failed to build HTTP client: {e}")))?;

    let result = match config.encoder {
        EncoderKind::Remote => {
            let encoder = RemoteEncoder::new(
                config.server_base_url.clone(),
                config.image_format,
                config.request_timeout,
            )
            .map_err(|e| anyhow::Error::msg(format!("Failed to build HTTP client: {e}")))?;
            render(config, encoder, fetcher).await
        }
        EncoderKind::Local => {
            let encoder = LocalEncoder::new(config.server_base_url.clone(), config.image_format);
            render(config, encoder, fetcher).await
        }
    };

    if result.is_ok() {
        println!("\nDiagram rendering complete.");
    }
    result
}

async fn render<E: Encoder>(config: RenderConfig, encoder: E, fetcher: HttpFetcher) -> Result<()> {
    let renderer = Renderer::new(config, encoder, fetcher);
    match renderer.render_all().await {
        Ok(report) => {
            tracing::info!(
                command = "render",
                rendered = report.rendered(),
                failed = report.failed(),
                "Rendering complete"
            );
            tracing::debug!(?report, "Render report");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "render", error = %e, "Rendering failed");
            eprintln!("[ERROR] Rendering failed: {e}");
            Err(anyhow::Error::new(e))
        }
    }
}
