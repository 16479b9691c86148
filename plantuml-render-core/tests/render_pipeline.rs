use std::fs;
use std::path::Path;
use tempfile::tempdir;

use plantuml_render_core::config::RenderConfig;
use plantuml_render_core::contract::{FetchResult, MockEncoder, MockImageFetcher};
use plantuml_render_core::render::{FileOutcome, Renderer};
use plantuml_render_core::validate::PNG_SIGNATURE;

const BASE: &str = "https://www.plantuml.com/plantuml";
const ENCODED: &str = "SyfFKj2rKt3CoKnELR1Io4ZDoSa70000";

fn png(payload: &[u8]) -> Vec<u8> {
    let mut body = PNG_SIGNATURE.to_vec();
    body.extend_from_slice(payload);
    body
}

fn write_source(dir: &Path, name: &str) {
    fs::write(dir.join(name), "@startuml\nBob -> Alice : hello\n@enduml\n").unwrap();
}

fn single_marker_encoder() -> MockEncoder {
    let mut encoder = MockEncoder::new();
    encoder
        .expect_encode()
        .returning(|_| Ok(format!("{BASE}{ENCODED}")));
    encoder
}

fn config_for(dir: &Path) -> RenderConfig {
    RenderConfig::default().with_source_directory(dir)
}

#[tokio::test]
async fn valid_first_response_is_written_without_retry() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");

    let body = png(b"first render");
    let expected = body.clone();

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == format!("{BASE}/png/{ENCODED}"))
        .times(1)
        .returning(move |_| Ok(FetchResult::new(200, body.clone()).with_content_type("image/png")));
    fetcher.expect_fetch().withf(|url| url.contains("~1")).never();

    let renderer = Renderer::new(config_for(tmp.path()), single_marker_encoder(), fetcher);
    let report = renderer.render_all().await.expect("Render should succeed");

    assert_eq!(report.files.len(), 1);
    assert!(matches!(
        report.files[0].outcome,
        FileOutcome::Rendered {
            used_alternate: false,
            ..
        }
    ));
    assert_eq!(fs::read(tmp.path().join("a.png")).unwrap(), expected);
}

#[tokio::test]
async fn error_status_with_image_bytes_retries_with_alternate_marker() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");

    let retry_body = png(b"retry render");
    let expected = retry_body.clone();

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == format!("{BASE}/png/{ENCODED}"))
        .times(1)
        .returning(|_| Ok(FetchResult::new(500, png(b"error render"))));
    fetcher
        .expect_fetch()
        .withf(|url| url == format!("{BASE}/png/~1{ENCODED}"))
        .times(1)
        .returning(move |_| Ok(FetchResult::new(200, retry_body.clone())));

    let renderer = Renderer::new(config_for(tmp.path()), single_marker_encoder(), fetcher);
    let report = renderer.render_all().await.expect("Render should succeed");

    assert!(matches!(
        report.files[0].outcome,
        FileOutcome::Rendered {
            used_alternate: true,
            ..
        }
    ));
    assert_eq!(fs::read(tmp.path().join("a.png")).unwrap(), expected);
}

#[tokio::test]
async fn error_marker_triggers_exactly_one_retry_then_gives_up() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");
    write_source(tmp.path(), "b.plantuml");

    let mut encoder = MockEncoder::new();
    encoder.expect_encode().times(2).returning(|text| {
        assert!(text.contains("Bob -> Alice"));
        Ok(format!("{BASE}{ENCODED}"))
    });

    // Every response is an error image; two files, two requests each.
    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| !url.contains("~1"))
        .times(2)
        .returning(|_| Ok(FetchResult::new(200, png(b"java.lang.HUFFMAN failure"))));
    fetcher
        .expect_fetch()
        .withf(|url| url.contains("~1"))
        .times(2)
        .returning(|_| Ok(FetchResult::new(200, png(b"bad URL"))));

    let renderer = Renderer::new(config_for(tmp.path()), encoder, fetcher);
    let report = renderer.render_all().await.expect("Batch should complete");

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.failed(), 2);
    assert!(!tmp.path().join("a.png").exists());
    assert!(!tmp.path().join("b.png").exists());
}

#[tokio::test]
async fn html_page_with_success_status_is_retried() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| !url.contains("~1"))
        .times(1)
        .returning(|_| {
            Ok(FetchResult::new(200, b"<html>oops</html>".to_vec()).with_content_type("text/html"))
        });
    fetcher
        .expect_fetch()
        .withf(|url| url.contains("~1"))
        .times(1)
        .returning(|_| Ok(FetchResult::new(200, png(b"ok"))));

    let renderer = Renderer::new(config_for(tmp.path()), single_marker_encoder(), fetcher);
    let report = renderer.render_all().await.unwrap();

    assert_eq!(report.rendered(), 1);
    assert!(tmp.path().join("a.png").exists());
}

#[tokio::test]
async fn transport_error_on_primary_still_gets_one_retry() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| !url.contains("~1"))
        .times(1)
        .returning(|_| Err("operation timed out".into()));
    fetcher
        .expect_fetch()
        .withf(|url| url.contains("~1"))
        .times(1)
        .returning(|_| Ok(FetchResult::new(404, b"not found".to_vec())));

    let renderer = Renderer::new(config_for(tmp.path()), single_marker_encoder(), fetcher);
    let report = renderer.render_all().await.unwrap();

    match &report.files[0].outcome {
        FileOutcome::Failed { reason } => assert!(reason.contains("timed out"), "got: {reason}"),
        other => panic!("Expected failure, got {other:?}"),
    }
    assert!(!tmp.path().join("a.png").exists());
}

#[tokio::test]
async fn stale_output_is_removed_even_when_render_fails() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");
    fs::write(tmp.path().join("a.png"), b"stale image").unwrap();

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .times(2)
        .returning(|_| Ok(FetchResult::new(503, b"busy".to_vec())));

    let renderer = Renderer::new(config_for(tmp.path()), single_marker_encoder(), fetcher);
    renderer.render_all().await.unwrap();

    assert!(!tmp.path().join("a.png").exists());
}

#[tokio::test]
async fn stale_output_is_replaced_on_success() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");
    fs::write(tmp.path().join("a.png"), b"stale image").unwrap();

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .times(1)
        .returning(|_| Ok(FetchResult::new(200, png(b"fresh"))));

    let renderer = Renderer::new(config_for(tmp.path()), single_marker_encoder(), fetcher);
    renderer.render_all().await.unwrap();

    assert_eq!(fs::read(tmp.path().join("a.png")).unwrap(), png(b"fresh"));
}

#[tokio::test]
async fn unrecognised_encoding_skips_fetch_and_continues() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");
    write_source(tmp.path(), "b.plantuml");

    let mut encoder = MockEncoder::new();
    let mut calls = 0;
    encoder.expect_encode().times(2).returning(move |_| {
        calls += 1;
        if calls == 1 {
            Ok("not-a-url".to_string())
        } else {
            Ok(format!("{BASE}/png/{ENCODED}"))
        }
    });

    let mut fetcher = MockImageFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url == format!("{BASE}/png/{ENCODED}"))
        .times(1)
        .returning(|_| Ok(FetchResult::new(200, png(b"b"))));

    let renderer = Renderer::new(config_for(tmp.path()), encoder, fetcher);
    let report = renderer.render_all().await.unwrap();

    assert!(matches!(report.files[0].outcome, FileOutcome::Failed { .. }));
    assert!(matches!(report.files[1].outcome, FileOutcome::Rendered { .. }));
    assert!(!tmp.path().join("a.png").exists());
    assert!(tmp.path().join("b.png").exists());
}

#[tokio::test]
async fn encoder_failure_is_contained_to_the_file() {
    let tmp = tempdir().unwrap();
    write_source(tmp.path(), "a.plantuml");

    let mut encoder = MockEncoder::new();
    encoder
        .expect_encode()
        .times(1)
        .returning(|_| Err("connection refused".into()));
    let mut fetcher = MockImageFetcher::new();
    fetcher.expect_fetch().never();

    let renderer = Renderer::new(config_for(tmp.path()), encoder, fetcher);
    let report = renderer.render_all().await.expect("Batch should not abort");

    match &report.files[0].outcome {
        FileOutcome::Failed { reason } => assert!(reason.contains("connection refused")),
        other => panic!("Expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_directory_renders_nothing() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("README.md"), "# docs").unwrap();

    let mut encoder = MockEncoder::new();
    encoder.expect_encode().never();
    let mut fetcher = MockImageFetcher::new();
    fetcher.expect_fetch().never();

    let renderer = Renderer::new(config_for(tmp.path()), encoder, fetcher);
    let report = renderer.render_all().await.expect("Empty directory is not an error");

    assert!(report.files.is_empty());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn missing_directory_renders_nothing_and_succeeds() {
    let tmp = tempdir().unwrap();
    let mut encoder = MockEncoder::new();
    encoder.expect_encode().never();
    let mut fetcher = MockImageFetcher::new();
    fetcher.expect_fetch().never();

    let renderer = Renderer::new(config_for(&tmp.path().join("missing")), encoder, fetcher);
    let report = renderer
        .render_all()
        .await
        .expect("Missing directory should not abort the batch");
    assert!(report.files.is_empty());
}
