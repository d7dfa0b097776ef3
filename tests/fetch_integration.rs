//! Integration tests for the fetch pipeline.
//!
//! These tests drive `Downloader::run` end to end against mock HTTP servers.

mod support;

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use fetcher_core::fetch::{Downloader, FetchError, FetchOutcome, FetcherConfig, PolicyRejection};
use support::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png but close enough";

/// Mounts a HEAD that answers with `content_type` and a GET serving `body`.
async fn mount_file(server: &MockServer, path_str: &str, content_type: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", content_type))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Mounts a HEAD with the given headers and a GET that must never be hit.
async fn mount_head_only(server: &MockServer, path_str: &str, headers: &[(&str, &str)]) {
    let mut template = ResponseTemplate::new(200);
    for (name, value) in headers {
        template = template.insert_header(*name, *value);
    }
    Mock::given(method("HEAD"))
        .and(path(path_str))
        .respond_with(template)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"body".to_vec()))
        .expect(0)
        .mount(server)
        .await;
}

async fn downloader_in(dir: &Path) -> Downloader {
    Downloader::new(FetcherConfig::with_download_dir(dir))
        .await
        .expect("downloader should initialize")
}

/// Answers a HEAD announcing a PNG of `declared` bytes, then a GET whose
/// connection closes after only `sent` bytes of that body.
fn spawn_truncating_server(listener: TcpListener, declared: usize, sent: usize) {
    thread::spawn(move || {
        for stream in listener.incoming().take(2) {
            let Ok(mut stream) = stream else {
                return;
            };
            let request = read_request_head(&mut stream);
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n\
                 Content-Length: {declared}\r\nConnection: close\r\n\r\n"
            );
            let _ = stream.write_all(header.as_bytes());
            if request.starts_with("GET ") {
                let _ = stream.write_all(&vec![0x42; sent]);
            }
            let _ = stream.flush();
        }
    });
}

fn read_request_head(stream: &mut impl Read) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_fetch_saves_image_with_url_filename() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_file(&server, "/photos/cat.png", "image/png", PNG_BYTES).await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/photos/cat.png", server.uri()))
        .await;

    let FetchOutcome::Saved { file, bytes } = outcome else {
        panic!("expected Saved, got {outcome:?}");
    };
    assert_eq!(file.path, temp_dir.path().join("cat.png"));
    assert_eq!(bytes, PNG_BYTES.len() as u64);
    assert_eq!(std::fs::read(&file.path).unwrap(), PNG_BYTES);
    assert!(downloader.seen_hashes().contains(&file.hash));
    assert_eq!(dir_entries(temp_dir.path()), vec!["cat.png"]);
}

#[tokio::test]
async fn test_fetch_same_url_twice_saves_once() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_file(&server, "/cat.png", "image/png", PNG_BYTES).await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;
    let url = format!("{}/cat.png", server.uri());

    let first = downloader.run(&url).await;
    let second = downloader.run(&url).await;

    assert_eq!(first.status(), "saved", "first: {first}");
    assert_eq!(second.status(), "duplicate", "second: {second}");
    assert_eq!(downloader.seen_hashes().len(), 1);
    assert_eq!(dir_entries(temp_dir.path()), vec!["cat.png"]);
}

#[tokio::test]
async fn test_fetch_same_content_under_other_name_is_discarded() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_file(&server, "/original.png", "image/png", PNG_BYTES).await;
    mount_file(&server, "/mirror.png", "image/png", PNG_BYTES).await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let first = downloader
        .run(&format!("{}/original.png", server.uri()))
        .await;
    let second = downloader.run(&format!("{}/mirror.png", server.uri())).await;

    assert!(matches!(first, FetchOutcome::Saved { .. }));
    let FetchOutcome::Duplicate { hash } = second else {
        panic!("expected Duplicate, got {second:?}");
    };
    assert!(downloader.seen_hashes().contains(&hash));
    assert_eq!(dir_entries(temp_dir.path()), vec!["original.png"]);
}

#[tokio::test]
async fn test_fetch_non_image_rejected_without_body_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_head_only(
        &server,
        "/not_an_image_file.txt",
        &[("Content-Type", "text/plain")],
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/not_an_image_file.txt", server.uri()))
        .await;

    assert!(
        matches!(
            &outcome,
            FetchOutcome::Rejected(PolicyRejection::UnsupportedType { content_type })
                if content_type == "text/plain"
        ),
        "got {outcome:?}"
    );
    assert!(dir_entries(temp_dir.path()).is_empty());
    assert!(downloader.seen_hashes().is_empty());
}

#[tokio::test]
async fn test_fetch_dangerous_extension_rejected_even_as_image() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_head_only(&server, "/script.js", &[("Content-Type", "image/png")]).await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/script.js", server.uri()))
        .await;

    assert!(
        matches!(
            &outcome,
            FetchOutcome::Rejected(PolicyRejection::DangerousExtension { filename })
                if filename == "script.js"
        ),
        "got {outcome:?}"
    );
    assert!(dir_entries(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_fetch_oversized_gzip_encoded_image_rejected_without_body_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_head_only(
        &server,
        "/huge.png",
        &[
            ("Content-Type", "image/png"),
            ("Content-Encoding", "gzip"),
            ("Content-Length", "22020096"),
        ],
    )
    .await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/huge.png", server.uri()))
        .await;

    assert!(
        matches!(
            outcome,
            FetchOutcome::Rejected(PolicyRejection::TooLarge {
                content_length: 22_020_096,
                ..
            })
        ),
        "got {outcome:?}"
    );
    assert!(dir_entries(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_fetch_uses_content_disposition_filename() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/api/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/jpeg")
                .insert_header("Content-Disposition", r#"attachment; filename="sunset.jpg""#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/api/download", server.uri()))
        .await;

    assert_eq!(outcome.status(), "saved", "got {outcome}");
    assert_eq!(dir_entries(temp_dir.path()), vec!["sunset.jpg"]);
}

#[tokio::test]
async fn test_fetch_bare_slash_url_uses_fallback_name() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_file(&server, "/gallery/", "image/jpeg", b"fallback bytes").await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader.run(&format!("{}/gallery/", server.uri())).await;

    assert_eq!(outcome.status(), "saved", "got {outcome}");
    assert_eq!(dir_entries(temp_dir.path()), vec!["downloaded_file.jpg"]);
}

#[tokio::test]
async fn test_fetch_traversal_filename_rejected_before_transfer() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_head_only(
        &server,
        "/evil",
        &[
            ("Content-Type", "image/png"),
            ("Content-Disposition", r#"attachment; filename="../escape.png""#),
        ],
    )
    .await;
    let outer = TempDir::new().unwrap();
    let download_dir = outer.path().join("Fetched_Images");
    let mut downloader = downloader_in(&download_dir).await;

    let outcome = downloader.run(&format!("{}/evil", server.uri())).await;

    assert!(
        matches!(outcome, FetchOutcome::Rejected(PolicyRejection::UnsafeFilename { .. })),
        "got {outcome:?}"
    );
    assert!(!outer.path().join("escape.png").exists());
    assert!(dir_entries(&download_dir).is_empty());
}

#[tokio::test]
async fn test_fetch_head_404_is_network_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/missing.png", server.uri()))
        .await;

    match outcome {
        FetchOutcome::Failed(error @ FetchError::HttpStatus { status: 404, .. }) => {
            assert!(error.is_network());
        }
        other => panic!("expected HttpStatus 404 failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_transfer_500_leaves_no_artifacts() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .and(path("/flaky.png"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader
        .run(&format!("{}/flaky.png", server.uri()))
        .await;

    assert!(
        matches!(
            outcome,
            FetchOutcome::Failed(FetchError::HttpStatus { status: 500, .. })
        ),
        "got {outcome:?}"
    );
    assert!(dir_entries(temp_dir.path()).is_empty());
    assert!(downloader.seen_hashes().is_empty());
}

#[tokio::test]
async fn test_fetch_truncated_body_removes_staging_file() {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0") else {
        eprintln!("cannot bind 127.0.0.1; skipping truncated body test");
        return;
    };
    let addr = listener.local_addr().unwrap();
    spawn_truncating_server(listener, 1000, 10);
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let outcome = downloader.run(&format!("http://{addr}/cut.png")).await;

    assert!(
        matches!(outcome, FetchOutcome::Failed(FetchError::Network { .. })),
        "got {outcome:?}"
    );
    assert!(dir_entries(temp_dir.path()).is_empty());
    assert!(downloader.seen_hashes().is_empty());
}

#[tokio::test]
async fn test_fetch_sequence_is_isolated_per_url() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_file(&server, "/a.png", "image/png", PNG_BYTES).await;
    mount_head_only(&server, "/page.html", &[("Content-Type", "text/html")]).await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;
    let valid = format!("{}/a.png", server.uri());
    let invalid = format!("{}/page.html", server.uri());

    let reports = downloader
        .run_all([valid.clone(), invalid.clone(), valid.clone()])
        .await;

    let statuses: Vec<&str> = reports.iter().map(|r| r.outcome.status()).collect();
    assert_eq!(statuses, vec!["saved", "rejected", "duplicate"]);
    assert_eq!(reports[1].url, invalid);
    assert_eq!(dir_entries(temp_dir.path()), vec!["a.png"]);
    assert_eq!(downloader.seen_hashes().len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_does_not_stop_following_urls() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_file(&server, "/ok.gif", "image/gif", b"GIF89a").await;
    let temp_dir = TempDir::new().unwrap();
    let mut downloader = downloader_in(temp_dir.path()).await;

    let reports = downloader
        .run_all([
            "http://127.0.0.1:1/unreachable.png".to_string(),
            format!("{}/ok.gif", server.uri()),
        ])
        .await;

    assert!(matches!(reports[0].outcome, FetchOutcome::Failed(_)));
    assert!(reports[1].outcome.is_accepted());
    assert_eq!(dir_entries(temp_dir.path()), vec!["ok.gif"]);
}
