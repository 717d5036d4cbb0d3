//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the course site and drive full
//! crawls with the static renderer into a temporary mirror directory.

use course_archiver::archive::ArchiveLayout;
use course_archiver::config::{Config, CrawlerConfig, OutputConfig, RendererKind, SiteConfig};
use course_archiver::crawler::{build_http_client, run_archive, Crawler, StaticRenderer};
use course_archiver::ArchiveError;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GIT_BASE: &str = "https://git.host/org";

/// Creates a test configuration writing everything under `dir`
fn create_test_config(server: &MockServer, dir: &Path, use_cache: bool) -> Config {
    let artifact = |name: &str| dir.join(name).display().to_string();

    Config {
        site: SiteConfig {
            course: format!("{}/course", server.uri()),
            git: GIT_BASE.to_string(),
        },
        crawler: CrawlerConfig {
            use_cache,
            renderer: RendererKind::Static,
            navigation_timeout_secs: 5,
            max_concurrent_downloads: 4,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            out_dir: artifact("out"),
            visited_path: artifact("visited.txt"),
            mappings_path: artifact("website-mappings.json"),
            repos_path: artifact("repos.txt"),
        },
    }
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).expect("artifact should exist")
}

/// Paths of every GET the server saw, in arrival order
async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_page_file_and_repository_link() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/course",
        &format!(
            r#"<html><body>
                <a href="{0}/course/faq">FAQ</a>
                <a href="{0}/course/slides.pdf">Slides</a>
                <a href="{1}/repo/blob/main/x">Code</a>
            </body></html>"#,
            server.uri(),
            GIT_BASE
        ),
    )
    .await;
    mount_page(&server, "/course/faq", "<html><body>FAQ</body></html>").await;
    mount_file(&server, "/course/slides.pdf", b"%PDF-1.4 slides").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), true);
    let outcome = run_archive(&config).await.expect("crawl should succeed");

    assert_eq!(outcome.stats.pages_remote, 2);
    assert_eq!(outcome.stats.files_downloaded, 1);

    // Page and file are both mirrored
    let faq = read(dir.path(), "out/course/faq.html");
    assert!(faq.ends_with("<html><body>FAQ</body></html>"));
    assert!(faq.starts_with(&format!(
        r#"<meta name="archived-base" content="{}/course/faq">"#,
        server.uri()
    )));
    assert_eq!(
        std::fs::read(dir.path().join("out/course/slides.pdf")).unwrap(),
        b"%PDF-1.4 slides"
    );

    let mappings: serde_json::Value =
        serde_json::from_str(&read(dir.path(), "website-mappings.json")).unwrap();
    assert_eq!(
        mappings["course/slides.pdf"],
        format!("{}/course/slides.pdf", server.uri())
    );
    assert_eq!(mappings["course/faq.html"], format!("{}/course/faq", server.uri()));
    assert_eq!(mappings["course.html"], format!("{}/course", server.uri()));

    // The repository link collapses to its root and is never crawled
    assert_eq!(read(dir.path(), "repos.txt"), "https://git.host/org/repo");
    let visited = read(dir.path(), "visited.txt");
    assert!(!visited.contains("git.host"));
    assert_eq!(visited.lines().count(), 3);
}

#[tokio::test]
async fn test_siblings_crawled_depth_first_in_reverse_order() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/course",
        r#"<a href="/course/a">A</a><a href="/course/b">B</a><a href="/course/c">C</a>"#,
    )
    .await;
    mount_page(&server, "/course/a", "<p>a</p>").await;
    mount_page(&server, "/course/b", r#"<a href="/course/b/deep">deeper</a>"#).await;
    mount_page(&server, "/course/b/deep", "<p>deep</p>").await;
    mount_page(&server, "/course/c", "<p>c</p>").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), true);
    run_archive(&config).await.expect("crawl should succeed");

    assert_eq!(
        requested_paths(&server).await,
        vec![
            "/course",
            "/course/c",
            "/course/b",
            "/course/b/deep",
            "/course/a"
        ]
    );
}

#[tokio::test]
async fn test_second_run_is_served_from_mirror() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/course",
        r#"<a href="/course/faq">FAQ</a><a href="/course/week1/hw1.zip">HW1</a>"#,
    )
    .await;
    // The FAQ lives at a directory URL; its relative links only make sense
    // against the redirect target
    Mock::given(method("GET"))
        .and(path("/course/faq"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/course/faq/"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/course/faq/",
        r#"<html><head><title>FAQ</title></head><body><a href="notes.txt">Notes</a></body></html>"#,
    )
    .await;
    mount_file(&server, "/course/week1/hw1.zip", b"PK\x03\x04").await;
    mount_file(&server, "/course/faq/notes.txt", b"notes").await;

    let dir = TempDir::new().unwrap();

    let first = run_archive(&create_test_config(&server, dir.path(), false))
        .await
        .expect("first crawl should succeed");
    let first_mappings = read(dir.path(), "website-mappings.json");
    let first_visited = read(dir.path(), "visited.txt");
    let requests_after_first = requested_paths(&server).await.len();
    assert_eq!(first.stats.pages_remote, 2);
    assert_eq!(first.stats.files_downloaded, 2);
    assert_eq!(
        first.recorder.mappings().get("course/faq/notes.txt"),
        Some(format!("{}/course/faq/notes.txt", server.uri()).as_str())
    );

    let second = run_archive(&create_test_config(&server, dir.path(), true))
        .await
        .expect("second crawl should succeed");

    assert_eq!(requested_paths(&server).await.len(), requests_after_first);
    assert!(second.stats.is_fully_cached());
    assert_eq!(second.stats.pages_local, 2);
    assert_eq!(second.stats.files_cached, 2);
    assert_eq!(read(dir.path(), "website-mappings.json"), first_mappings);
    assert_eq!(read(dir.path(), "visited.txt"), first_visited);
    assert!(second.recorder.mappings().get("course/notes.txt").is_none());
}

#[tokio::test]
async fn test_download_failure_does_not_stop_crawl() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/course",
        r#"<a href="/course/gone.pdf">Gone</a><a href="/course/ok.txt">Ok</a><a href="/course/faq">FAQ</a>"#,
    )
    .await;
    mount_page(&server, "/course/faq", "<p>faq</p>").await;
    mount_file(&server, "/course/ok.txt", b"ok").await;
    Mock::given(method("GET"))
        .and(path("/course/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_archive(&create_test_config(&server, dir.path(), true))
        .await
        .expect("download failures are not fatal");

    assert_eq!(outcome.stats.files_failed, 1);
    assert_eq!(outcome.stats.files_downloaded, 1);
    assert_eq!(outcome.stats.pages_remote, 2);

    let mappings = outcome.recorder.mappings();
    assert!(mappings.get("course/gone.pdf").is_none());
    assert!(mappings.get("course/ok.txt").is_some());
    assert!(!dir.path().join("out/course/gone.pdf").exists());
    assert!(!dir.path().join("out/course/gone.pdf.part").exists());
}

#[tokio::test]
async fn test_navigation_failure_is_fatal_but_flushes() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/course",
        r#"<a href="/course/slides.pdf">Slides</a><a href="/course/broken">Broken</a>"#,
    )
    .await;
    mount_file(&server, "/course/slides.pdf", b"slides").await;
    Mock::given(method("GET"))
        .and(path("/course/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = run_archive(&create_test_config(&server, dir.path(), true))
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Navigation { .. }));
    assert!(err.is_fatal());

    // Work done before the failure is still on record
    let visited = read(dir.path(), "visited.txt");
    assert!(visited.contains("/course/broken"));

    let mappings: serde_json::Value =
        serde_json::from_str(&read(dir.path(), "website-mappings.json")).unwrap();
    assert!(mappings.get("course.html").is_some());
    assert!(mappings.get("course/slides.pdf").is_some());
    assert!(mappings.get("course/broken.html").is_none());
}

#[tokio::test]
async fn test_archive_path_collision_aborts() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/course",
        r#"<a href="/course/notes.html">Notes file</a><a href="/course/notes">Notes page</a>"#,
    )
    .await;
    mount_page(&server, "/course/notes", "<p>notes page</p>").await;
    // Still downloading while the colliding page is rendered
    Mock::given(method("GET"))
        .and(path("/course/notes.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"<p>notes file</p>".to_vec())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), true);

    let client = build_http_client("TestArchiver/1.0", Duration::from_secs(5)).unwrap();
    let renderer = StaticRenderer::new(client, ArchiveLayout::new(&config.output.out_dir));
    let err = Crawler::new(&config, Box::new(renderer))
        .unwrap()
        .run()
        .await
        .unwrap_err();

    match err {
        ArchiveError::MappingCollision { path, existing, attempted } => {
            assert_eq!(path, "course/notes.html");
            assert_eq!(existing, format!("{}/course/notes.html", server.uri()));
            assert_eq!(attempted, format!("{}/course/notes", server.uri()));
        }
        other => panic!("expected mapping collision, got {:?}", other),
    }

    // The flushed mapping and the bytes on disk agree
    let mappings: serde_json::Value =
        serde_json::from_str(&read(dir.path(), "website-mappings.json")).unwrap();
    assert_eq!(
        mappings["course/notes.html"],
        format!("{}/course/notes.html", server.uri())
    );
    assert_eq!(
        std::fs::read(dir.path().join("out/course/notes.html")).unwrap(),
        b"<p>notes file</p>"
    );
}
