//! `HttpBackend` against a minimal in-process HTTP server
//!
//! The server understands just enough HTTP/1.1 to answer one request per
//! connection and records what it received.

mod common;

use common::{cutout_png, solid_png, upload, BLUE, RED};
use imgly_bgcompose::{
    BackgroundService, GalleryOutcome, HttpBackend, ImageFetcher, ImageRole, LoadOutcome,
    PreviewConfig, PreviewError, PreviewSession, SubmitOutcome,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    target: String,
    body: Vec<u8>,
}

struct Reply {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
        }
    }

    fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
        }
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    async fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(read_request(stream, handler, recorded));
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn config(&self) -> PreviewConfig {
        PreviewConfig::builder()
            .base_url(&self.base_url)
            .request_timeout_secs(5)
            .build()
            .unwrap()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

async fn read_request(
    mut stream: TcpStream,
    handler: Handler,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> Option<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(position) = find(&buffer, b"\r\n\r\n") {
            break position + 4;
        }
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut chunked = false;
    for line in lines {
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().ok()?;
        }
        if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
            chunked = true;
        }
    }

    let mut body = buffer[header_end..].to_vec();
    if chunked {
        while find(&body, b"0\r\n\r\n").is_none() {
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }
    } else {
        while body.len() < content_length {
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }
    }

    let request = RecordedRequest {
        method,
        target,
        body,
    };
    let reply = handler(&request);
    recorded.lock().unwrap().push(request);

    let head = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reply.content_type,
        reply.body.len()
    );
    stream.write_all(head.as_bytes()).await.ok()?;
    stream.write_all(&reply.body).await.ok()?;
    stream.shutdown().await.ok()?;
    Some(())
}

/// Routes of the page's server: removal, gallery listing and static images
fn page_server(removal: fn() -> Reply) -> Handler {
    Arc::new(move |request: &RecordedRequest| {
        let path = request.target.split('?').next().unwrap_or_default();
        match (request.method.as_str(), path) {
            ("POST", "/remove-background") => removal(),
            ("GET", "/api/backgrounds") if request.target.contains("query=beach") => Reply::ok(
                "application/json",
                r#"{"images": ["/static/bg/beach-1.png", "/static/bg/beach-2.png"]}"#,
            ),
            ("GET", "/api/backgrounds") if request.target.contains("query=abstract") => {
                Reply::ok("application/json", r#"{"error": "no results"}"#)
            },
            ("GET", "/api/backgrounds") if request.target.contains("query=broken") => {
                Reply::ok("text/html", "<html>upstream down</html>")
            },
            ("GET", "/api/backgrounds") => Reply::status(502, "bad gateway"),
            ("GET", "/static/bg/beach-1.png" | "/static/bg/beach-2.png") => {
                Reply::ok("image/png", solid_png(32, 32, BLUE))
            },
            _ => Reply::status(404, "not found"),
        }
    })
}

fn removal_ok() -> Reply {
    Reply::ok("image/png", cutout_png(300, 200, RED))
}

fn removal_error() -> Reply {
    Reply::status(500, "model crashed")
}

#[tokio::test]
async fn test_remove_background_posts_multipart_image_field() {
    let server = TestServer::start(page_server(removal_ok)).await;
    let backend = HttpBackend::new(&server.config()).unwrap();

    let removed = backend.remove_background(&upload(300, 200)).await.unwrap();
    assert_eq!(removed.content_type.as_deref(), Some("image/png"));
    assert_eq!(removed.bytes, cutout_png(300, 200, RED));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/remove-background");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(r#"name="image""#));
    assert!(body.contains(r#"filename="portrait.png""#));
}

#[tokio::test]
async fn test_remove_background_error_status() {
    let server = TestServer::start(page_server(removal_error)).await;
    let backend = HttpBackend::new(&server.config()).unwrap();

    let error = backend.remove_background(&upload(300, 200)).await.unwrap_err();
    assert!(matches!(error, PreviewError::RemovalFailed(_)));
    let message = error.to_string();
    assert!(message.contains("500"));
    assert!(message.contains("model crashed"));
}

#[tokio::test]
async fn test_list_backgrounds() {
    let server = TestServer::start(page_server(removal_ok)).await;
    let backend = HttpBackend::new(&server.config()).unwrap();

    let urls = backend.list_backgrounds("beach").await.unwrap();
    assert_eq!(urls, vec!["/static/bg/beach-1.png", "/static/bg/beach-2.png"]);
    assert_eq!(server.requests()[0].target, "/api/backgrounds?query=beach");

    assert!(backend.list_backgrounds("abstract").await.unwrap().is_empty());
    assert!(matches!(
        backend.list_backgrounds("broken").await,
        Err(PreviewError::GalleryQueryFailed(_))
    ));
    assert!(matches!(
        backend.list_backgrounds("sky").await,
        Err(PreviewError::GalleryQueryFailed(_))
    ));
}

#[tokio::test]
async fn test_fetch_resolves_relative_urls() {
    let server = TestServer::start(page_server(removal_ok)).await;
    let backend = HttpBackend::new(&server.config()).unwrap();

    let bytes = backend.fetch("/static/bg/beach-1.png").await.unwrap();
    assert_eq!(bytes, solid_png(32, 32, BLUE));

    let absolute = format!("{}/static/bg/beach-2.png", server.base_url);
    assert!(backend.fetch(&absolute).await.is_ok());

    assert!(matches!(
        backend.fetch("/static/bg/missing.png").await,
        Err(PreviewError::Network(_))
    ));
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = PreviewConfig::builder().base_url(base_url).build().unwrap();
    let backend = HttpBackend::new(&config).unwrap();
    assert!(matches!(
        backend.remove_background(&upload(10, 10)).await,
        Err(PreviewError::RemovalFailed(_))
    ));
    assert!(matches!(
        backend.list_backgrounds("beach").await,
        Err(PreviewError::GalleryQueryFailed(_))
    ));
}

/// Whole flow through a connected session: removal, gallery, composite, export
#[tokio::test]
async fn test_connected_session_end_to_end() {
    let server = TestServer::start(page_server(removal_ok)).await;
    let session = PreviewSession::connect(server.config()).unwrap();

    session.set_filter("clarendon");
    let outcome = session.submit(Some(&upload(300, 200))).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Loaded(LoadOutcome::Applied));

    let GalleryOutcome::Shown(view) = session.select_category("beach").await.unwrap() else {
        panic!("gallery not shown");
    };
    assert_eq!(view.thumbnails().len(), 2);
    assert_eq!(session.activate_thumbnail(0).await.unwrap(), LoadOutcome::Applied);
    assert_eq!(session.active_background().as_deref(), Some("/static/bg/beach-1.png"));

    let temp_dir = TempDir::new().unwrap();
    let path = session
        .export_control()
        .unwrap()
        .export_to(temp_dir.path())
        .await
        .unwrap();
    let exported = image::open(&path).unwrap().to_rgba8();
    assert_eq!(&exported, session.surface(ImageRole::Transformed).pixels());
    assert_eq!(exported.dimensions(), (400, 267));
}

#[tokio::test]
async fn test_connected_session_removal_failure() {
    let server = TestServer::start(page_server(removal_error)).await;
    let session = PreviewSession::connect(server.config()).unwrap();

    assert!(matches!(
        session.submit(Some(&upload(300, 200))).await,
        Err(PreviewError::RemovalFailed(_))
    ));
    assert!(session.export_control().is_none());
    assert!(!session.surface(ImageRole::Transformed).is_drawn());
}
