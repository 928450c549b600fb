#![allow(dead_code)]

use async_trait::async_trait;
use deal_tracker::{
    Conversion, DetailScraper, LinkConverter, MemoryStore, ProductDetails, ProductRecord,
    ProductUrl, Reply, ReplySink, RetailerConfig, TrackerError, TrackingRecord, TrackingStore,
    UrlExtractor,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Minimal HTTP/1.1 responder: answers every request with the same canned response.
pub struct TestServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl TestServer {
    pub async fn start(status: u16, content_type: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            if status == 200 { "OK" } else { "Status" },
            body.len()
        );

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let recorded = Arc::clone(&recorded);
                let response = response.clone();
                tokio::spawn(async move {
                    serve(socket, recorded, response).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub async fn html(body: &str) -> Self {
        Self::start(200, "text/html; charset=utf-8", body).await
    }

    pub async fn json(status: u16, body: &str) -> Self {
        Self::start(status, "application/json", body).await
    }

    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(mut socket: TcpStream, recorded: Arc<Mutex<Vec<CapturedRequest>>>, response: String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

    recorded.lock().unwrap().push(CapturedRequest { head, body });
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Collects formatted events from a thread-local subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Only covers events on the current thread, so use a current-thread runtime.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// First line of every event logged at `level` (`"ERROR"`, `"WARN"`, ...).
    pub fn events(&self, level: &str) -> Vec<String> {
        let output = String::from_utf8_lossy(&self.0.lock().unwrap()).to_string();
        output
            .lines()
            .filter(|line| line.trim_start().starts_with(level))
            .map(str::to_string)
            .collect()
    }
}

/// A local URL nothing is listening on.
pub async fn closed_port_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{path}")
}

pub fn flipkart_extractor() -> UrlExtractor {
    UrlExtractor::new(RetailerConfig::default()).unwrap()
}

/// Extractor whose canonical host is a local test server.
pub fn local_extractor(server_host: &str) -> UrlExtractor {
    UrlExtractor::new(RetailerConfig {
        domain: server_host.to_string(),
        mirror_subdomain: "dl".to_string(),
    })
    .unwrap()
}

pub fn product_url(text: &str) -> ProductUrl {
    flipkart_extractor().extract(text).unwrap()
}

pub fn widget() -> ProductDetails {
    ProductDetails {
        name: "Widget".to_string(),
        price: "₹999".to_string(),
        image_url: Some("https://rukminim2.flixcart.com/image/widget.jpeg".to_string()),
    }
}

pub struct FakeScraper {
    result: Result<ProductDetails, String>,
    pub calls: AtomicUsize,
}

impl FakeScraper {
    pub fn returning(details: ProductDetails) -> Self {
        Self {
            result: Ok(details),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(cause: &str) -> Self {
        Self {
            result: Err(cause.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetailScraper for FakeScraper {
    async fn scrape(&self, _url: &ProductUrl) -> Result<ProductDetails, TrackerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .map_err(TrackerError::FetchError)
    }
}

pub struct FakeConverter {
    link: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeConverter {
    pub fn converting_to(link: &str) -> Self {
        Self {
            link: Some(link.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            link: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkConverter for FakeConverter {
    async fn convert(&self, url: &ProductUrl) -> Conversion {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.link {
            Some(link) => Conversion::Converted(link.clone()),
            None => Conversion::Fallback {
                link: url.to_string(),
                cause: TrackerError::ConversionError("converter offline".into()),
            },
        }
    }
}

/// Wraps a [`MemoryStore`], counting calls and optionally rejecting writes.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub fail_products: bool,
    pub fail_tracking: bool,
    pub product_calls: AtomicUsize,
    pub tracking_calls: AtomicUsize,
}

impl CountingStore {
    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub fn tracking_calls(&self) -> usize {
        self.tracking_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackingStore for CountingStore {
    async fn upsert_product(&self, record: &ProductRecord) -> Result<(), TrackerError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_products {
            return Err(TrackerError::StoreError {
                table: "products".into(),
                message: "connection refused".into(),
            });
        }
        self.inner.upsert_product(record).await
    }

    async fn upsert_tracking(&self, record: &TrackingRecord) -> Result<(), TrackerError> {
        self.tracking_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tracking {
            return Err(TrackerError::StoreError {
                table: "user_tracking".into(),
                message: "permission denied".into(),
            });
        }
        self.inner.upsert_tracking(record).await
    }
}

#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<Reply>>,
}

impl RecordingSink {
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, reply: Reply) -> Result<(), TrackerError> {
        self.replies.lock().unwrap().push(reply);
        Ok(())
    }
}
