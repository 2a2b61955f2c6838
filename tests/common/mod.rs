//! Shared fixtures: a tiny ETag-aware HTTP server and list builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use token_lists_sdk::config::TokenListsConfig;
use token_lists_sdk::parsers::StatusTokenListParser;
use token_lists_sdk::stores::{
    MemoryContentStore, MemoryCustomTokenStore, MemoryLastRefreshTimeStore, StaticPrivacyGuard,
};

pub const SNT: &str = "0x744d70fdbe2ba4cf95131626614a1763df805b9e";
pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
pub const ZERO: &str = "0x0000000000000000000000000000000000000000";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Default)]
struct Route {
    body: Vec<u8>,
    etag: String,
    gzip: bool,
    delay: Duration,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;

/// Serves registered paths with 200 + ETag, 304 on a matching
/// `If-None-Match` and 404 for anything else.
pub struct TestServer {
    addr: SocketAddr,
    routes: Routes,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(AtomicUsize::new(0));

        let handle = {
            let routes = routes.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = routes.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        requests.fetch_add(1, Ordering::SeqCst);
                        let _ = handle_connection(stream, routes).await;
                    });
                }
            })
        };

        Self {
            addr,
            routes,
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn serve(&self, path: &str, body: Vec<u8>, etag: &str) {
        self.insert(
            path,
            Route {
                body,
                etag: etag.to_string(),
                ..Route::default()
            },
        );
    }

    /// Same as [`Self::serve`] with a gzip-encoded body.
    pub fn serve_gzip(&self, path: &str, body: &[u8], etag: &str) {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        self.insert(
            path,
            Route {
                body: encoder.finish().unwrap(),
                etag: etag.to_string(),
                gzip: true,
                ..Route::default()
            },
        );
    }

    /// Answers only after `delay`.
    pub fn serve_delayed(&self, path: &str, body: Vec<u8>, etag: &str, delay: Duration) {
        self.insert(
            path,
            Route {
                body,
                etag: etag.to_string(),
                delay,
                ..Route::default()
            },
        );
    }

    fn insert(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    pub fn remove(&self, path: &str) {
        self.routes.lock().unwrap().remove(path);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(mut stream: TcpStream, routes: Routes) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request = String::from_utf8_lossy(&buf);
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let if_none_match = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("if-none-match"))
        .map(|(_, value)| value.trim().to_string());

    let route = routes.lock().unwrap().get(&path).cloned();
    if let Some(route) = &route {
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
    }
    let response = match route {
        Some(route) if if_none_match.as_deref() == Some(route.etag.as_str()) => format!(
            "HTTP/1.1 304 Not Modified\r\nETag: {}\r\nConnection: close\r\n\r\n",
            route.etag
        )
        .into_bytes(),
        Some(route) => {
            let encoding = if route.gzip { "Content-Encoding: gzip\r\n" } else { "" };
            let mut out = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n{}ETag: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                encoding,
                route.etag,
                route.body.len()
            )
            .into_bytes();
            out.extend_from_slice(&route.body);
            out
        }
        None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
    };

    stream.write_all(&response).await?;
    stream.shutdown().await
}

/// Status-format list with every token on chain 1.
pub fn status_list(name: &str, tokens: &[(&str, &str, &str)]) -> Vec<u8> {
    let tokens: Vec<serde_json::Value> = tokens
        .iter()
        .map(|(cross, symbol, addr)| {
            serde_json::json!({
                "crossChainId": cross,
                "symbol": symbol,
                "name": symbol,
                "decimals": 18,
                "contracts": {"1": addr}
            })
        })
        .collect();
    serde_json::to_vec(&serde_json::json!({
        "name": name,
        "timestamp": "2024-01-01T00:00:00Z",
        "version": {"major": 1, "minor": 0, "patch": 0},
        "tokens": tokens
    }))
    .unwrap()
}

/// Uniswap-format list with every token on chain 1.
pub fn standard_list(name: &str, tokens: &[(&str, &str)]) -> Vec<u8> {
    let tokens: Vec<serde_json::Value> = tokens
        .iter()
        .map(|(symbol, addr)| {
            serde_json::json!({
                "chainId": 1,
                "address": addr,
                "name": symbol,
                "symbol": symbol,
                "decimals": 18
            })
        })
        .collect();
    serde_json::to_vec(&serde_json::json!({
        "name": name,
        "timestamp": "2024-01-01T00:00:00Z",
        "version": {"major": 1, "minor": 0, "patch": 0},
        "tokens": tokens
    }))
    .unwrap()
}

/// `entries` are `(id, source_url)` pairs.
pub fn manifest(entries: &[(&str, String)]) -> Vec<u8> {
    let lists: Vec<serde_json::Value> = entries
        .iter()
        .map(|(id, url)| serde_json::json!({"id": id, "sourceUrl": url}))
        .collect();
    serde_json::to_vec(&serde_json::json!({
        "timestamp": "2024-01-01T00:00:00Z",
        "version": {"major": 1, "minor": 0, "patch": 0},
        "tokenLists": lists
    }))
    .unwrap()
}

/// Memory-backed collaborators the tests keep handles to.
pub struct Stores {
    pub content: Arc<MemoryContentStore>,
    pub custom: Arc<MemoryCustomTokenStore>,
    pub last_refresh: Arc<MemoryLastRefreshTimeStore>,
    pub privacy: Arc<StaticPrivacyGuard>,
}

impl Stores {
    pub fn new(privacy_on: bool) -> Self {
        Self {
            content: Arc::new(MemoryContentStore::new()),
            custom: Arc::new(MemoryCustomTokenStore::new()),
            last_refresh: Arc::new(MemoryLastRefreshTimeStore::new()),
            privacy: Arc::new(StaticPrivacyGuard::new(privacy_on)),
        }
    }

    /// Status main list holding the native ETH record and SNT.
    pub fn config(&self) -> TokenListsConfig {
        let main = status_list("Status", &[("eth-native", "ETH", ZERO), ("snt", "SNT", SNT)]);
        TokenListsConfig::new("status", main, Arc::new(StatusTokenListParser))
            .with_chains([1])
            .with_content_store(self.content.clone())
            .with_custom_token_store(self.custom.clone())
            .with_last_refresh_time_store(self.last_refresh.clone())
            .with_privacy_guard(self.privacy.clone())
    }
}
