//! Shared utilities for integration testing: raw-TCP mock backends and a
//! proxy bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ollama_bridge::{HttpServer, ProxyConfig, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the mock backend answers to every request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Fixed-length response with `Content-Length`.
    Fixed {
        status: u16,
        content_type: &'static str,
        body: String,
    },
    /// `Transfer-Encoding: chunked`, one chunk per fragment with a pause after each.
    Chunked {
        status: u16,
        content_type: &'static str,
        fragments: Vec<String>,
        delay: Duration,
    },
    /// Read the request, then close the socket without answering.
    Hangup,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Reply::Fixed {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }
}

/// A request as the backend saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Request target: path plus query.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
    pub accepted: Arc<AtomicUsize>,
    /// Set once a chunked write fails because the peer went away.
    pub write_failed: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn write_failed(&self) -> bool {
        self.write_failed.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> CapturedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("backend saw no request")
    }
}

/// Start a mock backend answering every connection with `reply`.
pub async fn start_backend(reply: Reply) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let accepted = Arc::new(AtomicUsize::new(0));
    let write_failed = Arc::new(AtomicBool::new(false));

    let (reqs, count, failed) = (requests.clone(), accepted.clone(), write_failed.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    count.fetch_add(1, Ordering::SeqCst);
                    let reply = reply.clone();
                    let reqs = reqs.clone();
                    let failed = failed.clone();
                    tokio::spawn(async move {
                        serve_one(socket, reply, reqs, failed).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend {
        addr,
        requests,
        accepted,
        write_failed,
    }
}

async fn serve_one(
    mut socket: TcpStream,
    reply: Reply,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    write_failed: Arc<AtomicBool>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    requests.lock().unwrap().push(request);

    match reply {
        Reply::Fixed {
            status,
            content_type,
            body,
        } => {
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason(status),
                content_type,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
        Reply::Chunked {
            status,
            content_type,
            fragments,
            delay,
        } => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                content_type
            );
            if socket.write_all(head.as_bytes()).await.is_err() {
                write_failed.store(true, Ordering::SeqCst);
                return;
            }
            for fragment in fragments {
                let chunk = format!("{:x}\r\n{}\r\n", fragment.len(), fragment);
                if socket.write_all(chunk.as_bytes()).await.is_err() {
                    write_failed.store(true, Ordering::SeqCst);
                    return;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(delay).await;
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
        Reply::Hangup => {}
    }
    let _ = socket.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// Read one HTTP/1.1 request: head, then a `Content-Length` or chunked body.
async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if !read_more(socket, &mut buf).await {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut request = CapturedRequest {
        method,
        target,
        headers,
        body: Vec::new(),
    };
    let mut rest = buf[head_end..].to_vec();

    if let Some(len) = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        while rest.len() < len {
            if !read_more(socket, &mut rest).await {
                return None;
            }
        }
        request.body = rest[..len].to_vec();
    } else if request
        .header("transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
    {
        while find(&rest, b"0\r\n\r\n").is_none() {
            if !read_more(socket, &mut rest).await {
                return None;
            }
        }
        request.body = decode_chunked(&rest);
    }

    Some(request)
}

async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) -> bool {
    let mut tmp = [0u8; 4096];
    match socket.read(&mut tmp).await {
        Ok(0) | Err(_) => false,
        Ok(n) => {
            buf.extend_from_slice(&tmp[..n]);
            true
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_chunked(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(data, b"\r\n") {
        let size_str = String::from_utf8_lossy(&data[..line_end]).to_string();
        let size = usize::from_str_radix(size_str.split(';').next().unwrap_or("0").trim(), 16)
            .unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        out.extend_from_slice(&data[start..start + size]);
        data = &data[start + size + 2..];
    }
    out
}

/// A running proxy in front of `backend_url`.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(backend_url: &str) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.backend.url = backend_url.to_string();
    start_proxy_with(config).await
}

pub async fn start_proxy_with(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// An address with nothing listening on it.
pub fn dead_address() -> SocketAddr {
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    reserved.local_addr().unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
