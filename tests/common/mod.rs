//! Local servers shared by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use request_boost::{
    BoostConfig, Dispatcher, HttpTransport, NetworkTransport, ProxyProbe,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Dispatcher whose HTTP client ignores proxy environment variables.
pub fn dispatcher(config: BoostConfig) -> Dispatcher<NetworkTransport> {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(config.timeout)
        .build()
        .expect("client");
    let http = HttpTransport::with_client(reqwest_middleware::ClientBuilder::new(client).build(), &config);
    let probe = ProxyProbe::new(config.status_policy);
    Dispatcher::new(config, NetworkTransport::new(http, probe))
}

/// A request as seen by the test HTTP server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

type Handler = dyn Fn(&SeenRequest, usize) -> (u16, String) + Send + Sync;

/// Minimal HTTP/1.1 server. The handler receives the request and how many
/// times that path has been requested before, and returns status and body.
pub struct HttpServer {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl HttpServer {
    pub async fn spawn(handler: impl Fn(&SeenRequest, usize) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let requests: Arc<Mutex<Vec<SeenRequest>>> = Arc::default();
        let handler: Arc<Handler> = Arc::new(handler);

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let seen = Arc::clone(&seen);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let _ = serve_http(stream, seen, handler).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }
}

async fn serve_http(
    mut stream: TcpStream,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    handler: Arc<Handler>,
) -> std::io::Result<()> {
    let head = read_head(&mut stream).await?;
    let text = String::from_utf8_lossy(&head).to_string();
    let mut lines = text.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await?;

    let request = SeenRequest {
        method,
        path,
        headers,
        body,
    };
    let previous = {
        let mut seen = seen.lock();
        let previous = seen.iter().filter(|r| r.path == request.path).count();
        seen.push(request.clone());
        previous
    };

    let (status, body) = handler(&request, previous);
    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Read up to and including the blank line ending the header block.
async fn read_head<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).await? == 0 {
            break;
        }
        head.push(byte[0]);
    }
    Ok(head)
}

/// What the fake SOCKS5 proxy observed for one tunnel.
#[derive(Debug, Clone)]
pub struct Tunnel {
    pub host: String,
    pub port: u16,
    pub request: Vec<u8>,
}

/// SOCKS5 proxy (no authentication) that answers every tunnelled request
/// itself with a fixed response.
pub struct SocksServer {
    pub addr: SocketAddr,
    pub tunnels: Arc<Mutex<Vec<Tunnel>>>,
}

impl SocksServer {
    pub async fn spawn(response: &'static [u8]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let tunnels: Arc<Mutex<Vec<Tunnel>>> = Arc::default();

        let seen = Arc::clone(&tunnels);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let _ = serve_socks(stream, seen, response).await;
                });
            }
        });

        Self { addr, tunnels }
    }

    pub fn connections(&self) -> usize {
        self.tunnels.lock().len()
    }
}

async fn serve_socks(
    mut stream: TcpStream,
    seen: Arc<Mutex<Vec<Tunnel>>>,
    response: &'static [u8],
) -> std::io::Result<()> {
    // greeting: version, method count, methods
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream.write_all(&[0x05, 0x00]).await?;

    // connect request: version, command, reserved, address type
    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    let host = match request[3] {
        0x01 => {
            let mut ip = [0u8; 4];
            stream.read_exact(&mut ip).await?;
            std::net::Ipv4Addr::from(ip).to_string()
        }
        0x03 => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            stream.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).to_string()
        }
        _ => {
            let mut ip = [0u8; 16];
            stream.read_exact(&mut ip).await?;
            std::net::Ipv6Addr::from(ip).to_string()
        }
    };
    let mut port = [0u8; 2];
    stream.read_exact(&mut port).await?;
    stream
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await?;

    let head = read_head(&mut stream).await?;
    seen.lock().push(Tunnel {
        host,
        port: u16::from_be_bytes(port),
        request: head,
    });

    stream.write_all(response).await?;
    stream.shutdown().await
}

/// An address on which nothing is listening.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr")
}

/// Accepts connections and never answers.
pub async fn silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}
