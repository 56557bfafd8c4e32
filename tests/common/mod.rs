#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

/// How the synthetic server answers each request.
#[derive(Debug, Clone)]
pub enum Behavior {
    Respond {
        status: u16,
        reason: &'static str,
        body: &'static str,
        /// Rotated through as `X-server` values; empty omits the header.
        servers: Vec<&'static str>,
        latency: Duration,
    },
    /// Reads the request and never answers.
    Hang,
}

impl Behavior {
    pub fn ok() -> Self {
        Behavior::Respond {
            status: 200,
            reason: "OK",
            body: "{}",
            servers: Vec::new(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        match self {
            Behavior::Respond {
                status,
                reason,
                body,
                servers,
                ..
            } => Behavior::Respond {
                status,
                reason,
                body,
                servers,
                latency,
            },
            Behavior::Hang => Behavior::Hang,
        }
    }
}

#[derive(Debug, Default)]
pub struct ServerStats {
    pub requests: AtomicU64,
    pub in_flight: AtomicU64,
    pub max_in_flight: AtomicU64,
    pub accept_json: AtomicBool,
}

pub struct SyntheticServer {
    pub addr: SocketAddr,
    pub stats: Arc<ServerStats>,
}

impl SyntheticServer {
    pub fn url(&self) -> String {
        format!("http://{}/probe", self.addr)
    }

    pub fn requests(&self) -> u64 {
        self.stats.requests.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> u64 {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }
}

pub async fn spawn(behavior: Behavior) -> SyntheticServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(ServerStats::default());

    let server_stats = Arc::clone(&stats);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, behavior.clone(), Arc::clone(&server_stats)));
        }
    });

    SyntheticServer { addr, stats }
}

async fn serve(stream: TcpStream, behavior: Behavior, stats: Arc<ServerStats>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        if line.eq_ignore_ascii_case("accept: application/json\r\n") {
            stats.accept_json.store(true, Ordering::SeqCst);
        }
        if line == "\r\n" {
            break;
        }
    }

    let seq = stats.requests.fetch_add(1, Ordering::SeqCst);
    let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

    match behavior {
        Behavior::Hang => {
            sleep(Duration::from_secs(60)).await;
            drop(reader);
        }
        Behavior::Respond {
            status,
            reason,
            body,
            servers,
            latency,
        } => {
            sleep(latency).await;

            let mut response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n",
                status,
                reason,
                body.len()
            );
            if !servers.is_empty() {
                let server = servers[seq as usize % servers.len()];
                response.push_str(&format!("X-server: {}\r\n", server));
            }
            response.push_str("\r\n");
            response.push_str(body);

            stats.in_flight.fetch_sub(1, Ordering::SeqCst);

            let mut stream = reader.into_inner();
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    }
}
