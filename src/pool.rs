use clap::ValueEnum;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::Result;

/// Number of independent clients. Each keeps its own connections so requests
/// are not pinned to a single front end.
pub const POOL_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PoolStrategy {
    Random,
    RoundRobin,
}

pub struct ConnectionPool {
    clients: Vec<Client>,
    strategy: PoolStrategy,
    cursor: AtomicUsize,
}

impl ConnectionPool {
    pub fn new(size: usize, timeout: Option<Duration>, strategy: PoolStrategy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let clients = (0..size.max(1))
            .map(|_| {
                let builder = Client::builder().default_headers(headers.clone());
                let builder = match timeout {
                    Some(timeout) => builder.timeout(timeout),
                    None => builder,
                };
                builder.build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            clients,
            strategy,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Picks a client for the next request. Never blocks.
    pub fn acquire(&self) -> &Client {
        let idx = match self.strategy {
            PoolStrategy::Random => rand::rng().random_range(0..self.clients.len()),
            PoolStrategy::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % self.clients.len()
            }
        };
        &self.clients[idx]
    }
}
