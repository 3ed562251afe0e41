//! Server configuration

use std::net::SocketAddr;

use crate::error::Error;

/// Connection-handling concurrency model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// One blocking OS thread per connection
    ThreadPerConnection,
    /// Non-blocking sockets multiplexed over a small worker pool
    Reactor,
}

impl ServerMode {
    /// Parse the bootstrap selector argument (`tpc` or `reactor`)
    pub fn from_arg(arg: &str) -> Result<Self, Error> {
        match arg.to_ascii_lowercase().as_str() {
            "tpc" => Ok(ServerMode::ThreadPerConnection),
            "reactor" => Ok(ServerMode::Reactor),
            other => Err(Error::InvalidArgument(format!(
                "unknown server mode '{}', expected 'tpc' or 'reactor'",
                other
            ))),
        }
    }
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Concurrency model for connection handling
    pub mode: ServerMode,

    /// Worker threads for the reactor runtime (0 = available parallelism)
    pub worker_threads: usize,

    /// Size of each pooled read buffer (reactor variant)
    pub read_buffer_size: usize,

    /// Maximum idle buffers retained by the pool (reactor variant)
    pub pool_capacity: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:61613".parse().unwrap(),
            mode: ServerMode::Reactor,
            worker_threads: 0,
            read_buffer_size: 8 * 1024,
            pool_capacity: 64,
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the concurrency model
    pub fn mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the reactor worker thread count
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = count;
        self
    }

    /// Set the pooled read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the buffer pool retention bound
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}
