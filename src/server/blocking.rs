//! Thread-per-connection server
//!
//! The classic blocking deployment: the accept loop hands each connection a
//! dedicated OS thread that reads one byte at a time, feeds the decoder and
//! runs the session synchronously. Outbound frames are written straight to
//! the socket by whichever thread produced them, serialized per connection so
//! each frame write is atomic.

use std::io::{BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::FrameDecoder;
use crate::registry::{FrameSink, Registry};
use crate::server::config::ServerConfig;
use crate::session::Session;

/// STOMP server running one blocking thread per connection
pub struct BlockingServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: ServerConfig,
    next_conn_id: AtomicU64,
}

impl BlockingServer {
    /// Bind the listener; the accept loop starts with [`run`](Self::run)
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)?;
        tracing::info!(addr = %config.bind_addr, "broker listening (thread per connection)");
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            config,
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, spawning a thread per connection
    pub fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                    if self.config.tcp_nodelay {
                        let _ = stream.set_nodelay(true);
                    }
                    tracing::debug!(conn = id, peer = %peer_addr, "connection accepted");

                    let registry = Arc::clone(&self.registry);
                    std::thread::spawn(move || {
                        if let Err(e) = handle_connection(id, stream, registry) {
                            tracing::debug!(conn = id, error = %e, "connection error");
                        }
                        tracing::debug!(conn = id, "connection closed");
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}

/// Sink writing synchronously to the socket
///
/// The mutex keeps concurrent fan-out writes from interleaving within one
/// frame. A failed write shuts the socket down so the reader thread unblocks
/// and tears the connection down.
struct SocketSink {
    stream: Mutex<TcpStream>,
}

impl FrameSink for SocketSink {
    fn deliver(&self, bytes: Bytes) -> bool {
        let mut stream = self.stream.lock().unwrap();
        match stream.write_all(&bytes).and_then(|_| stream.flush()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "socket write failed");
                let _ = stream.shutdown(Shutdown::Both);
                false
            }
        }
    }
}

/// Read/decode/process loop for one connection; returns on termination, EOF
/// or I/O error, cleaning up the registry either way
fn handle_connection(id: u64, stream: TcpStream, registry: Arc<Registry>) -> Result<()> {
    let write_half = stream.try_clone()?;
    registry.register(
        id,
        Arc::new(SocketSink {
            stream: Mutex::new(write_half),
        }),
    );

    let mut session = Session::new(id, Arc::clone(&registry));
    let mut decoder = FrameDecoder::new();
    let mut reader = BufReader::new(&stream);
    let mut byte = [0u8; 1];

    let result = loop {
        if session.is_terminated() {
            break Ok(());
        }
        match reader.read(&mut byte) {
            Ok(0) => break Ok(()), // peer closed the stream
            Ok(_) => {
                if let Some(frame) = decoder.decode(byte[0]) {
                    session.process(frame);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => break Err(e.into()),
        }
    };

    // Idempotent: the session may already have disconnected on DISCONNECT
    registry.disconnect(id);
    let _ = stream.shutdown(Shutdown::Both);
    result
}
