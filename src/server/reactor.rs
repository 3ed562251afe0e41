//! Reactor server
//!
//! Non-blocking deployment on the tokio runtime: a small pool of worker
//! threads polls readiness for every connection, so no thread ever blocks on
//! a single socket. Each connection owns an outbound FIFO queue; producers
//! anywhere in the process (fan-out from another connection's SEND included)
//! enqueue encoded frames without blocking, and the queue's owning task wakes
//! to write them in order. Read buffers come from a shared [`BufferPool`].
//!
//! Teardown follows the queue: once the session terminates, the connection's
//! registry entry is dropped, the writer drains whatever is still queued
//! (the final ERROR or RECEIPT included) and only then closes the socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::FrameDecoder;
use crate::registry::{FrameSink, Registry};
use crate::server::config::ServerConfig;
use crate::server::pool::BufferPool;
use crate::session::Session;

/// STOMP server multiplexing non-blocking connections over the runtime's
/// worker pool
pub struct ReactorServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    pool: Arc<BufferPool>,
    config: ServerConfig,
    next_conn_id: AtomicU64,
}

impl ReactorServer {
    /// Bind the listener; the accept loop starts with [`run`](Self::run)
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        tracing::info!(addr = %config.bind_addr, "broker listening (reactor)");
        let pool = Arc::new(BufferPool::new(
            config.read_buffer_size,
            config.pool_capacity,
        ));
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            pool,
            config,
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, spawning a task per connection
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                    if self.config.tcp_nodelay {
                        let _ = socket.set_nodelay(true);
                    }
                    tracing::debug!(conn = id, peer = %peer_addr, "connection accepted");

                    let registry = Arc::clone(&self.registry);
                    let pool = Arc::clone(&self.pool);
                    tokio::spawn(async move {
                        handle_connection(id, socket, registry, pool).await;
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

/// Sink appending encoded frames to the connection's outbound queue
///
/// Enqueueing is non-blocking and wakes the writer task; delivery fails only
/// once the connection is tearing down and the queue is closed.
struct QueueSink {
    queue: mpsc::UnboundedSender<Bytes>,
}

impl FrameSink for QueueSink {
    fn deliver(&self, bytes: Bytes) -> bool {
        self.queue.send(bytes).is_ok()
    }
}

/// Drive one connection: a writer task drains the outbound queue while this
/// task reads, decodes and processes frames inline
async fn handle_connection(
    id: u64,
    socket: TcpStream,
    registry: Arc<Registry>,
    pool: Arc<BufferPool>,
) {
    let (read_half, write_half) = socket.into_split();
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    registry.register(id, Arc::new(QueueSink { queue: queue_tx }));

    let writer = tokio::spawn(write_loop(id, write_half, queue_rx, Arc::clone(&registry)));

    read_loop(id, read_half, &registry, &pool).await;

    // Removing the registry entry drops the queue sender; the writer finishes
    // the remaining queue and closes the socket
    registry.disconnect(id);
    let _ = writer.await;
}

async fn read_loop(id: u64, read_half: OwnedReadHalf, registry: &Arc<Registry>, pool: &BufferPool) {
    let mut session = Session::new(id, Arc::clone(registry));
    let mut decoder = FrameDecoder::new();

    loop {
        // Wait for readiness before leasing, so an idle connection holds no
        // pooled buffer; the lease only spans one non-blocking read
        if let Err(e) = read_half.readable().await {
            tracing::debug!(conn = id, error = %e, "read failed");
            return;
        }

        let mut buf = pool.lease();
        let done = match read_half.try_read_buf(&mut buf) {
            Ok(0) => true, // peer closed the stream
            Ok(_) => {
                for frame in decoder.decode_all(&buf) {
                    session.process(frame);
                    if session.is_terminated() {
                        break;
                    }
                }
                session.is_terminated()
            }
            // Spurious readiness; release the buffer and wait again
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => false,
            Err(e) => {
                tracing::debug!(conn = id, error = %e, "read failed");
                true
            }
        };
        pool.release(buf);
        if done {
            return;
        }
    }
}

async fn write_loop(
    id: u64,
    mut write_half: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Bytes>,
    registry: Arc<Registry>,
) {
    while let Some(bytes) = queue.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            tracing::debug!(conn = id, error = %e, "socket write failed");
            registry.disconnect(id);
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
