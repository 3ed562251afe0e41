//! stompd: a topic-based pub/sub message broker speaking a STOMP subset
//!
//! Clients connect over TCP, authenticate with a CONNECT frame, subscribe to
//! named destinations and publish messages that the broker fans out to every
//! current subscriber of the destination.
//!
//! # Architecture
//!
//! ```text
//!  socket bytes ──► FrameDecoder ──► Session::process ──► Registry
//!                                                            │
//!                        fan-out: encode + FrameSink::deliver┘
//! ```
//!
//! The same [`session::Session`] / [`registry::Registry`] core runs under two
//! interchangeable connection-handling models:
//!
//! - [`server::BlockingServer`]: one OS thread per connection, synchronous
//!   read/decode/process/write loop.
//! - [`server::ReactorServer`]: non-blocking sockets multiplexed over the
//!   tokio worker pool, with a per-connection outbound FIFO queue and pooled
//!   read buffers.
//!
//! All broker state is in-memory and process-lifetime scoped; nothing is
//! persisted across restarts.

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use error::{Error, Result};
pub use protocol::{Command, Frame, FrameDecoder};
pub use registry::{FrameSink, Registry};
pub use server::{BlockingServer, ReactorServer, ServerConfig, ServerMode};
pub use session::Session;
