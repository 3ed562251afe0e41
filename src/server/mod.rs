//! Connection handling: two concurrency models over one session/registry core

pub mod blocking;
pub mod config;
pub mod pool;
pub mod reactor;

pub use blocking::BlockingServer;
pub use config::{ServerConfig, ServerMode};
pub use pool::BufferPool;
pub use reactor::ReactorServer;
