//! Shared pool of fixed-size read buffers
//!
//! The reactor read path leases a buffer per readiness callback and returns it
//! once the bytes have been fed to the decoder, avoiding an allocation per
//! read under steady load.

use std::sync::Mutex;

use bytes::BytesMut;

/// Pool of reusable fixed-size `BytesMut` read buffers
pub struct BufferPool {
    buffers: Mutex<Vec<BytesMut>>,
    buffer_size: usize,
    capacity: usize,
}

impl BufferPool {
    /// Create a pool handing out buffers of `buffer_size` bytes, retaining at
    /// most `capacity` idle buffers
    pub fn new(buffer_size: usize, capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
            capacity,
        }
    }

    /// Take a cleared buffer from the pool, allocating if none is idle
    pub fn lease(&self) -> BytesMut {
        self.buffers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.buffer_size))
    }

    /// Return a buffer to the pool; dropped if the pool is full
    pub fn release(&self, mut buffer: BytesMut) {
        buffer.clear();
        let mut buffers = self.buffers.lock().unwrap();
        if buffers.len() < self.capacity {
            buffers.push(buffer);
        }
    }

    /// Number of idle buffers currently held
    pub fn idle(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}
