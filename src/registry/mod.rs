//! Connection registry for pub/sub routing
//!
//! The registry is the process-wide directory of live connections, the global
//! subscription table, the credential store, and the message-id generator. One
//! instance is created at bootstrap and shared (`Arc`) with every session and
//! handler; there is no static state.
//!
//! Each piece of shared state is synchronized independently so that, for
//! example, a fan-out snapshot never contends with an unrelated CONNECT
//! authenticating. Locks are held only for map access, never across I/O or
//! `.await`, which keeps the registry callable from both blocking connection
//! threads and reactor worker threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;

use crate::protocol::{codec, Frame};

/// Delivery seam between the registry and a connection handler
///
/// Both handler variants implement this: the blocking handler writes straight
/// to the socket, the reactor handler appends to the connection's outbound
/// queue. `deliver` must not block on the network for the reactor variant.
pub trait FrameSink: Send + Sync {
    /// Hand encoded frame bytes to the connection; `false` means the
    /// connection can no longer accept output
    fn deliver(&self, bytes: Bytes) -> bool;
}

/// Process-wide connection and subscription registry
pub struct Registry {
    /// Live connections: connection id -> frame sink
    handlers: RwLock<HashMap<u64, Arc<dyn FrameSink>>>,

    /// Subscription table: destination -> (connection id -> subscription id)
    subscriptions: Mutex<HashMap<String, HashMap<u64, i64>>>,

    /// Credential store: login -> passcode, registered on first CONNECT
    users: Mutex<HashMap<String, String>>,

    /// Shared message-id counter, incremented once per SEND
    next_message_id: AtomicU64,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            next_message_id: AtomicU64::new(0),
        }
    }

    /// Record the sink for a freshly accepted connection
    ///
    /// Called exactly once per connection, before any frame is processed.
    pub fn register(&self, id: u64, sink: Arc<dyn FrameSink>) {
        self.handlers.write().unwrap().insert(id, sink);
        tracing::debug!(conn = id, "connection registered");
    }

    /// Route one outbound frame to a connection, if still registered
    ///
    /// Returns whether the frame was accepted by a live connection. A sink
    /// that reports failure is deregistered on the spot, so a broken
    /// connection stops receiving fan-out immediately.
    pub fn send(&self, id: u64, frame: &Frame) -> bool {
        let sink = self.handlers.read().unwrap().get(&id).cloned();
        match sink {
            Some(sink) => {
                if sink.deliver(codec::encode(frame)) {
                    true
                } else {
                    tracing::debug!(conn = id, "delivery failed, dropping connection");
                    self.disconnect(id);
                    false
                }
            }
            None => false,
        }
    }

    /// Remove a connection and every subscription it holds
    ///
    /// Idempotent: calling it again, or for an unknown id, is a no-op.
    /// Destinations left without subscribers are pruned.
    pub fn disconnect(&self, id: u64) {
        let removed = self.handlers.write().unwrap().remove(&id).is_some();

        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions.retain(|_, subscribers| {
            subscribers.remove(&id);
            !subscribers.is_empty()
        });

        if removed {
            tracing::debug!(conn = id, "connection deregistered");
        }
    }

    /// Add a subscription, creating the destination entry if absent
    pub fn add_subscription(&self, destination: &str, id: u64, subscription_id: i64) {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default()
            .insert(id, subscription_id);
        tracing::debug!(conn = id, destination, subscription_id, "subscribed");
    }

    /// Remove a connection's subscription, pruning the destination entry if it
    /// was the last subscriber
    pub fn remove_subscription(&self, destination: &str, id: u64) {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(subscribers) = subscriptions.get_mut(destination) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                subscriptions.remove(destination);
            }
        }
        tracing::debug!(conn = id, destination, "unsubscribed");
    }

    /// Point-in-time snapshot of a destination's subscribers for fan-out
    ///
    /// Concurrent subscription changes after the snapshot is taken are not
    /// reflected in the fan-out that uses it.
    pub fn subscribers_of(&self, destination: &str) -> HashMap<u64, i64> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    /// Authenticate a login, registering it implicitly on first use
    ///
    /// The first-ever CONNECT for a login stores its passcode and succeeds;
    /// later attempts succeed only on exact passcode equality.
    pub fn authenticate(&self, login: &str, passcode: &str) -> bool {
        let mut users = self.users.lock().unwrap();
        match users.get(login) {
            Some(stored) => stored == passcode,
            None => {
                users.insert(login.to_string(), passcode.to_string());
                true
            }
        }
    }

    /// Allocate the next process-unique message id
    pub fn next_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
