//! Per-connection protocol state machine
//!
//! A [`Session`] consumes decoded frames from one connection, validates them
//! against the current state, mutates the shared [`Registry`] and produces
//! outbound frames through it. There is no recoverable protocol error: every
//! violation answers with a single ERROR frame and terminates the session.
//!
//! Lifecycle: unconnected until a CONNECT authenticates, then connected until
//! a terminal outcome (DISCONNECT, protocol violation, or transport failure
//! observed by the owning handler). A terminated session processes nothing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::{Command, Frame};
use crate::registry::Registry;

/// STOMP version advertised in CONNECTED responses
const PROTOCOL_VERSION: &str = "1.2";

/// Protocol state machine for one connection
pub struct Session {
    /// Connection identity, assigned at accept time
    id: u64,

    /// Shared connection registry
    registry: Arc<Registry>,

    /// True once CONNECT has succeeded
    connected: bool,

    /// True once any terminal outcome occurred; latched
    terminated: bool,

    /// This connection's subscriptions: subscription id -> destination
    subscriptions: HashMap<i64, String>,
}

impl Session {
    /// Create the session for a freshly accepted connection
    pub fn new(id: u64, registry: Arc<Registry>) -> Self {
        Self {
            id,
            registry,
            connected: false,
            terminated: false,
            subscriptions: HashMap::new(),
        }
    }

    /// Whether the session has reached a terminal outcome
    ///
    /// The owning handler must stop feeding frames and close the connection
    /// once this returns true.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Process one decoded frame
    pub fn process(&mut self, frame: Frame) {
        if self.terminated {
            return;
        }

        match &frame.command {
            Command::Connect => self.handle_connect(&frame),
            Command::Subscribe => self.handle_subscribe(&frame),
            Command::Unsubscribe => self.handle_unsubscribe(&frame),
            Command::Send => self.handle_send(&frame),
            Command::Disconnect => self.handle_disconnect(&frame),
            Command::Connected
            | Command::Message
            | Command::Receipt
            | Command::Error
            | Command::Unknown(_) => {
                self.error(
                    &format!("invalid command: {}", frame.command),
                    &frame,
                );
            }
        }
    }

    fn handle_connect(&mut self, frame: &Frame) {
        if self.connected {
            self.error("already connected", frame);
            return;
        }

        let version = frame.header("accept-version");
        let login = frame.header("login");
        let passcode = frame.header("passcode");
        let host = frame.header("host");

        let (login, passcode) = match (version, login, passcode, host) {
            (Some(_), Some(login), Some(passcode), Some(_)) => (login, passcode),
            _ => {
                self.error(
                    "missing required headers in CONNECT (accept-version, login, passcode, host)",
                    frame,
                );
                return;
            }
        };

        if !self.registry.authenticate(login, passcode) {
            self.error(&format!("invalid passcode for user {}", login), frame);
            return;
        }

        self.connected = true;
        tracing::info!(conn = self.id, login, "client connected");

        self.registry
            .send(self.id, &Frame::connected(PROTOCOL_VERSION));
        self.receipt_if_requested(frame);
    }

    fn handle_subscribe(&mut self, frame: &Frame) {
        if !self.connected {
            self.error("SUBSCRIBE received before CONNECT", frame);
            return;
        }

        let (destination, id) = match (frame.header("destination"), frame.header("id")) {
            (Some(destination), Some(id)) => (destination, id),
            _ => {
                self.error(
                    "missing required headers in SUBSCRIBE (destination, id)",
                    frame,
                );
                return;
            }
        };

        let subscription_id: i64 = match id.parse() {
            Ok(id) => id,
            Err(_) => {
                self.error(&format!("invalid subscription id: {}", id), frame);
                return;
            }
        };

        self.subscriptions
            .insert(subscription_id, destination.to_string());
        self.registry
            .add_subscription(destination, self.id, subscription_id);
        self.receipt_if_requested(frame);
    }

    fn handle_unsubscribe(&mut self, frame: &Frame) {
        if !self.connected {
            self.error("UNSUBSCRIBE received before CONNECT", frame);
            return;
        }

        let id = match frame.header("id") {
            Some(id) => id,
            None => {
                self.error("missing id header in UNSUBSCRIBE", frame);
                return;
            }
        };

        let subscription_id: i64 = match id.parse() {
            Ok(id) => id,
            Err(_) => {
                self.error(&format!("invalid subscription id: {}", id), frame);
                return;
            }
        };

        let destination = match self.subscriptions.remove(&subscription_id) {
            Some(destination) => destination,
            None => {
                self.error(&format!("no such subscription: {}", subscription_id), frame);
                return;
            }
        };

        self.registry.remove_subscription(&destination, self.id);
        self.receipt_if_requested(frame);
    }

    fn handle_send(&mut self, frame: &Frame) {
        if !self.connected {
            self.error("SEND received before CONNECT", frame);
            return;
        }

        // Any connected client may publish to any destination; the sender
        // does not have to be a subscriber itself.
        let destination = match frame.header("destination") {
            Some(destination) => destination,
            None => {
                self.error("missing destination header in SEND", frame);
                return;
            }
        };

        let message_id = self.registry.next_message_id();
        let subscribers = self.registry.subscribers_of(destination);
        tracing::debug!(
            conn = self.id,
            destination,
            message_id,
            subscribers = subscribers.len(),
            "fan-out"
        );

        for (subscriber, subscription_id) in subscribers {
            let message = Frame::message(destination, subscription_id, message_id, &frame.body);
            self.registry.send(subscriber, &message);
        }
    }

    fn handle_disconnect(&mut self, frame: &Frame) {
        if !self.connected {
            self.error("DISCONNECT received before CONNECT", frame);
            return;
        }

        self.terminated = true;
        tracing::info!(conn = self.id, "client disconnecting");

        for destination in self.subscriptions.values() {
            self.registry.remove_subscription(destination, self.id);
        }
        self.subscriptions.clear();

        // The receipt must go out before the sink is deregistered
        self.receipt_if_requested(frame);
        self.registry.disconnect(self.id);
    }

    /// Emit an ERROR frame echoing the offending frame, then terminate
    fn error(&mut self, reason: &str, offending: &Frame) {
        tracing::debug!(conn = self.id, reason, "protocol violation");
        self.registry.send(self.id, &Frame::error(reason, offending));
        self.terminated = true;
    }

    /// Emit a RECEIPT if the originating frame asked for one
    fn receipt_if_requested(&self, frame: &Frame) {
        if let Some(receipt_id) = frame.header("receipt") {
            self.registry.send(self.id, &Frame::receipt(receipt_id));
        }
    }
}
