//! STOMP frame representation
//!
//! A frame is one decoded protocol message: a command, a set of headers and a
//! text body. Headers keep their wire order so that re-encoding a decoded
//! frame reproduces the original bytes.

use std::fmt;

/// STOMP command, decoded at the codec boundary
///
/// Client-to-server commands are the first five variants; the rest are only
/// ever produced by the server. Anything else arrives as [`Command::Unknown`]
/// carrying the original text, so an ERROR frame can echo the offending
/// frame verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Connected,
    Message,
    Receipt,
    Error,
    /// Any command string the protocol does not recognize
    Unknown(String),
}

impl Command {
    /// Decode a command line into its variant
    pub fn parse(s: &str) -> Self {
        match s {
            "CONNECT" => Command::Connect,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "CONNECTED" => Command::Connected,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Wire text of this command
    pub fn as_str(&self) -> &str {
        match self {
            Command::Connect => "CONNECT",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Unknown(s) => s,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame command
    pub command: Command,
    /// Headers in wire order; lookup returns the first occurrence
    headers: Vec<(String, String)>,
    /// Frame body, possibly empty
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header, keeping wire order
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Builder-style [`push_header`](Self::push_header)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_header(name, value);
        self
    }

    /// Builder-style body setter
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header value; first occurrence wins
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All headers in wire order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Build a CONNECTED response frame
    pub fn connected(version: &str) -> Self {
        Frame::new(Command::Connected).with_header("version", version)
    }

    /// Build a MESSAGE frame for one subscriber
    pub fn message(destination: &str, subscription_id: i64, message_id: u64, body: &str) -> Self {
        Frame::new(Command::Message)
            .with_header("destination", destination)
            .with_header("subscription", subscription_id.to_string())
            .with_header("message-id", message_id.to_string())
            .with_body(body)
    }

    /// Build a RECEIPT frame echoing the client's receipt id
    pub fn receipt(receipt_id: &str) -> Self {
        Frame::new(Command::Receipt).with_header("receipt-id", receipt_id)
    }

    /// Build an ERROR frame for a rejected client frame
    ///
    /// The `message` header carries the reason; `receipt-id` echoes the
    /// offending frame's `receipt` header when present; the body embeds the
    /// full rendering of the offending frame for diagnostics.
    pub fn error(reason: &str, offending: &Frame) -> Self {
        let mut frame = Frame::new(Command::Error).with_header("message", reason);
        if let Some(receipt_id) = offending.header("receipt") {
            frame.push_header("receipt-id", receipt_id);
        }
        frame.body = format!(
            "The message:\n-----\n{}\n-----\nReason: {}",
            offending, reason
        );
        frame
    }
}

/// Renders the exact wire text of the frame, minus the trailing NUL
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.command)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        f.write_str(&self.body)
    }
}
