//! STOMP wire codec
//!
//! Wire format: a command line, zero or more `name:value` header lines, a
//! blank line, an optional body, and a single NUL terminator. The decoder is
//! stateful and incremental (one instance per connection); the encoder is a
//! free function.

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::{Command, Frame};

/// Initial accumulation buffer size; grows by amortized doubling
const INITIAL_BUFFER_SIZE: usize = 1 << 10;

/// Incremental byte-at-a-time frame decoder
///
/// Bytes accumulate until a NUL terminator is observed, at which point the
/// accumulated text is parsed as one complete frame and the buffer resets.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create a fresh decoder
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    /// Feed one byte; returns a frame once its NUL terminator arrives
    pub fn decode(&mut self, byte: u8) -> Option<Frame> {
        if byte == 0 {
            let frame = parse(&self.buf);
            self.buf.clear();
            return Some(frame);
        }
        self.buf.push(byte);
        None
    }

    /// Feed a slice of bytes, collecting every frame completed within it
    pub fn decode_all(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| self.decode(b)).collect()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a frame to its exact wire bytes, NUL terminator included
pub fn encode(frame: &Frame) -> Bytes {
    let text = frame.to_string();
    let mut buf = BytesMut::with_capacity(text.len() + 1);
    buf.put_slice(text.as_bytes());
    buf.put_u8(0);
    buf.freeze()
}

/// Parse one complete frame (NUL already stripped)
///
/// The header block is everything before the first blank line; its first line
/// is the command. Header lines split on the first colon; lines without a
/// colon are silently ignored. Parsing never fails: an empty command comes out
/// as `Command::Unknown("")` and the session rejects it.
fn parse(bytes: &[u8]) -> Frame {
    let text = String::from_utf8_lossy(bytes);

    let (header_block, body) = match text.split_once("\n\n") {
        Some((head, body)) => (head, body),
        None => (text.as_ref(), ""),
    };

    let mut lines = header_block.lines();
    let command = Command::parse(lines.next().unwrap_or(""));

    let mut frame = Frame::new(command).with_body(body);
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            frame.push_header(name, value);
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(text: &str) -> Frame {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.decode_all(text.as_bytes());
        assert_eq!(frames.len(), 1, "expected exactly one frame");
        frames.pop().unwrap()
    }

    #[test]
    fn test_decode_connect_frame() {
        let frame =
            decode_one("CONNECT\naccept-version:1.2\nlogin:alice\npasscode:pw\nhost:test\n\n\0");

        assert_eq!(frame.command, Command::Connect);
        assert_eq!(frame.header("accept-version"), Some("1.2"));
        assert_eq!(frame.header("login"), Some("alice"));
        assert_eq!(frame.header("passcode"), Some("pw"));
        assert_eq!(frame.header("host"), Some("test"));
        assert_eq!(frame.body, "");
    }

    #[test]
    fn test_decode_body() {
        let frame = decode_one("SEND\ndestination:/topic/a\n\nhello world\0");

        assert_eq!(frame.command, Command::Send);
        assert_eq!(frame.body, "hello world");
    }

    #[test]
    fn test_incomplete_frame_yields_nothing() {
        let mut decoder = FrameDecoder::new();
        for &b in b"SEND\ndestination:/topic/a\n\nhel" {
            assert!(decoder.decode(b).is_none());
        }
    }

    #[test]
    fn test_decoder_resets_between_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.decode_all(b"DISCONNECT\n\n\0DISCONNECT\nreceipt:9\n\n\0");

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].header("receipt"), None);
        assert_eq!(frames[1].header("receipt"), Some("9"));
    }

    #[test]
    fn test_frame_split_across_feeds() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode_all(b"SEND\ndestina").is_empty());
        let frames = decoder.decode_all(b"tion:/topic/a\n\nhi\0");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].header("destination"), Some("/topic/a"));
        assert_eq!(frames[0].body, "hi");
    }

    #[test]
    fn test_colon_in_header_value() {
        let frame = decode_one("SEND\ndestination:/topic/time:12:30\n\n\0");
        assert_eq!(frame.header("destination"), Some("/topic/time:12:30"));
    }

    #[test]
    fn test_header_line_without_colon_ignored() {
        let frame = decode_one("SEND\nnot a header\ndestination:/topic/a\n\n\0");

        assert_eq!(frame.headers().len(), 1);
        assert_eq!(frame.header("destination"), Some("/topic/a"));
    }

    #[test]
    fn test_empty_frame_becomes_unknown() {
        let frame = decode_one("\0");
        assert_eq!(frame.command, Command::Unknown(String::new()));
    }

    #[test]
    fn test_encode_appends_nul() {
        let frame = Frame::connected("1.2");
        assert_eq!(&encode(&frame)[..], b"CONNECTED\nversion:1.2\n\n\0");
    }

    #[test]
    fn test_round_trip_text_is_byte_identical() {
        let texts = [
            "CONNECT\naccept-version:1.2\nlogin:alice\npasscode:pw\nhost:test\n\n\0",
            "SEND\ndestination:/topic/a\n\nhello\0",
            "SEND\ndestination:/topic/a\n\nmulti\nline\nbody\0",
            "MESSAGE\ndestination:/topic/a\nsubscription:1\nmessage-id:42\n\nhello\n\0",
            "DISCONNECT\n\n\0",
        ];

        for text in texts {
            let mut decoder = FrameDecoder::new();
            let frames = decoder.decode_all(text.as_bytes());
            assert_eq!(frames.len(), 1);
            assert_eq!(&encode(&frames[0])[..], text.as_bytes(), "text: {:?}", text);
        }
    }

    #[test]
    fn test_round_trip_frame_is_equivalent() {
        let frame = Frame::message("/topic/a", 7, 42, "payload");
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.decode_all(&encode(&frame));

        assert_eq!(frames.pop().unwrap(), frame);
    }
}
