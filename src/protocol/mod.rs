//! STOMP wire protocol: frame types and the incremental codec

pub mod codec;
pub mod frame;

pub use codec::{encode, FrameDecoder};
pub use frame::{Command, Frame};
