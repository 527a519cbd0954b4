//! Control-plane wire protocol.
//!
//! Versioned JSON messages in length-prefixed frames, one message per
//! connection. See [`message`] for the schema.

mod codec;
mod error;
mod message;

pub use codec::{framed, read_frame, write_frame, DEFAULT_MAX_FRAME_LENGTH};
pub use error::ProtocolError;
pub use message::{
    decode, encode, ConfigMessage, DeltaContent, Envelope, OutputEvent, StreamConfig,
    PROTOCOL_VERSION,
};
