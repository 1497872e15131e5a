//! Command protocol between the front-end and the emulation engine.
//!
//! The front-end speaks a small text grammar ([`parse`]); the engine sees
//! typed [`Command`] values that travel the command ring as one tag word plus
//! at most one argument word ([`Command::encode`] / [`Command::decode`]).

mod codec;
mod command;
mod error;

pub use codec::{parse, serialize, Message, Payload, MAX_TOKENS};
pub use command::{
    Command, CommandTag, CommandWords, Drive, InputDevice, PayloadSlot, Port, DRIVE_COUNT,
};
pub use error::{ParseError, WireError};
