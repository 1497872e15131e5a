use crate::CommandTag;
use thiserror::Error;

/// Rejection of an inbound text message. Never fatal; nothing was mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty message")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`{command}` expects {expected} tokens, got {found}")]
    Arity {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown drive `{0}`")]
    UnknownDrive(String),

    #[error("unknown port `{0}`")]
    UnknownPort(String),

    #[error("unknown input device `{0}`")]
    UnknownInput(String),
}

/// Malformed words read back from the command ring.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown command tag {0}")]
    UnknownTag(u32),

    #[error("invalid argument {arg} for {tag:?}")]
    InvalidArgument { tag: CommandTag, arg: u32 },
}
