//! Text grammar spoken by the front-end.
//!
//! ```text
//! reset                    -> Reset
//! eject <drive>            -> EjectDisk(drive)
//! insert <drive> <url>     -> InsertDisk(drive) + payload(url)
//! rom <url>                -> SelectRom + payload(url)
//! connect <port> <input>   -> port configuration change, not queued
//! ```
//!
//! A message is split on whitespace into at most [`MAX_TOKENS`] tokens; extra
//! tokens are ignored. The kept token count must equal the command's arity.

use crate::{Command, Drive, InputDevice, ParseError, PayloadSlot, Port};
use smallvec::SmallVec;

/// Tokens considered per message.
pub const MAX_TOKENS: usize = 3;

/// Path carried alongside a queued command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payload<'a> {
    pub slot: PayloadSlot,
    pub value: &'a str,
}

/// Result of parsing one inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message<'a> {
    /// Goes through the command ring; the payload, if any, must be stored
    /// before the command is pushed.
    Queued {
        command: Command,
        payload: Option<Payload<'a>>,
    },
    /// Applied synchronously by the front-end.
    Connect { port: Port, device: InputDevice },
}

impl<'a> Message<'a> {
    fn queued(command: Command) -> Self {
        Message::Queued {
            command,
            payload: None,
        }
    }

    fn with_payload(command: Command, value: &'a str) -> Self {
        let payload = command
            .payload_slot()
            .map(|slot| Payload { slot, value });
        Message::Queued { command, payload }
    }
}

fn arity(command: &str) -> Option<usize> {
    match command {
        "reset" => Some(1),
        "eject" | "rom" => Some(2),
        "insert" | "connect" => Some(3),
        _ => None,
    }
}

fn drive(token: &str) -> Result<Drive, ParseError> {
    Drive::from_token(token).ok_or_else(|| ParseError::UnknownDrive(token.to_owned()))
}

/// Parses one front-end message. Pure; the caller applies the result.
pub fn parse(raw: &str) -> Result<Message<'_>, ParseError> {
    let tokens: SmallVec<[&str; MAX_TOKENS]> =
        raw.split_ascii_whitespace().take(MAX_TOKENS).collect();

    let head = *tokens.first().ok_or(ParseError::Empty)?;
    let expected = arity(head).ok_or_else(|| ParseError::UnknownCommand(head.to_owned()))?;
    if tokens.len() != expected {
        return Err(ParseError::Arity {
            command: head.to_owned(),
            expected,
            found: tokens.len(),
        });
    }

    match *tokens.as_slice() {
        ["reset"] => Ok(Message::queued(Command::Reset)),
        ["eject", target] => Ok(Message::queued(Command::EjectDisk(drive(target)?))),
        ["insert", target, url] => Ok(Message::with_payload(
            Command::InsertDisk(drive(target)?),
            url,
        )),
        ["rom", url] => Ok(Message::with_payload(Command::SelectRom, url)),
        ["connect", port, input] => {
            let port =
                Port::from_token(port).ok_or_else(|| ParseError::UnknownPort(port.to_owned()))?;
            let device = InputDevice::from_token(input)
                .ok_or_else(|| ParseError::UnknownInput(input.to_owned()))?;
            Ok(Message::Connect { port, device })
        }
        _ => Err(ParseError::UnknownCommand(head.to_owned())),
    }
}

/// Renders a message back to its text form.
///
/// Returns `None` for commands the text grammar cannot express (they are only
/// sent programmatically) and for a payload command without its payload.
pub fn serialize(message: &Message<'_>) -> Option<String> {
    match *message {
        Message::Connect { port, device } => {
            Some(format!("connect {} {}", port.token(), device.token()))
        }
        Message::Queued { command, payload } => match (command, payload) {
            (Command::Reset, None) => Some("reset".to_owned()),
            (Command::EjectDisk(drive), None) => Some(format!("eject {}", drive.token())),
            (Command::InsertDisk(drive), Some(payload)) => {
                Some(format!("insert {} {}", drive.token(), payload.value))
            }
            (Command::SelectRom, Some(payload)) => Some(format!("rom {}", payload.value)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eject_selects_drive() {
        assert_eq!(
            parse("eject df0"),
            Ok(Message::queued(Command::EjectDisk(Drive::Df0)))
        );
        assert_eq!(
            parse("eject df2"),
            Err(ParseError::UnknownDrive("df2".to_owned()))
        );
    }

    #[test]
    fn insert_carries_drive_payload() {
        assert_eq!(
            parse("insert df1 file:///a.adf"),
            Ok(Message::Queued {
                command: Command::InsertDisk(Drive::Df1),
                payload: Some(Payload {
                    slot: PayloadSlot::Drive(Drive::Df1),
                    value: "file:///a.adf",
                }),
            })
        );
    }

    #[test]
    fn rom_uses_rom_slot() {
        let Ok(Message::Queued { command, payload }) = parse("rom kick.rom") else {
            panic!("rom should parse");
        };
        assert_eq!(command, Command::SelectRom);
        assert_eq!(payload.map(|p| p.slot), Some(PayloadSlot::Rom));
    }

    #[test]
    fn connect_is_not_queued() {
        assert_eq!(
            parse("connect port1 kbd0"),
            Ok(Message::Connect {
                port: Port::Port1,
                device: InputDevice::Kbd0
            })
        );
        assert_eq!(
            parse("connect port2 mouse"),
            Err(ParseError::UnknownPort("port2".to_owned()))
        );
        assert_eq!(
            parse("connect port0 trackball"),
            Err(ParseError::UnknownInput("trackball".to_owned()))
        );
    }

    #[test]
    fn tokens_past_the_third_are_ignored() {
        assert_eq!(
            parse("insert df0 disk.adf trailing words"),
            parse("insert df0 disk.adf")
        );
        assert!(parse("connect port0 joy1 extra").is_ok());
    }

    #[test]
    fn arity_must_match_exactly() {
        assert_eq!(
            parse("eject"),
            Err(ParseError::Arity {
                command: "eject".to_owned(),
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(parse("reset now"), Err(ParseError::Arity { .. })));
        assert!(matches!(parse("eject df0 x"), Err(ParseError::Arity { .. })));
        assert!(matches!(parse("insert df0"), Err(ParseError::Arity { .. })));
    }

    #[test]
    fn unknown_and_empty_input() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   \t "), Err(ParseError::Empty));
        assert_eq!(
            parse("Reset"),
            Err(ParseError::UnknownCommand("Reset".to_owned()))
        );
        assert_eq!(
            parse("quit"),
            Err(ParseError::UnknownCommand("quit".to_owned()))
        );
    }

    #[test]
    fn extra_whitespace_is_tolerated() {
        assert_eq!(parse("  eject\tdf1  "), parse("eject df1"));
    }

    #[test]
    fn programmatic_commands_have_no_text_form() {
        assert_eq!(serialize(&Message::queued(Command::Pause)), None);
        assert_eq!(
            serialize(&Message::queued(Command::InsertDisk(Drive::Df0))),
            None
        );
    }
}

#[cfg(test)]
mod prop {
    use super::*;
    use proptest::prelude::*;
    use proptest::prelude::prop;

    fn url() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9:/._%-]{1,64}"
    }

    fn drive() -> impl Strategy<Value = Drive> {
        prop::sample::select(Drive::ALL.to_vec())
    }

    proptest! {
        /// Every expressible message survives serialize -> parse unchanged.
        #[test]
        fn text_round_trip(
            choice in 0u8..5,
            target in drive(),
            port in prop::sample::select(Port::ALL.to_vec()),
            device in prop::sample::select(InputDevice::ALL.to_vec()),
            path in url(),
        ) {
            let message = match choice {
                0 => Message::queued(Command::Reset),
                1 => Message::queued(Command::EjectDisk(target)),
                2 => Message::with_payload(Command::InsertDisk(target), &path),
                3 => Message::with_payload(Command::SelectRom, &path),
                _ => Message::Connect { port, device },
            };
            let text = serialize(&message).expect("expressible message");
            prop_assert_eq!(parse(&text), Ok(message));
        }

        /// Arbitrary input never panics and never yields a payload-less insert.
        #[test]
        fn parse_is_total(raw in "\\PC{0,80}") {
            if let Ok(Message::Queued { command, payload }) = parse(&raw) {
                prop_assert_eq!(command.payload_slot(), payload.map(|p| p.slot));
            }
        }
    }
}
