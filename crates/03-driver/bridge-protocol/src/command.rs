//! Typed commands and their word encoding on the command ring.
//!
//! Above the ring everything is a [`Command`]; on the ring a command is a
//! [`CommandTag`] word optionally followed by one argument word. Whether an
//! argument follows is a property of the tag alone.

use crate::WireError;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Number of floppy drives addressable by the protocol.
pub const DRIVE_COUNT: usize = 2;

/// Floppy drive selector (`df0`, `df1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Drive {
    Df0,
    Df1,
}

impl Drive {
    pub const ALL: [Drive; DRIVE_COUNT] = [Drive::Df0, Drive::Df1];

    /// Zero-based drive index.
    pub fn index(self) -> usize {
        match self {
            Drive::Df0 => 0,
            Drive::Df1 => 1,
        }
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Drive::Df0),
            1 => Some(Drive::Df1),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Drive::Df0 => "df0",
            Drive::Df1 => "df1",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "df0" => Some(Drive::Df0),
            "df1" => Some(Drive::Df1),
            _ => None,
        }
    }
}

/// Joystick port selector (`port0`, `port1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Port {
    Port0,
    Port1,
}

impl Port {
    pub const ALL: [Port; 2] = [Port::Port0, Port::Port1];

    pub fn index(self) -> usize {
        match self {
            Port::Port0 => 0,
            Port::Port1 => 1,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Port::Port0 => "port0",
            Port::Port1 => "port1",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "port0" => Some(Port::Port0),
            "port1" => Some(Port::Port1),
            _ => None,
        }
    }
}

/// Host input device that can be attached to a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputDevice {
    /// Host mouse.
    Mouse,
    /// First host joystick.
    Joy0,
    /// Second host joystick.
    Joy1,
    /// First keyboard joystick layout.
    Kbd0,
    /// Second keyboard joystick layout.
    Kbd1,
}

impl InputDevice {
    pub const ALL: [InputDevice; 5] = [
        InputDevice::Mouse,
        InputDevice::Joy0,
        InputDevice::Joy1,
        InputDevice::Kbd0,
        InputDevice::Kbd1,
    ];

    /// Fixed device identifier understood by the engine's port configuration.
    pub fn id(self) -> u32 {
        match self {
            InputDevice::Mouse => 0,
            InputDevice::Joy0 => 1,
            InputDevice::Joy1 => 2,
            InputDevice::Kbd0 => 3,
            InputDevice::Kbd1 => 4,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|device| device.id() == id)
    }

    pub fn token(self) -> &'static str {
        match self {
            InputDevice::Mouse => "mouse",
            InputDevice::Joy0 => "joy0",
            InputDevice::Joy1 => "joy1",
            InputDevice::Kbd0 => "kbd0",
            InputDevice::Kbd1 => "kbd1",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|device| device.token() == token)
    }
}

/// Slot under which at most one pending payload may wait for the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadSlot {
    /// Disk image path for a drive.
    Drive(Drive),
    /// Kickstart ROM path.
    Rom,
}

impl PayloadSlot {
    /// Every slot, in storage order.
    pub const ALL: [PayloadSlot; DRIVE_COUNT + 1] = [
        PayloadSlot::Drive(Drive::Df0),
        PayloadSlot::Drive(Drive::Df1),
        PayloadSlot::Rom,
    ];

    /// Dense index into a slot table.
    pub fn index(self) -> usize {
        match self {
            PayloadSlot::Drive(drive) => drive.index(),
            PayloadSlot::Rom => DRIVE_COUNT,
        }
    }
}

/// Command delivered from the front-end to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Start,
    Stop,
    Quit,
    Reset,
    Pause,
    Resume,
    Debug,
    SaveConfig,
    EjectDisk(Drive),
    InsertDisk(Drive),
    SelectRom,
    LoadState,
    SaveState,
}

/// Word representation of a command's variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandTag {
    Start = 0,
    Stop = 1,
    Quit = 2,
    Reset = 3,
    Pause = 4,
    Resume = 5,
    Debug = 6,
    SaveConfig = 7,
    EjectDisk = 8,
    InsertDisk = 9,
    SelectRom = 10,
    LoadState = 11,
    SaveState = 12,
}

impl CommandTag {
    const ALL: [CommandTag; 13] = [
        CommandTag::Start,
        CommandTag::Stop,
        CommandTag::Quit,
        CommandTag::Reset,
        CommandTag::Pause,
        CommandTag::Resume,
        CommandTag::Debug,
        CommandTag::SaveConfig,
        CommandTag::EjectDisk,
        CommandTag::InsertDisk,
        CommandTag::SelectRom,
        CommandTag::LoadState,
        CommandTag::SaveState,
    ];

    pub fn from_word(word: u32) -> Option<Self> {
        Self::ALL.get(word as usize).copied()
    }

    pub fn word(self) -> u32 {
        self as u32
    }

    /// True when exactly one argument word follows this tag on the ring.
    pub fn takes_arg(self) -> bool {
        matches!(self, CommandTag::EjectDisk | CommandTag::InsertDisk)
    }
}

/// Ring words for one command: the tag, then at most one argument.
pub type CommandWords = SmallVec<[u32; 2]>;

impl Command {
    pub fn tag(self) -> CommandTag {
        match self {
            Command::Start => CommandTag::Start,
            Command::Stop => CommandTag::Stop,
            Command::Quit => CommandTag::Quit,
            Command::Reset => CommandTag::Reset,
            Command::Pause => CommandTag::Pause,
            Command::Resume => CommandTag::Resume,
            Command::Debug => CommandTag::Debug,
            Command::SaveConfig => CommandTag::SaveConfig,
            Command::EjectDisk(_) => CommandTag::EjectDisk,
            Command::InsertDisk(_) => CommandTag::InsertDisk,
            Command::SelectRom => CommandTag::SelectRom,
            Command::LoadState => CommandTag::LoadState,
            Command::SaveState => CommandTag::SaveState,
        }
    }

    /// Payload slot the engine must consume when it applies this command.
    pub fn payload_slot(self) -> Option<PayloadSlot> {
        match self {
            Command::InsertDisk(drive) => Some(PayloadSlot::Drive(drive)),
            Command::SelectRom => Some(PayloadSlot::Rom),
            _ => None,
        }
    }

    /// Encodes the command as ring words. The result is pushed as one unit.
    pub fn encode(self) -> CommandWords {
        match self {
            Command::EjectDisk(drive) | Command::InsertDisk(drive) => {
                smallvec![self.tag().word(), drive.index() as u32]
            }
            _ => smallvec![self.tag().word()],
        }
    }

    /// Decodes a command from its tag word, reading the argument word through
    /// `next_arg` only when the tag requires one.
    pub fn decode(tag_word: u32, next_arg: impl FnOnce() -> u32) -> Result<Self, WireError> {
        let tag = CommandTag::from_word(tag_word).ok_or(WireError::UnknownTag(tag_word))?;
        let command = match tag {
            CommandTag::Start => Command::Start,
            CommandTag::Stop => Command::Stop,
            CommandTag::Quit => Command::Quit,
            CommandTag::Reset => Command::Reset,
            CommandTag::Pause => Command::Pause,
            CommandTag::Resume => Command::Resume,
            CommandTag::Debug => Command::Debug,
            CommandTag::SaveConfig => Command::SaveConfig,
            CommandTag::SelectRom => Command::SelectRom,
            CommandTag::LoadState => Command::LoadState,
            CommandTag::SaveState => Command::SaveState,
            CommandTag::EjectDisk | CommandTag::InsertDisk => {
                let arg = next_arg();
                let drive =
                    Drive::from_index(arg).ok_or(WireError::InvalidArgument { tag, arg })?;
                if tag == CommandTag::EjectDisk {
                    Command::EjectDisk(drive)
                } else {
                    Command::InsertDisk(drive)
                }
            }
        };
        Ok(command)
    }
}
