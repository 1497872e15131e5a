//! Engine-side view of the media configuration driven by commands.

use crate::Engine;
use bridge_protocol::{Command, Drive, DRIVE_COUNT};

/// Longest path the engine keeps; longer payloads are cut at a char boundary.
pub const MAX_PATH_BYTES: usize = 255;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmulatorPrefs {
    floppy: [Option<String>; DRIVE_COUNT],
    rom: Option<String>,
    resets: u64,
    paused: bool,
    running: bool,
    quit_requested: bool,
}

impl EmulatorPrefs {
    pub fn floppy(&self, drive: Drive) -> Option<&str> {
        self.floppy[drive.index()].as_deref()
    }

    pub fn rom(&self) -> Option<&str> {
        self.rom.as_deref()
    }

    /// Number of resets applied so far.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Applies one command. `payload` is the path taken from the command's
    /// slot, if it has one.
    pub fn apply(&mut self, command: Command, payload: Option<String>) {
        match command {
            Command::Start => self.running = true,
            Command::Stop => self.running = false,
            Command::Quit => {
                self.running = false;
                self.quit_requested = true;
            }
            Command::Reset => self.resets += 1,
            Command::Pause => self.paused = true,
            Command::Resume => self.paused = false,
            Command::EjectDisk(drive) => self.floppy[drive.index()] = None,
            Command::InsertDisk(drive) => {
                if let Some(path) = payload {
                    self.floppy[drive.index()] = Some(truncate_path(path));
                }
            }
            Command::SelectRom => {
                if let Some(path) = payload {
                    self.rom = Some(truncate_path(path));
                }
            }
            Command::Debug | Command::SaveConfig | Command::LoadState | Command::SaveState => {}
        }
    }
}

impl Engine for EmulatorPrefs {
    fn on_command(&mut self, command: Command, payload: Option<String>) {
        self.apply(command, payload);
    }
}

fn truncate_path(mut path: String) -> String {
    if path.len() > MAX_PATH_BYTES {
        let mut end = MAX_PATH_BYTES;
        while !path.is_char_boundary(end) {
            end -= 1;
        }
        path.truncate(end);
    }
    path
}
