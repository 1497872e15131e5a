//! Synchronisation bridge between an event-driven front-end and an emulation
//! engine running its own loop.
//!
//! [`Bridge::init`] wires a command ring, pending payload slots, input port
//! configuration and the audio/video hand-offs, then splits them into one
//! endpoint per execution context.

mod config;
mod context;
mod error;
mod frontend;
mod host;
mod input;
mod payload;
mod prefs;
mod stats;

pub use config::{
    AudioConfig, BridgeConfig, SampleRate, VideoConfig, DEFAULT_MAX_MESSAGE_LEN,
    DEFAULT_QUEUE_CAPACITY, MAX_AUDIO_FRAMES, MAX_VIDEO_DIMENSION, MIN_AUDIO_FRAMES,
};
pub use context::{Bridge, EngineEndpoints};
pub use error::{BridgeError, BridgeResult};
pub use frontend::{Delivery, FrontEnd};
pub use host::{CommandHost, Engine};
pub use input::{InputPorts, PortMap};
pub use payload::PendingPayloadStore;
pub use prefs::{EmulatorPrefs, MAX_PATH_BYTES};
pub use stats::{FrameStats, FrameStatsSnapshot};

pub use bridge_protocol as protocol;
pub use transport;
