//! Bridge configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use crate::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use transport::{AudioSwapConfig, FrameSwapConfig, PixelFormat, MIN_IN_FLIGHT, MIN_RING_WORDS};

pub const DEFAULT_QUEUE_CAPACITY: usize = 20;
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1023;
pub const MIN_AUDIO_FRAMES: usize = 64;
pub const MAX_AUDIO_FRAMES: usize = 32_768;
/// Largest accepted video width or height in pixels.
pub const MAX_VIDEO_DIMENSION: u32 = 8192;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Command ring capacity in words.
    pub queue_capacity: usize,
    /// Inbound messages are truncated to this many bytes before parsing.
    pub max_message_len: usize,
    pub audio: AudioConfig,
    pub video: VideoConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            audio: AudioConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> BridgeResult<()> {
        if self.queue_capacity < MIN_RING_WORDS {
            return Err(BridgeError::InvalidConfig(format!(
                "queue_capacity {} is below {MIN_RING_WORDS}",
                self.queue_capacity
            )));
        }
        if self.max_message_len == 0 {
            return Err(BridgeError::InvalidConfig(
                "max_message_len must be positive".into(),
            ));
        }
        if self.audio.latency_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "audio.latency_ms must be positive".into(),
            ));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "video size {}x{} is empty",
                self.video.width, self.video.height
            )));
        }
        if self.video.width > MAX_VIDEO_DIMENSION || self.video.height > MAX_VIDEO_DIMENSION {
            return Err(BridgeError::InvalidConfig(format!(
                "video size {}x{} exceeds {MAX_VIDEO_DIMENSION}x{MAX_VIDEO_DIMENSION}",
                self.video.width, self.video.height
            )));
        }
        if self.video.max_in_flight < MIN_IN_FLIGHT {
            return Err(BridgeError::InvalidConfig(format!(
                "video.max_in_flight {} is below {MIN_IN_FLIGHT}",
                self.video.max_in_flight
            )));
        }
        Ok(())
    }
}

/// Output sample rates the audio path negotiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    Hz44100,
    Hz48000,
}

impl SampleRate {
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz48000 => 48_000,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = String;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        match hz {
            44_100 => Ok(SampleRate::Hz44100),
            48_000 => Ok(SampleRate::Hz48000),
            other => Err(format!("unsupported sample rate {other}")),
        }
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> u32 {
        rate.hz()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: SampleRate,
    /// Requested output latency; rounded to a whole frame count.
    pub latency_ms: u32,
    /// Bounded spin before a commit gives up waiting for the reader.
    pub swap_spin_limit: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz44100,
            latency_ms: 100,
            swap_spin_limit: 4096,
        }
    }
}

impl AudioConfig {
    /// Stereo sample frames per buffer.
    pub fn frame_count(&self) -> usize {
        let frames = self.sample_rate.hz() as u64 * self.latency_ms as u64 / 1000;
        (frames as usize).clamp(MIN_AUDIO_FRAMES, MAX_AUDIO_FRAMES)
    }

    /// Latency actually delivered by [`frame_count`](Self::frame_count).
    pub fn effective_latency_ms(&self) -> u32 {
        (self.frame_count() as u64 * 1000 / self.sample_rate.hz() as u64) as u32
    }

    pub fn swap_config(&self) -> AudioSwapConfig {
        AudioSwapConfig {
            frame_count: self.frame_count(),
            spin_limit: self.swap_spin_limit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Image resources shared between engine and presenter.
    pub max_in_flight: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 720,
            height: 568,
            format: PixelFormat::BgraPremul,
            max_in_flight: MIN_IN_FLIGHT,
        }
    }
}

impl VideoConfig {
    pub fn swap_config(&self) -> FrameSwapConfig {
        FrameSwapConfig {
            width: self.width,
            height: self.height,
            format: self.format,
            max_in_flight: self.max_in_flight,
        }
    }
}
