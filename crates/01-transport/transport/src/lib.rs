#![cfg_attr(
    all(target_arch = "wasm32", not(feature = "loom")),
    feature(stdarch_wasm_atomic_wait)
)]
//! Lock-free hand-off primitives between a front-end thread and an emulation
//! engine thread.
//!
//! * [`CommandRing`] – SPSC word queue with a parking consumer.
//! * [`audio_swap`] – fixed-size sample double buffer read by a real-time callback.
//! * [`frame_swap`] – copy-and-recycle framebuffer hand-off to a presenter.
//! * [`TransportError`] – capacity, overflow and allocation failures.

mod audio_swap;
mod cmd_ring;
mod error;
mod frame_swap;
pub mod wait;

pub use audio_swap::{
    audio_swap, AudioConsumer, AudioProducer, AudioSwapConfig, AudioSwapStats, CommitOutcome,
    AUDIO_CHANNELS, BYTES_PER_SAMPLE,
};
pub use cmd_ring::{CommandRing, MIN_RING_WORDS};
pub use error::{TransportError, TransportResult};
pub use frame_swap::{
    frame_swap, ChannelMasks, FramePresenter, FrameProducer, FrameSwapConfig, FrameSwapStats,
    ImageData, PixelFormat, Present, BYTES_PER_PIXEL, MIN_IN_FLIGHT,
};
