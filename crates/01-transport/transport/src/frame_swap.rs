//! Copy-and-recycle video hand-off.
//!
//! The engine owns a single draw buffer for its whole lifetime. Completing a
//! frame deep-copies that buffer into an [`ImageData`] resource and submits the
//! resource to the presentation side; the engine keeps drawing into its own
//! buffer immediately and never waits for a paint.
//!
//! Image resources circulate between two bounded channels, like the free and
//! ready rings of a slot pool:
//!
//! ```text
//!   free ──► producer copies draw buffer ──► ready ──► presenter (current)
//!    ▲                                                    │
//!    └──────────────── released on next present ◄─────────┘
//! ```
//!
//! At most `max_in_flight` resources exist. When none is free, the producer
//! reclaims the oldest frame still waiting in `ready` (it was about to be
//! superseded anyway); only if the presenter holds everything does a commit
//! fail with [`TransportError::FrameInFlightLimit`].

use crate::{TransportError, TransportResult};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Bytes per pixel for every supported format.
pub const BYTES_PER_PIXEL: usize = 4;

/// Smallest number of image resources that lets presentation and production
/// overlap.
pub const MIN_IN_FLIGHT: usize = 2;

/// Native 32-bit layouts the presentation side may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Blue, green, red, alpha in memory order; premultiplied alpha.
    BgraPremul,
    /// Red, green, blue, alpha in memory order; premultiplied alpha.
    RgbaPremul,
}

/// Channel masks for a 32-bit little-endian pixel word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

impl PixelFormat {
    /// Masks the engine uses to pack colours into a pixel word.
    pub fn channel_masks(self) -> ChannelMasks {
        match self {
            PixelFormat::BgraPremul => ChannelMasks {
                red: 0x00FF_0000,
                green: 0x0000_FF00,
                blue: 0x0000_00FF,
                alpha: 0xFF00_0000,
            },
            PixelFormat::RgbaPremul => ChannelMasks {
                red: 0x0000_00FF,
                green: 0x0000_FF00,
                blue: 0x00FF_0000,
                alpha: 0xFF00_0000,
            },
        }
    }
}

/// Shape of the video hand-off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSwapConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Total image resources shared by producer and presenter.
    pub max_in_flight: usize,
}

impl FrameSwapConfig {
    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Bytes per frame (rows × stride).
    ///
    /// Only meaningful for shapes [`frame_swap`] accepted; use
    /// [`checked_frame_bytes`](Self::checked_frame_bytes) on untrusted input.
    pub fn frame_bytes(&self) -> usize {
        self.stride() * self.height as usize
    }

    /// Bytes per frame, or `None` if the shape does not fit in memory.
    pub fn checked_frame_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(BYTES_PER_PIXEL)?
            .checked_mul(self.height as usize)
    }
}

/// Presentation-owned copy of one complete frame.
#[derive(Debug)]
pub struct ImageData {
    bytes: Box<[u8]>,
    sequence: u64,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl ImageData {
    fn allocate(config: &FrameSwapConfig) -> TransportResult<Self> {
        Ok(Self {
            bytes: zeroed_buffer(config.frame_bytes())?,
            sequence: 0,
            width: config.width,
            height: config.height,
            format: config.format,
        })
    }

    /// Raw pixel bytes, rows × stride.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Submission order of this frame, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Iterates over scanlines.
    pub fn rows(&self) -> std::slice::Chunks<'_, u8> {
        self.bytes.chunks(self.stride())
    }
}

/// Presentation boundary: paints a fully formed image.
pub trait Present {
    fn present(&mut self, image: &ImageData);
}

/// Counters describing hand-off health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSwapStats {
    /// Frames handed to the presentation side.
    pub submitted: u64,
    /// Frames shown by the presenter.
    pub presented: u64,
    /// Submitted frames replaced by a newer one before being shown.
    pub superseded: u64,
    /// Commits that found no image resource.
    pub allocation_failures: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    presented: AtomicU64,
    superseded: AtomicU64,
    allocation_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> FrameSwapStats {
        FrameSwapStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            presented: self.presented.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Creates a connected engine/presentation pair.
///
/// One image resource is allocated up front so a misconfigured frame size is
/// reported at init rather than on the first commit.
pub fn frame_swap(config: FrameSwapConfig) -> TransportResult<(FrameProducer, FramePresenter)> {
    if config.width == 0 || config.height == 0 {
        return Err(TransportError::InvalidCapacity {
            requested: 0,
            minimum: BYTES_PER_PIXEL,
        });
    }
    let frame_bytes = config
        .checked_frame_bytes()
        .ok_or(TransportError::AllocationFailed { size: usize::MAX })?;
    if config.max_in_flight < MIN_IN_FLIGHT {
        return Err(TransportError::InvalidCapacity {
            requested: config.max_in_flight,
            minimum: MIN_IN_FLIGHT,
        });
    }

    let (free_tx, free_rx) = bounded(config.max_in_flight);
    let (ready_tx, ready_rx) = bounded(config.max_in_flight);
    let counters = Arc::new(Counters::default());

    let first = ImageData::allocate(&config)?;
    if free_tx.try_send(first).is_err() {
        return Err(TransportError::AllocationFailed { size: frame_bytes });
    }

    let producer = FrameProducer {
        draw: zeroed_buffer(frame_bytes)?,
        config,
        allocated: 1,
        next_sequence: 1,
        free_rx,
        ready_tx,
        reclaim_rx: ready_rx.clone(),
        counters: Arc::clone(&counters),
    };
    let presenter = FramePresenter {
        ready_rx,
        free_tx,
        current: None,
        counters,
    };
    Ok((producer, presenter))
}

/// Engine-side handle owning the draw buffer.
pub struct FrameProducer {
    draw: Box<[u8]>,
    config: FrameSwapConfig,
    allocated: usize,
    next_sequence: u64,
    free_rx: Receiver<ImageData>,
    ready_tx: Sender<ImageData>,
    reclaim_rx: Receiver<ImageData>,
    counters: Arc<Counters>,
}

impl FrameProducer {
    /// Writable framebuffer (rows × stride bytes).
    pub fn draw_target(&mut self) -> &mut [u8] {
        &mut self.draw
    }

    /// Copies the finished frame into an image resource, submits it, and
    /// returns the draw buffer for the next frame.
    ///
    /// On [`TransportError::FrameInFlightLimit`] nothing was submitted; the
    /// draw buffer is untouched and the caller retries on its next frame.
    pub fn commit_and_recycle(&mut self) -> TransportResult<&mut [u8]> {
        let mut image = match self.acquire_image() {
            Ok(image) => image,
            Err(err) => {
                self.counters
                    .allocation_failures
                    .fetch_add(1, Ordering::Relaxed);
                return Err(err);
            }
        };

        image.bytes.copy_from_slice(&self.draw);
        image.sequence = self.next_sequence;
        self.next_sequence += 1;

        match self.ready_tx.try_send(image) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                // The resource is dropped; allocate a fresh one next time.
                self.allocated -= 1;
                tracing::warn!(
                    sequence = self.next_sequence - 1,
                    "presentation side unavailable, frame discarded"
                );
            }
        }

        Ok(&mut self.draw)
    }

    /// Buffer shape.
    pub fn config(&self) -> FrameSwapConfig {
        self.config
    }

    /// Snapshot of hand-off counters.
    pub fn stats(&self) -> FrameSwapStats {
        self.counters.snapshot()
    }

    fn acquire_image(&mut self) -> TransportResult<ImageData> {
        if let Ok(image) = self.free_rx.try_recv() {
            return Ok(image);
        }
        if self.allocated < self.config.max_in_flight {
            let image = ImageData::allocate(&self.config)?;
            self.allocated += 1;
            return Ok(image);
        }
        if let Ok(stale) = self.reclaim_rx.try_recv() {
            self.counters.superseded.fetch_add(1, Ordering::Relaxed);
            return Ok(stale);
        }
        Err(TransportError::FrameInFlightLimit {
            max_in_flight: self.config.max_in_flight,
        })
    }
}

/// Presentation-side handle.
pub struct FramePresenter {
    ready_rx: Receiver<ImageData>,
    free_tx: Sender<ImageData>,
    current: Option<ImageData>,
    counters: Arc<Counters>,
}

impl FramePresenter {
    /// Takes the newest submitted frame, releasing the previously presented
    /// image and any older frames. Returns `None` when nothing new arrived.
    pub fn latest(&mut self) -> Option<&ImageData> {
        let first = self.ready_rx.try_recv().ok()?;
        Some(self.adopt(first))
    }

    /// Like [`latest`](Self::latest), but waits up to `timeout` for a frame.
    pub fn wait_latest(&mut self, timeout: Duration) -> Option<&ImageData> {
        match self.ready_rx.recv_timeout(timeout) {
            Ok(first) => Some(self.adopt(first)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Paints the newest frame through `sink`; returns true if one was shown.
    pub fn present_latest<P: Present + ?Sized>(&mut self, sink: &mut P) -> bool {
        match self.latest() {
            Some(image) => {
                sink.present(image);
                true
            }
            None => false,
        }
    }

    /// Image currently on screen, if any.
    pub fn current(&self) -> Option<&ImageData> {
        self.current.as_ref()
    }

    /// Returns the on-screen image to the free list.
    pub fn release_current(&mut self) {
        if let Some(image) = self.current.take() {
            release(&self.free_tx, image);
        }
    }

    /// Snapshot of hand-off counters.
    pub fn stats(&self) -> FrameSwapStats {
        self.counters.snapshot()
    }

    fn adopt(&mut self, first: ImageData) -> &ImageData {
        let mut newest = first;
        while let Ok(next) = self.ready_rx.try_recv() {
            let older = std::mem::replace(&mut newest, next);
            self.counters.superseded.fetch_add(1, Ordering::Relaxed);
            release(&self.free_tx, older);
        }

        if let Some(previous) = self.current.take() {
            release(&self.free_tx, previous);
        }
        self.counters.presented.fetch_add(1, Ordering::Relaxed);
        self.current.insert(newest)
    }
}

fn release(free_tx: &Sender<ImageData>, image: ImageData) {
    // Capacity equals the resource budget, so a full list cannot happen; a
    // disconnected producer just lets the image drop.
    let _ = free_tx.try_send(image);
}

fn zeroed_buffer(len: usize) -> TransportResult<Box<[u8]>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| TransportError::AllocationFailed { size: len })?;
    buffer.resize(len, 0);
    Ok(buffer.into_boxed_slice())
}
