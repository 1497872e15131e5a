//! Double-buffered audio hand-off between the engine and a real-time pull
//! callback.
//!
//! Two fixed-size buffers of interleaved 16-bit stereo samples live behind a
//! single atomic state word:
//!
//! ```text
//! bit 0  FRONT    index of the buffer the consumer reads
//! bit 1  READING  consumer is copying out of the front buffer
//! bit 2  FRESH    front was committed and has not been read yet
//! bit 3  SILENCE  front must be zeroed before the next read
//! ```
//!
//! The producer writes the back buffer and flips `FRONT` in [`AudioProducer::commit`].
//! A flip is only published while `READING` is clear, so the buffer the
//! consumer copies from can never become the producer's back buffer mid-read.
//! The consumer never waits: when nothing new was committed it re-reads the
//! previous frame.

use crate::{TransportError, TransportResult};
#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::cell::UnsafeCell;
use std::sync::Arc;
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

const FRONT: u32 = 0b001;
const READING: u32 = 0b010;
const FRESH: u32 = 0b100;
const SILENCE: u32 = 0b1000;

/// Interleaved channels per sample frame.
pub const AUDIO_CHANNELS: usize = 2;
/// Bytes per sample (signed 16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Shape of the audio double buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioSwapConfig {
    /// Sample frames per buffer (one frame = one left + one right sample).
    pub frame_count: usize,
    /// Upper bound on spin iterations a commit spends waiting for the
    /// consumer. Zero never waits.
    pub spin_limit: u32,
}

impl AudioSwapConfig {
    /// Size in bytes of one buffer.
    pub fn frame_bytes(&self) -> usize {
        self.frame_count * AUDIO_CHANNELS * BYTES_PER_SAMPLE
    }
}

/// What a commit did with the freshly written back buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The back buffer became the front buffer.
    Swapped,
    /// The buffers were swapped, but the previous front was never read.
    Overrun,
    /// The consumer was mid-read for the whole spin budget; the frame stays in
    /// the back buffer and will be overwritten by the next fill.
    Deferred,
}

/// Counters describing hand-off health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioSwapStats {
    /// Commits that published a frame.
    pub swaps: u64,
    /// Published frames that replaced an unread frame.
    pub overruns: u64,
    /// Commits that could not publish because a read was in progress.
    pub deferred: u64,
    /// Reads that re-used an already consumed frame.
    pub stale_reads: u64,
}

struct Shared {
    state: AtomicU32,
    playing: AtomicBool,
    buffers: [UnsafeCell<Box<[i16]>>; 2],
    config: AudioSwapConfig,
    swaps: AtomicU64,
    overruns: AtomicU64,
    deferred: AtomicU64,
    stale_reads: AtomicU64,
}

// SAFETY: Buffer access is partitioned by the `state` protocol: the producer
// only touches the back buffer, the consumer only the front buffer while
// `READING` is set, and `FRONT` only flips while `READING` is clear.
unsafe impl Sync for Shared {}
// SAFETY: The buffers are plain sample data owned by the shared block.
unsafe impl Send for Shared {}

impl Shared {
    fn stats(&self) -> AudioSwapStats {
        AudioSwapStats {
            swaps: self.swaps.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
        }
    }
}

/// Creates a connected producer/consumer pair.
///
/// Both buffers start zeroed, so the consumer plays silence until the first
/// commit.
pub fn audio_swap(config: AudioSwapConfig) -> TransportResult<(AudioProducer, AudioConsumer)> {
    if config.frame_count == 0 {
        return Err(TransportError::InvalidCapacity {
            requested: 0,
            minimum: 1,
        });
    }
    let samples = config
        .frame_count
        .checked_mul(AUDIO_CHANNELS)
        .ok_or(TransportError::AllocationFailed {
            size: config.frame_count,
        })?;

    let shared = Arc::new(Shared {
        state: AtomicU32::new(0),
        playing: AtomicBool::new(true),
        buffers: [
            UnsafeCell::new(vec![0i16; samples].into_boxed_slice()),
            UnsafeCell::new(vec![0i16; samples].into_boxed_slice()),
        ],
        config,
        swaps: AtomicU64::new(0),
        overruns: AtomicU64::new(0),
        deferred: AtomicU64::new(0),
        stale_reads: AtomicU64::new(0),
    });

    Ok((
        AudioProducer {
            shared: Arc::clone(&shared),
        },
        AudioConsumer { shared },
    ))
}

/// Engine-side handle: fills the back buffer and commits it.
pub struct AudioProducer {
    shared: Arc<Shared>,
}

impl AudioProducer {
    /// Returns the back buffer as interleaved stereo samples.
    ///
    /// The slice stays valid until the next [`commit`](Self::commit).
    pub fn fill_slice(&mut self) -> &mut [i16] {
        let back = self.back_index();
        // SAFETY: `FRONT` only changes inside `commit`, which needs `&mut self`,
        // so the back index is stable for the lifetime of this borrow and the
        // consumer never reads the back buffer.
        unsafe { &mut **self.shared.buffers[back].get() }
    }

    /// Publishes the back buffer as the new front buffer.
    ///
    /// Waits at most `spin_limit` iterations for the consumer to finish an
    /// in-progress read and to consume the previous frame. Past the budget the
    /// frame is either published over the unread one ([`CommitOutcome::Overrun`])
    /// or kept back ([`CommitOutcome::Deferred`]) when a read is still running.
    pub fn commit(&mut self) -> CommitOutcome {
        let shared = &*self.shared;
        let limit = shared.config.spin_limit;
        let mut spins = 0u32;
        let mut state = shared.state.load(Ordering::Acquire);

        loop {
            let busy = state & (READING | FRESH) != 0;
            if busy && spins < limit {
                spins += 1;
                spin_hint();
                state = shared.state.load(Ordering::Acquire);
                continue;
            }
            if state & READING != 0 {
                shared.deferred.fetch_add(1, Ordering::Relaxed);
                return CommitOutcome::Deferred;
            }

            let next = ((state ^ FRONT) | FRESH) & !SILENCE;
            match shared
                .state
                .compare_exchange_weak(state, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    shared.swaps.fetch_add(1, Ordering::Relaxed);
                    if state & FRESH != 0 {
                        shared.overruns.fetch_add(1, Ordering::Relaxed);
                        return CommitOutcome::Overrun;
                    }
                    return CommitOutcome::Swapped;
                }
                Err(actual) => state = actual,
            }
        }
    }

    /// Zeroes both buffers so the consumer hears silence from the next read.
    ///
    /// When the consumer is mid-read the front buffer cannot be swapped out;
    /// it is then flagged and the consumer zeroes it before its next copy.
    pub fn clear(&mut self) {
        self.fill_slice().fill(0);
        if self.commit() == CommitOutcome::Deferred {
            self.shared.state.fetch_or(SILENCE, Ordering::AcqRel);
        } else {
            self.fill_slice().fill(0);
        }
    }

    /// Starts or stops playback; a stopped consumer reads silence.
    pub fn set_playing(&self, playing: bool) {
        self.shared.playing.store(playing, Ordering::Release);
    }

    /// Buffer shape shared by both handles.
    pub fn config(&self) -> AudioSwapConfig {
        self.shared.config
    }

    /// Snapshot of hand-off counters.
    pub fn stats(&self) -> AudioSwapStats {
        self.shared.stats()
    }

    fn back_index(&self) -> usize {
        let front = self.shared.state.load(Ordering::Acquire) & FRONT;
        (front ^ FRONT) as usize
    }
}

/// Real-time side handle: copies the front buffer out without blocking.
pub struct AudioConsumer {
    shared: Arc<Shared>,
}

impl AudioConsumer {
    /// Copies `min(max_len, dst.len(), frame_bytes)` bytes of native-endian
    /// samples from the front buffer into `dst` and returns the byte count.
    ///
    /// Never blocks. If no frame was committed since the previous read, the
    /// same frame is copied again.
    pub fn read_into(&mut self, dst: &mut [u8], max_len: usize) -> usize {
        let len = max_len.min(dst.len()).min(self.shared.config.frame_bytes());
        let dst = &mut dst[..len];

        if !self.shared.playing.load(Ordering::Acquire) {
            dst.fill(0);
            return len;
        }

        self.with_front(|front| {
            for (out, sample) in dst.chunks_mut(BYTES_PER_SAMPLE).zip(front.iter()) {
                let bytes = sample.to_ne_bytes();
                out.copy_from_slice(&bytes[..out.len()]);
            }
        });
        len
    }

    /// Sample-typed variant of [`read_into`](Self::read_into); returns the
    /// number of samples written.
    pub fn read_samples(&mut self, dst: &mut [i16]) -> usize {
        let len = dst.len().min(self.shared.config.frame_count * AUDIO_CHANNELS);
        let dst = &mut dst[..len];

        if !self.shared.playing.load(Ordering::Acquire) {
            dst.fill(0);
            return len;
        }

        self.with_front(|front| dst.copy_from_slice(&front[..len]));
        len
    }

    /// Returns true while playback is running.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Buffer shape shared by both handles.
    pub fn config(&self) -> AudioSwapConfig {
        self.shared.config
    }

    /// Snapshot of hand-off counters.
    pub fn stats(&self) -> AudioSwapStats {
        self.shared.stats()
    }

    fn with_front<R>(&mut self, f: impl FnOnce(&[i16]) -> R) -> R {
        let shared = &*self.shared;
        let prev = shared.state.fetch_or(READING, Ordering::Acquire);
        let front = (prev & FRONT) as usize;
        if prev & FRESH == 0 {
            shared.stale_reads.fetch_add(1, Ordering::Relaxed);
        }

        // SAFETY: `READING` is set, so the producer cannot flip `FRONT` and
        // only ever writes the other buffer.
        let buffer = unsafe { &mut **shared.buffers[front].get() };
        if prev & SILENCE != 0 {
            buffer.fill(0);
        }
        let result = f(buffer);

        // A `SILENCE` raised during this copy is left for the next read.
        shared
            .state
            .fetch_and(!(READING | FRESH | (prev & SILENCE)), Ordering::Release);
        result
    }
}

#[inline]
fn spin_hint() {
    #[cfg(feature = "loom")]
    loom::thread::yield_now();
    #[cfg(not(feature = "loom"))]
    std::hint::spin_loop();
}
