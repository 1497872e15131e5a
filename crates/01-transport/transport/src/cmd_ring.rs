//! Single-producer/single-consumer ring of command words.
//!
//! The ring stores raw `u32` words; the protocol crate decides which words are
//! command tags and which are arguments. A producer publishes a tag and its
//! argument with one cursor store, so the consumer can never observe half of a
//! pair.
//!
//! ```text
//! entries: [w0][w1][w2] ... [wN-1]     N = capacity rounded to a power of two
//! head  (producer cursor, wrapping u32)  -- consumer parks on this word
//! tail  (consumer cursor, wrapping u32)
//! len = head - tail, never above the logical capacity
//! ```
//!
//! Producers never block: a push that does not fit reports
//! [`TransportError::QueueOverflow`]. Consumers may either poll with
//! [`CommandRing::try_pop`] or park in [`CommandRing::pop_blocking`].

use crate::wait;
use crate::{TransportError, TransportResult};
#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicU32, Ordering};

/// Smallest logical capacity accepted by [`CommandRing::new`].
pub const MIN_RING_WORDS: usize = 16;

/// Bounded SPSC word queue with a parking consumer.
///
/// All methods take `&self`; the single-producer and single-consumer roles are
/// a contract of the owner (the bridge hands out exactly one producer and one
/// consumer endpoint).
#[derive(Debug)]
pub struct CommandRing {
    head: AtomicU32,
    tail: AtomicU32,
    capacity: u32,
    mask: u32,
    entries: Box<[AtomicU32]>,
}

impl CommandRing {
    /// Creates a ring that holds at most `capacity` words.
    pub fn new(capacity: usize) -> TransportResult<Self> {
        if capacity < MIN_RING_WORDS {
            return Err(TransportError::InvalidCapacity {
                requested: capacity,
                minimum: MIN_RING_WORDS,
            });
        }
        if capacity > (u32::MAX / 2) as usize {
            return Err(TransportError::AllocationFailed {
                size: capacity * std::mem::size_of::<u32>(),
            });
        }

        let slots = capacity.next_power_of_two();
        let entries = (0..slots).map(|_| AtomicU32::new(0)).collect::<Vec<_>>();

        Ok(Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            capacity: capacity as u32,
            mask: (slots - 1) as u32,
            entries: entries.into_boxed_slice(),
        })
    }

    /// Logical number of words the ring can hold.
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Number of words currently queued.
    pub fn len(&self) -> usize {
        // Tail first: `head` only moves forward, so a later head load can never
        // fall behind the tail already observed.
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail) as usize
    }

    /// Returns true when no words are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a single word.
    pub fn push(&self, word: u32) -> TransportResult<()> {
        self.push_words(&[word])
    }

    /// Appends `words` as one unit: either every word becomes visible to the
    /// consumer at once, or nothing is written.
    pub fn push_words(&self, words: &[u32]) -> TransportResult<()> {
        if words.is_empty() {
            return Ok(());
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let used = head.wrapping_sub(tail);
        let free = self.capacity - used;
        if words.len() > free as usize {
            return Err(TransportError::QueueOverflow {
                capacity: self.capacity(),
                free: free as usize,
                needed: words.len(),
            });
        }

        for (offset, word) in words.iter().enumerate() {
            let index = head.wrapping_add(offset as u32) & self.mask;
            self.entries[index as usize].store(*word, Ordering::Relaxed);
        }

        self.head
            .store(head.wrapping_add(words.len() as u32), Ordering::Release);
        wait::wake_one(&self.head);
        Ok(())
    }

    /// Non-blocking check used by the consumer to decide whether to drain now
    /// or return to its own loop.
    pub fn try_has_data(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        head != tail
    }

    /// Removes the oldest word if one is available.
    pub fn try_pop(&self) -> Option<u32> {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        if head == tail {
            return None;
        }
        Some(self.take_at(tail))
    }

    /// Removes the oldest word, parking the calling thread until one arrives.
    ///
    /// This is the only place in the bridge where a thread is suspended.
    pub fn pop_blocking(&self) -> u32 {
        loop {
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Relaxed);
            if head != tail {
                return self.take_at(tail);
            }
            // Returns immediately if the producer moved `head` after our load.
            wait::wait_u32(&self.head, head);
        }
    }

    fn take_at(&self, tail: u32) -> u32 {
        let word = self.entries[(tail & self.mask) as usize].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        word
    }
}
