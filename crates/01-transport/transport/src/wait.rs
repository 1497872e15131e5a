//! Cross-platform atomic wait/notify shims used by the command ring.
//!
//! Native targets park on the `atomic-wait` crate (futex-backed where
//! available); wasm builds park on linear-memory atomics. Loom tests stub these
//! operations so the deterministic scheduler keeps control.

#[cfg(feature = "loom")]
use loom::sync::atomic::AtomicU32;
#[cfg(not(feature = "loom"))]
use std::sync::atomic::AtomicU32;

/// Result of attempting to wait on an atomic location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The value matched and the caller was woken by a notify.
    Ok,
    /// The value no longer matched when the wait was attempted.
    NotEqual,
    /// The wait timed out before a notify was observed.
    TimedOut,
}

#[cfg(feature = "loom")]
mod imp {
    use super::{AtomicU32, WaitResult};

    #[inline]
    pub(crate) fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
        let _ = (atomic, expected);
        loom::thread::yield_now();
        WaitResult::NotEqual
    }

    #[inline]
    pub(crate) fn wake_one(atomic: &AtomicU32) {
        let _ = atomic;
    }
}

#[cfg(all(not(feature = "loom"), target_arch = "wasm32"))]
mod imp {
    use super::{AtomicU32, WaitResult};
    use core::arch::wasm32::{memory_atomic_notify, memory_atomic_wait32};

    #[inline]
    pub(crate) fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
        // SAFETY: The atomic lives in the shared linear memory of the module.
        let result = unsafe {
            memory_atomic_wait32(atomic as *const _ as *mut i32, expected as i32, -1_i64)
        };
        match result {
            0 => WaitResult::Ok,
            2 => WaitResult::TimedOut,
            _ => WaitResult::NotEqual,
        }
    }

    #[inline]
    pub(crate) fn wake_one(atomic: &AtomicU32) {
        // SAFETY: Same address that waiters park on.
        unsafe {
            memory_atomic_notify(atomic as *const _ as *mut i32, 1);
        }
    }
}

#[cfg(all(not(feature = "loom"), not(target_arch = "wasm32")))]
mod imp {
    use super::{AtomicU32, WaitResult};

    #[inline]
    pub(crate) fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
        atomic_wait::wait(atomic, expected);
        WaitResult::Ok
    }

    #[inline]
    pub(crate) fn wake_one(atomic: &AtomicU32) {
        atomic_wait::wake_one(atomic as *const AtomicU32);
    }
}

/// Blocks the caller until the atomic differs from `expected` or a wakeup occurs.
///
/// Spurious returns are allowed; callers re-check their condition in a loop.
#[inline]
pub fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
    imp::wait_u32(atomic, expected)
}

/// Wakes at most one waiter parked on `atomic`.
#[inline]
pub fn wake_one(atomic: &AtomicU32) {
    imp::wake_one(atomic)
}
