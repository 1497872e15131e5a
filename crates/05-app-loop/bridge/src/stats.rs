//! Frame-rate figures published by the engine and read by the front-end.

use std::sync::atomic::{AtomicU64, Ordering};

/// Latest fps/idle report, in tenths, packed into one word so the pair never
/// tears.
#[derive(Debug, Default)]
pub struct FrameStats {
    packed: AtomicU64,
    reports: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStatsSnapshot {
    pub fps: f32,
    /// Percentage of frame time the engine spent idle.
    pub idle: f32,
    /// Number of reports received.
    pub reports: u64,
}

impl FrameStats {
    pub fn report(&self, fps: f32, idle: f32) {
        let fps = to_tenths(fps) as u64;
        let idle = to_tenths(idle) as u64;
        self.packed.store((fps << 32) | idle, Ordering::Release);
        self.reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        let packed = self.packed.load(Ordering::Acquire);
        FrameStatsSnapshot {
            fps: (packed >> 32) as u32 as f32 / 10.0,
            idle: (packed & u32::MAX as u64) as u32 as f32 / 10.0,
            reports: self.reports.load(Ordering::Relaxed),
        }
    }
}

fn to_tenths(value: f32) -> u32 {
    if value.is_finite() && value > 0.0 {
        (value * 10.0).round().min(u32::MAX as f32) as u32
    } else {
        0
    }
}
