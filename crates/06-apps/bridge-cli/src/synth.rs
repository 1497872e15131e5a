//! Stand-in engine: a tone generator and a scrolling test pattern.

use bridge::protocol::Command;
use bridge::transport::PixelFormat;
use bridge::{EmulatorPrefs, Engine};
use std::f32::consts::TAU;

const TONE_HZ: f32 = 440.0;
const AMPLITUDE: f32 = 8_000.0;
const BAR_WIDTH: usize = 32;

pub struct SynthEngine {
    pub prefs: EmulatorPrefs,
    sample_rate: f32,
    phase: f32,
    scroll: usize,
    format: PixelFormat,
}

impl SynthEngine {
    pub fn new(sample_rate: u32, format: PixelFormat) -> Self {
        Self {
            prefs: EmulatorPrefs::default(),
            sample_rate: sample_rate as f32,
            phase: 0.0,
            scroll: 0,
            format,
        }
    }

    /// Fills interleaved stereo samples with a sine tone.
    pub fn render_audio(&mut self, samples: &mut [i16]) {
        let step = TAU * TONE_HZ / self.sample_rate;
        for frame in samples.chunks_exact_mut(2) {
            let value = (self.phase.sin() * AMPLITUDE) as i16;
            frame[0] = value;
            frame[1] = value;
            self.phase = (self.phase + step) % TAU;
        }
    }

    /// Draws vertical colour bars scrolled by one pixel per frame.
    pub fn render_video(&mut self, pixels: &mut [u8], stride: usize) {
        let masks = self.format.channel_masks();
        let palette = [masks.red, masks.green, masks.blue, masks.red | masks.green];
        for row in pixels.chunks_exact_mut(stride) {
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let bar = ((x + self.scroll) / BAR_WIDTH) % palette.len();
                let word = palette[bar] | masks.alpha;
                pixel.copy_from_slice(&word.to_le_bytes());
            }
        }
        self.scroll = self.scroll.wrapping_add(1);
    }
}

impl Engine for SynthEngine {
    fn on_command(&mut self, command: Command, payload: Option<String>) {
        tracing::info!(?command, payload = payload.as_deref(), "engine applied command");
        if command == Command::Reset {
            self.phase = 0.0;
            self.scroll = 0;
        }
        self.prefs.apply(command, payload);
    }
}
