//! Drives the bridge end to end: protocol lines from stdin, a synthetic engine
//! thread, a paced audio pull and a presenter.

mod synth;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bridge::protocol::{Command, Drive};
use bridge::transport::{AudioConsumer, FramePresenter, ImageData, Present};
use bridge::{Bridge, BridgeConfig, EmulatorPrefs, EngineEndpoints};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use synth::SynthEngine;

#[derive(Parser, Debug)]
#[command(author, version, about = "Front-end/engine bridge demo")]
struct Args {
    /// JSON bridge configuration; defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine frame rate
    #[arg(long, default_value_t = 50)]
    fps: u32,
}

fn main() -> Result<()> {
    init_tracing();

    let Args { config, fps } = Args::parse();
    if fps == 0 {
        bail!("--fps must be positive");
    }
    let config = match config {
        Some(path) => load_config(&path)?,
        None => BridgeConfig::default(),
    };

    let Bridge {
        mut front_end,
        engine,
        audio_out,
        presenter,
    } = Bridge::init(&config).context("failed to initialise bridge")?;

    let stop = Arc::new(AtomicBool::new(false));
    let audio_period = Duration::from_millis(config.audio.effective_latency_ms().max(1) as u64);
    let frame_period = Duration::from_secs(1) / fps;

    let synth = SynthEngine::new(config.audio.sample_rate.hz(), config.video.format);
    let engine_thread = thread::Builder::new()
        .name("engine".into())
        .spawn(move || run_engine(engine, synth, frame_period, audio_period))
        .context("failed to spawn engine thread")?;

    let pull_stop = Arc::clone(&stop);
    let audio_thread = thread::Builder::new()
        .name("audio-pull".into())
        .spawn(move || pull_audio(audio_out, audio_period, &pull_stop))
        .context("failed to spawn audio thread")?;

    let present_stop = Arc::clone(&stop);
    let presenter_thread = thread::Builder::new()
        .name("presenter".into())
        .spawn(move || present_frames(presenter, &present_stop))
        .context("failed to spawn presenter thread")?;

    info!("reading protocol lines from stdin");
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        match front_end.handle_message(&line) {
            Ok(delivery) => info!(?delivery, "message accepted"),
            Err(err) if err.is_fatal() => {
                return Err(err).context("command queue overflowed");
            }
            Err(err) => warn!(%err, line = line.as_str(), "message rejected"),
        }
    }

    front_end
        .send(Command::Quit)
        .context("failed to queue quit")?;
    let outcome = engine_thread
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;
    let prefs = outcome.context("engine loop failed")?;

    stop.store(true, Ordering::Release);
    let audio = audio_thread
        .join()
        .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;
    let frames = presenter_thread
        .join()
        .map_err(|_| anyhow::anyhow!("presenter thread panicked"))?;

    let stats = front_end.frame_stats();
    println!("fps {:.1} idle {:.1}%", stats.fps, stats.idle);
    print_prefs(&prefs);
    println!(
        "audio: {} bytes pulled, {} swaps, {} overruns, {} stale reads",
        audio.bytes, audio.stats.swaps, audio.stats.overruns, audio.stats.stale_reads
    );
    println!(
        "video: {} presented, {} submitted, {} superseded",
        frames.presented, frames.stats.submitted, frames.stats.superseded
    );
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).with_writer(io::stderr).try_init();
}

fn load_config(path: &Path) -> Result<BridgeConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config in {}", path.display()))
}

fn run_engine(
    mut endpoints: EngineEndpoints,
    mut synth: SynthEngine,
    frame_period: Duration,
    audio_period: Duration,
) -> Result<EmulatorPrefs> {
    let stride = endpoints.video.config().stride();
    let mut last_audio = Instant::now()
        .checked_sub(audio_period)
        .unwrap_or_else(Instant::now);
    let mut window_start = Instant::now();
    let mut window_frames = 0u32;
    let mut window_busy = Duration::ZERO;

    loop {
        let started = Instant::now();
        endpoints.handle_events(&mut synth)?;
        if endpoints.commands.quit_requested() {
            break;
        }
        if endpoints.commands.is_paused() {
            endpoints.wait_while_paused(&mut synth)?;
            continue;
        }

        if !endpoints.commands.is_stopped() {
            if last_audio.elapsed() >= audio_period {
                synth.render_audio(endpoints.audio.fill_slice());
                endpoints.commit_audio();
                last_audio = Instant::now();
            }

            synth.render_video(endpoints.video.draw_target(), stride);
            if let Err(err) = endpoints.commit_frame() {
                if err.is_fatal() {
                    return Err(err.into());
                }
            }
            window_frames += 1;
        }

        let busy = started.elapsed();
        window_busy += busy;
        if let Some(rest) = frame_period.checked_sub(busy) {
            thread::sleep(rest);
        }

        let window = window_start.elapsed();
        if window >= Duration::from_secs(1) {
            let fps = window_frames as f32 / window.as_secs_f32();
            let idle = 100.0 * (1.0 - window_busy.as_secs_f32() / window.as_secs_f32());
            endpoints.commands.report_frame_stats(fps, idle.max(0.0));
            window_start = Instant::now();
            window_frames = 0;
            window_busy = Duration::ZERO;
        }
    }

    Ok(synth.prefs)
}

struct AudioSummary {
    bytes: u64,
    stats: bridge::transport::AudioSwapStats,
}

fn pull_audio(mut consumer: AudioConsumer, period: Duration, stop: &AtomicBool) -> AudioSummary {
    let frame_bytes = consumer.config().frame_bytes();
    let mut buffer = vec![0u8; frame_bytes];
    let mut bytes = 0u64;
    while !stop.load(Ordering::Acquire) {
        bytes += consumer.read_into(&mut buffer, frame_bytes) as u64;
        thread::sleep(period);
    }
    AudioSummary {
        bytes,
        stats: consumer.stats(),
    }
}

#[derive(Default)]
struct CountingSink {
    presented: u64,
}

impl Present for CountingSink {
    fn present(&mut self, image: &ImageData) {
        tracing::trace!(sequence = image.sequence(), "painted");
        self.presented += 1;
    }
}

struct FrameSummary {
    presented: u64,
    stats: bridge::transport::FrameSwapStats,
}

fn present_frames(mut presenter: FramePresenter, stop: &AtomicBool) -> FrameSummary {
    let mut sink = CountingSink::default();
    while !stop.load(Ordering::Acquire) {
        if presenter.wait_latest(Duration::from_millis(50)).is_some() {
            if let Some(image) = presenter.current() {
                sink.present(image);
            }
        }
    }
    presenter.release_current();
    FrameSummary {
        presented: sink.presented,
        stats: presenter.stats(),
    }
}

fn print_prefs(prefs: &EmulatorPrefs) {
    for drive in Drive::ALL {
        println!("{}: {}", drive.token(), prefs.floppy(drive).unwrap_or("<empty>"));
    }
    println!("rom: {}", prefs.rom().unwrap_or("<none>"));
    println!("resets: {}", prefs.resets());
}
