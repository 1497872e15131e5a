#![cfg(all(test, not(target_arch = "wasm32")))]

use bridge::{AudioConfig, Bridge, BridgeConfig, SampleRate, VideoConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use transport::{CommitOutcome, PixelFormat};

fn config() -> BridgeConfig {
    BridgeConfig {
        audio: AudioConfig {
            sample_rate: SampleRate::Hz48000,
            latency_ms: 2,
            swap_spin_limit: 64,
        },
        video: VideoConfig {
            width: 32,
            height: 16,
            format: PixelFormat::RgbaPremul,
            max_in_flight: 3,
        },
        ..BridgeConfig::default()
    }
}

#[test]
fn audio_reads_are_whole_frames_under_contention() {
    const FRAMES: i16 = 3_000;
    let Bridge {
        mut engine,
        mut audio_out,
        ..
    } = Bridge::init(&config()).expect("init");
    let frame_bytes = audio_out.config().frame_bytes();
    assert_eq!(frame_bytes, 96 * 4);

    let done = Arc::new(AtomicBool::new(false));
    let reader_done = Arc::clone(&done);
    let reader = thread::spawn(move || {
        let mut buffer = vec![0u8; frame_bytes];
        let mut last = 0i16;
        let mut reads = 0u64;
        while !reader_done.load(Ordering::Acquire) {
            let copied = audio_out.read_into(&mut buffer, frame_bytes);
            assert_eq!(copied, frame_bytes);
            let samples: Vec<i16> = buffer
                .chunks_exact(2)
                .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
                .collect();
            let marker = samples[0];
            assert!(samples.iter().all(|s| *s == marker), "torn audio frame");
            assert!(marker >= last, "audio went backwards");
            last = marker;
            reads += 1;
        }
        reads
    });

    let mut published = 0u64;
    for marker in 1..=FRAMES {
        engine.audio.fill_slice().fill(marker);
        if engine.commit_audio() != CommitOutcome::Deferred {
            published += 1;
        }
    }
    done.store(true, Ordering::Release);
    let reads = reader.join().unwrap();

    let stats = engine.audio.stats();
    assert_eq!(stats.swaps, published);
    assert_eq!(stats.swaps + stats.deferred, FRAMES as u64);
    assert!(reads > 0);
}

#[test]
fn video_frames_match_draw_contents() {
    let Bridge {
        mut engine,
        mut presenter,
        ..
    } = Bridge::init(&config()).expect("init");
    let stride = engine.video.config().stride();
    assert_eq!(stride, 32 * 4);

    for frame in 0..8u8 {
        for (row, line) in engine.video.draw_target().chunks_mut(stride).enumerate() {
            line.fill(frame ^ row as u8);
        }
        let expected = engine.video.draw_target().to_vec();
        engine.commit_frame().expect("commit");

        let image = presenter.latest().expect("frame");
        assert_eq!(image.bytes(), expected.as_slice());
        assert_eq!(image.format(), PixelFormat::RgbaPremul);
        assert_eq!((image.width(), image.height()), (32, 16));
    }
}

#[test]
fn presenter_keeps_up_without_blocking_engine() {
    const FRAMES: u32 = 1_000;
    let Bridge {
        mut engine,
        mut presenter,
        ..
    } = Bridge::init(&config()).expect("init");

    let painter = thread::spawn(move || {
        let mut shown = Vec::new();
        while let Some(image) = presenter.wait_latest(Duration::from_millis(200)) {
            let first = image.bytes()[0];
            assert!(image.bytes().iter().all(|b| *b == first), "torn video frame");
            shown.push(image.sequence());
            thread::sleep(Duration::from_micros(200));
        }
        (shown, presenter.stats())
    });

    let mut dropped = 0u32;
    for frame in 1..=FRAMES {
        engine.video.draw_target().fill(frame as u8);
        if engine.commit_frame().is_err() {
            dropped += 1;
        }
    }

    let (shown, stats) = painter.join().unwrap();
    assert!(shown.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(stats.submitted + dropped as u64, FRAMES as u64);
    assert_eq!(stats.allocation_failures, dropped as u64);
    assert_eq!(shown.last().copied(), Some(stats.submitted));
}
