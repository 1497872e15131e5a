//! Bridge construction and the per-context endpoints.
//!
//! [`Bridge::init`] builds every shared piece once and splits it into the
//! handles each execution context owns:
//!
//! ```text
//! front-end thread    FrontEnd          ── commands, payloads, connect
//! engine thread       EngineEndpoints   ── CommandHost + audio/video producers
//! audio callback      AudioConsumer     ── read_into, never blocks
//! presentation        FramePresenter    ── latest frame, recycles images
//! ```
//!
//! Teardown is a `Quit` command followed by dropping the handles.

use crate::{
    BridgeConfig, BridgeError, BridgeResult, CommandHost, Engine, FrameStats, FrontEnd,
    InputPorts, PendingPayloadStore,
};
use std::sync::Arc;
use transport::{
    audio_swap, frame_swap, AudioConsumer, AudioProducer, CommandRing, CommitOutcome,
    FramePresenter, FrameProducer,
};

pub struct Bridge {
    pub front_end: FrontEnd,
    pub engine: EngineEndpoints,
    pub audio_out: AudioConsumer,
    pub presenter: FramePresenter,
}

impl Bridge {
    pub fn init(config: &BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;

        let ring = Arc::new(CommandRing::new(config.queue_capacity)?);
        let payloads = Arc::new(PendingPayloadStore::new());
        let ports = Arc::new(InputPorts::default());
        let stats = Arc::new(FrameStats::default());

        let audio_config = config.audio.swap_config();
        tracing::debug!(
            sample_rate = config.audio.sample_rate.hz(),
            frame_count = audio_config.frame_count,
            latency_ms = config.audio.effective_latency_ms(),
            "audio hand-off configured"
        );
        let (audio, audio_out) = audio_swap(audio_config)?;

        let video_config = config.video.swap_config();
        tracing::debug!(
            width = video_config.width,
            height = video_config.height,
            format = ?video_config.format,
            stride = video_config.stride(),
            "video hand-off configured"
        );
        let (video, presenter) = frame_swap(video_config)?;

        let front_end = FrontEnd::new(
            Arc::clone(&ring),
            Arc::clone(&payloads),
            Arc::clone(&ports),
            Arc::clone(&stats),
            config.max_message_len,
        );
        let commands = CommandHost::new(ring, payloads, ports, stats);

        tracing::info!(queue_capacity = config.queue_capacity, "bridge initialised");
        Ok(Self {
            front_end,
            engine: EngineEndpoints {
                commands,
                audio,
                video,
            },
            audio_out,
            presenter,
        })
    }
}

/// Everything the engine thread owns.
pub struct EngineEndpoints {
    pub commands: CommandHost,
    pub audio: AudioProducer,
    pub video: FrameProducer,
}

impl EngineEndpoints {
    /// Drains pending commands and keeps audio playback in step with the
    /// pause/stop state.
    pub fn handle_events<E: Engine + ?Sized>(&mut self, engine: &mut E) -> BridgeResult<usize> {
        let dispatched = self.commands.handle_events(engine)?;
        self.sync_playback();
        Ok(dispatched)
    }

    /// Parks while paused; see [`CommandHost::wait_while_paused`].
    pub fn wait_while_paused<E: Engine + ?Sized>(&mut self, engine: &mut E) -> BridgeResult<()> {
        self.sync_playback();
        self.commands.wait_while_paused(engine)?;
        self.sync_playback();
        Ok(())
    }

    /// Publishes the filled audio buffer.
    pub fn commit_audio(&mut self) -> CommitOutcome {
        let outcome = self.audio.commit();
        match outcome {
            CommitOutcome::Swapped => tracing::trace!("audio frame committed"),
            CommitOutcome::Overrun => tracing::warn!("audio overrun, unread frame replaced"),
            CommitOutcome::Deferred => tracing::warn!("audio swap deferred, reader still busy"),
        }
        outcome
    }

    /// Hands the finished frame to presentation.
    ///
    /// A missing image resource drops this frame only; the engine carries on
    /// and the next commit tries again.
    pub fn commit_frame(&mut self) -> BridgeResult<()> {
        match self.video.commit_and_recycle() {
            Ok(_) => {
                tracing::trace!("video frame committed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "video frame dropped");
                Err(BridgeError::from(err))
            }
        }
    }

    fn sync_playback(&self) {
        let playing = !self.commands.is_paused() && !self.commands.is_stopped();
        self.audio.set_playing(playing);
    }
}
