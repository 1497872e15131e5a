//! Engine side of the command path.
//!
//! The engine loop calls [`CommandHost::handle_events`] once per iteration.
//! While paused it calls [`CommandHost::wait_while_paused`], which parks on the
//! command ring until the front-end resumes, stops or quits.

use crate::{BridgeError, BridgeResult, FrameStats, InputPorts, PendingPayloadStore};
use bridge_protocol::{Command, InputDevice, Port};
use std::sync::Arc;
use transport::CommandRing;

/// Receives decoded commands on the engine thread.
pub trait Engine {
    /// Applies one command. `payload` is the taken value for commands that
    /// carry one, and `None` otherwise.
    fn on_command(&mut self, command: Command, payload: Option<String>);
}

/// Sole consumer of the command ring.
pub struct CommandHost {
    ring: Arc<CommandRing>,
    payloads: Arc<PendingPayloadStore>,
    ports: Arc<InputPorts>,
    stats: Arc<FrameStats>,
    paused: bool,
    stopped: bool,
    quit: bool,
    handled: u64,
    payloads_missing: u64,
}

impl CommandHost {
    pub(crate) fn new(
        ring: Arc<CommandRing>,
        payloads: Arc<PendingPayloadStore>,
        ports: Arc<InputPorts>,
        stats: Arc<FrameStats>,
    ) -> Self {
        Self {
            ring,
            payloads,
            ports,
            stats,
            paused: false,
            stopped: false,
            quit: false,
            handled: 0,
            payloads_missing: 0,
        }
    }

    /// Applies every queued command without blocking. Returns how many
    /// commands were dispatched.
    pub fn handle_events<E: Engine + ?Sized>(&mut self, engine: &mut E) -> BridgeResult<usize> {
        let mut dispatched = 0;
        while self.ring.try_has_data() {
            let command = self.next_command()?;
            self.dispatch(engine, command);
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Parks until a command ends the pause. Returns immediately when not
    /// paused.
    pub fn wait_while_paused<E: Engine + ?Sized>(&mut self, engine: &mut E) -> BridgeResult<()> {
        while self.paused {
            let command = self.next_command()?;
            self.dispatch(engine, command);
        }
        Ok(())
    }

    /// Blocks for exactly one command and applies it.
    pub fn handle_one<E: Engine + ?Sized>(&mut self, engine: &mut E) -> BridgeResult<Command> {
        let command = self.next_command()?;
        self.dispatch(engine, command);
        Ok(command)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Commands dispatched so far.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Payload commands that found their slot empty.
    pub fn payloads_missing(&self) -> u64 {
        self.payloads_missing
    }

    /// Current device on `port`, as last set by a `connect` message.
    pub fn port_device(&self, port: Port) -> InputDevice {
        self.ports.device(port)
    }

    /// Publishes frame-rate figures for the front-end.
    pub fn report_frame_stats(&self, fps: f32, idle: f32) {
        self.stats.report(fps, idle);
    }

    fn next_command(&self) -> BridgeResult<Command> {
        let tag = self.ring.pop_blocking();
        Command::decode(tag, || self.ring.pop_blocking()).map_err(|err| {
            tracing::error!(%err, "undecodable command words");
            BridgeError::from(err)
        })
    }

    fn dispatch<E: Engine + ?Sized>(&mut self, engine: &mut E, command: Command) {
        tracing::trace!(?command, "dispatch");
        self.handled += 1;

        let payload = match command.payload_slot() {
            Some(slot) => match self.payloads.take(slot) {
                Some(value) => Some(value),
                None => {
                    self.payloads_missing += 1;
                    tracing::warn!(
                        ?command,
                        error = %BridgeError::PayloadMissing(slot),
                        "command skipped"
                    );
                    return;
                }
            },
            None => None,
        };

        match command {
            Command::Pause => self.paused = true,
            Command::Resume => self.paused = false,
            Command::Start => self.stopped = false,
            Command::Stop => {
                self.stopped = true;
                self.paused = false;
            }
            Command::Quit => {
                self.quit = true;
                self.paused = false;
            }
            _ => {}
        }

        engine.on_command(command, payload);
    }
}

impl Drop for CommandHost {
    fn drop(&mut self) {
        tracing::info!(
            handled = self.handled,
            quit = self.quit,
            "engine command host shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmulatorPrefs;
    use bridge_protocol::{Drive, PayloadSlot};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Log(Vec<(Command, Option<String>)>);

    impl Engine for Log {
        fn on_command(&mut self, command: Command, payload: Option<String>) {
            self.0.push((command, payload));
        }
    }

    fn host() -> (CommandHost, Arc<CommandRing>, Arc<PendingPayloadStore>) {
        let ring = Arc::new(CommandRing::new(32).expect("ring"));
        let payloads = Arc::new(PendingPayloadStore::new());
        let host = CommandHost::new(
            Arc::clone(&ring),
            Arc::clone(&payloads),
            Arc::new(InputPorts::default()),
            Arc::new(FrameStats::default()),
        );
        (host, ring, payloads)
    }

    fn push(ring: &CommandRing, command: Command) {
        ring.push_words(&command.encode()).expect("push");
    }

    #[test]
    fn drains_in_fifo_order_with_payloads() {
        let (mut host, ring, payloads) = host();
        payloads.set(PayloadSlot::Drive(Drive::Df1), "b.adf");
        push(&ring, Command::Reset);
        push(&ring, Command::InsertDisk(Drive::Df1));
        push(&ring, Command::EjectDisk(Drive::Df0));

        let mut log = Log::default();
        assert_eq!(host.handle_events(&mut log).unwrap(), 3);
        assert_eq!(
            log.0,
            vec![
                (Command::Reset, None),
                (Command::InsertDisk(Drive::Df1), Some("b.adf".to_owned())),
                (Command::EjectDisk(Drive::Df0), None),
            ]
        );
        assert_eq!(host.handle_events(&mut log).unwrap(), 0);
    }

    #[test]
    fn missing_payload_is_a_no_op() {
        let (mut host, ring, _payloads) = host();
        push(&ring, Command::SelectRom);
        push(&ring, Command::Reset);

        let mut prefs = EmulatorPrefs::default();
        host.handle_events(&mut prefs).unwrap();
        assert_eq!(prefs.rom(), None);
        assert_eq!(prefs.resets(), 1);
        assert_eq!(host.payloads_missing(), 1);
        assert_eq!(host.handled(), 2);
    }

    #[test]
    fn corrupt_tag_is_reported() {
        let (mut host, ring, _payloads) = host();
        ring.push(77).unwrap();
        let err = host.handle_events(&mut Log::default()).unwrap_err();
        assert!(matches!(err, BridgeError::Wire(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn pause_parks_until_resume() {
        let (mut host, ring, _payloads) = host();
        push(&ring, Command::Pause);
        let mut log = Log::default();
        host.handle_events(&mut log).unwrap();
        assert!(host.is_paused());

        let producer = Arc::clone(&ring);
        let resumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            push(&producer, Command::Reset);
            push(&producer, Command::Resume);
        });

        host.wait_while_paused(&mut log).unwrap();
        resumer.join().unwrap();
        assert!(!host.is_paused());
        let seen: Vec<_> = log.0.iter().map(|(command, _)| *command).collect();
        assert_eq!(seen, vec![Command::Pause, Command::Reset, Command::Resume]);
    }

    #[test]
    fn quit_ends_a_pause() {
        let (mut host, ring, _payloads) = host();
        push(&ring, Command::Pause);
        push(&ring, Command::Quit);
        let mut log = Log::default();

        assert_eq!(host.handle_one(&mut log).unwrap(), Command::Pause);
        host.wait_while_paused(&mut log).unwrap();
        assert!(host.quit_requested());
        assert!(!host.is_paused());
    }
}
