#![cfg(all(test, not(target_arch = "wasm32")))]

use bridge::{Bridge, BridgeConfig, BridgeError, Delivery, EmulatorPrefs, Engine, VideoConfig};
use bridge_protocol::{Command, Drive, InputDevice, Port};
use parking_lot::Mutex;
use rand::prelude::*;
use std::sync::Arc;
use std::thread;

fn config() -> BridgeConfig {
    BridgeConfig {
        video: VideoConfig {
            width: 16,
            height: 8,
            ..VideoConfig::default()
        },
        ..BridgeConfig::default()
    }
}

/// Records commands into a shared log and applies them to prefs.
struct Recorder {
    prefs: EmulatorPrefs,
    log: Arc<Mutex<Vec<Command>>>,
}

impl Engine for Recorder {
    fn on_command(&mut self, command: Command, payload: Option<String>) {
        self.log.lock().push(command);
        self.prefs.apply(command, payload);
    }
}

#[test]
fn eject_without_payload_clears_drive() {
    let Bridge {
        mut front_end,
        mut engine,
        ..
    } = Bridge::init(&config()).expect("init");
    let mut prefs = EmulatorPrefs::default();

    front_end.handle_message("insert df0 file:///work.adf").unwrap();
    engine.handle_events(&mut prefs).unwrap();
    assert_eq!(prefs.floppy(Drive::Df0), Some("file:///work.adf"));

    front_end.handle_message("eject df0").unwrap();
    engine.handle_events(&mut prefs).unwrap();
    assert_eq!(prefs.floppy(Drive::Df0), None);
    assert_eq!(engine.commands.payloads_missing(), 0);
}

#[test]
fn payloads_follow_their_commands_across_threads() {
    let Bridge {
        mut front_end,
        engine,
        ..
    } = Bridge::init(&config()).expect("init");
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut recorder = Recorder {
        prefs: EmulatorPrefs::default(),
        log: Arc::clone(&log),
    };

    let engine_thread = thread::spawn(move || {
        let mut engine = engine;
        while !engine.commands.quit_requested() {
            engine.commands.handle_one(&mut recorder).unwrap();
        }
        (recorder.prefs, engine.commands.payloads_missing())
    });

    for line in [
        "insert df0 a.adf",
        "insert df1 b.adf",
        "rom kick13.rom",
        "reset",
    ] {
        assert!(matches!(
            front_end.handle_message(line).unwrap(),
            Delivery::Queued(_)
        ));
    }
    front_end.send(Command::Quit).unwrap();

    let (prefs, missing) = engine_thread.join().unwrap();
    assert_eq!(missing, 0);
    assert_eq!(prefs.floppy(Drive::Df0), Some("a.adf"));
    assert_eq!(prefs.floppy(Drive::Df1), Some("b.adf"));
    assert_eq!(prefs.rom(), Some("kick13.rom"));
    assert_eq!(prefs.resets(), 1);
    assert_eq!(log.lock().last(), Some(&Command::Quit));
}

#[test]
fn randomized_commands_arrive_in_order() {
    const COMMANDS: usize = 5_000;
    let Bridge {
        mut front_end,
        engine,
        ..
    } = Bridge::init(&config()).expect("init");
    let capacity = config().queue_capacity;

    let mut rng = StdRng::seed_from_u64(0xB21D_6E);
    let pool = [
        Command::Start,
        Command::Reset,
        Command::Debug,
        Command::SaveConfig,
        Command::EjectDisk(Drive::Df0),
        Command::EjectDisk(Drive::Df1),
        Command::LoadState,
        Command::SaveState,
    ];
    let sent: Vec<Command> = (0..COMMANDS)
        .map(|_| *pool.choose(&mut rng).expect("pool"))
        .collect();

    let log = Arc::new(Mutex::new(Vec::with_capacity(COMMANDS + 1)));
    let mut recorder = Recorder {
        prefs: EmulatorPrefs::default(),
        log: Arc::clone(&log),
    };
    let engine_thread = thread::spawn(move || {
        let mut engine = engine;
        while !engine.commands.quit_requested() {
            engine.commands.handle_one(&mut recorder).unwrap();
        }
    });

    for command in sent.iter().copied().chain(std::iter::once(Command::Quit)) {
        // Stay within the ring; overflowing it is a fatal contract breach.
        while front_end.queued_words() + 2 > capacity {
            thread::yield_now();
        }
        front_end.send(command).unwrap();
    }
    engine_thread.join().unwrap();

    let log = log.lock();
    assert_eq!(&log[..COMMANDS], sent.as_slice());
    assert_eq!(log[COMMANDS], Command::Quit);
}

#[test]
fn connect_is_visible_before_later_commands() {
    let Bridge {
        mut front_end,
        mut engine,
        ..
    } = Bridge::init(&config()).expect("init");

    front_end.handle_message("connect port0 joy1").unwrap();
    front_end.handle_message("reset").unwrap();

    struct PortProbe<'a> {
        ports: &'a bridge::InputPorts,
        seen: Option<InputDevice>,
    }
    impl Engine for PortProbe<'_> {
        fn on_command(&mut self, command: Command, _payload: Option<String>) {
            if command == Command::Reset {
                self.seen = Some(self.ports.device(Port::Port0));
            }
        }
    }

    let mut probe = PortProbe {
        ports: front_end.input_ports(),
        seen: None,
    };
    engine.handle_events(&mut probe).unwrap();
    assert_eq!(probe.seen, Some(InputDevice::Joy1));
    assert_eq!(engine.commands.port_device(Port::Port0), InputDevice::Joy1);
}

#[test]
fn rejected_messages_change_nothing() {
    let Bridge {
        mut front_end,
        mut engine,
        ..
    } = Bridge::init(&config()).expect("init");

    for bad in ["", "eject df2", "insert df0", "rom", "connect port9 mouse", "boot"] {
        let err = front_end.handle_message(bad).unwrap_err();
        assert!(matches!(err, BridgeError::Protocol(_)), "{bad}: {err}");
    }
    assert_eq!(front_end.queued_words(), 0);

    let mut prefs = EmulatorPrefs::default();
    assert_eq!(engine.handle_events(&mut prefs).unwrap(), 0);
    assert_eq!(prefs, EmulatorPrefs::default());
}

#[test]
fn overflow_surfaces_as_fatal() {
    let Bridge { mut front_end, .. } = Bridge::init(&config()).expect("init");
    let mut outcome = Ok(());
    for _ in 0..=config().queue_capacity {
        outcome = front_end.send(Command::Reset);
        if outcome.is_err() {
            break;
        }
    }
    let err = outcome.unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn pause_holds_engine_until_resume() {
    let Bridge {
        mut front_end,
        engine,
        ..
    } = Bridge::init(&config()).expect("init");
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut recorder = Recorder {
        prefs: EmulatorPrefs::default(),
        log: Arc::clone(&log),
    };

    front_end.send(Command::Pause).unwrap();
    let engine_thread = thread::spawn(move || {
        let mut engine = engine;
        let mut frames = 0u32;
        loop {
            engine.handle_events(&mut recorder).unwrap();
            if engine.commands.quit_requested() {
                break;
            }
            if engine.commands.is_paused() {
                engine.wait_while_paused(&mut recorder).unwrap();
                continue;
            }
            frames += 1;
            thread::yield_now();
        }
        frames
    });

    front_end.send(Command::Resume).unwrap();
    front_end.send(Command::Quit).unwrap();
    engine_thread.join().unwrap();

    assert_eq!(
        log.lock().as_slice(),
        &[Command::Pause, Command::Resume, Command::Quit]
    );
}
