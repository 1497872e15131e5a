//! Joystick port assignments.
//!
//! `connect` messages are applied immediately from the front-end thread
//! instead of travelling the command ring; the engine reads the latest
//! snapshot whenever it polls input.

use arc_swap::ArcSwap;
use bridge_protocol::{InputDevice, Port};
use std::sync::Arc;

/// Device attached to each port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortMap {
    devices: [InputDevice; 2],
}

impl PortMap {
    pub fn device(&self, port: Port) -> InputDevice {
        self.devices[port.index()]
    }

    fn with(mut self, port: Port, device: InputDevice) -> Self {
        self.devices[port.index()] = device;
        self
    }
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            devices: [InputDevice::Mouse, InputDevice::Joy0],
        }
    }
}

#[derive(Debug, Default)]
pub struct InputPorts {
    current: ArcSwap<PortMap>,
}

impl InputPorts {
    pub fn new(initial: PortMap) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Attaches `device` to `port`. Returns false when it was already there.
    pub fn connect(&self, port: Port, device: InputDevice) -> bool {
        let mut changed = false;
        self.current.rcu(|map| {
            changed = map.device(port) != device;
            if changed {
                Arc::new(map.with(port, device))
            } else {
                Arc::clone(map)
            }
        });
        if changed {
            tracing::debug!(?port, ?device, "input port reassigned");
        }
        changed
    }

    pub fn device(&self, port: Port) -> InputDevice {
        self.current.load().device(port)
    }

    pub fn snapshot(&self) -> Arc<PortMap> {
        self.current.load_full()
    }
}
