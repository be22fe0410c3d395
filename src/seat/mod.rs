//! Seat Capability Broadcaster
//!
//! A seat owns the server-wide input capability set (pointer, keyboard,
//! touch) and a device name. Every bound seat resource is an observer:
//! whenever the set changes, each binding receives the new bitmask, and
//! bindings at version 2 or newer also receive name changes.
//!
//! Broadcasts walk a snapshot of the binding list taken when the pass starts,
//! and a mutation plus its notify pass happen within one `&mut self` call, so
//! a binding added afterwards only ever sees the complete current state.

use crate::protocol::{Event, EventSink, ResourceHandle};
use log::debug;

/// Version in which the seat name event was introduced
pub const SEAT_NAME_SINCE_VERSION: u32 = 2;

/// Highest seat version this implementation speaks
pub const SEAT_MAX_VERSION: u32 = 3;

bitflags::bitflags! {
    /// Capability bitmask as sent on the wire
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        const POINTER = 1 << 0;
        const KEYBOARD = 1 << 1;
        const TOUCH = 1 << 2;
    }
}

/// A single input capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Pointer,
    Keyboard,
    Touch,
}

impl Capability {
    /// Bit for this capability
    pub const fn as_flag(self) -> Capabilities {
        match self {
            Capability::Pointer => Capabilities::POINTER,
            Capability::Keyboard => Capabilities::KEYBOARD,
            Capability::Touch => Capabilities::TOUCH,
        }
    }
}

/// Events sent to seat resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatEvent {
    Capabilities(Capabilities),
    Name(String),
}

/// One bound seat resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatBinding {
    pub handle: ResourceHandle,
    pub version: u32,
}

/// A seat global and its observers
#[derive(Debug, Clone)]
pub struct Seat {
    name: String,
    capabilities: Capabilities,
    bindings: Vec<SeatBinding>,
}

impl Seat {
    /// Create a seat with no capabilities
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::empty(),
            bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability.as_flag())
    }

    pub fn bindings(&self) -> &[SeatBinding] {
        &self.bindings
    }

    /// Register a new binding and send it the current state
    pub fn bind(&mut self, handle: ResourceHandle, version: u32, out: &mut dyn EventSink) {
        let binding = SeatBinding { handle, version };
        self.bindings.push(binding);
        self.send_capabilities(binding, out);
        self.send_name(binding, out);
        debug!("Seat '{}' bound by {} at v{}", self.name, handle, version);
    }

    /// Remove a binding. Returns false if it was not bound.
    pub fn unbind(&mut self, handle: ResourceHandle) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|binding| binding.handle != handle);
        before != self.bindings.len()
    }

    /// Set one capability, broadcasting if it changed
    pub fn set_capability(
        &mut self,
        capability: Capability,
        present: bool,
        out: &mut dyn EventSink,
    ) -> bool {
        if self.has(capability) == present {
            return false;
        }
        self.capabilities.set(capability.as_flag(), present);
        debug!(
            "Seat '{}' {:?} -> {}, capabilities now {:?}",
            self.name, capability, present, self.capabilities
        );

        let snapshot = self.bindings.clone();
        for binding in snapshot {
            self.send_capabilities(binding, out);
        }
        true
    }

    /// Rename the seat, broadcasting to bindings that understand names
    pub fn set_name(&mut self, name: impl Into<String>, out: &mut dyn EventSink) -> bool {
        let name = name.into();
        if self.name == name {
            return false;
        }
        self.name = name;

        let snapshot = self.bindings.clone();
        for binding in snapshot {
            self.send_name(binding, out);
        }
        true
    }

    fn send_capabilities(&self, binding: SeatBinding, out: &mut dyn EventSink) {
        out.send(
            binding.handle,
            Event::Seat(SeatEvent::Capabilities(self.capabilities)),
        );
    }

    fn send_name(&self, binding: SeatBinding, out: &mut dyn EventSink) {
        if binding.version < SEAT_NAME_SINCE_VERSION {
            return;
        }
        out.send(binding.handle, Event::Seat(SeatEvent::Name(self.name.clone())));
    }
}
