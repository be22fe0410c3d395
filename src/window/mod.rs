//! Window Management global
//!
//! The server-side source of the window list. The compositor creates,
//! updates and removes windows here; every client bound to the global is
//! told about each change, and requests coming back from clients are queued
//! as [`WindowRequested`] notifications for the compositor to act on.
//!
//! The global never changes window state in response to a client request on
//! its own. Whatever the compositor decides comes back through the setters
//! like any other change.

use crate::protocol::{ClientId, Event, EventSink, ResourceHandle};
use log::debug;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Server-assigned window identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Window state bitmask as sent on the wire
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowState: u32 {
        const ACTIVE = 1 << 0;
        const MINIMIZED = 1 << 1;
        const MAXIMIZED = 1 << 2;
        const FULLSCREEN = 1 << 3;
        const KEEP_ABOVE = 1 << 4;
        const KEEP_BELOW = 1 << 5;
        const ON_ALL_DESKTOPS = 1 << 6;
        const DEMANDS_ATTENTION = 1 << 7;
        const MINIMIZABLE = 1 << 8;
        const MAXIMIZABLE = 1 << 9;
        const FULLSCREENABLE = 1 << 10;
        const SKIP_TASKBAR = 1 << 11;
        const SHADEABLE = 1 << 12;
        const SHADED = 1 << 13;
        const MOVABLE = 1 << 14;
        const RESIZABLE = 1 << 15;
    }
}

/// Events sent to window management resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    Created(WindowId),
    Removed(WindowId),
    TitleChanged(WindowId, String),
    AppIdChanged(WindowId, String),
    StateChanged(WindowId, WindowState),
    VirtualDesktopChanged(WindowId, u32),
    IconChanged(WindowId, String),
}

impl WindowEvent {
    pub fn window(&self) -> WindowId {
        match self {
            WindowEvent::Created(id)
            | WindowEvent::Removed(id)
            | WindowEvent::TitleChanged(id, _)
            | WindowEvent::AppIdChanged(id, _)
            | WindowEvent::StateChanged(id, _)
            | WindowEvent::VirtualDesktopChanged(id, _)
            | WindowEvent::IconChanged(id, _) => *id,
        }
    }
}

/// Requests a client sends about a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    Activate(WindowId),
    Close(WindowId),
    Move(WindowId),
    Resize(WindowId),
    SetVirtualDesktop(WindowId, u32),
    SetMinimized(WindowId, bool),
    SetMaximized(WindowId, bool),
    SetShaded(WindowId, bool),
}

impl WindowRequest {
    pub fn window(&self) -> WindowId {
        match self {
            WindowRequest::Activate(id)
            | WindowRequest::Close(id)
            | WindowRequest::Move(id)
            | WindowRequest::Resize(id)
            | WindowRequest::SetVirtualDesktop(id, _)
            | WindowRequest::SetMinimized(id, _)
            | WindowRequest::SetMaximized(id, _)
            | WindowRequest::SetShaded(id, _) => *id,
        }
    }
}

/// A client request waiting for the compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequested {
    pub client: ClientId,
    pub request: WindowRequest,
}

/// Server-side properties of one window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerWindow {
    pub title: String,
    pub app_id: String,
    pub state: WindowState,
    pub virtual_desktop: u32,
    pub icon: String,
}

/// The window management global
#[derive(Debug, Default)]
pub struct WindowManagement {
    /// Ordered by id, which is creation order
    windows: BTreeMap<WindowId, ServerWindow>,
    bindings: Vec<ResourceHandle>,
    next_window_id: u32,
    requests: VecDeque<WindowRequested>,
}

impl WindowManagement {
    pub fn new() -> Self {
        Self {
            next_window_id: 1,
            ..Default::default()
        }
    }

    pub fn window(&self, id: WindowId) -> Option<&ServerWindow> {
        self.windows.get(&id)
    }

    /// Live windows in creation order
    pub fn windows(&self) -> impl Iterator<Item = (WindowId, &ServerWindow)> {
        self.windows.iter().map(|(id, window)| (*id, window))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn bindings(&self) -> &[ResourceHandle] {
        &self.bindings
    }

    /// Register a binding and replay every existing window to it
    pub fn bind(&mut self, handle: ResourceHandle, out: &mut dyn EventSink) {
        self.bindings.push(handle);
        for (id, window) in &self.windows {
            announce(*id, window, handle, out);
        }
        debug!(
            "Window management bound by {}, replayed {} windows",
            handle,
            self.windows.len()
        );
    }

    pub fn unbind(&mut self, handle: ResourceHandle) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|binding| *binding != handle);
        before != self.bindings.len()
    }

    /// Create a window with default properties and announce it
    pub fn create_window(&mut self, out: &mut dyn EventSink) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;

        let window = ServerWindow::default();
        for handle in self.bindings.clone() {
            announce(id, &window, handle, out);
        }
        self.windows.insert(id, window);

        debug!("Created {}", id);
        id
    }

    /// Remove a window. Queued requests naming it are discarded.
    pub fn remove_window(&mut self, id: WindowId, out: &mut dyn EventSink) -> bool {
        if self.windows.remove(&id).is_none() {
            return false;
        }
        self.requests.retain(|queued| queued.request.window() != id);
        self.broadcast(WindowEvent::Removed(id), out);
        debug!("Removed {}", id);
        true
    }

    pub fn set_title(&mut self, id: WindowId, title: &str, out: &mut dyn EventSink) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.title == title {
            return false;
        }
        window.title = title.to_string();
        self.broadcast(WindowEvent::TitleChanged(id, title.to_string()), out);
        true
    }

    pub fn set_app_id(&mut self, id: WindowId, app_id: &str, out: &mut dyn EventSink) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.app_id == app_id {
            return false;
        }
        window.app_id = app_id.to_string();
        self.broadcast(WindowEvent::AppIdChanged(id, app_id.to_string()), out);
        true
    }

    /// Set or clear state flags, broadcasting the full mask on change
    pub fn set_state(
        &mut self,
        id: WindowId,
        flags: WindowState,
        on: bool,
        out: &mut dyn EventSink,
    ) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        let mut state = window.state;
        state.set(flags, on);
        if state == window.state {
            return false;
        }
        window.state = state;
        self.broadcast(WindowEvent::StateChanged(id, state), out);
        true
    }

    pub fn set_virtual_desktop(&mut self, id: WindowId, desktop: u32, out: &mut dyn EventSink) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.virtual_desktop == desktop {
            return false;
        }
        window.virtual_desktop = desktop;
        self.broadcast(WindowEvent::VirtualDesktopChanged(id, desktop), out);
        true
    }

    pub fn set_icon(&mut self, id: WindowId, icon: &str, out: &mut dyn EventSink) -> bool {
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.icon == icon {
            return false;
        }
        window.icon = icon.to_string();
        self.broadcast(WindowEvent::IconChanged(id, icon.to_string()), out);
        true
    }

    /// Queue a client request for the compositor.
    ///
    /// Requests naming a window that no longer exists are dropped.
    pub fn handle_request(&mut self, client: ClientId, request: WindowRequest) -> bool {
        if !self.windows.contains_key(&request.window()) {
            debug!("Dropping {:?} from {}: no such window", request, client);
            return false;
        }
        debug!("{} requested {:?}", client, request);
        self.requests.push_back(WindowRequested { client, request });
        true
    }

    /// Drain queued client requests, oldest first
    pub fn take_requests(&mut self) -> Vec<WindowRequested> {
        self.requests.drain(..).collect()
    }

    fn broadcast(&self, event: WindowEvent, out: &mut dyn EventSink) {
        for handle in &self.bindings {
            out.send(*handle, Event::Window(event.clone()));
        }
    }
}

/// Send a window's creation and every non-default property
fn announce(id: WindowId, window: &ServerWindow, handle: ResourceHandle, out: &mut dyn EventSink) {
    let mut send = |event| out.send(handle, Event::Window(event));
    send(WindowEvent::Created(id));
    if !window.title.is_empty() {
        send(WindowEvent::TitleChanged(id, window.title.clone()));
    }
    if !window.app_id.is_empty() {
        send(WindowEvent::AppIdChanged(id, window.app_id.clone()));
    }
    if !window.state.is_empty() {
        send(WindowEvent::StateChanged(id, window.state));
    }
    if window.virtual_desktop != 0 {
        send(WindowEvent::VirtualDesktopChanged(id, window.virtual_desktop));
    }
    if !window.icon.is_empty() {
        send(WindowEvent::IconChanged(id, window.icon.clone()));
    }
}
