//! List Model Synchronizer
//!
//! Client-side mirror of the server's window list. Rows are appended in the
//! order windows are announced and removed when the server says so; reads
//! are addressed by row index and [`Role`]. The model never changes a row on
//! its own. User intents go back to the server as fire-and-forget
//! [`WindowRequest`]s and only become visible once the server echoes the
//! resulting change.

pub mod channel;
pub mod roles;

pub use channel::EventFanout;
pub use roles::{Role, RoleValue};

use crate::window::{WindowEvent, WindowId, WindowRequest, WindowState};
use log::{debug, warn};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Cached properties of one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRow {
    pub id: WindowId,
    pub title: String,
    pub app_id: String,
    pub state: WindowState,
    pub virtual_desktop: u32,
    pub icon: String,
}

impl WindowRow {
    fn new(id: WindowId) -> Self {
        Self {
            id,
            title: String::new(),
            app_id: String::new(),
            state: WindowState::empty(),
            virtual_desktop: 0,
            icon: String::new(),
        }
    }

    pub fn data(&self, role: Role) -> RoleValue {
        match role {
            Role::Display => RoleValue::Text(self.title.clone()),
            Role::Decoration => RoleValue::Text(self.icon.clone()),
            Role::AppId => RoleValue::Text(self.app_id.clone()),
            Role::VirtualDesktop => RoleValue::Number(self.virtual_desktop),
            flag_role => RoleValue::Bool(
                flag_role
                    .state_flag()
                    .is_some_and(|flag| self.state.contains(flag)),
            ),
        }
    }

    pub fn has(&self, flag: WindowState) -> bool {
        self.state.contains(flag)
    }
}

/// Structural or data change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChange {
    RowsInserted { first: usize, last: usize },
    RowsRemoved { first: usize, last: usize },
    DataChanged { row: usize, roles: Vec<Role> },
}

type Listener = Box<dyn Fn(&ModelChange) + Send + Sync>;

/// Observable window list
pub struct WindowModel {
    rows: Vec<WindowRow>,
    requests: mpsc::UnboundedSender<WindowRequest>,
    listeners: Vec<Listener>,
}

impl WindowModel {
    /// Create an empty model sending user intents on `requests`
    pub fn new(requests: mpsc::UnboundedSender<WindowRequest>) -> Self {
        Self {
            rows: Vec::new(),
            requests,
            listeners: Vec::new(),
        }
    }

    /// Add change listener
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&ModelChange) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[WindowRow] {
        &self.rows
    }

    /// Row at a signed index, as views address rows
    pub fn row(&self, row: i32) -> Option<&WindowRow> {
        usize::try_from(row).ok().and_then(|row| self.rows.get(row))
    }

    pub fn row_of(&self, id: WindowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Cell value, `None` outside `[0, row_count)`
    pub fn data(&self, row: i32, role: Role) -> Option<RoleValue> {
        self.row(row).map(|row| row.data(role))
    }

    /// Every role and its stable name
    pub fn role_names(&self) -> BTreeMap<Role, &'static str> {
        Role::ALL.iter().map(|role| (*role, role.name())).collect()
    }

    /// Apply one server event
    pub fn handle_event(&mut self, event: WindowEvent) {
        let id = event.window();
        match event {
            WindowEvent::Created(_) => {
                if self.row_of(id).is_some() {
                    warn!("Ignoring duplicate announcement of {}", id);
                    return;
                }
                self.rows.push(WindowRow::new(id));
                let row = self.rows.len() - 1;
                self.emit(ModelChange::RowsInserted {
                    first: row,
                    last: row,
                });
            }
            WindowEvent::Removed(_) => {
                let Some(row) = self.row_of(id) else {
                    debug!("Ignoring removal of unknown {}", id);
                    return;
                };
                self.rows.remove(row);
                self.emit(ModelChange::RowsRemoved {
                    first: row,
                    last: row,
                });
            }
            WindowEvent::TitleChanged(_, title) => {
                self.update(id, Role::Display, |row| replace(&mut row.title, title));
            }
            WindowEvent::AppIdChanged(_, app_id) => {
                self.update(id, Role::AppId, |row| replace(&mut row.app_id, app_id));
            }
            WindowEvent::IconChanged(_, icon) => {
                self.update(id, Role::Decoration, |row| replace(&mut row.icon, icon));
            }
            WindowEvent::VirtualDesktopChanged(_, desktop) => {
                self.update(id, Role::VirtualDesktop, |row| {
                    replace(&mut row.virtual_desktop, desktop)
                });
            }
            WindowEvent::StateChanged(_, state) => {
                let Some(row) = self.row_of(id) else {
                    debug!("Ignoring state of unknown {}", id);
                    return;
                };
                let old = std::mem::replace(&mut self.rows[row].state, state);
                for role in Role::flipped(old, state) {
                    self.emit(ModelChange::DataChanged {
                        row,
                        roles: vec![role],
                    });
                }
            }
        }
    }

    /// Process events until the channel closes
    pub async fn run(&mut self, mut events: mpsc::Receiver<WindowEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        debug!("Window event stream closed with {} rows", self.rows.len());
    }

    /// Process whatever is already queued, without waiting
    pub fn drain(&mut self, events: &mut mpsc::Receiver<WindowEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn request_activate(&self, row: i32) {
        self.request(row, |window| WindowRequest::Activate(window.id));
    }

    pub fn request_close(&self, row: i32) {
        self.request(row, |window| WindowRequest::Close(window.id));
    }

    pub fn request_move(&self, row: i32) {
        self.request(row, |window| WindowRequest::Move(window.id));
    }

    pub fn request_resize(&self, row: i32) {
        self.request(row, |window| WindowRequest::Resize(window.id));
    }

    pub fn request_virtual_desktop(&self, row: i32, desktop: u32) {
        self.request(row, |window| {
            WindowRequest::SetVirtualDesktop(window.id, desktop)
        });
    }

    pub fn request_toggle_minimized(&self, row: i32) {
        self.request(row, |window| {
            WindowRequest::SetMinimized(window.id, !window.has(WindowState::MINIMIZED))
        });
    }

    pub fn request_toggle_maximized(&self, row: i32) {
        self.request(row, |window| {
            WindowRequest::SetMaximized(window.id, !window.has(WindowState::MAXIMIZED))
        });
    }

    pub fn request_toggle_shaded(&self, row: i32) {
        self.request(row, |window| {
            WindowRequest::SetShaded(window.id, !window.has(WindowState::SHADED))
        });
    }

    fn request<F>(&self, row: i32, build: F)
    where
        F: FnOnce(&WindowRow) -> WindowRequest,
    {
        let Some(window) = self.row(row) else {
            debug!("Ignoring request for row {} of {}", row, self.rows.len());
            return;
        };
        let request = build(window);
        if self.requests.send(request).is_err() {
            debug!("Request channel closed, dropping {:?}", request);
        }
    }

    fn update<F>(&mut self, id: WindowId, role: Role, apply: F)
    where
        F: FnOnce(&mut WindowRow) -> bool,
    {
        let Some(row) = self.row_of(id) else {
            debug!("Ignoring {} change of unknown {}", role, id);
            return;
        };
        if apply(&mut self.rows[row]) {
            self.emit(ModelChange::DataChanged {
                row,
                roles: vec![role],
            });
        }
    }

    fn emit(&self, change: ModelChange) {
        for listener in &self.listeners {
            listener(&change);
        }
    }
}

/// Store `value`, reporting whether it differed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
