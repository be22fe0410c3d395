//! # tether
//!
//! Object lifecycle and state synchronization for a Wayland-style windowing
//! protocol.
//!
//! ## Architecture
//!
//! - `protocol`: handles, interfaces, request/event vocabularies and the
//!   resource registry
//! - `seat`: capability broadcaster with version-gated name updates
//! - `surface`: double-buffered surface state and the subsurface commit cascade
//! - `window`: server-side window management global
//! - `model`: client-side window list model and typed event fan-out
//! - `display`: per-turn request dispatcher owning every global
//! - `session`: coarse-locked display shared between connections
//! - `config`: configuration parsing and management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tether::{Session, TetherConfig};
//! use tether::protocol::{Interface, Request};
//!
//! let session = Session::new(&TetherConfig::default());
//! let (client, mut link) = session.connect();
//! let seat = session
//!     .with_display(|display| display.global_of(Interface::Seat))
//!     .unwrap();
//! session.submit(client, Request::Bind { name: seat, version: 3 }).unwrap();
//! while let Ok((target, event)) = link.try_recv() {
//!     println!("{target}: {event:?}");
//! }
//! ```

pub mod config;
pub mod display;
pub mod headless;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod seat;
pub mod session;
pub mod surface;
pub mod window;

// Re-export main types for easy access
pub use config::TetherConfig;
pub use display::Display;
pub use model::{EventFanout, ModelChange, Role, RoleValue, WindowModel};
pub use protocol::{ClientId, Event, ProtocolError, Request, ResourceHandle};
pub use seat::{Capabilities, Capability, Seat};
pub use session::Session;
pub use surface::{SurfaceId, SurfaceTree, SyncMode};
pub use window::{WindowEvent, WindowId, WindowManagement, WindowRequest, WindowState};

/// Version information for tether
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Commit the binary was built from, when built inside a git checkout
pub const GIT_COMMIT: &str = match option_env!("GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};
