//! Protocol Object Model
//!
//! Identifiers, interfaces and the request/event vocabularies exchanged
//! between clients and the [`Display`](crate::display::Display).
//!
//! Wire framing is not handled here. A [`Request`] is an already decoded,
//! typed message addressed to one resource; an [`Event`] is queued for one
//! resource of one client and flushed by whoever owns the transport.
//!
//! Every request kind is a variant of a single tagged enum so that dispatch
//! stays a `match` per object kind, while the bind/unbind lifecycle is shared
//! through the [`ResourceRegistry`].

pub mod error;
pub mod registry;

pub use error::ProtocolError;
pub use registry::{ObjectRef, ResourceEntry, ResourceRegistry};

use crate::seat::SeatEvent;
use crate::surface::{BufferRef, Rect, Region};
use crate::window::{WindowEvent, WindowRequest};
use std::fmt;

/// Object id reserved for the display object of every connection
pub const DISPLAY_OBJECT_ID: u32 = 1;

/// Identifies one client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Opaque per-connection handle to a protocol object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    client: ClientId,
    id: u32,
}

impl ResourceHandle {
    pub(crate) fn new(client: ClientId, id: u32) -> Self {
        Self { client, id }
    }

    /// The display object of a connection, target of fatal errors
    pub fn display(client: ClientId) -> Self {
        Self::new(client, DISPLAY_OBJECT_ID)
    }

    /// Owning client
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Object id within the owning connection
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.client, self.id)
    }
}

/// Numeric name under which a global is advertised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalName(pub u32);

/// Protocol interfaces known to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Seat,
    Compositor,
    Subcompositor,
    Surface,
    Subsurface,
    WindowManagement,
}

impl Interface {
    /// Interface name as advertised to clients
    pub fn name(&self) -> &'static str {
        match self {
            Interface::Seat => "wl_seat",
            Interface::Compositor => "wl_compositor",
            Interface::Subcompositor => "wl_subcompositor",
            Interface::Surface => "wl_surface",
            Interface::Subsurface => "wl_subsurface",
            Interface::WindowManagement => "window_management",
        }
    }
}

/// Advertised global, as listed to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalInfo {
    pub name: GlobalName,
    pub interface: Interface,
    pub version: u32,
}

/// Inbound requests, one variant per object kind
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Bind a global, creating a new resource
    Bind { name: GlobalName, version: u32 },
    Seat {
        seat: ResourceHandle,
        request: SeatRequest,
    },
    Compositor {
        compositor: ResourceHandle,
        request: CompositorRequest,
    },
    Surface {
        surface: ResourceHandle,
        request: SurfaceRequest,
    },
    Subcompositor {
        subcompositor: ResourceHandle,
        request: SubcompositorRequest,
    },
    Subsurface {
        subsurface: ResourceHandle,
        request: SubsurfaceRequest,
    },
    WindowManagement {
        manager: ResourceHandle,
        request: WindowRequest,
    },
}

impl Request {
    /// Resource the request is addressed to, if any
    pub fn target(&self) -> Option<ResourceHandle> {
        match self {
            Request::Bind { .. } => None,
            Request::Seat { seat, .. } => Some(*seat),
            Request::Compositor { compositor, .. } => Some(*compositor),
            Request::Surface { surface, .. } => Some(*surface),
            Request::Subcompositor { subcompositor, .. } => Some(*subcompositor),
            Request::Subsurface { subsurface, .. } => Some(*subsurface),
            Request::WindowManagement { manager, .. } => Some(*manager),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatRequest {
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorRequest {
    CreateSurface,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceRequest {
    /// Attach a buffer, or detach with `None`
    Attach(Option<BufferRef>),
    Damage(Rect),
    SetBufferScale(i32),
    SetOpaqueRegion(Region),
    /// `None` resets the input region to infinite
    SetInputRegion(Option<Region>),
    Commit,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubcompositorRequest {
    GetSubsurface {
        surface: ResourceHandle,
        parent: ResourceHandle,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsurfaceRequest {
    SetPosition { x: i32, y: i32 },
    /// Sibling is given as its surface resource
    PlaceAbove(ResourceHandle),
    PlaceBelow(ResourceHandle),
    SetSync,
    SetDesync,
    Destroy,
}

/// Outbound events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Fatal: the server could not allocate a resource for the client
    NoMemory,
    /// A global the client may have bound went away
    GlobalRemove(GlobalName),
    Seat(SeatEvent),
    Window(WindowEvent),
}

/// Destination for events produced while handling a request
pub trait EventSink {
    fn send(&mut self, target: ResourceHandle, event: Event);
}

impl EventSink for Vec<(ResourceHandle, Event)> {
    fn send(&mut self, target: ResourceHandle, event: Event) {
        self.push((target, event));
    }
}
