//! Display dispatcher
//!
//! The [`Display`] owns the resource registry and every global. Each call to
//! [`Display::dispatch`] handles one request to completion, so every state
//! change and the notifications it causes happen within a single turn.
//!
//! Non-fatal protocol violations are returned to the caller and leave no
//! trace in the state. Allocation failure is fatal: the client is sent
//! [`Event::NoMemory`] on its display object and nothing is recorded.

use crate::config::TetherConfig;
use crate::protocol::{
    ClientId, CompositorRequest, Event, EventSink, GlobalInfo, GlobalName, Interface, ObjectRef,
    ProtocolError, Request, ResourceHandle, ResourceRegistry, SeatRequest, SubcompositorRequest,
    SubsurfaceRequest, SurfaceRequest,
};
use crate::seat::{Capability, Seat};
use crate::surface::{SurfaceDelta, SurfaceId, SurfaceTree, SyncMode};
use crate::window::{WindowManagement, WindowRequested};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};

/// Per-client outbound event queues
#[derive(Debug, Default)]
struct Outbox {
    queues: BTreeMap<ClientId, Vec<(ResourceHandle, Event)>>,
}

impl EventSink for Outbox {
    fn send(&mut self, target: ResourceHandle, event: Event) {
        match self.queues.get_mut(&target.client()) {
            Some(queue) => queue.push((target, event)),
            None => debug!("Dropping event for disconnected {}", target.client()),
        }
    }
}

/// Server side of every connection
pub struct Display {
    registry: ResourceRegistry,
    globals: BTreeMap<GlobalName, GlobalInfo>,
    seats: HashMap<GlobalName, Seat>,
    seat_version: u32,
    surfaces: SurfaceTree,
    windows: WindowManagement,
    outbox: Outbox,
    /// Surfaces whose applied state changed, in application order
    applied: Vec<SurfaceId>,
    next_client: u32,
    next_global: u32,
}

impl Display {
    /// Create a display advertising the configured globals
    pub fn new(config: &TetherConfig) -> Self {
        let mut display = Self {
            registry: ResourceRegistry::new(config.registry.max_resources_per_client),
            globals: BTreeMap::new(),
            seats: HashMap::new(),
            seat_version: config.seat.version,
            surfaces: SurfaceTree::new(),
            windows: WindowManagement::new(),
            outbox: Outbox::default(),
            applied: Vec::new(),
            next_client: 1,
            next_global: 1,
        };

        display.add_global(Interface::Compositor, config.compositor.compositor_version);
        display.add_global(
            Interface::Subcompositor,
            config.compositor.subcompositor_version,
        );
        display.add_global(Interface::WindowManagement, config.window_management.version);

        let seat = display.create_seat(&config.seat.name);
        for (capability, present) in [
            (Capability::Pointer, config.seat.pointer),
            (Capability::Keyboard, config.seat.keyboard),
            (Capability::Touch, config.seat.touch),
        ] {
            display.set_seat_capability(seat, capability, present);
        }

        display
    }

    fn add_global(&mut self, interface: Interface, version: u32) -> GlobalName {
        let name = GlobalName(self.next_global);
        self.next_global += 1;
        self.globals.insert(
            name,
            GlobalInfo {
                name,
                interface,
                version,
            },
        );
        debug!("Advertising {} v{} as {:?}", interface.name(), version, name);
        name
    }

    /// Advertised globals, ordered by name
    pub fn globals(&self) -> Vec<GlobalInfo> {
        self.globals.values().cloned().collect()
    }

    /// Name of the first global implementing `interface`
    pub fn global_of(&self, interface: Interface) -> Option<GlobalName> {
        self.globals
            .values()
            .find(|global| global.interface == interface)
            .map(|global| global.name)
    }

    /// Accept a new connection
    pub fn connect(&mut self) -> ClientId {
        let client = ClientId(self.next_client);
        self.next_client += 1;
        self.registry.add_client(client);
        self.outbox.queues.insert(client, Vec::new());
        info!("{} connected", client);
        client
    }

    pub fn is_connected(&self, client: ClientId) -> bool {
        self.registry.has_client(client)
    }

    /// Connected clients in connection order
    pub fn clients(&self) -> Vec<ClientId> {
        self.outbox.queues.keys().copied().collect()
    }

    /// Tear down a connection, destroying every resource it owns
    pub fn disconnect(&mut self, client: ClientId) {
        let resources = self.registry.remove_client(client);
        let count = resources.len();
        for (handle, entry) in resources {
            match entry.object {
                ObjectRef::Seat(global) => {
                    if let Some(seat) = self.seats.get_mut(&global) {
                        seat.unbind(handle);
                    }
                }
                ObjectRef::Surface(surface) => {
                    self.surfaces.destroy(surface);
                }
                ObjectRef::Subsurface(surface) => {
                    self.surfaces.remove_subsurface_role(surface);
                }
                ObjectRef::WindowManagement => {
                    self.windows.unbind(handle);
                }
                ObjectRef::Compositor | ObjectRef::Subcompositor => {}
            }
        }
        self.outbox.queues.remove(&client);
        info!("{} disconnected, {} resources released", client, count);
    }

    /// Handle one request from `client`.
    ///
    /// Returns the handle of the resource the request created, if any.
    pub fn dispatch(
        &mut self,
        client: ClientId,
        request: Request,
    ) -> Result<Option<ResourceHandle>, ProtocolError> {
        let span = tracing::debug_span!("dispatch", client = client.0);
        let _enter = span.enter();

        if !self.registry.has_client(client) {
            return Err(ProtocolError::UnknownClient(client));
        }

        let result = match request.target() {
            Some(target) if target.client() != client => Err(ProtocolError::InvalidObject(target)),
            _ => self.handle(client, request),
        };

        if let Err(err) = &result {
            if err.is_fatal() {
                warn!("Fatal error for {}: {}", client, err);
                self.outbox
                    .send(ResourceHandle::display(client), Event::NoMemory);
            } else {
                debug!("Protocol violation by {}: {}", client, err);
            }
        }
        result
    }

    fn handle(
        &mut self,
        client: ClientId,
        request: Request,
    ) -> Result<Option<ResourceHandle>, ProtocolError> {
        match request {
            Request::Bind { name, version } => self.bind(client, name, version).map(Some),
            Request::Seat { seat, request } => {
                self.handle_seat(seat, request)?;
                Ok(None)
            }
            Request::Compositor {
                compositor,
                request,
            } => self.handle_compositor(client, compositor, request).map(Some),
            Request::Surface { surface, request } => {
                self.handle_surface(surface, request)?;
                Ok(None)
            }
            Request::Subcompositor {
                subcompositor,
                request,
            } => self
                .handle_subcompositor(client, subcompositor, request)
                .map(Some),
            Request::Subsurface {
                subsurface,
                request,
            } => {
                self.handle_subsurface(client, subsurface, request)?;
                Ok(None)
            }
            Request::WindowManagement { manager, request } => {
                self.registry.lookup_as(manager, Interface::WindowManagement)?;
                self.windows.handle_request(client, request);
                Ok(None)
            }
        }
    }

    fn bind(
        &mut self,
        client: ClientId,
        name: GlobalName,
        requested: u32,
    ) -> Result<ResourceHandle, ProtocolError> {
        let global = self
            .globals
            .get(&name)
            .ok_or(ProtocolError::UnknownGlobal(name))?;
        if requested == 0 {
            return Err(ProtocolError::InvalidVersion {
                interface: global.interface,
                requested,
            });
        }

        let interface = global.interface;
        let version = global.version.min(requested);
        let object = match interface {
            Interface::Seat => ObjectRef::Seat(name),
            Interface::Compositor => ObjectRef::Compositor,
            Interface::Subcompositor => ObjectRef::Subcompositor,
            Interface::WindowManagement => ObjectRef::WindowManagement,
            Interface::Surface | Interface::Subsurface => {
                return Err(ProtocolError::UnknownGlobal(name))
            }
        };

        let handle = self
            .registry
            .bind_global(client, name, interface, version, object)?;

        match interface {
            Interface::Seat => {
                if let Some(seat) = self.seats.get_mut(&name) {
                    seat.bind(handle, version, &mut self.outbox);
                }
            }
            Interface::WindowManagement => self.windows.bind(handle, &mut self.outbox),
            _ => {}
        }

        debug!(
            "{} bound {} at v{} (requested v{})",
            client,
            interface.name(),
            version,
            requested
        );
        Ok(handle)
    }

    fn handle_seat(&mut self, seat: ResourceHandle, request: SeatRequest) -> Result<(), ProtocolError> {
        let entry = *self.registry.lookup_as(seat, Interface::Seat)?;
        match request {
            SeatRequest::Release => {
                if let ObjectRef::Seat(global) = entry.object {
                    if let Some(state) = self.seats.get_mut(&global) {
                        state.unbind(seat);
                    }
                }
                self.registry.destroy(seat);
            }
        }
        Ok(())
    }

    fn handle_compositor(
        &mut self,
        client: ClientId,
        compositor: ResourceHandle,
        request: CompositorRequest,
    ) -> Result<ResourceHandle, ProtocolError> {
        let version = self
            .registry
            .lookup_as(compositor, Interface::Compositor)?
            .version;
        match request {
            CompositorRequest::CreateSurface => {
                let surface = self.surfaces.create();
                self.registry
                    .create(client, Interface::Surface, version, ObjectRef::Surface(surface))
                    .map_err(|err| {
                        self.surfaces.destroy(surface);
                        err
                    })
            }
        }
    }

    fn handle_surface(
        &mut self,
        handle: ResourceHandle,
        request: SurfaceRequest,
    ) -> Result<(), ProtocolError> {
        let surface = self.resolve_surface(handle)?;
        let delta = match request {
            SurfaceRequest::Attach(buffer) => SurfaceDelta::Attach(buffer),
            SurfaceRequest::Damage(rect) => SurfaceDelta::Damage(rect),
            SurfaceRequest::SetBufferScale(scale) => SurfaceDelta::SetBufferScale(scale),
            SurfaceRequest::SetOpaqueRegion(region) => SurfaceDelta::SetOpaqueRegion(region),
            SurfaceRequest::SetInputRegion(region) => SurfaceDelta::SetInputRegion(region),
            SurfaceRequest::Commit => {
                let applied = self.surfaces.commit(surface)?;
                self.applied.extend(applied);
                return Ok(());
            }
            SurfaceRequest::Destroy => {
                self.surfaces.destroy(surface);
                self.registry.destroy(handle);
                return Ok(());
            }
        };
        self.surfaces.mutate_pending(surface, delta)
    }

    fn handle_subcompositor(
        &mut self,
        client: ClientId,
        subcompositor: ResourceHandle,
        request: SubcompositorRequest,
    ) -> Result<ResourceHandle, ProtocolError> {
        let version = self
            .registry
            .lookup_as(subcompositor, Interface::Subcompositor)?
            .version;
        match request {
            SubcompositorRequest::GetSubsurface { surface, parent } => {
                let surface_id = self.resolve_own_surface(client, surface)?;
                let parent_id = self.resolve_own_surface(client, parent)?;
                self.surfaces.make_subsurface(surface_id, parent_id)?;
                self.registry
                    .create(
                        client,
                        Interface::Subsurface,
                        version,
                        ObjectRef::Subsurface(surface_id),
                    )
                    .map_err(|err| {
                        self.surfaces.remove_subsurface_role(surface_id);
                        err
                    })
            }
        }
    }

    fn handle_subsurface(
        &mut self,
        client: ClientId,
        subsurface: ResourceHandle,
        request: SubsurfaceRequest,
    ) -> Result<(), ProtocolError> {
        let entry = *self.registry.lookup_as(subsurface, Interface::Subsurface)?;
        let ObjectRef::Subsurface(surface) = entry.object else {
            return Err(ProtocolError::InvalidObject(subsurface));
        };

        match request {
            SubsurfaceRequest::SetPosition { x, y } => self
                .surfaces
                .mutate_pending(surface, SurfaceDelta::SetPosition { x, y }),
            SubsurfaceRequest::PlaceAbove(sibling) => {
                let sibling = self.resolve_own_surface(client, sibling)?;
                self.surfaces.place_above(surface, sibling)
            }
            SubsurfaceRequest::PlaceBelow(sibling) => {
                let sibling = self.resolve_own_surface(client, sibling)?;
                self.surfaces.place_below(surface, sibling)
            }
            SubsurfaceRequest::SetSync => self.set_sync_mode(surface, SyncMode::Synchronized),
            SubsurfaceRequest::SetDesync => self.set_sync_mode(surface, SyncMode::Desynchronized),
            SubsurfaceRequest::Destroy => {
                self.surfaces.remove_subsurface_role(surface);
                self.registry.destroy(subsurface);
                Ok(())
            }
        }
    }

    fn set_sync_mode(&mut self, surface: SurfaceId, mode: SyncMode) -> Result<(), ProtocolError> {
        let applied = self.surfaces.set_sync_mode(surface, mode)?;
        self.applied.extend(applied);
        Ok(())
    }

    fn resolve_surface(&self, handle: ResourceHandle) -> Result<SurfaceId, ProtocolError> {
        match self.registry.lookup_as(handle, Interface::Surface)?.object {
            ObjectRef::Surface(surface) => Ok(surface),
            _ => Err(ProtocolError::InvalidObject(handle)),
        }
    }

    fn resolve_own_surface(
        &self,
        client: ClientId,
        handle: ResourceHandle,
    ) -> Result<SurfaceId, ProtocolError> {
        if handle.client() != client {
            return Err(ProtocolError::InvalidObject(handle));
        }
        self.resolve_surface(handle)
    }

    /// Create a new seat global with no capabilities
    pub fn create_seat(&mut self, name: &str) -> GlobalName {
        let global = self.add_global(Interface::Seat, self.seat_version);
        self.seats.insert(global, Seat::new(name));
        global
    }

    pub fn seat(&self, global: GlobalName) -> Option<&Seat> {
        self.seats.get(&global)
    }

    /// Change one capability of a seat. Returns true if it changed.
    pub fn set_seat_capability(
        &mut self,
        global: GlobalName,
        capability: Capability,
        present: bool,
    ) -> bool {
        match self.seats.get_mut(&global) {
            Some(seat) => seat.set_capability(capability, present, &mut self.outbox),
            None => false,
        }
    }

    /// Rename a seat. Returns true if the name changed.
    pub fn set_seat_name(&mut self, global: GlobalName, name: &str) -> bool {
        match self.seats.get_mut(&global) {
            Some(seat) => seat.set_name(name, &mut self.outbox),
            None => false,
        }
    }

    /// Withdraw a seat global.
    ///
    /// Every client is told the global is gone, and bindings to it are
    /// destroyed.
    pub fn remove_global(&mut self, name: GlobalName) -> bool {
        let Some(global) = self.globals.get(&name) else {
            return false;
        };
        if global.interface != Interface::Seat {
            warn!("Refusing to remove singleton global {}", global.interface.name());
            return false;
        }
        self.globals.remove(&name);
        self.seats.remove(&name);

        for handle in self.registry.bindings_of(name) {
            self.registry.destroy(handle);
        }
        for client in self.clients() {
            self.outbox
                .send(ResourceHandle::display(client), Event::GlobalRemove(name));
        }
        info!("Removed seat global {:?}", name);
        true
    }

    /// Run `f` against the window management global with this display's
    /// event queues
    pub fn with_windows<R>(
        &mut self,
        f: impl FnOnce(&mut WindowManagement, &mut dyn EventSink) -> R,
    ) -> R {
        f(&mut self.windows, &mut self.outbox)
    }

    pub fn windows(&self) -> &WindowManagement {
        &self.windows
    }

    /// Drain client requests queued for the compositor
    pub fn take_window_requests(&mut self) -> Vec<WindowRequested> {
        self.windows.take_requests()
    }

    /// Drain events queued for `client`
    pub fn take_events(&mut self, client: ClientId) -> Vec<(ResourceHandle, Event)> {
        self.outbox
            .queues
            .get_mut(&client)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Drain events for every client that has any
    pub fn take_all_events(&mut self) -> Vec<(ClientId, Vec<(ResourceHandle, Event)>)> {
        self.outbox
            .queues
            .iter_mut()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(client, queue)| (*client, std::mem::take(queue)))
            .collect()
    }

    /// Drain the list of surfaces whose applied state changed
    pub fn take_applied(&mut self) -> Vec<SurfaceId> {
        std::mem::take(&mut self.applied)
    }

    pub fn surfaces(&self) -> &SurfaceTree {
        &self.surfaces
    }

    /// Surface behind a surface resource
    pub fn surface_of(&self, handle: ResourceHandle) -> Option<SurfaceId> {
        self.resolve_surface(handle).ok()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }
}
