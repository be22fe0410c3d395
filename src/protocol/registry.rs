//! Resource Registry
//!
//! Maps opaque per-connection handles to typed protocol objects and tracks,
//! per client, which globals are bound and at which negotiated version.
//!
//! Handle allocation is bounded per client. When a client is at its limit
//! the registry refuses the allocation with [`ProtocolError::NoMemory`] and
//! records nothing; the caller is expected to deliver the fatal notification.

use super::{ClientId, GlobalName, Interface, ProtocolError, ResourceHandle, DISPLAY_OBJECT_ID};
use crate::surface::SurfaceId;
use log::debug;
use std::collections::HashMap;

/// Object a resource refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Seat(GlobalName),
    Compositor,
    Subcompositor,
    Surface(SurfaceId),
    Subsurface(SurfaceId),
    WindowManagement,
}

/// A live resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEntry {
    pub interface: Interface,
    /// Negotiated protocol version
    pub version: u32,
    pub object: ObjectRef,
    /// Global this resource was bound from, if it is a global binding
    pub global: Option<GlobalName>,
}

#[derive(Debug, Default)]
struct ClientResources {
    next_id: u32,
    live: usize,
    bound: HashMap<GlobalName, ResourceHandle>,
}

/// Registry of all live resources across clients
#[derive(Debug)]
pub struct ResourceRegistry {
    max_resources_per_client: usize,
    clients: HashMap<ClientId, ClientResources>,
    resources: HashMap<ResourceHandle, ResourceEntry>,
}

impl ResourceRegistry {
    /// Create an empty registry with a per-client handle limit
    pub fn new(max_resources_per_client: usize) -> Self {
        Self {
            max_resources_per_client,
            clients: HashMap::new(),
            resources: HashMap::new(),
        }
    }

    /// Start tracking a client connection
    pub fn add_client(&mut self, client: ClientId) {
        self.clients.entry(client).or_insert_with(|| ClientResources {
            next_id: DISPLAY_OBJECT_ID + 1,
            ..Default::default()
        });
    }

    pub fn has_client(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    /// Forget a client and return its resources, newest first
    pub fn remove_client(&mut self, client: ClientId) -> Vec<(ResourceHandle, ResourceEntry)> {
        if self.clients.remove(&client).is_none() {
            return Vec::new();
        }

        let mut handles: Vec<ResourceHandle> = self
            .resources
            .keys()
            .filter(|handle| handle.client() == client)
            .copied()
            .collect();
        handles.sort_by(|a, b| b.id().cmp(&a.id()));

        handles
            .into_iter()
            .filter_map(|handle| self.resources.remove(&handle).map(|entry| (handle, entry)))
            .collect()
    }

    /// Allocate a handle for a new object
    pub fn create(
        &mut self,
        client: ClientId,
        interface: Interface,
        version: u32,
        object: ObjectRef,
    ) -> Result<ResourceHandle, ProtocolError> {
        self.allocate(client, interface, version, object, None)
    }

    /// Allocate a handle for a global binding.
    ///
    /// A client holds at most one binding per global.
    pub fn bind_global(
        &mut self,
        client: ClientId,
        global: GlobalName,
        interface: Interface,
        version: u32,
        object: ObjectRef,
    ) -> Result<ResourceHandle, ProtocolError> {
        let resources = self
            .clients
            .get(&client)
            .ok_or(ProtocolError::UnknownClient(client))?;
        if resources.bound.contains_key(&global) {
            return Err(ProtocolError::AlreadyBound { client, global });
        }

        let handle = self.allocate(client, interface, version, object, Some(global))?;
        if let Some(resources) = self.clients.get_mut(&client) {
            resources.bound.insert(global, handle);
        }
        Ok(handle)
    }

    fn allocate(
        &mut self,
        client: ClientId,
        interface: Interface,
        version: u32,
        object: ObjectRef,
        global: Option<GlobalName>,
    ) -> Result<ResourceHandle, ProtocolError> {
        let resources = self
            .clients
            .get_mut(&client)
            .ok_or(ProtocolError::UnknownClient(client))?;

        if resources.live >= self.max_resources_per_client {
            debug!(
                "{} is at its limit of {} resources, refusing {}",
                client,
                self.max_resources_per_client,
                interface.name()
            );
            return Err(ProtocolError::NoMemory(client));
        }

        let handle = ResourceHandle::new(client, resources.next_id);
        resources.next_id += 1;
        resources.live += 1;

        self.resources.insert(
            handle,
            ResourceEntry {
                interface,
                version,
                object,
                global,
            },
        );

        debug!("Created {} v{} as {}", interface.name(), version, handle);
        Ok(handle)
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&ResourceEntry> {
        self.resources.get(&handle)
    }

    /// Look up a resource and check its interface
    pub fn lookup_as(
        &self,
        handle: ResourceHandle,
        expected: Interface,
    ) -> Result<&ResourceEntry, ProtocolError> {
        let entry = self
            .resources
            .get(&handle)
            .ok_or(ProtocolError::InvalidObject(handle))?;
        if entry.interface != expected {
            return Err(ProtocolError::WrongInterface { handle, expected });
        }
        Ok(entry)
    }

    /// Negotiated version of a resource
    pub fn version(&self, handle: ResourceHandle) -> Option<u32> {
        self.resources.get(&handle).map(|entry| entry.version)
    }

    /// Handle a client holds for a global, if bound
    pub fn binding(&self, client: ClientId, global: GlobalName) -> Option<ResourceHandle> {
        self.clients
            .get(&client)
            .and_then(|resources| resources.bound.get(&global))
            .copied()
    }

    /// Destroy a resource. Destroying twice is a no-op.
    pub fn destroy(&mut self, handle: ResourceHandle) -> Option<ResourceEntry> {
        let entry = self.resources.remove(&handle)?;
        if let Some(resources) = self.clients.get_mut(&handle.client()) {
            resources.live = resources.live.saturating_sub(1);
            if let Some(global) = entry.global {
                if resources.bound.get(&global) == Some(&handle) {
                    resources.bound.remove(&global);
                }
            }
        }
        debug!("Destroyed {} ({})", handle, entry.interface.name());
        Some(entry)
    }

    /// All resources bound from a global, across clients
    pub fn bindings_of(&self, global: GlobalName) -> Vec<ResourceHandle> {
        let mut handles: Vec<ResourceHandle> = self
            .resources
            .iter()
            .filter(|(_, entry)| entry.global == Some(global))
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    /// Number of live resources owned by a client
    pub fn live_count(&self, client: ClientId) -> usize {
        self.clients.get(&client).map_or(0, |resources| resources.live)
    }

    /// Total number of live resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
