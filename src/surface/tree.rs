//! Surface hierarchy and commit cascade
//!
//! Nodes live in a slab arena and are addressed by generational
//! [`SurfaceId`]s. Parent and child links are plain ids: a link to a
//! destroyed node simply stops resolving, so nothing dangles and children
//! never keep their parent alive.

use super::state::{PendingState, Placement, SurfaceDelta, SurfaceState};
use crate::protocol::ProtocolError;
use log::debug;
use slab::Slab;

/// Generational handle to a surface node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId {
    index: usize,
    generation: u32,
}

/// Commit behavior of a subsurface relative to its parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Commits are cached and applied when the parent's state is applied
    #[default]
    Synchronized,
    /// Commits are applied immediately
    Desynchronized,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SurfaceRole {
    #[default]
    None,
    Subsurface,
}

/// A node of the surface hierarchy
#[derive(Debug, Clone, Default)]
pub struct SurfaceNode {
    role: SurfaceRole,
    applied: SurfaceState,
    pending: PendingState,
    /// Committed by a synchronized child, waiting for the parent
    cached: Option<PendingState>,
    parent: Option<SurfaceId>,
    /// Bottom to top
    children: Vec<SurfaceId>,
    sync_mode: SyncMode,
}

impl SurfaceNode {
    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    pub fn applied(&self) -> &SurfaceState {
        &self.applied
    }

    pub fn pending(&self) -> &PendingState {
        &self.pending
    }

    pub fn cached(&self) -> Option<&PendingState> {
        self.cached.as_ref()
    }

    pub fn children(&self) -> &[SurfaceId] {
        &self.children
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }
}

struct Slot {
    generation: u32,
    node: SurfaceNode,
}

/// Arena of surface nodes
pub struct SurfaceTree {
    slots: Slab<Slot>,
    next_generation: u32,
}

impl Default for SurfaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceTree {
    pub fn new() -> Self {
        Self {
            slots: Slab::new(),
            next_generation: 0,
        }
    }

    /// Create a root surface with empty state
    pub fn create(&mut self) -> SurfaceId {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let index = self.slots.insert(Slot {
            generation,
            node: SurfaceNode::default(),
        });
        SurfaceId { index, generation }
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: SurfaceId) -> Option<&SurfaceNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &slot.node)
    }

    fn get_mut(&mut self, id: SurfaceId) -> Option<&mut SurfaceNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &mut slot.node)
    }

    fn node_mut(&mut self, id: SurfaceId) -> Result<&mut SurfaceNode, ProtocolError> {
        self.get_mut(id).ok_or(ProtocolError::DeadSurface(id))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Parent of a node, if both are still alive
    pub fn parent(&self, id: SurfaceId) -> Option<SurfaceId> {
        self.get(id)
            .and_then(|node| node.parent)
            .filter(|parent| self.contains(*parent))
    }

    /// Whether `ancestor` is found walking up from `id`
    pub fn is_ancestor(&self, ancestor: SurfaceId, id: SurfaceId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Merge a delta into pending state
    pub fn mutate_pending(&mut self, id: SurfaceId, delta: SurfaceDelta) -> Result<(), ProtocolError> {
        self.node_mut(id)?.pending.apply_delta(delta);
        Ok(())
    }

    /// Cache a request to stack `id` directly above `sibling`
    pub fn place_above(&mut self, id: SurfaceId, sibling: SurfaceId) -> Result<(), ProtocolError> {
        self.check_sibling(id, sibling)?;
        self.node_mut(id)?.pending.placement = Some(Placement::Above(sibling));
        Ok(())
    }

    /// Cache a request to stack `id` directly below `sibling`
    pub fn place_below(&mut self, id: SurfaceId, sibling: SurfaceId) -> Result<(), ProtocolError> {
        self.check_sibling(id, sibling)?;
        self.node_mut(id)?.pending.placement = Some(Placement::Below(sibling));
        Ok(())
    }

    fn check_sibling(&self, id: SurfaceId, sibling: SurfaceId) -> Result<(), ProtocolError> {
        if !self.contains(id) {
            return Err(ProtocolError::DeadSurface(id));
        }
        let parent = self.parent(id);
        if sibling == id || parent.is_none() || self.parent(sibling) != parent {
            return Err(ProtocolError::NotASibling { surface: id, sibling });
        }
        Ok(())
    }

    /// Give `id` the subsurface role under `parent`, stacked on top
    pub fn make_subsurface(&mut self, id: SurfaceId, parent: SurfaceId) -> Result<(), ProtocolError> {
        let node = self.get(id).ok_or(ProtocolError::DeadSurface(id))?;
        if !self.contains(parent) {
            return Err(ProtocolError::DeadSurface(parent));
        }
        if node.role != SurfaceRole::None {
            return Err(ProtocolError::RoleAlreadyAssigned(id));
        }
        if id == parent {
            return Err(ProtocolError::BadSurface {
                surface: id,
                reason: "a surface cannot be its own parent",
            });
        }
        if self.is_ancestor(id, parent) {
            return Err(ProtocolError::BadSurface {
                surface: id,
                reason: "parent is a descendant of the surface",
            });
        }

        let node = self.node_mut(id)?;
        node.role = SurfaceRole::Subsurface;
        node.parent = Some(parent);
        node.sync_mode = SyncMode::Synchronized;
        self.node_mut(parent)?.children.push(id);

        debug!("Surface {:?} is now a subsurface of {:?}", id, parent);
        Ok(())
    }

    /// Drop the subsurface role, detaching from the parent.
    ///
    /// The surface keeps its applied state; cached state is discarded.
    pub fn remove_subsurface_role(&mut self, id: SurfaceId) -> bool {
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        if node.role != SurfaceRole::Subsurface {
            return false;
        }
        node.role = SurfaceRole::None;
        node.cached = None;
        node.pending.placement = None;
        node.sync_mode = SyncMode::Synchronized;
        let parent = node.parent.take();

        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }
        true
    }

    /// Switch sync mode. Leaving synchronized mode flushes cached state.
    ///
    /// Returns the nodes whose applied state changed, in application order.
    pub fn set_sync_mode(&mut self, id: SurfaceId, mode: SyncMode) -> Result<Vec<SurfaceId>, ProtocolError> {
        let node = self.node_mut(id)?;
        let previous = node.sync_mode;
        node.sync_mode = mode;

        let mut applied = Vec::new();
        if previous == SyncMode::Synchronized && mode == SyncMode::Desynchronized {
            if let Some(cached) = node.cached.take() {
                debug!("Surface {:?} desynchronized, flushing cached state", id);
                self.apply(id, cached, &mut applied);
            }
        }
        Ok(applied)
    }

    /// Commit pending state.
    ///
    /// A synchronized node with a live parent only caches its state. Any
    /// other node applies immediately, then cascades into its synchronized
    /// children depth-first in stacking order. Returns the nodes whose
    /// applied state changed, in application order.
    pub fn commit(&mut self, id: SurfaceId) -> Result<Vec<SurfaceId>, ProtocolError> {
        let synchronized = self.parent(id).is_some();
        let node = self.node_mut(id)?;
        let pending = std::mem::take(&mut node.pending);

        let mut applied = Vec::new();
        if synchronized && node.sync_mode == SyncMode::Synchronized {
            node.cached.get_or_insert_with(PendingState::default).merge(pending);
            debug!("Surface {:?} committed to cache (synchronized)", id);
            return Ok(applied);
        }

        let state = match node.cached.take() {
            Some(mut cached) => {
                cached.merge(pending);
                cached
            }
            None => pending,
        };
        self.apply(id, state, &mut applied);
        Ok(applied)
    }

    fn apply(&mut self, id: SurfaceId, mut state: PendingState, applied: &mut Vec<SurfaceId>) {
        let placement = state.placement.take();
        let Some(node) = self.get_mut(id) else {
            return;
        };
        node.applied.apply(&state);
        applied.push(id);
        debug!("Surface {:?} applied (serial {})", id, node.applied.serial);

        if let Some(placement) = placement {
            self.restack(id, placement);
        }
        self.cascade(id, applied);
    }

    fn cascade(&mut self, id: SurfaceId, applied: &mut Vec<SurfaceId>) {
        let children = match self.get(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            let Some(node) = self.get_mut(child) else {
                continue;
            };
            if node.sync_mode != SyncMode::Synchronized {
                continue;
            }
            match node.cached.take() {
                Some(cached) => self.apply(child, cached, applied),
                None => self.cascade(child, applied),
            }
        }
    }

    fn restack(&mut self, id: SurfaceId, placement: Placement) {
        let sibling = placement.sibling();
        let Some(parent) = self.parent(id) else {
            return;
        };
        if self.parent(sibling) != Some(parent) || sibling == id {
            debug!("Dropping stale placement of {:?} against {:?}", id, sibling);
            return;
        }
        let Some(parent) = self.get_mut(parent) else {
            return;
        };

        parent.children.retain(|child| *child != id);
        let Some(position) = parent.children.iter().position(|child| *child == sibling) else {
            return;
        };
        let index = match placement {
            Placement::Above(_) => position + 1,
            Placement::Below(_) => position,
        };
        parent.children.insert(index, id);
    }

    /// Destroy a node, discarding pending and cached state.
    ///
    /// Children are detached, not destroyed. Returns the orphaned children.
    pub fn destroy(&mut self, id: SurfaceId) -> Vec<SurfaceId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let slot = self.slots.remove(id.index);

        if let Some(parent) = slot.node.parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }

        let mut orphans = Vec::new();
        for child in slot.node.children {
            if let Some(node) = self.get_mut(child) {
                node.parent = None;
                node.cached = None;
                node.pending.placement = None;
                orphans.push(child);
            }
        }

        debug!("Surface {:?} destroyed, {} children orphaned", id, orphans.len());
        orphans
    }
}
