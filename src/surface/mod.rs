//! Surface State Buffer
//!
//! Every surface carries three copies of its state:
//! - pending: mutations since the last commit
//! - cached: committed by a synchronized subsurface, waiting for its parent
//! - applied: what the compositor presents
//!
//! Commit of a root or desynchronized node applies immediately and then
//! cascades into synchronized children depth-first in stacking order, so a
//! whole synchronized subtree becomes visible in a single turn.

pub mod state;
pub mod tree;

pub use state::{BufferRef, PendingState, Placement, Rect, Region, SurfaceDelta, SurfaceState};
pub use tree::{SurfaceId, SurfaceNode, SurfaceRole, SurfaceTree, SyncMode};

#[cfg(test)]
mod tests;
