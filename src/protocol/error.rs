//! Protocol error type

use super::{ClientId, GlobalName, Interface, ResourceHandle};
use crate::surface::SurfaceId;
use thiserror::Error;

/// Errors raised while handling a request.
///
/// Everything except [`ProtocolError::NoMemory`] is non-fatal: the request is
/// dropped and no state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("no memory to allocate a resource for {0}")]
    NoMemory(ClientId),

    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    #[error("no global named {0:?}")]
    UnknownGlobal(GlobalName),

    #[error("{client} already bound global {global:?}")]
    AlreadyBound { client: ClientId, global: GlobalName },

    #[error("invalid version {requested} for {interface:?}")]
    InvalidVersion { interface: Interface, requested: u32 },

    #[error("invalid object {0}")]
    InvalidObject(ResourceHandle),

    #[error("object {handle} is not a {expected:?}")]
    WrongInterface {
        handle: ResourceHandle,
        expected: Interface,
    },

    #[error("surface {0:?} no longer exists")]
    DeadSurface(SurfaceId),

    #[error("surface {0:?} already has a role")]
    RoleAlreadyAssigned(SurfaceId),

    #[error("bad surface {surface:?}: {reason}")]
    BadSurface {
        surface: SurfaceId,
        reason: &'static str,
    },

    #[error("surface {sibling:?} is not a sibling of {surface:?}")]
    NotASibling {
        surface: SurfaceId,
        sibling: SurfaceId,
    },
}

impl ProtocolError {
    /// Whether the error terminates the client connection
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::NoMemory(_))
    }
}
