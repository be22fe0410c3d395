//! Data roles exposed by the window model

use crate::window::WindowState;
use std::fmt;

/// A column of the window model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Window title
    Display,
    /// Icon name
    Decoration,
    AppId,
    IsActive,
    IsFullscreenable,
    IsFullscreen,
    IsMaximizable,
    IsMaximized,
    IsMinimizable,
    IsMinimized,
    IsKeepAbove,
    IsKeepBelow,
    VirtualDesktop,
    IsOnAllDesktops,
    IsDemandingAttention,
    SkipTaskbar,
    IsShadeable,
    IsShaded,
    IsMovable,
    IsResizable,
}

impl Role {
    pub const ALL: [Role; 20] = [
        Role::Display,
        Role::Decoration,
        Role::AppId,
        Role::IsActive,
        Role::IsFullscreenable,
        Role::IsFullscreen,
        Role::IsMaximizable,
        Role::IsMaximized,
        Role::IsMinimizable,
        Role::IsMinimized,
        Role::IsKeepAbove,
        Role::IsKeepBelow,
        Role::VirtualDesktop,
        Role::IsOnAllDesktops,
        Role::IsDemandingAttention,
        Role::SkipTaskbar,
        Role::IsShadeable,
        Role::IsShaded,
        Role::IsMovable,
        Role::IsResizable,
    ];

    /// Stable name exposed to views
    pub fn name(&self) -> &'static str {
        match self {
            Role::Display => "DisplayRole",
            Role::Decoration => "DecorationRole",
            Role::AppId => "AppId",
            Role::IsActive => "IsActive",
            Role::IsFullscreenable => "IsFullscreenable",
            Role::IsFullscreen => "IsFullscreen",
            Role::IsMaximizable => "IsMaximizable",
            Role::IsMaximized => "IsMaximized",
            Role::IsMinimizable => "IsMinimizable",
            Role::IsMinimized => "IsMinimized",
            Role::IsKeepAbove => "IsKeepAbove",
            Role::IsKeepBelow => "IsKeepBelow",
            Role::VirtualDesktop => "VirtualDesktop",
            Role::IsOnAllDesktops => "IsOnAllDesktops",
            Role::IsDemandingAttention => "IsDemandingAttention",
            Role::SkipTaskbar => "SkipTaskbar",
            Role::IsShadeable => "IsShadeable",
            Role::IsShaded => "IsShaded",
            Role::IsMovable => "IsMovable",
            Role::IsResizable => "IsResizable",
        }
    }

    /// State flag backing a boolean role
    pub fn state_flag(&self) -> Option<WindowState> {
        let flag = match self {
            Role::IsActive => WindowState::ACTIVE,
            Role::IsFullscreenable => WindowState::FULLSCREENABLE,
            Role::IsFullscreen => WindowState::FULLSCREEN,
            Role::IsMaximizable => WindowState::MAXIMIZABLE,
            Role::IsMaximized => WindowState::MAXIMIZED,
            Role::IsMinimizable => WindowState::MINIMIZABLE,
            Role::IsMinimized => WindowState::MINIMIZED,
            Role::IsKeepAbove => WindowState::KEEP_ABOVE,
            Role::IsKeepBelow => WindowState::KEEP_BELOW,
            Role::IsOnAllDesktops => WindowState::ON_ALL_DESKTOPS,
            Role::IsDemandingAttention => WindowState::DEMANDS_ATTENTION,
            Role::SkipTaskbar => WindowState::SKIP_TASKBAR,
            Role::IsShadeable => WindowState::SHADEABLE,
            Role::IsShaded => WindowState::SHADED,
            Role::IsMovable => WindowState::MOVABLE,
            Role::IsResizable => WindowState::RESIZABLE,
            Role::Display | Role::Decoration | Role::AppId | Role::VirtualDesktop => return None,
        };
        Some(flag)
    }

    /// Boolean roles whose flag differs between two masks, in role order
    pub fn flipped(old: WindowState, new: WindowState) -> Vec<Role> {
        let changed = old ^ new;
        Role::ALL
            .iter()
            .copied()
            .filter(|role| role.state_flag().is_some_and(|flag| changed.contains(flag)))
            .collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleValue {
    Text(String),
    Bool(bool),
    Number(u32),
}

impl RoleValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RoleValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RoleValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u32> {
        match self {
            RoleValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}
