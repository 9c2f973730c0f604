//! Client Flags
//!
//! Bitfield flags and lifecycle state for toplevel window records.

use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

bitflags! {
    /// Aspects of a record that are out of sync with the native window and
    /// waiting for a deferred reconciliation pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PendingFlags: u32 {
        /// Record is queued on the idle queue
        const UPDATE_PENDING      = 1 << 0;
        /// Position must be pushed even if the size is unchanged
        const MOVE                = 1 << 1;
        /// Requested size (or the content's natural size) changed
        const GEOMETRY            = 1 << 2;
        /// Min/max, grid or resizable information changed
        const SIZE_HINTS          = 1 << 3;
        /// Decoration style may be stale; frame may need recreating
        const STYLE               = 1 << 4;
        /// Native frame is being created; geometry is recorded, not applied
        const CREATE_PENDING      = 1 << 5;
        /// A native call issued by the reconciler is in progress; notifications
        /// arriving now echo our own request
        const SYNC_PENDING        = 1 << 6;
        /// A reconciliation pass for this record is running
        const RECONCILING         = 1 << 7;
    }
}

impl PendingFlags {
    /// Bits a reconciliation pass consumes
    pub fn reconcilable() -> Self {
        Self::MOVE | Self::GEOMETRY | Self::SIZE_HINTS | Self::STYLE
    }
}

bitflags! {
    /// Persistent per-record window-manager flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmFlags: u32 {
        const OVERRIDE_REDIRECT        = 1 << 0;
        const EMBEDDED                 = 1 << 1;
        /// X is measured from the right edge of the screen
        const NEGATIVE_X               = 1 << 2;
        /// Y is measured from the bottom edge of the screen
        const NEGATIVE_Y               = 1 << 3;
        /// Colormap window list was set explicitly by the user
        const COLORMAPS_EXPLICIT       = 1 << 4;
        /// Toplevel was appended implicitly to an explicit colormap list
        const ADDED_TOPLEVEL_COLORMAP  = 1 << 5;
        /// Transient hidden because its master was iconified
        const HIDDEN_WITH_MASTER       = 1 << 6;
    }
}

/// Lifecycle state of a toplevel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    NeverMapped,
    Withdrawn,
    Iconic,
    Normal,
    Zoomed,
}

impl LifecycleState {
    /// States the toolkit may request
    pub const REQUESTABLE: [LifecycleState; 4] = [
        LifecycleState::Withdrawn,
        LifecycleState::Iconic,
        LifecycleState::Normal,
        LifecycleState::Zoomed,
    ];

    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::NeverMapped,
        LifecycleState::Withdrawn,
        LifecycleState::Iconic,
        LifecycleState::Normal,
        LifecycleState::Zoomed,
    ];

    /// Parse a `wm state` argument
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(Self::Normal),
            "iconic" => Some(Self::Iconic),
            "withdrawn" => Some(Self::Withdrawn),
            "zoomed" => Some(Self::Zoomed),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NeverMapped => "nevermapped",
            Self::Withdrawn => "withdrawn",
            Self::Iconic => "iconic",
            Self::Normal => "normal",
            Self::Zoomed => "zoomed",
        }
    }

    /// Is the content area on screen in this state?
    pub fn is_viewable(&self) -> bool {
        matches!(self, Self::Normal | Self::Zoomed)
    }

    /// The OS owns the frame rectangle in these states (or it is not
    /// reporting reliable client rectangles), so geometry is not reconciled
    pub fn suppresses_geometry(&self) -> bool {
        matches!(self, Self::Withdrawn | Self::Iconic | Self::Zoomed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Show state reported by the native window system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateHint {
    Normal,
    Minimized,
    Maximized,
    Hidden,
}

impl StateHint {
    pub fn lifecycle(&self) -> LifecycleState {
        match self {
            Self::Normal => LifecycleState::Normal,
            Self::Minimized => LifecycleState::Iconic,
            Self::Maximized => LifecycleState::Zoomed,
            Self::Hidden => LifecycleState::Withdrawn,
        }
    }
}

/// Who supplied a position or size (`wm positionfrom` / `wm sizefrom`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    User,
    Program,
}

impl Source {
    pub fn from_name(name: &str) -> Option<Self> {
        if !name.is_empty() && "user".starts_with(name) {
            Some(Self::User)
        } else if !name.is_empty() && "program".starts_with(name) {
            Some(Self::Program)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Program => "program",
        }
    }
}

/// Focus model (`wm focusmodel`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusModel {
    Active,
    #[default]
    Passive,
}

impl FocusModel {
    pub fn from_name(name: &str) -> Option<Self> {
        if !name.is_empty() && "active".starts_with(name) {
            Some(Self::Active)
        } else if !name.is_empty() && "passive".starts_with(name) {
            Some(Self::Passive)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }
}
