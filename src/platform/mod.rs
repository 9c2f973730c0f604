//! Native Platform Module
//!
//! The boundary between the reconciler and the OS window system. Every
//! native call the reconciler makes goes through `NativePlatform`; every
//! notification the OS delivers comes back as a `NativeEvent`.
//!
//! Native calls complete synchronously, but the OS may deliver notifications
//! while a call is in progress (a move/resize reports the new rectangle before
//! it returns). Implementations queue those notifications and hand them over
//! through `take_sent_events`, which the reconciler drains right after every
//! call, before it considers the call finished.

pub mod sim;

use serde::Serialize;
use thiserror::Error;

use crate::shared::{Insets, Rect, Size};
use crate::wm::WindowId;
use crate::wm::client_flags::{LifecycleState, StateHint};
use crate::wm::decorations::FrameStyle;

pub use sim::SimulatedPlatform;

/// Opaque OS window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NativeHandle(pub u64);

/// Opaque native menu handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MenuHandle(pub u64);

/// Toolkit colormap (backed by a native palette)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ColormapId(pub u32);

impl ColormapId {
    pub const DEFAULT: ColormapId = ColormapId(0);
}

/// OS metrics consumed by geometry computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemMetrics {
    /// Primary screen size
    pub screen: Size,
    /// Largest frame the OS lets the user track to
    pub max_track: Size,
    /// Height of one menu bar row
    pub menu_height: i32,
}

/// Everything needed to create a decorative frame in one call.
///
/// `owner` names the record under construction; notifications the OS sends
/// during creation are attributed to it once the new handle is registered.
#[derive(Debug, Clone)]
pub struct FrameRequest<'a> {
    pub owner: WindowId,
    pub style: FrameStyle,
    pub content: NativeHandle,
    /// Frame of the master, for transient dialogs
    pub owner_frame: Option<NativeHandle>,
    /// Initial frame rectangle; None lets the OS pick the position
    pub rect: Option<Rect>,
    /// Initial client size when the OS picks the position
    pub client_size: Size,
    pub title: &'a str,
    pub menu: Option<MenuHandle>,
}

/// Show commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    Hide,
    Minimize,
    ShowNormal,
    Maximize,
}

impl ShowCommand {
    pub fn for_state(state: LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::NeverMapped => None,
            LifecycleState::Withdrawn => Some(Self::Hide),
            LifecycleState::Iconic => Some(Self::Minimize),
            LifecycleState::Normal => Some(Self::ShowNormal),
            LifecycleState::Zoomed => Some(Self::Maximize),
        }
    }
}

/// Z-order placement for a restack call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPlacement {
    Top,
    Bottom,
    Above(NativeHandle),
    Below(NativeHandle),
}

/// Native call failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("frame creation failed: {0}")]
    CreateFailed(String),
    #[error("no such native window {0:?}")]
    NoSuchWindow(NativeHandle),
}

/// Notifications delivered by the native window system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    /// Frame moved, resized, shown, hidden, minimized or maximized
    PosChanged {
        frame: NativeHandle,
        frame_rect: Rect,
        client_size: Size,
        hint: StateHint,
    },
    /// Frame destroyed
    Destroyed { frame: NativeHandle },
    /// User asked to close the frame
    Close { frame: NativeHandle },
    /// Window-manager protocol message
    Protocol { frame: NativeHandle, protocol: String },
    /// Frame activated or deactivated
    Activate { frame: NativeHandle, active: bool },
    /// OS asks for interactive tracking limits
    GetMinMaxInfo { frame: NativeHandle },
    /// OS proposes a client size during an interactive resize
    Sizing { frame: NativeHandle, proposed: Size },
    /// Frame is about to become the foreground window
    QueryNewPalette { frame: NativeHandle },
    /// Some window (`source`) changed the system palette
    PaletteChanged {
        frame: NativeHandle,
        source: NativeHandle,
    },
    /// Embedded client in another process asks its container for a size
    EmbeddedGeometryRequest { frame: NativeHandle, size: Size },
}

impl NativeEvent {
    pub fn frame(&self) -> NativeHandle {
        match self {
            Self::PosChanged { frame, .. }
            | Self::Destroyed { frame }
            | Self::Close { frame }
            | Self::Protocol { frame, .. }
            | Self::Activate { frame, .. }
            | Self::GetMinMaxInfo { frame }
            | Self::Sizing { frame, .. }
            | Self::QueryNewPalette { frame }
            | Self::PaletteChanged { frame, .. }
            | Self::EmbeddedGeometryRequest { frame, .. } => *frame,
        }
    }
}

/// OS window-system operations used by the reconciler
pub trait NativePlatform {
    fn metrics(&self) -> SystemMetrics;

    /// Frame thickness for a style, including one menu bar row when `has_menu`
    fn frame_insets(&self, style: FrameStyle, has_menu: bool) -> Insets;

    /// Create a content window for a newly registered toplevel
    fn create_content(&mut self, owner: WindowId) -> NativeHandle;

    /// Create a hidden frame and reparent the content window into it
    fn create_frame(&mut self, request: &FrameRequest<'_>) -> Result<NativeHandle, NativeError>;

    fn destroy_frame(&mut self, frame: NativeHandle);

    fn set_frame_rect(&mut self, frame: NativeHandle, rect: Rect);

    fn frame_rect(&self, frame: NativeHandle) -> Option<Rect>;

    fn client_size(&self, frame: NativeHandle) -> Option<Size>;

    fn show(&mut self, frame: NativeHandle, command: ShowCommand);

    fn set_content_visible(&mut self, content: NativeHandle, visible: bool);

    fn restack(&mut self, frame: NativeHandle, placement: StackPlacement);

    fn set_title(&mut self, frame: NativeHandle, title: &str);

    fn set_menu(&mut self, frame: NativeHandle, menu: Option<MenuHandle>);

    /// Select and realize a colormap's palette into the frame. Returns the
    /// number of palette entries that changed; 0 means nothing took effect.
    fn realize_palette(&mut self, frame: NativeHandle, colormap: ColormapId, background: bool) -> usize;

    /// Ask the process owning an embedded container for a new client size
    fn forward_geometry_request(&mut self, container: NativeHandle, size: Size);

    /// Ask the process owning an embedded container for a state change
    fn forward_state_request(&mut self, container: NativeHandle, state: LifecycleState);

    /// Notifications delivered synchronously during the previous calls
    fn take_sent_events(&mut self) -> Vec<NativeEvent>;
}
