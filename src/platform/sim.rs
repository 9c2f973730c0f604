//! Simulated Platform
//!
//! Deterministic in-memory native window system. Records every call it
//! receives, delivers position/state notifications synchronously the way the
//! OS does during move/resize and show calls, and emulates the OS behaviors
//! the reconciler has to cope with: menu bars that wrap on narrow frames,
//! frame heights the OS refuses to grant, and a limited number of palettes
//! that can be realized at once.

use std::collections::HashMap;

use tracing::debug;

use crate::config::PlatformConfig;
use crate::platform::{
    ColormapId, FrameRequest, MenuHandle, NativeError, NativeEvent, NativeHandle, NativePlatform,
    ShowCommand, StackPlacement, SystemMetrics,
};
use crate::shared::{Insets, Point, Rect, Size};
use crate::wm::WindowId;
use crate::wm::client_flags::{LifecycleState, StateHint};
use crate::wm::decorations::{DecorationStyle, FrameStyle};

/// One recorded native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    CreateContent { owner: WindowId, content: NativeHandle },
    CreateFrame { owner: WindowId, frame: NativeHandle, style: DecorationStyle, rect: Rect },
    DestroyFrame { frame: NativeHandle },
    SetFrameRect { frame: NativeHandle, rect: Rect },
    Show { frame: NativeHandle, command: ShowCommand },
    SetContentVisible { content: NativeHandle, visible: bool },
    Restack { frame: NativeHandle, placement: StackPlacement },
    SetTitle { frame: NativeHandle, title: String },
    SetMenu { frame: NativeHandle, menu: Option<MenuHandle> },
    RealizePalette { frame: NativeHandle, colormap: ColormapId, background: bool },
    ForwardGeometry { container: NativeHandle, size: Size },
    ForwardState { container: NativeHandle, state: LifecycleState },
}

#[derive(Debug, Clone)]
struct SimFrame {
    style: FrameStyle,
    rect: Rect,
    client: Size,
    hint: StateHint,
    /// Rectangle to go back to when restored from minimized/maximized
    restore: Rect,
    menu: Option<MenuHandle>,
    title: String,
}

/// In-memory native window system
pub struct SimulatedPlatform {
    config: PlatformConfig,
    next_handle: u64,
    frames: HashMap<NativeHandle, SimFrame>,
    /// Bottom to top
    z_order: Vec<NativeHandle>,
    content_visible: HashMap<NativeHandle, bool>,
    /// Realized palettes, oldest first
    realized: Vec<ColormapId>,
    outbox: Vec<NativeEvent>,
    calls: Vec<NativeCall>,
    fail_next_create: bool,
}

impl SimulatedPlatform {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            next_handle: 0x1000,
            frames: HashMap::new(),
            z_order: Vec::new(),
            content_visible: HashMap::new(),
            realized: Vec::new(),
            outbox: Vec::new(),
            calls: Vec::new(),
            fail_next_create: false,
        }
    }

    /// Calls received so far
    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of move/resize calls received so far
    pub fn frame_rect_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, NativeCall::SetFrameRect { .. }))
            .count()
    }

    /// Make the next `create_frame` fail
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    pub fn config_mut(&mut self) -> &mut PlatformConfig {
        &mut self.config
    }

    pub fn frame_exists(&self, frame: NativeHandle) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn content_visible(&self, content: NativeHandle) -> bool {
        self.content_visible.get(&content).copied().unwrap_or(false)
    }

    /// Bottom-to-top frame order
    pub fn z_order(&self) -> &[NativeHandle] {
        &self.z_order
    }

    /// Queue a notification as if the OS had sent it on its own
    pub fn inject(&mut self, event: NativeEvent) {
        self.outbox.push(event);
    }

    /// Move or resize a frame as the user would. The notification is queued
    /// until the reconciler next drains sent events.
    pub fn user_place(&mut self, frame: NativeHandle, rect: Rect) {
        self.reposition(frame, rect);
    }

    /// Minimize, maximize or restore a frame as the user would
    pub fn user_show(&mut self, frame: NativeHandle, command: ShowCommand) {
        self.apply_show(frame, command);
    }

    fn apply_show(&mut self, frame: NativeHandle, command: ShowCommand) {
        let screen = Rect::new(0, 0, self.config.screen_width, self.config.screen_height);
        let Some(sim) = self.frames.get_mut(&frame) else {
            return;
        };
        if sim.hint == StateHint::Normal {
            sim.restore = sim.rect;
        }
        let (hint, rect) = match command {
            ShowCommand::Hide => (StateHint::Hidden, sim.rect),
            ShowCommand::Minimize => (StateHint::Minimized, sim.restore),
            ShowCommand::ShowNormal => (StateHint::Normal, sim.restore),
            ShowCommand::Maximize => (StateHint::Maximized, screen),
        };
        sim.hint = hint;
        self.place(frame, rect);
        self.notify(frame);
    }

    fn reposition(&mut self, frame: NativeHandle, rect: Rect) {
        self.place(frame, rect);
        if let Some(sim) = self.frames.get_mut(&frame)
            && sim.hint == StateHint::Normal
        {
            sim.restore = sim.rect;
        }
        self.notify(frame);
    }

    fn allocate(&mut self) -> NativeHandle {
        self.next_handle += 1;
        NativeHandle(self.next_handle)
    }

    /// Client size of a frame, accounting for a wrapped menu bar
    fn client_for(&self, style: FrameStyle, menu: Option<MenuHandle>, rect: &Rect) -> Size {
        let insets = self.frame_insets(style, menu.is_some());
        let mut client = insets.inner_size(rect);
        if menu.is_some() && self.config.menu_wrap_width > 0 && rect.width < self.config.menu_wrap_width {
            client.height = (client.height - self.config.menu_height).max(0);
        }
        client
    }

    fn notify(&mut self, frame: NativeHandle) {
        if let Some(sim) = self.frames.get(&frame) {
            self.outbox.push(NativeEvent::PosChanged {
                frame,
                frame_rect: sim.rect,
                client_size: sim.client,
                hint: sim.hint,
            });
        }
    }

    fn place(&mut self, frame: NativeHandle, rect: Rect) {
        let mut rect = rect;
        if self.config.max_frame_height > 0 && rect.height > self.config.max_frame_height {
            rect.height = self.config.max_frame_height;
        }
        let Some(sim) = self.frames.get(&frame) else {
            return;
        };
        let client = self.client_for(sim.style, sim.menu, &rect);
        if let Some(sim) = self.frames.get_mut(&frame) {
            sim.rect = rect;
            sim.client = client;
        }
    }
}

impl NativePlatform for SimulatedPlatform {
    fn metrics(&self) -> SystemMetrics {
        SystemMetrics {
            screen: Size::new(self.config.screen_width, self.config.screen_height),
            max_track: Size::new(self.config.max_track_width, self.config.max_track_height),
            menu_height: self.config.menu_height,
        }
    }

    fn frame_insets(&self, style: FrameStyle, has_menu: bool) -> Insets {
        let border = match style.class {
            DecorationStyle::OverridePopup => 0,
            DecorationStyle::TransientDialog if style.is_sizable() => self.config.thick_frame,
            DecorationStyle::TransientDialog => self.config.dialog_border,
            DecorationStyle::NormalToplevel if style.is_sizable() => self.config.thick_frame,
            DecorationStyle::NormalToplevel => self.config.thin_border,
        };
        let caption = match style.class {
            DecorationStyle::OverridePopup => 0,
            _ => self.config.caption_height,
        };
        let menu = if has_menu { self.config.menu_height } else { 0 };
        Insets::new(border, border + caption + menu, border, border)
    }

    fn create_content(&mut self, owner: WindowId) -> NativeHandle {
        let content = self.allocate();
        self.content_visible.insert(content, false);
        self.calls.push(NativeCall::CreateContent { owner, content });
        content
    }

    fn create_frame(&mut self, request: &FrameRequest<'_>) -> Result<NativeHandle, NativeError> {
        if self.fail_next_create {
            self.fail_next_create = false;
            return Err(NativeError::CreateFailed(format!(
                "out of window handles creating frame for window {}",
                request.owner
            )));
        }

        let frame = self.allocate();
        let insets = self.frame_insets(request.style, request.menu.is_some());
        let rect = request.rect.unwrap_or_else(|| {
            insets.outer(
                Point::new(self.config.default_x, self.config.default_y),
                request.client_size,
            )
        });
        self.frames.insert(
            frame,
            SimFrame {
                style: request.style,
                rect,
                client: Size::default(),
                hint: StateHint::Hidden,
                restore: rect,
                menu: request.menu,
                title: request.title.to_string(),
            },
        );
        self.place(frame, rect);
        self.z_order.push(frame);
        self.calls.push(NativeCall::CreateFrame {
            owner: request.owner,
            frame,
            style: request.style.class,
            rect,
        });
        debug!("sim: created frame {:?} for window {}", frame, request.owner);

        // Sent before creation returns, while the handle is still unknown to the caller
        self.notify(frame);
        Ok(frame)
    }

    fn destroy_frame(&mut self, frame: NativeHandle) {
        self.calls.push(NativeCall::DestroyFrame { frame });
        if self.frames.remove(&frame).is_some() {
            self.z_order.retain(|&f| f != frame);
            self.outbox.push(NativeEvent::Destroyed { frame });
        }
    }

    fn set_frame_rect(&mut self, frame: NativeHandle, rect: Rect) {
        self.calls.push(NativeCall::SetFrameRect { frame, rect });
        self.reposition(frame, rect);
    }

    fn frame_rect(&self, frame: NativeHandle) -> Option<Rect> {
        self.frames.get(&frame).map(|sim| sim.rect)
    }

    fn client_size(&self, frame: NativeHandle) -> Option<Size> {
        self.frames.get(&frame).map(|sim| sim.client)
    }

    fn show(&mut self, frame: NativeHandle, command: ShowCommand) {
        self.calls.push(NativeCall::Show { frame, command });
        self.apply_show(frame, command);
    }

    fn set_content_visible(&mut self, content: NativeHandle, visible: bool) {
        self.calls.push(NativeCall::SetContentVisible { content, visible });
        self.content_visible.insert(content, visible);
    }

    fn restack(&mut self, frame: NativeHandle, placement: StackPlacement) {
        self.calls.push(NativeCall::Restack { frame, placement });
        if !self.frames.contains_key(&frame) {
            return;
        }
        self.z_order.retain(|&f| f != frame);
        let index = match placement {
            StackPlacement::Top => self.z_order.len(),
            StackPlacement::Bottom => 0,
            StackPlacement::Above(other) => self
                .z_order
                .iter()
                .position(|&f| f == other)
                .map_or(self.z_order.len(), |i| i + 1),
            StackPlacement::Below(other) => self
                .z_order
                .iter()
                .position(|&f| f == other)
                .unwrap_or(0),
        };
        self.z_order.insert(index, frame);
    }

    fn set_title(&mut self, frame: NativeHandle, title: &str) {
        self.calls.push(NativeCall::SetTitle {
            frame,
            title: title.to_string(),
        });
        if let Some(sim) = self.frames.get_mut(&frame) {
            sim.title = title.to_string();
        }
    }

    fn set_menu(&mut self, frame: NativeHandle, menu: Option<MenuHandle>) {
        self.calls.push(NativeCall::SetMenu { frame, menu });
        let Some(sim) = self.frames.get_mut(&frame) else {
            return;
        };
        sim.menu = menu;
        // The frame keeps its outer size; the client area shrinks or grows
        let rect = sim.rect;
        self.place(frame, rect);
        self.notify(frame);
    }

    fn realize_palette(&mut self, frame: NativeHandle, colormap: ColormapId, background: bool) -> usize {
        self.calls.push(NativeCall::RealizePalette {
            frame,
            colormap,
            background,
        });
        if self.realized.contains(&colormap) {
            return 0;
        }
        if self.realized.len() >= self.config.palette_slots {
            if background || self.realized.is_empty() {
                debug!("sim: no free palette slot for {:?}", colormap);
                return 0;
            }
            // The foreground palette evicts the oldest one
            self.realized.remove(0);
        }
        self.realized.push(colormap);
        16
    }

    fn forward_geometry_request(&mut self, container: NativeHandle, size: Size) {
        self.calls.push(NativeCall::ForwardGeometry { container, size });
    }

    fn forward_state_request(&mut self, container: NativeHandle, state: LifecycleState) {
        self.calls.push(NativeCall::ForwardState { container, state });
    }

    fn take_sent_events(&mut self) -> Vec<NativeEvent> {
        std::mem::take(&mut self.outbox)
    }
}
