//! Window Manager Module
//!
//! Keeps each toplevel's declared geometry and lifecycle state consistent
//! with its native frame, in both directions. Requests only mutate records
//! and schedule a deferred reconciliation pass; the pass runs from the idle
//! queue, coalescing bursts of requests into one set of native calls.
//! Native notifications flow back through `events` and update the records
//! without undoing user-driven changes.

/// Trace a window-manager action; promoted to `info` while `wm tracing` is on
macro_rules! wm_trace {
    ($wm:expr, $($arg:tt)+) => {
        if $wm.tracing {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod client_flags;
pub mod colormaps;
pub mod command;
pub mod decorations;
pub mod error;
pub mod events;
pub mod geometry_spec;
pub mod hints;
pub mod menu;
pub mod protocols;
pub mod reconcile;
pub mod record;
pub mod stacking;
pub mod transients;

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::platform::{ColormapId, NativeHandle, NativePlatform, ShowCommand};
use crate::shared::{Point, Rect, Size};
use crate::wm::client_flags::{LifecycleState, PendingFlags, Source, WmFlags};
use crate::wm::decorations::{DecorationStyle, FrameStyle};
use crate::wm::error::{WmError, WmResult};
use crate::wm::geometry_spec::GeometrySpec;
use crate::wm::hints::{AspectConstraints, GridState, Resizable, SizeConstraints};
use crate::wm::protocols::ProtocolRegistry;
use crate::wm::record::{Attributes, WindowRecord};
use crate::wm::stacking::StackingManager;

pub use events::EventReply;

/// Toolkit window identity
pub type WindowId = u32;

/// Notifications delivered back to the toolkit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolkitEvent {
    /// Content area moved or resized
    Configure {
        window: WindowId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Map { window: WindowId },
    Unmap { window: WindowId },
    Destroy { window: WindowId },
    /// Window needs repainting (e.g. its colormap was reinstalled)
    Expose { window: WindowId },
    StateChanged { window: WindowId, state: LifecycleState },
    /// Script bound with `wm protocol` asks to be evaluated
    Command { window: WindowId, script: String },
}

/// Hook invoked synchronously for every toolkit event
pub type EventHook<P> = Box<dyn FnMut(&mut WindowManager<P>, &ToolkitEvent)>;

/// Options for registering a toplevel
#[derive(Debug, Clone, Copy, Default)]
pub struct ToplevelOptions {
    pub override_redirect: bool,
    /// Container frame owned by another process
    pub embedded_in: Option<NativeHandle>,
    /// Natural content size, if already known
    pub req_size: Option<Size>,
}

/// Geometry-manager interface the reconciler implements for the toolkit
pub trait GeometryManager {
    /// Content of `window` changed its natural size
    fn requested_geometry_changed(&mut self, window: WindowId, size: Size);
}

/// Serializable view of one record
#[derive(Debug, Clone, Serialize)]
pub struct RecordSnapshot {
    pub id: WindowId,
    pub path: String,
    pub state: LifecycleState,
    pub initial_state: LifecycleState,
    pub frame: Option<NativeHandle>,
    pub style: Option<DecorationStyle>,
    pub master: Option<WindowId>,
    pub icon: Option<WindowId>,
    pub icon_for: Option<WindowId>,
    pub requested_size: Option<Size>,
    pub requested_position: Option<Point>,
    pub negative_x: bool,
    pub negative_y: bool,
    pub req_size: Size,
    pub grid: Option<GridState>,
    pub constraints: SizeConstraints,
    pub aspect: Option<AspectConstraints>,
    pub resizable: Resizable,
    pub pending: u32,
    pub config_size: Option<Size>,
    pub applied: Rect,
    pub applied_client: Size,
    pub colormap: ColormapId,
    pub colormap_windows: Vec<WindowId>,
    pub attributes: Attributes,
}

/// The window-manager reconciler
pub struct WindowManager<P: NativePlatform> {
    platform: P,
    config: ReconcilerConfig,
    /// Registry; sole owner of every record
    records: HashMap<WindowId, WindowRecord>,
    /// Path name -> window
    names: HashMap<String, WindowId>,
    /// Frame (or embedding container) -> window
    frames: HashMap<NativeHandle, WindowId>,
    /// Records waiting for a reconciliation pass
    idle: VecDeque<WindowId>,
    stacking: StackingManager,
    protocols: ProtocolRegistry<P>,
    /// Toplevel owning the foreground frame
    foreground: Option<WindowId>,
    /// Colormaps of non-toplevel toolkit windows
    window_colormaps: HashMap<WindowId, ColormapId>,
    tracing: bool,
    event_hook: Option<EventHook<P>>,
    toolkit_events: Vec<ToolkitEvent>,
    background_errors: Vec<String>,
}

impl<P: NativePlatform> WindowManager<P> {
    /// Create a reconciler driving `platform`
    pub fn new(platform: P, config: ReconcilerConfig) -> Self {
        info!("Initializing window manager (tracing={})", config.tracing);
        Self {
            platform,
            tracing: config.tracing,
            config,
            records: HashMap::new(),
            names: HashMap::new(),
            frames: HashMap::new(),
            idle: VecDeque::new(),
            stacking: StackingManager::new(),
            protocols: ProtocolRegistry::new(),
            foreground: None,
            window_colormaps: HashMap::new(),
            event_hook: None,
            toolkit_events: Vec::new(),
            background_errors: Vec::new(),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn tracing(&self) -> bool {
        self.tracing
    }

    pub fn set_tracing(&mut self, on: bool) {
        self.tracing = on;
        info!("wm tracing {}", if on { "on" } else { "off" });
    }

    /// Install the hook that receives toolkit events as they happen
    pub fn set_event_hook(&mut self, hook: EventHook<P>) {
        self.event_hook = Some(hook);
    }

    /// Toolkit events delivered since the last call
    pub fn take_toolkit_events(&mut self) -> Vec<ToolkitEvent> {
        std::mem::take(&mut self.toolkit_events)
    }

    /// Failures reported by protocol handlers since the last call
    pub fn take_background_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.background_errors)
    }

    pub fn foreground(&self) -> Option<WindowId> {
        self.foreground
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    pub fn record(&self, id: WindowId) -> Option<&WindowRecord> {
        self.records.get(&id)
    }

    /// Registered toplevels, ordered by id
    pub fn windows(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.records.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve a path name to its toplevel
    pub fn lookup(&self, path: &str) -> WmResult<WindowId> {
        self.names
            .get(path)
            .copied()
            .ok_or_else(|| WmError::UnknownWindow(path.to_string()))
    }

    /// Resolve a native handle back to its toplevel
    pub fn window_for_handle(&self, handle: NativeHandle) -> Option<WindowId> {
        self.frames.get(&handle).copied()
    }

    fn get(&self, id: WindowId) -> WmResult<&WindowRecord> {
        self.records.get(&id).ok_or(WmError::UnknownWindowId(id))
    }

    fn get_mut(&mut self, id: WindowId) -> WmResult<&mut WindowRecord> {
        self.records.get_mut(&id).ok_or(WmError::UnknownWindowId(id))
    }

    fn path_of(&self, id: WindowId) -> String {
        self.records
            .get(&id)
            .map(|r| r.path.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Register a new toplevel. The native frame is created when it is
    /// first mapped.
    pub fn register_toplevel(
        &mut self,
        id: WindowId,
        path: &str,
        options: ToplevelOptions,
    ) -> WmResult<()> {
        if self.records.contains_key(&id) || self.names.contains_key(path) {
            return Err(WmError::AlreadyRegistered(path.to_string()));
        }

        let content = self.platform.create_content(id);
        let mut record = WindowRecord::new(id, path.to_string(), content);
        record.constraints.min_width = self.config.default_min_width;
        record.constraints.min_height = self.config.default_min_height;
        if options.override_redirect {
            record.flags |= WmFlags::OVERRIDE_REDIRECT;
        }
        if let Some(container) = options.embedded_in {
            record.flags |= WmFlags::EMBEDDED;
            record.container = Some(container);
            self.frames.insert(container, id);
        }
        if let Some(size) = options.req_size {
            record.req_size = size;
        }

        self.records.insert(id, record);
        self.names.insert(path.to_string(), id);
        wm_trace!(self, "Registered toplevel {} ({}) {:?}", path, id, options);
        Ok(())
    }

    /// Toolkit teardown of a toplevel
    pub fn destroy_toplevel(&mut self, id: WindowId) -> WmResult<()> {
        self.get(id)?;
        self.dead_window(id, false);
        Ok(())
    }

    /// Remove a record and every reference to it. `frame_gone` is set when
    /// the OS already destroyed the frame.
    pub(crate) fn dead_window(&mut self, id: WindowId, frame_gone: bool) {
        let Some(record) = self.records.remove(&id) else {
            return;
        };
        wm_trace!(self, "Destroying toplevel {} ({})", record.path, id);

        // Cancel any pending pass
        self.idle.retain(|&w| w != id);
        self.names.remove(&record.path);
        if let Some(container) = record.container {
            self.frames.remove(&container);
        }

        for transient in self.transients_of(id) {
            if let Some(other) = self.records.get_mut(&transient) {
                debug!("Clearing master of {} (master {} destroyed)", other.path, record.path);
                other.master = None;
                other.flags.remove(WmFlags::HIDDEN_WITH_MASTER);
            }
            self.mark_dirty(transient, PendingFlags::STYLE);
        }
        if let Some(icon) = record.icon
            && let Some(other) = self.records.get_mut(&icon)
        {
            other.icon_for = None;
        }
        if let Some(owner) = record.icon_for
            && let Some(other) = self.records.get_mut(&owner)
        {
            other.icon = None;
        }
        for other in self.records.values_mut() {
            if other.attributes.group_leader == Some(id) {
                other.attributes.group_leader = None;
            }
            other.colormap_windows.retain(|&w| w != id);
        }

        self.protocols.remove_window(id);
        self.stacking.remove_window(id);
        self.window_colormaps.remove(&id);
        if self.foreground == Some(id) {
            self.foreground = None;
        }

        if let Some(frame) = record.frame {
            self.frames.remove(&frame);
            if !frame_gone {
                self.platform.destroy_frame(frame);
                self.dispatch_sent_events();
            }
        }

        self.emit(ToolkitEvent::Destroy { window: id });
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Record that `bits` are out of sync and schedule a pass. Scheduling an
    /// already queued record is a no-op; bits set while the record's own pass
    /// is running survive that pass.
    pub(crate) fn mark_dirty(&mut self, id: WindowId, bits: PendingFlags) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        record.pending |= bits;
        if record.pending.contains(PendingFlags::RECONCILING) {
            record.rearmed |= bits;
        }
        if !record.pending.contains(PendingFlags::UPDATE_PENDING) {
            record.pending |= PendingFlags::UPDATE_PENDING;
            self.idle.push_back(id);
        }
    }

    /// Is a reconciliation pass queued for `id`?
    pub fn is_scheduled(&self, id: WindowId) -> bool {
        self.idle.contains(&id)
    }

    /// Run every queued reconciliation pass. Returns the number of passes run.
    pub fn run_idle(&mut self) -> usize {
        let mut passes = 0;
        while let Some(id) = self.idle.pop_front() {
            self.reconcile(id);
            passes += 1;
        }
        passes
    }

    // ------------------------------------------------------------------
    // Native call plumbing
    // ------------------------------------------------------------------

    /// Issue a native call on behalf of `id`. Notifications the OS delivers
    /// during the call are processed before it is considered finished, and
    /// are recognized as echoes of our own request.
    pub(crate) fn with_sync<R>(&mut self, id: WindowId, call: impl FnOnce(&mut P) -> R) -> R {
        let was_sync = match self.records.get_mut(&id) {
            Some(record) => {
                let was = record.pending.contains(PendingFlags::SYNC_PENDING);
                record.pending |= PendingFlags::SYNC_PENDING;
                was
            }
            None => false,
        };
        let result = call(&mut self.platform);
        self.dispatch_sent_events();
        if !was_sync && let Some(record) = self.records.get_mut(&id) {
            record.pending.remove(PendingFlags::SYNC_PENDING);
        }
        result
    }

    /// Process notifications the OS has queued, including any sent while
    /// handling them
    pub fn dispatch_sent_events(&mut self) {
        loop {
            let events = self.platform.take_sent_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.handle_native_event(event);
            }
        }
    }

    pub(crate) fn emit(&mut self, event: ToolkitEvent) {
        self.toolkit_events.push(event.clone());
        if let Some(mut hook) = self.event_hook.take() {
            hook(self, &event);
            if self.event_hook.is_none() {
                self.event_hook = Some(hook);
            }
        }
    }

    // ------------------------------------------------------------------
    // Geometry requests
    // ------------------------------------------------------------------

    /// Parse and apply a `[=][WxH][{+|-}X{+|-}Y]` request. An empty string
    /// cancels the requested size. Malformed input leaves the record untouched.
    pub fn request_geometry(&mut self, id: WindowId, spec: &str) -> WmResult<()> {
        self.get(id)?;
        if spec.is_empty() {
            let record = self.get_mut(id)?;
            record.requested_size = None;
            self.mark_dirty(id, PendingFlags::GEOMETRY);
            return Ok(());
        }
        let parsed = GeometrySpec::parse(spec)?;
        self.request_geometry_spec(id, parsed)
    }

    /// Apply an already parsed geometry request
    pub fn request_geometry_spec(&mut self, id: WindowId, spec: GeometrySpec) -> WmResult<()> {
        let record = self.get_mut(id)?;
        if let Some(size) = spec.size {
            record.requested_size = Some(size);
        }
        if let Some(position) = spec.position {
            record.requested_position = Some(Point::new(position.x, position.y));
            record.flags.set(WmFlags::NEGATIVE_X, position.x_negative);
            record.flags.set(WmFlags::NEGATIVE_Y, position.y_negative);
            if record.attributes.position_source.is_none() {
                record.attributes.position_source = Some(Source::User);
            }
        }
        wm_trace!(self, "Geometry request for {}: {}", id, spec);
        self.mark_dirty(id, PendingFlags::MOVE | PendingFlags::GEOMETRY);
        Ok(())
    }

    /// Current geometry as `WxH±X±Y`; size in grid units when gridded
    pub fn geometry_string(&self, id: WindowId) -> WmResult<String> {
        let record = self.get(id)?;
        let metrics = self.platform.metrics();
        let realized = record.frame.is_some() && record.state != LifecycleState::NeverMapped;

        let pixels = if realized {
            record.applied_client
        } else {
            let style = FrameStyle::derive(
                record.is_override_redirect(),
                record.master.is_some(),
                record.resizable,
            );
            let insets = self.platform.frame_insets(style, record.menu.is_some());
            record.target_client_size(&metrics, insets)
        };
        let size = match &record.grid {
            Some(grid) => grid.size_to_units(record.req_size, pixels),
            None => pixels,
        };

        let (mut x, mut y) = if realized {
            (record.applied.x, record.applied.y)
        } else {
            record
                .requested_position
                .map(|p| (p.x, p.y))
                .unwrap_or((0, 0))
        };
        let x_sign = if record.flags.contains(WmFlags::NEGATIVE_X) {
            if realized {
                x = metrics.screen.width.saturating_sub(x).saturating_sub(record.applied.width);
            }
            '-'
        } else {
            '+'
        };
        let y_sign = if record.flags.contains(WmFlags::NEGATIVE_Y) {
            if realized {
                y = metrics.screen.height.saturating_sub(y).saturating_sub(record.applied.height);
            }
            '-'
        } else {
            '+'
        };
        Ok(format!("{}x{}{}{}{}{}", size.width, size.height, x_sign, x, y_sign, y))
    }

    /// Enable or change gridding. A different controller silently loses to
    /// the current one.
    pub fn set_grid(
        &mut self,
        id: WindowId,
        controller: WindowId,
        base_width: i32,
        base_height: i32,
        width_inc: i32,
        height_inc: i32,
    ) -> WmResult<()> {
        if base_width < 0 || base_height < 0 {
            return Err(WmError::InvalidValue(
                "baseWidth and baseHeight can't be negative".to_string(),
            ));
        }
        if width_inc <= 0 || height_inc <= 0 {
            return Err(WmError::InvalidValue(
                "widthInc and heightInc must be > 0".to_string(),
            ));
        }

        let grid = GridState {
            controller,
            base_width,
            base_height,
            width_inc,
            height_inc,
        };
        let record = self.get_mut(id)?;
        match &record.grid {
            Some(current) if current.controller != controller => {
                debug!(
                    "Grid request for {} from {} ignored: {} controls gridding",
                    record.path, controller, current.controller
                );
                return Ok(());
            }
            Some(current) if current.same_layout(&grid) => return Ok(()),
            Some(_) => {}
            None if record.state != LifecycleState::NeverMapped => {
                // First grid on a mapped window: keep the interactive size
                record.requested_size = match record.requested_size {
                    Some(pixels) if record.req_size.is_known() => {
                        Some(grid.size_to_units(record.req_size, pixels))
                    }
                    _ => None,
                };
            }
            None => {}
        }

        record.grid = Some(grid);
        wm_trace!(self, "Grid for {}: {:?}", id, grid);
        self.mark_dirty(id, PendingFlags::SIZE_HINTS | PendingFlags::GEOMETRY);
        Ok(())
    }

    /// Disable gridding. Only the controlling window can do this.
    pub fn unset_grid(&mut self, id: WindowId, controller: WindowId) -> WmResult<()> {
        let record = self.get_mut(id)?;
        let Some(grid) = record.grid else {
            return Ok(());
        };
        if grid.controller != controller {
            debug!("Ungrid of {} by non-owner {} ignored", record.path, controller);
            return Ok(());
        }
        if let Some(units) = record.requested_size {
            record.requested_size = Some(grid.size_to_pixels(record.req_size, units));
        }
        record.grid = None;
        wm_trace!(self, "Grid for {} unset", id);
        self.mark_dirty(id, PendingFlags::SIZE_HINTS | PendingFlags::GEOMETRY);
        Ok(())
    }

    pub fn set_min_size(&mut self, id: WindowId, width: i32, height: i32) -> WmResult<()> {
        if width < 0 || height < 0 {
            return Err(WmError::InvalidValue(format!(
                "bad minimum size {width}x{height}: values can't be negative"
            )));
        }
        let record = self.get_mut(id)?;
        record.constraints.min_width = width;
        record.constraints.min_height = height;
        self.mark_dirty(id, PendingFlags::SIZE_HINTS | PendingFlags::GEOMETRY);
        Ok(())
    }

    /// Max size; 0 on an axis means the OS tracking maximum
    pub fn set_max_size(&mut self, id: WindowId, width: i32, height: i32) -> WmResult<()> {
        if width < 0 || height < 0 {
            return Err(WmError::InvalidValue(format!(
                "bad maximum size {width}x{height}: values can't be negative"
            )));
        }
        let record = self.get_mut(id)?;
        record.constraints.max_width = width;
        record.constraints.max_height = height;
        self.mark_dirty(id, PendingFlags::SIZE_HINTS | PendingFlags::GEOMETRY);
        Ok(())
    }

    pub fn set_size_constraints(&mut self, id: WindowId, constraints: SizeConstraints) -> WmResult<()> {
        self.set_min_size(id, constraints.min_width, constraints.min_height)?;
        self.set_max_size(id, constraints.max_width, constraints.max_height)
    }

    pub fn set_aspect(&mut self, id: WindowId, aspect: Option<AspectConstraints>) -> WmResult<()> {
        if let Some(a) = &aspect {
            if a.min_numer <= 0 || a.min_denom <= 0 || a.max_numer <= 0 || a.max_denom <= 0 {
                return Err(WmError::InvalidValue("aspect number can't be <= 0".to_string()));
            }
            if i64::from(a.min_numer) * i64::from(a.max_denom) > i64::from(a.max_numer) * i64::from(a.min_denom) {
                return Err(WmError::InvalidValue(
                    "min aspect ratio can't be greater than max aspect ratio".to_string(),
                ));
            }
        }
        let record = self.get_mut(id)?;
        record.aspect = aspect;
        self.mark_dirty(id, PendingFlags::SIZE_HINTS);
        Ok(())
    }

    pub fn set_resizable(&mut self, id: WindowId, resizable: Resizable) -> WmResult<()> {
        let record = self.get_mut(id)?;
        if record.resizable == resizable {
            return Ok(());
        }
        record.resizable = resizable;
        self.mark_dirty(id, PendingFlags::STYLE | PendingFlags::SIZE_HINTS);
        Ok(())
    }

    pub fn set_override_redirect(&mut self, id: WindowId, on: bool) -> WmResult<()> {
        let record = self.get_mut(id)?;
        if record.is_override_redirect() == on {
            return Ok(());
        }
        record.flags.set(WmFlags::OVERRIDE_REDIRECT, on);
        self.mark_dirty(id, PendingFlags::STYLE);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Descriptive attributes that need no native update
    pub fn attributes_mut(&mut self, id: WindowId) -> WmResult<&mut Attributes> {
        Ok(&mut self.get_mut(id)?.attributes)
    }

    pub fn set_title(&mut self, id: WindowId, title: &str) -> WmResult<()> {
        let record = self.get_mut(id)?;
        record.attributes.title = Some(title.to_string());
        if let Some(frame) = record.frame {
            self.platform.set_title(frame, title);
        }
        Ok(())
    }

    /// Title shown in the frame (the path name until one is set)
    pub fn title(&self, id: WindowId) -> WmResult<String> {
        let record = self.get(id)?;
        Ok(record
            .attributes
            .title
            .clone()
            .unwrap_or_else(|| record.path.trim_start_matches('.').to_string()))
    }

    pub fn set_group(&mut self, id: WindowId, leader: Option<WindowId>) -> WmResult<()> {
        if let Some(leader) = leader {
            if leader == id {
                return Err(WmError::OwnGroupLeader(self.path_of(id)));
            }
            self.get(leader)?;
        }
        self.get_mut(id)?.attributes.group_leader = leader;
        Ok(())
    }

    /// Designate (or clear) the icon window of `id`. The icon is withdrawn.
    pub fn set_icon_window(&mut self, id: WindowId, icon: Option<WindowId>) -> WmResult<()> {
        let old = self.get(id)?.icon;
        let Some(icon) = icon else {
            if let Some(old) = old
                && let Some(record) = self.records.get_mut(&old)
            {
                record.icon_for = None;
            }
            self.get_mut(id)?.icon = None;
            return Ok(());
        };

        if icon == id {
            return Err(WmError::OwnIcon(self.path_of(id)));
        }
        let icon_record = self.get(icon)?;
        if let Some(owner) = icon_record.icon_for
            && owner != id
        {
            return Err(WmError::AlreadyIcon {
                icon: icon_record.path.clone(),
                owner: self.path_of(owner),
            });
        }

        if let Some(old) = old
            && old != icon
            && let Some(record) = self.records.get_mut(&old)
        {
            record.icon_for = None;
        }
        self.get_mut(id)?.icon = Some(icon);
        self.get_mut(icon)?.icon_for = Some(id);

        // Withdraw the icon without the icon-for legality check
        let icon_record = self.get_mut(icon)?;
        let has_frame = icon_record.frame.is_some();
        match icon_record.state {
            LifecycleState::NeverMapped => icon_record.initial_state = LifecycleState::Withdrawn,
            LifecycleState::Withdrawn => {}
            _ if has_frame => self.show_state(icon, LifecycleState::Withdrawn),
            _ => self.enter_state(icon, LifecycleState::Withdrawn),
        }
        wm_trace!(self, "Icon window of {} is {}", id, icon);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// The toolkit maps the toplevel. The first map realizes the frame and
    /// shows it in the initial state.
    pub fn map_window(&mut self, id: WindowId) -> WmResult<()> {
        let record = self.get(id)?;
        if record.state != LifecycleState::NeverMapped {
            return Ok(());
        }
        let initial = record.initial_state;
        wm_trace!(self, "Mapping {} in state {}", record.path, initial);

        if record.is_embedded() {
            self.enter_state(id, initial);
            return Ok(());
        }
        if initial == LifecycleState::Withdrawn {
            self.enter_state(id, LifecycleState::Withdrawn);
            return Ok(());
        }

        self.realize_now(id)?;
        self.show_state(id, initial);
        Ok(())
    }

    /// The toolkit unmaps the toplevel
    pub fn unmap_window(&mut self, id: WindowId) -> WmResult<()> {
        let record = self.get(id)?;
        let (state, has_frame) = (record.state, record.frame.is_some());
        match state {
            LifecycleState::NeverMapped | LifecycleState::Withdrawn => {}
            _ if has_frame => self.show_state(id, LifecycleState::Withdrawn),
            _ => self.enter_state(id, LifecycleState::Withdrawn),
        }
        Ok(())
    }

    /// Request a lifecycle transition (`wm iconify`, `deiconify`,
    /// `withdraw`, `state`). Illegal transitions are rejected without any
    /// change.
    pub fn set_lifecycle_state(&mut self, id: WindowId, target: LifecycleState) -> WmResult<()> {
        let record = self.get(id)?;
        let owner_path = record.icon_for.map(|owner| self.path_of(owner));
        record.check_transition(target, owner_path.as_deref())?;

        let record = self.get_mut(id)?;
        if record.state == LifecycleState::NeverMapped {
            record.initial_state = target;
            wm_trace!(self, "Initial state of {} set to {}", id, target);
            return Ok(());
        }
        if record.state == target {
            return Ok(());
        }
        if record.is_embedded() {
            if let Some(container) = record.container {
                wm_trace!(self, "Forwarding state {} of {} to container", target, id);
                self.platform.forward_state_request(container, target);
            }
            return Ok(());
        }

        if record.frame.is_none() && target != LifecycleState::Withdrawn {
            self.realize_now(id)?;
        }
        self.show_state(id, target);
        Ok(())
    }

    /// Report the state as `wm state` does (the initial state before the
    /// first map)
    pub fn lifecycle_state(&self, id: WindowId) -> WmResult<LifecycleState> {
        let record = self.get(id)?;
        Ok(match record.state {
            LifecycleState::NeverMapped => record.initial_state,
            state => state,
        })
    }

    /// Ask the OS to show the frame in `state`, then settle the record
    pub(crate) fn show_state(&mut self, id: WindowId, state: LifecycleState) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let (Some(frame), Some(command)) = (record.frame, ShowCommand::for_state(state)) else {
            self.enter_state(id, state);
            return;
        };
        wm_trace!(self, "Show {} as {:?}", record.path, command);
        self.with_sync(id, |platform| platform.show(frame, command));

        // The OS may have echoed the change already
        if self.records.get(&id).is_some_and(|r| r.state != state) {
            self.enter_state(id, state);
        }
    }

    /// Record a lifecycle transition and apply its side effects
    pub(crate) fn enter_state(&mut self, id: WindowId, new: LifecycleState) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        let old = record.state;
        if old == new {
            return;
        }
        record.state = new;
        let content = record.content;
        wm_trace!(self, "State of {} ({}): {} -> {}", record.path, id, old, new);

        match new {
            LifecycleState::Iconic | LifecycleState::Withdrawn => {
                if old.is_viewable() {
                    self.platform.set_content_visible(content, false);
                    self.emit(ToolkitEvent::Unmap { window: id });
                }
                if new == LifecycleState::Iconic {
                    self.hide_transients(id);
                }
            }
            LifecycleState::Normal | LifecycleState::Zoomed => {
                if !old.is_viewable() {
                    self.platform.set_content_visible(content, true);
                    self.emit(ToolkitEvent::Map { window: id });
                }
                if matches!(old, LifecycleState::Iconic | LifecycleState::Withdrawn) {
                    // Cached geometry is stale after being hidden
                    self.mark_dirty(id, PendingFlags::MOVE | PendingFlags::GEOMETRY);
                } else if old == LifecycleState::Zoomed {
                    // Requests made while zoomed were left pending by the pass
                    let deferred = self
                        .records
                        .get(&id)
                        .map(|r| r.pending & PendingFlags::reconcilable())
                        .unwrap_or_default();
                    if !deferred.is_empty() {
                        self.mark_dirty(id, deferred);
                    }
                }
                if old == LifecycleState::Iconic {
                    self.restore_transients(id);
                }
            }
            LifecycleState::NeverMapped => {
                warn!("Record {} moved back to NeverMapped", id);
            }
        }
        self.emit(ToolkitEvent::StateChanged { window: id, state: new });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn snapshot(&self, id: WindowId) -> WmResult<RecordSnapshot> {
        let r = self.get(id)?;
        Ok(RecordSnapshot {
            id: r.id,
            path: r.path.clone(),
            state: r.state,
            initial_state: r.initial_state,
            frame: r.frame,
            style: r.applied_style.map(|s| s.class),
            master: r.master,
            icon: r.icon,
            icon_for: r.icon_for,
            requested_size: r.requested_size,
            requested_position: r.requested_position,
            negative_x: r.flags.contains(WmFlags::NEGATIVE_X),
            negative_y: r.flags.contains(WmFlags::NEGATIVE_Y),
            req_size: r.req_size,
            grid: r.grid,
            constraints: r.constraints,
            aspect: r.aspect,
            resizable: r.resizable,
            pending: r.pending.bits(),
            config_size: r.config_size,
            applied: r.applied,
            applied_client: r.applied_client,
            colormap: r.colormap,
            colormap_windows: r.colormap_windows.clone(),
            attributes: r.attributes.clone(),
        })
    }
}

impl<P: NativePlatform> GeometryManager for WindowManager<P> {
    fn requested_geometry_changed(&mut self, window: WindowId, size: Size) {
        let Some(record) = self.records.get_mut(&window) else {
            debug!("Geometry request for unknown window {}", window);
            return;
        };
        if record.req_size == size {
            return;
        }
        record.req_size = size;
        wm_trace!(self, "Content of {} requests {}x{}", window, size.width, size.height);
        self.mark_dirty(window, PendingFlags::GEOMETRY | PendingFlags::SIZE_HINTS);
    }
}
