//! Reconciliation Pass
//!
//! Brings one record's native frame in line with its declared state:
//! recreates the frame when its decoration style is stale, then pushes the
//! target rectangle to the OS unless the OS owns the rectangle in the
//! current state. Native-call anomalies are absorbed into the cached state.

use tracing::{debug, warn};

use crate::platform::{FrameRequest, NativePlatform};
use crate::shared::{Insets, Point, Rect, Size};
use crate::wm::client_flags::{LifecycleState, PendingFlags, WmFlags};
use crate::wm::decorations::FrameStyle;
use crate::wm::error::{WmError, WmResult};
use crate::wm::record::WindowRecord;
use crate::wm::{WindowId, WindowManager};

/// Frame position for a client area of `size`, resolving edge-relative axes
/// against the screen and the frame that `size` implies
pub(crate) fn resolve_position(record: &WindowRecord, requested: Point, size: Size, insets: Insets, screen: Size) -> Point {
    let frame = insets.outer(requested, size);
    let x = if record.flags.contains(WmFlags::NEGATIVE_X) {
        screen.width.saturating_sub(requested.x).saturating_sub(frame.width)
    } else {
        requested.x
    };
    let y = if record.flags.contains(WmFlags::NEGATIVE_Y) {
        screen.height.saturating_sub(requested.y).saturating_sub(frame.height)
    } else {
        requested.y
    };
    Point::new(x, y)
}

fn derive_style(record: &WindowRecord) -> FrameStyle {
    FrameStyle::derive(
        record.is_override_redirect(),
        record.master.is_some(),
        record.resizable,
    )
}

impl<P: NativePlatform> WindowManager<P> {
    /// Run the reconciliation pass for one record. Normally invoked from the
    /// idle queue; running it directly also cancels the queued pass.
    pub fn reconcile(&mut self, id: WindowId) {
        self.idle.retain(|&w| w != id);
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        record.pending.remove(PendingFlags::UPDATE_PENDING);
        if record.state == LifecycleState::NeverMapped {
            // Bits stay set until the first map realizes the window
            return;
        }

        record.pending |= PendingFlags::RECONCILING;
        record.rearmed = PendingFlags::empty();
        let handled = record.pending & PendingFlags::reconcilable();
        wm_trace!(self, "Reconciling {} ({:?})", id, handled);

        let done = self.reconcile_steps(id, handled);

        if let Some(record) = self.records.get_mut(&id) {
            let cleared = done - record.rearmed;
            record.pending.remove(cleared | PendingFlags::RECONCILING);
            record.rearmed = PendingFlags::empty();
        }
    }

    /// Returns the bits the pass took care of
    fn reconcile_steps(&mut self, id: WindowId, handled: PendingFlags) -> PendingFlags {
        let mut done = PendingFlags::empty();

        let Some(record) = self.records.get(&id) else {
            return done;
        };
        let stale = if record.is_embedded() {
            record.applied_style != Some(derive_style(record))
        } else {
            record.frame.is_none() || record.applied_style != Some(derive_style(record))
        };
        if stale {
            self.update_frame(id);
        }
        done |= handled & PendingFlags::STYLE;

        let Some(record) = self.records.get(&id) else {
            return done;
        };
        if record.state.suppresses_geometry() {
            wm_trace!(self, "Geometry of {} left to the OS while {}", id, record.state);
            return done;
        }
        if record.native_target().is_none() {
            return done;
        }

        self.apply_geometry(id, handled.contains(PendingFlags::MOVE));
        done | (handled & (PendingFlags::MOVE | PendingFlags::GEOMETRY | PendingFlags::SIZE_HINTS))
    }

    /// Replace the frame with one of the currently derived style
    fn update_frame(&mut self, id: WindowId) {
        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        let style = derive_style(record);
        if record.is_embedded() {
            // The embedding process owns the frame
            record.applied_style = Some(style);
            return;
        }

        let state = record.state;
        let Some(old) = record.frame.take() else {
            if let Err(err) = self.realize(id, None) {
                warn!("{}", err);
                return;
            }
            if state != LifecycleState::Withdrawn {
                self.show_state(id, state);
            }
            return;
        };

        wm_trace!(self, "Recreating frame of {} with style {:?}", id, style.class);
        let keep_at = record.applied.position();
        // Notifications for the old frame are no longer ours
        self.frames.remove(&old);

        if let Err(err) = self.realize(id, Some(keep_at)) {
            warn!("{}; keeping the old frame", err);
            self.frames.insert(old, id);
            if let Some(record) = self.records.get_mut(&id) {
                record.frame = Some(old);
            }
            return;
        }
        self.platform.destroy_frame(old);
        self.dispatch_sent_events();

        if state != LifecycleState::Withdrawn {
            self.show_state(id, state);
        }
    }

    /// Realize a record outside of a pass; bits pending from earlier requests
    /// are consumed by the frame being created at the requested geometry
    pub(crate) fn realize_now(&mut self, id: WindowId) -> WmResult<()> {
        let consumed = match self.records.get_mut(&id) {
            Some(record) => {
                let consumed = record.pending & PendingFlags::reconcilable();
                record.pending |= PendingFlags::RECONCILING;
                record.rearmed = PendingFlags::empty();
                consumed
            }
            None => return Err(WmError::UnknownWindowId(id)),
        };

        let result = self.realize(id, None);

        if let Some(record) = self.records.get_mut(&id) {
            if result.is_ok() {
                let cleared = consumed - record.rearmed;
                record.pending.remove(cleared);
            }
            record.pending.remove(PendingFlags::RECONCILING);
            record.rearmed = PendingFlags::empty();
        }
        result
    }

    /// Create the native frame at the target geometry. Notifications sent
    /// during creation only update the cached rectangle. `fallback` is the
    /// position to use when none was requested.
    fn realize(&mut self, id: WindowId, fallback: Option<Point>) -> WmResult<()> {
        let metrics = self.platform.metrics();
        let record = self.records.get(&id).ok_or(WmError::UnknownWindowId(id))?;
        let style = derive_style(record);
        let insets = self.platform.frame_insets(style, record.menu.is_some());
        let size = record.target_client_size(&metrics, insets);
        let rect = record
            .requested_position
            .map(|requested| resolve_position(record, requested, size, insets, metrics.screen))
            .or(fallback)
            .map(|origin| insets.outer(origin, size));
        let owner_frame = record
            .master
            .and_then(|master| self.records.get(&master))
            .and_then(|master| master.frame);
        let title = record
            .attributes
            .title
            .clone()
            .unwrap_or_else(|| record.path.trim_start_matches('.').to_string());
        let request = FrameRequest {
            owner: id,
            style,
            content: record.content,
            owner_frame,
            rect,
            client_size: size,
            title: &title,
            menu: record.menu,
        };

        if let Some(record) = self.records.get_mut(&id) {
            record.pending |= PendingFlags::CREATE_PENDING;
        }
        let created = self.platform.create_frame(&request);
        let frame = match created {
            Ok(frame) => frame,
            Err(err) => {
                let path = match self.records.get_mut(&id) {
                    Some(record) => {
                        record.pending.remove(PendingFlags::CREATE_PENDING);
                        record.path.clone()
                    }
                    None => String::new(),
                };
                return Err(WmError::FrameCreation {
                    window: path,
                    reason: err.to_string(),
                });
            }
        };

        // Register before draining so creation-time notifications find the record
        self.frames.insert(frame, id);
        self.stacking.add_window(id);
        if let Some(record) = self.records.get_mut(&id) {
            record.frame = Some(frame);
            record.applied_style = Some(style);
            record.config_size = Some(size);
        }
        self.dispatch_sent_events();

        let frame_rect = self.platform.frame_rect(frame);
        let client = self.platform.client_size(frame);
        if let Some(record) = self.records.get_mut(&id) {
            record.pending.remove(PendingFlags::CREATE_PENDING);
            if let Some(rect) = frame_rect {
                record.applied = rect;
            }
            if let Some(client) = client {
                record.applied_client = client;
            }
        }
        wm_trace!(self, "Realized {} in frame {:?} ({:?})", id, frame, style.class);
        Ok(())
    }

    /// Push the target rectangle to the OS, compensating for menu bars that
    /// wrap and eat client height. The retry stops when the client height
    /// matches, when the OS grants less frame height than asked for, or after
    /// `menu_wrap_retries` extra attempts.
    fn apply_geometry(&mut self, id: WindowId, force_move: bool) {
        let metrics = self.platform.metrics();
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let style = record.applied_style.unwrap_or_else(|| derive_style(record));
        let insets = self.platform.frame_insets(style, record.menu.is_some());
        let size = record.target_client_size(&metrics, insets);
        let position = match record.requested_position {
            Some(requested) => resolve_position(record, requested, size, insets, metrics.screen),
            None => record.applied.position(),
        };

        if !force_move && record.config_size == Some(size) {
            debug!("Geometry of {} already requested ({}x{})", id, size.width, size.height);
            return;
        }
        let negative_y = record.flags.contains(WmFlags::NEGATIVE_Y);
        let create_pending = record.pending.contains(PendingFlags::CREATE_PENDING);
        let embedded = record.is_embedded();
        let container = record.container;
        let frame = record.frame;

        if let Some(record) = self.records.get_mut(&id) {
            record.config_size = Some(size);
        }
        if create_pending {
            return;
        }
        if embedded {
            if let Some(container) = container {
                wm_trace!(self, "Forwarding {}x{} for {} to container", size.width, size.height, id);
                self.platform.forward_geometry_request(container, size);
            }
            return;
        }
        let Some(frame) = frame else {
            return;
        };

        let mut height = size.height;
        let mut y = position.y;
        let mut retries = 0;
        loop {
            let rect = Rect::new(
                position.x,
                y,
                size.width.saturating_add(insets.horizontal()),
                height.saturating_add(insets.vertical()),
            );
            wm_trace!(self, "Move/resize {} to {:?}", id, rect);
            self.with_sync(id, |platform| platform.set_frame_rect(frame, rect));

            // The record or its frame may be gone after the notifications ran
            if self.records.get(&id).and_then(|r| r.frame) != Some(frame) {
                return;
            }
            let granted = self.platform.frame_rect(frame).unwrap_or(rect);
            let client = self.platform.client_size(frame).unwrap_or(size);
            if granted.height < rect.height {
                debug!(
                    "OS granted {} of {} frame height for {}",
                    granted.height, rect.height, id
                );
                break;
            }
            if client.height >= size.height {
                break;
            }
            if retries >= self.config.menu_wrap_retries {
                warn!("Menu of {} still wraps after {} retries", id, retries);
                break;
            }
            let delta = size.height - client.height;
            height = height.saturating_add(delta);
            if negative_y {
                y = y.saturating_sub(delta);
            }
            retries += 1;
        }

        let frame_rect = self.platform.frame_rect(frame);
        let client = self.platform.client_size(frame);
        if let Some(record) = self.records.get_mut(&id) {
            if let Some(rect) = frame_rect {
                record.applied = rect;
            }
            if let Some(client) = client {
                record.applied_client = client;
            }
        }
    }
}
