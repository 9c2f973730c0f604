//! Events Module
//!
//! Translates notifications from the native window system into record
//! updates and toolkit events. Notifications that echo a native call the
//! reconciler itself issued (the record is in `SYNC_PENDING`) only confirm
//! the cached state; anything else is a user or OS action and becomes the
//! new requested geometry, so later passes do not undo it.

use tracing::debug;

use crate::platform::{NativeEvent, NativePlatform, SystemMetrics};
use crate::shared::{Insets, Point, Size};
use crate::wm::client_flags::{LifecycleState, PendingFlags, StateHint, WmFlags};
use crate::wm::decorations::FrameStyle;
use crate::wm::hints::TrackLimits;
use crate::wm::protocols::WM_DELETE_WINDOW;
use crate::wm::record::WindowRecord;
use crate::wm::{GeometryManager, ToolkitEvent, WindowId, WindowManager};

/// Result of handling a native event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReply {
    /// Event was handled
    Handled,
    /// Event is not for a known window, or needs no action
    Ignored,
    /// Tracking limits for `GetMinMaxInfo`
    Limits(TrackLimits),
    /// Constrained client size for `Sizing`
    Size(Size),
    /// Whether any palette entry changed
    PaletteRealized(bool),
}

impl<P: NativePlatform> WindowManager<P> {
    /// Route one native notification to the record owning its frame
    pub fn handle_native_event(&mut self, event: NativeEvent) -> EventReply {
        let Some(id) = self.window_for_handle(event.frame()) else {
            debug!("Event for unknown frame {:?} ignored", event.frame());
            return EventReply::Ignored;
        };
        wm_trace!(self, "Native event for {}: {:?}", id, event);

        match event {
            NativeEvent::PosChanged {
                frame_rect,
                client_size,
                hint,
                ..
            } => {
                self.on_structure_changed(id, frame_rect.position(), client_size, hint);
                EventReply::Handled
            }
            NativeEvent::Destroyed { .. } => {
                self.on_destroyed_externally(id);
                EventReply::Handled
            }
            NativeEvent::Close { .. } => {
                self.on_protocol_message(id, WM_DELETE_WINDOW);
                EventReply::Handled
            }
            NativeEvent::Protocol { protocol, .. } => {
                self.on_protocol_message(id, &protocol);
                EventReply::Handled
            }
            NativeEvent::Activate { active, .. } => {
                if active {
                    self.foreground = Some(id);
                } else if self.foreground == Some(id) {
                    self.foreground = None;
                }
                EventReply::Handled
            }
            NativeEvent::GetMinMaxInfo { .. } => match self.records.get(&id) {
                Some(record) => {
                    let (metrics, insets) = self.metrics_and_insets(record);
                    EventReply::Limits(record.track_limits(&metrics, insets))
                }
                None => EventReply::Ignored,
            },
            NativeEvent::Sizing { proposed, .. } => match self.records.get(&id) {
                Some(record) => {
                    let (metrics, insets) = self.metrics_and_insets(record);
                    EventReply::Size(record.constrain_size(proposed, &metrics, insets))
                }
                None => EventReply::Ignored,
            },
            NativeEvent::QueryNewPalette { .. } => {
                EventReply::PaletteRealized(self.install_colormaps(id, true) > 0)
            }
            NativeEvent::PaletteChanged { source, .. } => {
                if self.window_for_handle(source) == Some(id) {
                    // Our own realization
                    return EventReply::Ignored;
                }
                EventReply::PaletteRealized(self.install_colormaps(id, false) > 0)
            }
            NativeEvent::EmbeddedGeometryRequest { size, .. } => {
                self.requested_geometry_changed(id, size);
                EventReply::Handled
            }
        }
    }

    pub(crate) fn metrics_and_insets(&self, record: &WindowRecord) -> (SystemMetrics, Insets) {
        let style = record.applied_style.unwrap_or_else(|| {
            FrameStyle::derive(
                record.is_override_redirect(),
                record.master.is_some(),
                record.resizable,
            )
        });
        (
            self.platform.metrics(),
            self.platform.frame_insets(style, record.menu.is_some()),
        )
    }

    /// The OS reports a new frame position, client size or show state
    pub fn on_structure_changed(&mut self, id: WindowId, frame_pos: Point, client_size: Size, hint: StateHint) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let frame_rect = match record.frame.and_then(|frame| self.platform.frame_rect(frame)) {
            Some(rect) if rect.position() == frame_pos => rect,
            _ => {
                let (_, insets) = self.metrics_and_insets(record);
                insets.outer(frame_pos, client_size)
            }
        };

        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        if record.pending.contains(PendingFlags::CREATE_PENDING)
            || record.state == LifecycleState::NeverMapped
        {
            record.applied = frame_rect;
            record.applied_client = client_size;
            return;
        }

        let new_state = hint.lifecycle();
        let transition = new_state != record.state;
        if transition {
            self.enter_state(id, new_state);
        }

        let Some(record) = self.records.get_mut(&id) else {
            return;
        };
        if matches!(record.state, LifecycleState::Iconic | LifecycleState::Withdrawn) {
            debug!("Geometry report for {} discarded while {}", id, record.state);
            return;
        }

        record.applied = frame_rect;
        record.applied_client = client_size;
        // A restore re-applies the requested geometry instead of adopting the OS's
        let user_driven = !transition
            && !record.pending.contains(PendingFlags::SYNC_PENDING)
            && !record.is_embedded()
            && record.state == LifecycleState::Normal;
        if user_driven {
            record.requested_size = match &record.grid {
                Some(grid) => Some(grid.size_to_units(record.req_size, client_size)),
                None if record.requested_size.is_none() && client_size == record.req_size => None,
                None => Some(client_size),
            };
            record.config_size = Some(client_size);
            record.requested_position = Some(frame_pos);
            record.flags.remove(WmFlags::NEGATIVE_X | WmFlags::NEGATIVE_Y);
            wm_trace!(
                self,
                "User moved/resized {} to {}x{}+{}+{}",
                id,
                client_size.width,
                client_size.height,
                frame_pos.x,
                frame_pos.y
            );
        }

        self.emit(ToolkitEvent::Configure {
            window: id,
            x: frame_rect.x,
            y: frame_rect.y,
            width: client_size.width,
            height: client_size.height,
        });
    }

    /// The OS destroyed the frame without a toolkit request
    pub fn on_destroyed_externally(&mut self, id: WindowId) {
        wm_trace!(self, "Frame of {} destroyed externally", id);
        self.dead_window(id, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlatformConfig, ReconcilerConfig};
    use crate::platform::{NativeHandle, SimulatedPlatform};
    use crate::wm::ToplevelOptions;
    use crate::wm::hints::Resizable;

    fn mapped() -> (WindowManager<SimulatedPlatform>, NativeHandle) {
        let mut wm = WindowManager::new(
            SimulatedPlatform::new(PlatformConfig::default()),
            ReconcilerConfig::default(),
        );
        let options = ToplevelOptions {
            req_size: Some(Size::new(200, 100)),
            ..Default::default()
        };
        wm.register_toplevel(1, ".t", options).unwrap();
        wm.map_window(1).unwrap();
        wm.take_toolkit_events();
        let frame = wm.record(1).unwrap().frame.unwrap();
        (wm, frame)
    }

    #[test]
    fn test_user_resize_becomes_request() {
        let (mut wm, _) = mapped();
        wm.request_geometry(1, "-5-5").unwrap();
        wm.run_idle();

        wm.on_structure_changed(1, Point::new(30, 40), Size::new(250, 120), StateHint::Normal);
        let record = wm.record(1).unwrap();
        assert_eq!(record.requested_size, Some(Size::new(250, 120)));
        assert_eq!(record.requested_position, Some(Point::new(30, 40)));
        assert!(!record.flags.contains(WmFlags::NEGATIVE_X));
        assert!(!wm.is_scheduled(1));
        assert!(wm.take_toolkit_events().contains(&ToolkitEvent::Configure {
            window: 1,
            x: 30,
            y: 40,
            width: 250,
            height: 120
        }));
    }

    #[test]
    fn test_user_resize_of_gridded_window_in_units() {
        let (mut wm, _) = mapped();
        wm.set_grid(1, 1, 10, 10, 5, 5).unwrap();
        wm.run_idle();
        wm.on_structure_changed(1, Point::new(0, 0), Size::new(225, 90), StateHint::Normal);
        assert_eq!(wm.record(1).unwrap().requested_size, Some(Size::new(15, 8)));
    }

    #[test]
    fn test_natural_size_report_keeps_request_unset() {
        let (mut wm, _) = mapped();
        wm.on_structure_changed(1, Point::new(0, 0), Size::new(200, 100), StateHint::Normal);
        assert_eq!(wm.record(1).unwrap().requested_size, None);
    }

    #[test]
    fn test_state_hints_drive_transitions() {
        let (mut wm, _) = mapped();
        wm.on_structure_changed(1, Point::new(0, 0), Size::new(200, 100), StateHint::Minimized);
        assert_eq!(wm.record(1).unwrap().state, LifecycleState::Iconic);

        wm.on_structure_changed(1, Point::new(-32000, -32000), Size::new(0, 0), StateHint::Minimized);
        assert_eq!(wm.record(1).unwrap().applied_client, Size::new(200, 100));

        wm.on_structure_changed(1, Point::new(0, 0), Size::new(200, 100), StateHint::Normal);
        let record = wm.record(1).unwrap();
        assert_eq!(record.state, LifecycleState::Normal);
        assert!(record.pending.contains(PendingFlags::MOVE | PendingFlags::GEOMETRY));
        assert!(wm.is_scheduled(1));

        wm.on_structure_changed(1, Point::new(0, 0), Size::new(1280, 1000), StateHint::Maximized);
        let record = wm.record(1).unwrap();
        assert_eq!(record.state, LifecycleState::Zoomed);
        assert_eq!(record.requested_size, None);
        assert_eq!(record.applied_client, Size::new(1280, 1000));
    }

    #[test]
    fn test_unknown_frames_are_ignored() {
        let (mut wm, _) = mapped();
        assert_eq!(
            wm.handle_native_event(NativeEvent::Destroyed { frame: NativeHandle(1) }),
            EventReply::Ignored
        );
    }

    #[test]
    fn test_external_destroy_notifies_toolkit() {
        let (mut wm, frame) = mapped();
        assert_eq!(
            wm.handle_native_event(NativeEvent::Destroyed { frame }),
            EventReply::Handled
        );
        assert!(wm.record(1).is_none());
        assert!(wm.take_toolkit_events().contains(&ToolkitEvent::Destroy { window: 1 }));
        assert!(!wm.platform().calls().contains(&crate::platform::sim::NativeCall::DestroyFrame { frame }));
    }

    #[test]
    fn test_tracking_replies() {
        let (mut wm, frame) = mapped();
        wm.set_resizable(1, Resizable { width: false, height: true }).unwrap();
        wm.run_idle();
        let EventReply::Limits(limits) = wm.handle_native_event(NativeEvent::GetMinMaxInfo { frame }) else {
            panic!("expected limits");
        };
        assert_eq!(limits.min.width, limits.max.width);

        wm.set_grid(1, 1, 0, 0, 10, 10).unwrap();
        let reply = wm.handle_native_event(NativeEvent::Sizing {
            frame,
            proposed: Size::new(200, 157),
        });
        assert_eq!(reply, EventReply::Size(Size::new(200, 150)));
    }

    #[test]
    fn test_activation_tracks_foreground() {
        let (mut wm, frame) = mapped();
        wm.handle_native_event(NativeEvent::Activate { frame, active: true });
        assert_eq!(wm.foreground(), Some(1));
        wm.handle_native_event(NativeEvent::Activate { frame, active: false });
        assert_eq!(wm.foreground(), None);
    }

    #[test]
    fn test_embedded_request_updates_natural_size() {
        let (mut wm, frame) = mapped();
        wm.handle_native_event(NativeEvent::EmbeddedGeometryRequest {
            frame,
            size: Size::new(90, 60),
        });
        assert_eq!(wm.record(1).unwrap().req_size, Size::new(90, 60));
        assert!(wm.is_scheduled(1));
    }
}
