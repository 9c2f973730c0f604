//! Menu Module
//!
//! Menu bars attached to a toplevel's frame (`-menu` on a toplevel). The
//! menu sits inside the frame's top inset, so attaching or removing one
//! changes the client area and forces a geometry pass.

use crate::platform::{MenuHandle, NativePlatform};
use crate::wm::client_flags::PendingFlags;
use crate::wm::error::WmResult;
use crate::wm::{WindowId, WindowManager};

impl<P: NativePlatform> WindowManager<P> {
    /// Attach `menu` to the frame of `id`, or remove the current one
    pub fn set_menu(&mut self, id: WindowId, menu: Option<MenuHandle>) -> WmResult<()> {
        let record = self.get_mut(id)?;
        if record.menu == menu {
            return Ok(());
        }
        record.menu = menu;
        let frame = record.frame;

        wm_trace!(self, "Menu of {} is now {:?}", id, menu);
        if let Some(frame) = frame {
            self.with_sync(id, |platform| platform.set_menu(frame, menu));
        }
        self.mark_dirty(id, PendingFlags::MOVE | PendingFlags::GEOMETRY);
        Ok(())
    }

    pub fn menu(&self, id: WindowId) -> WmResult<Option<MenuHandle>> {
        Ok(self.get(id)?.menu)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{PlatformConfig, ReconcilerConfig};
    use crate::platform::sim::NativeCall;
    use crate::platform::{MenuHandle, SimulatedPlatform};
    use crate::shared::Size;
    use crate::wm::{ToplevelOptions, WindowManager};

    fn manager(wrap_width: i32, retries: u32) -> WindowManager<SimulatedPlatform> {
        let mut platform = PlatformConfig::default();
        platform.menu_wrap_width = wrap_width;
        let config = ReconcilerConfig {
            menu_wrap_retries: retries,
            ..ReconcilerConfig::default()
        };
        let mut wm = WindowManager::new(SimulatedPlatform::new(platform), config);
        let options = ToplevelOptions {
            req_size: Some(Size::new(300, 200)),
            ..Default::default()
        };
        wm.register_toplevel(1, ".t", options).unwrap();
        wm.map_window(1).unwrap();
        wm.run_idle();
        wm.platform_mut().clear_calls();
        wm
    }

    #[test]
    fn test_menu_keeps_client_size() {
        let mut wm = manager(0, 4);
        wm.set_menu(1, Some(MenuHandle(9))).unwrap();
        let frame = wm.record(1).unwrap().frame.unwrap();
        assert!(wm.platform().calls().contains(&NativeCall::SetMenu {
            frame,
            menu: Some(MenuHandle(9))
        }));
        // The frame kept its size, so the client lost the menu height
        assert_eq!(wm.record(1).unwrap().applied_client, Size::new(300, 181));

        wm.run_idle();
        assert_eq!(wm.platform().frame_rect_calls(), 1);
        assert_eq!(wm.record(1).unwrap().applied_client, Size::new(300, 200));
        assert_eq!(wm.menu(1).unwrap(), Some(MenuHandle(9)));
    }

    #[test]
    fn test_wrapped_menu_is_compensated() {
        let mut wm = manager(400, 4);
        wm.set_menu(1, Some(MenuHandle(9))).unwrap();
        wm.run_idle();

        // One attempt at the nominal size, one more after the menu wrapped
        assert_eq!(wm.platform().frame_rect_calls(), 2);
        assert_eq!(wm.record(1).unwrap().applied_client, Size::new(300, 200));
    }

    #[test]
    fn test_wrap_retries_are_bounded() {
        let mut wm = manager(400, 0);
        wm.set_menu(1, Some(MenuHandle(9))).unwrap();
        wm.run_idle();

        assert_eq!(wm.platform().frame_rect_calls(), 1);
        assert_eq!(wm.record(1).unwrap().applied_client, Size::new(300, 181));
        assert!(!wm.is_scheduled(1));
    }

    #[test]
    fn test_menu_before_first_map_is_part_of_frame() {
        let mut wm = WindowManager::new(
            SimulatedPlatform::new(PlatformConfig::default()),
            ReconcilerConfig::default(),
        );
        let options = ToplevelOptions {
            req_size: Some(Size::new(300, 200)),
            ..Default::default()
        };
        wm.register_toplevel(1, ".t", options).unwrap();
        wm.set_menu(1, Some(MenuHandle(3))).unwrap();
        assert!(wm.platform().calls().iter().all(|c| !matches!(c, NativeCall::SetMenu { .. })));

        wm.map_window(1).unwrap();
        assert_eq!(wm.record(1).unwrap().applied_client, Size::new(300, 200));
    }
}
