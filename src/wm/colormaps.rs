//! Colormaps Module
//!
//! Per-toplevel colormap window lists and palette installation. The list is
//! collected automatically as descendants acquire non-default colormaps,
//! unless the user set it explicitly with `wm colormapwindows`. Realizing a
//! palette can fail to take effect when too many are realized already; that
//! only degrades colors and is never an error.

use tracing::debug;

use crate::platform::{ColormapId, NativePlatform};
use crate::wm::client_flags::WmFlags;
use crate::wm::error::WmResult;
use crate::wm::{ToolkitEvent, WindowId, WindowManager};

impl<P: NativePlatform> WindowManager<P> {
    /// Colormap used by any toolkit window
    pub fn colormap_of(&self, window: WindowId) -> ColormapId {
        match self.records.get(&window) {
            Some(record) => record.colormap,
            None => self
                .window_colormaps
                .get(&window)
                .copied()
                .unwrap_or(ColormapId::DEFAULT),
        }
    }

    /// Give `window` (a toplevel or one of its descendants) a colormap
    pub fn set_window_colormap(&mut self, window: WindowId, colormap: ColormapId) {
        match self.records.get_mut(&window) {
            Some(record) => record.colormap = colormap,
            None if colormap == ColormapId::DEFAULT => {
                self.window_colormaps.remove(&window);
            }
            None => {
                self.window_colormaps.insert(window, colormap);
            }
        }
    }

    /// Note that `window` inside toplevel `id` has a non-default colormap.
    /// The toplevel itself joins the list after its first descendant and
    /// stays behind every descendant added later.
    pub fn add_to_colormap_windows(&mut self, id: WindowId, window: WindowId) -> WmResult<()> {
        let record = self.get_mut(id)?;
        if record.flags.contains(WmFlags::COLORMAPS_EXPLICIT) {
            return Ok(());
        }
        if record.colormap_windows.contains(&window) {
            return Ok(());
        }
        match record.colormap_windows.iter().position(|&w| w == id) {
            Some(toplevel) => record.colormap_windows.insert(toplevel, window),
            None => {
                record.colormap_windows.push(window);
                record.colormap_windows.push(id);
            }
        }
        debug!("Colormap windows of {}: {:?}", id, record.colormap_windows);
        Ok(())
    }

    pub fn remove_from_colormap_windows(&mut self, id: WindowId, window: WindowId) -> WmResult<()> {
        let record = self.get_mut(id)?;
        record.colormap_windows.retain(|&w| w != window);
        Ok(())
    }

    /// Set the list explicitly (`wm colormapwindows`). The toplevel is
    /// appended when missing and left out of later queries.
    pub fn set_colormap_windows(&mut self, id: WindowId, windows: &[WindowId]) -> WmResult<()> {
        let record = self.get_mut(id)?;
        let mut list: Vec<WindowId> = Vec::with_capacity(windows.len() + 1);
        for &window in windows {
            if !list.contains(&window) {
                list.push(window);
            }
        }
        let added = !list.contains(&id);
        if added {
            list.push(id);
        }
        record.colormap_windows = list;
        record.flags |= WmFlags::COLORMAPS_EXPLICIT;
        record.flags.set(WmFlags::ADDED_TOPLEVEL_COLORMAP, added);
        wm_trace!(self, "Colormap windows of {} set explicitly", id);
        Ok(())
    }

    /// The list as the user sees it
    pub fn colormap_windows(&self, id: WindowId) -> WmResult<Vec<WindowId>> {
        let record = self.get(id)?;
        let mut list = record.colormap_windows.clone();
        if record.flags.contains(WmFlags::ADDED_TOPLEVEL_COLORMAP) {
            list.retain(|&w| w != id);
        }
        Ok(list)
    }

    /// Install the toplevel's colormaps into its frame. In the foreground the
    /// toplevel's own colormap is realized as the foreground palette, then the
    /// listed windows' colormaps in the background, in list order; otherwise
    /// only the toplevel's own colormap is realized, in the background.
    /// Windows whose colormap changed are exposed. Returns the number of
    /// palette entries that changed.
    pub fn install_colormaps(&mut self, id: WindowId, is_foreground: bool) -> usize {
        let Some(record) = self.records.get(&id) else {
            return 0;
        };
        let Some(frame) = record.frame else {
            return 0;
        };
        let mut order = vec![id];
        order.extend(record.colormap_windows.iter().copied().filter(|&w| w != id));

        let mut installed: Vec<ColormapId> = Vec::new();
        let mut total = 0;
        for (index, window) in order.iter().enumerate() {
            let colormap = self.colormap_of(*window);
            if installed.contains(&colormap) {
                continue;
            }
            installed.push(colormap);

            let background = !is_foreground || index > 0;
            let changed = self.platform.realize_palette(frame, colormap, background);
            if changed == 0 {
                debug!("Palette {:?} of {} not realized", colormap, id);
            } else {
                total += changed;
                for &exposed in &order {
                    if self.colormap_of(exposed) == colormap {
                        self.emit(ToolkitEvent::Expose { window: exposed });
                    }
                }
            }
            if !is_foreground {
                break;
            }
        }
        wm_trace!(self, "Installed colormaps of {} ({} entries changed)", id, total);
        total
    }
}
