//! Stacking Module
//!
//! Z-order requests between toplevels (`raise`/`lower` in the toolkit). Both
//! windows are realized first, mapping them implicitly when needed, and the
//! resulting order is mirrored here.

use tracing::debug;

use crate::platform::{NativePlatform, StackPlacement};
use crate::wm::client_flags::LifecycleState;
use crate::wm::error::WmResult;
use crate::wm::{WindowId, WindowManager};

/// Where to restack relative to the other window (or all siblings)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRelation {
    Above,
    Below,
}

/// Stacking manager
pub struct StackingManager {
    /// Stacking order (bottom to top)
    stacking_order: Vec<WindowId>,
}

impl StackingManager {
    /// Create a new stacking manager
    pub fn new() -> Self {
        Self {
            stacking_order: Vec::new(),
        }
    }

    /// Add window to the top of the stacking order
    pub fn add_window(&mut self, window: WindowId) {
        if !self.stacking_order.contains(&window) {
            self.stacking_order.push(window);
        }
    }

    /// Remove window from stacking order
    pub fn remove_window(&mut self, window: WindowId) {
        self.stacking_order.retain(|&w| w != window);
    }

    /// Move `window` directly above or below `sibling`, or to the top or
    /// bottom when there is none
    pub fn restack(&mut self, window: WindowId, relation: StackRelation, sibling: Option<WindowId>) {
        self.stacking_order.retain(|&w| w != window);
        let index = match (relation, sibling) {
            (StackRelation::Above, None) => self.stacking_order.len(),
            (StackRelation::Below, None) => 0,
            (StackRelation::Above, Some(other)) => self
                .stacking_order
                .iter()
                .position(|&w| w == other)
                .map_or(self.stacking_order.len(), |i| i + 1),
            (StackRelation::Below, Some(other)) => self
                .stacking_order
                .iter()
                .position(|&w| w == other)
                .unwrap_or(0),
        };
        self.stacking_order.insert(index, window);
    }

    /// Get stacking order (bottom to top)
    pub fn get_stacking_order(&self) -> &[WindowId] {
        &self.stacking_order
    }
}

impl Default for StackingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: NativePlatform> WindowManager<P> {
    /// Restack `id` above or below `other` (or all siblings when `None`)
    pub fn restack(&mut self, id: WindowId, relation: StackRelation, other: Option<WindowId>) -> WmResult<()> {
        self.get(id)?;
        if let Some(other) = other {
            self.get(other)?;
        }
        self.ensure_realized(id)?;
        if let Some(other) = other {
            self.ensure_realized(other)?;
        }

        let Some(frame) = self.get(id)?.frame else {
            debug!("Restack of embedded {} left to its container", id);
            return Ok(());
        };
        let sibling_frame = match other {
            Some(other) => self.get(other)?.frame,
            None => None,
        };
        let placement = match (relation, sibling_frame) {
            (StackRelation::Above, None) => StackPlacement::Top,
            (StackRelation::Below, None) => StackPlacement::Bottom,
            (StackRelation::Above, Some(sibling)) => StackPlacement::Above(sibling),
            (StackRelation::Below, Some(sibling)) => StackPlacement::Below(sibling),
        };

        wm_trace!(self, "Restack {} {:?} {:?}", id, relation, other);
        self.with_sync(id, |platform| platform.restack(frame, placement));
        self.stacking.restack(id, relation, sibling_frame.and(other));
        Ok(())
    }

    /// Bottom-to-top order of realized toplevels
    pub fn stacking_order(&self) -> &[WindowId] {
        self.stacking.get_stacking_order()
    }

    /// Map (and realize) a window implicitly before restacking it
    fn ensure_realized(&mut self, id: WindowId) -> WmResult<()> {
        if self.get(id)?.state == LifecycleState::NeverMapped {
            self.map_window(id)?;
        }
        let record = self.get(id)?;
        if record.frame.is_none() && !record.is_embedded() {
            self.realize_now(id)?;
        }
        Ok(())
    }
}
