//! Transients Module
//!
//! Transient-for (master) relationships between toplevels. The relationship
//! is stored on the transient as a back-reference id; masters are looked up
//! through the registry, so destroying a master only has to clear the ids.

use tracing::debug;

use crate::platform::NativePlatform;
use crate::wm::client_flags::{LifecycleState, PendingFlags, WmFlags};
use crate::wm::error::{WmError, WmResult};
use crate::wm::{WindowId, WindowManager};

impl<P: NativePlatform> WindowManager<P> {
    /// Set or clear the master of `id`. A new master changes the decoration
    /// style, so the frame is recreated by the next pass.
    pub fn set_master(&mut self, id: WindowId, master: Option<WindowId>) -> WmResult<()> {
        let record = self.get(id)?;
        if let Some(owner) = record.icon_for {
            return Err(WmError::IsIconFor {
                action: "make a transient of",
                window: record.path.clone(),
                owner: self.path_of(owner),
            });
        }

        if let Some(master) = master {
            if master == id {
                return Err(WmError::OwnMaster(record.path.clone()));
            }
            let master_record = self.get(master)?;
            if let Some(owner) = master_record.icon_for {
                return Err(WmError::MasterIsIcon {
                    master: master_record.path.clone(),
                    owner: self.path_of(owner),
                });
            }
            if self.master_chain_contains(master, id) {
                return Err(WmError::MasterCycle {
                    master: master_record.path.clone(),
                });
            }
        }

        let record = self.get_mut(id)?;
        if record.master == master {
            return Ok(());
        }
        record.master = master;
        record.flags.remove(WmFlags::HIDDEN_WITH_MASTER);
        wm_trace!(self, "Master of {} is now {:?}", id, master);
        self.mark_dirty(id, PendingFlags::STYLE);
        Ok(())
    }

    /// Does following masters from `start` reach `target`?
    fn master_chain_contains(&self, start: WindowId, target: WindowId) -> bool {
        let mut current = Some(start);
        let mut steps = 0;
        while let Some(window) = current {
            if window == target {
                return true;
            }
            steps += 1;
            if steps > self.records.len() {
                break;
            }
            current = self.records.get(&window).and_then(|r| r.master);
        }
        false
    }

    /// Transients of `master`, ordered by id
    pub fn transients_of(&self, master: WindowId) -> Vec<WindowId> {
        let mut transients: Vec<WindowId> = self
            .records
            .values()
            .filter(|r| r.master == Some(master))
            .map(|r| r.id)
            .collect();
        transients.sort_unstable();
        transients
    }

    /// Hide the mapped transients of an iconified master
    pub(crate) fn hide_transients(&mut self, master: WindowId) {
        for transient in self.transients_of(master) {
            let Some(record) = self.records.get_mut(&transient) else {
                continue;
            };
            if !record.state.is_viewable() {
                continue;
            }
            debug!("Hiding transient {} with its master {}", transient, master);
            record.flags |= WmFlags::HIDDEN_WITH_MASTER;
            self.show_state(transient, LifecycleState::Withdrawn);
        }
    }

    /// Re-show transients hidden by `hide_transients`
    pub(crate) fn restore_transients(&mut self, master: WindowId) {
        for transient in self.transients_of(master) {
            let Some(record) = self.records.get_mut(&transient) else {
                continue;
            };
            if !record.flags.contains(WmFlags::HIDDEN_WITH_MASTER) {
                continue;
            }
            debug!("Restoring transient {} with its master {}", transient, master);
            record.flags.remove(WmFlags::HIDDEN_WITH_MASTER);
            self.show_state(transient, LifecycleState::Normal);
        }
    }
}
