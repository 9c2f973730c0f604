//! Window Record
//!
//! Per-toplevel state owned by the reconciler. Relationships to other
//! toplevels (master, icon, group leader) are stored as ids and resolved
//! through the registry, never as owning references.

use serde::Serialize;

use crate::platform::{ColormapId, MenuHandle, NativeHandle};
use crate::shared::{Point, Rect, Size};
use crate::wm::WindowId;
use crate::wm::client_flags::{FocusModel, LifecycleState, PendingFlags, Source, WmFlags};
use crate::wm::decorations::FrameStyle;
use crate::wm::error::{WmError, WmResult};
use crate::wm::hints::{AspectConstraints, GridState, Resizable, SizeConstraints};

/// Descriptive attributes that are stored and reported but do not take part
/// in reconciliation (except the title, which is pushed to the frame)
#[derive(Debug, Clone, Default, Serialize)]
pub struct Attributes {
    pub title: Option<String>,
    pub icon_name: Option<String>,
    pub icon_bitmap: Option<String>,
    pub icon_mask: Option<String>,
    pub icon_position: Option<Point>,
    pub client_machine: Option<String>,
    pub command: Option<Vec<String>>,
    pub focus_model: FocusModel,
    pub group_leader: Option<WindowId>,
    pub position_source: Option<Source>,
    pub size_source: Option<Source>,
}

/// State of one toplevel window
#[derive(Debug)]
pub struct WindowRecord {
    /// Toolkit window identity
    pub id: WindowId,

    /// Toolkit path name (".top")
    pub path: String,

    /// Decorative frame; created lazily, replaced when the style changes
    pub frame: Option<NativeHandle>,

    /// Client area the toolkit draws into
    pub content: NativeHandle,

    /// Frame owned by another process, for embedded toplevels
    pub container: Option<NativeHandle>,

    /// Transient-for relationship (back-reference)
    pub master: Option<WindowId>,

    /// Requested size; grid units when gridded. None = follow the content
    pub requested_size: Option<Size>,

    /// Requested frame position; axes may be measured from the far edges
    /// (see `WmFlags::NEGATIVE_X` / `NEGATIVE_Y`). None = OS placement
    pub requested_position: Option<Point>,

    /// Natural size requested by the toolkit's content geometry manager
    /// (0x0 until the content has asked for one)
    pub req_size: Size,

    pub grid: Option<GridState>,
    pub constraints: SizeConstraints,
    pub aspect: Option<AspectConstraints>,
    pub resizable: Resizable,

    /// Style the current frame was created with
    pub applied_style: Option<FrameStyle>,

    pub state: LifecycleState,

    /// State to show in when next mapped
    pub initial_state: LifecycleState,

    /// This record serves as the icon window of another record
    pub icon_for: Option<WindowId>,

    /// This record's own icon window
    pub icon: Option<WindowId>,

    pub pending: PendingFlags,

    /// Bits re-requested while a reconciliation pass was running
    pub rearmed: PendingFlags,

    pub flags: WmFlags,

    /// Client size most recently requested of the OS
    pub config_size: Option<Size>,

    /// Frame rectangle last observed from the OS
    pub applied: Rect,

    /// Client size last observed from the OS
    pub applied_client: Size,

    /// Primary colormap of the toplevel
    pub colormap: ColormapId,

    /// Windows whose colormaps are installed with this toplevel, in order
    pub colormap_windows: Vec<WindowId>,

    pub menu: Option<MenuHandle>,

    pub attributes: Attributes,
}

impl WindowRecord {
    pub fn new(id: WindowId, path: String, content: NativeHandle) -> Self {
        Self {
            id,
            path,
            frame: None,
            content,
            container: None,
            master: None,
            requested_size: None,
            requested_position: None,
            req_size: Size::default(),
            grid: None,
            constraints: SizeConstraints::default(),
            aspect: None,
            resizable: Resizable::default(),
            applied_style: None,
            state: LifecycleState::NeverMapped,
            initial_state: LifecycleState::Normal,
            icon_for: None,
            icon: None,
            pending: PendingFlags::empty(),
            rearmed: PendingFlags::empty(),
            flags: WmFlags::empty(),
            config_size: None,
            applied: Rect::default(),
            applied_client: Size::default(),
            colormap: ColormapId::DEFAULT,
            colormap_windows: Vec::new(),
            menu: None,
            attributes: Attributes::default(),
        }
    }

    pub fn is_override_redirect(&self) -> bool {
        self.flags.contains(WmFlags::OVERRIDE_REDIRECT)
    }

    pub fn is_embedded(&self) -> bool {
        self.flags.contains(WmFlags::EMBEDDED)
    }

    /// Handle native geometry and state requests go to
    pub fn native_target(&self) -> Option<NativeHandle> {
        if self.is_embedded() {
            self.container
        } else {
            self.frame
        }
    }

    pub fn is_realized(&self) -> bool {
        self.native_target().is_some() && self.state != LifecycleState::NeverMapped
    }

    /// Pixel increments currently in effect (1x1 when ungridded)
    pub fn increments(&self) -> Size {
        match &self.grid {
            Some(grid) => Size::new(grid.width_inc, grid.height_inc),
            None => Size::new(1, 1),
        }
    }

    /// Check whether the toolkit may move this record to `target`.
    ///
    /// `owner_path` names the record this one is an icon for, if any.
    /// Embedded records are rejected only for iconify; other transitions are
    /// delegated to the embedding process by the caller.
    pub fn check_transition(&self, target: LifecycleState, owner_path: Option<&str>) -> WmResult<()> {
        let action = match target {
            LifecycleState::NeverMapped => {
                return Err(WmError::InvalidValue(format!(
                    "bad argument \"{}\": must be normal, iconic, withdrawn, or zoomed",
                    target.name()
                )));
            }
            LifecycleState::Withdrawn => "withdraw",
            LifecycleState::Iconic => "iconify",
            LifecycleState::Normal => "deiconify",
            LifecycleState::Zoomed => "zoom",
        };

        if self.icon_for.is_some() {
            return Err(WmError::IsIconFor {
                action,
                window: self.path.clone(),
                owner: owner_path.unwrap_or("?").to_string(),
            });
        }

        match target {
            LifecycleState::Iconic => {
                if self.is_override_redirect() {
                    return Err(WmError::OverrideRedirect {
                        action,
                        window: self.path.clone(),
                    });
                }
                if self.master.is_some() {
                    return Err(WmError::Transient(self.path.clone()));
                }
                if self.is_embedded() {
                    return Err(WmError::Embedded(self.path.clone()));
                }
            }
            LifecycleState::Zoomed if self.is_override_redirect() => {
                return Err(WmError::OverrideRedirect {
                    action,
                    window: self.path.clone(),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug)]
    enum Variant {
        Plain,
        Override,
        Transient,
        IconFor,
        Embedded,
    }

    fn record(variant: Variant, state: LifecycleState) -> WindowRecord {
        let mut record = WindowRecord::new(1, ".w".into(), NativeHandle(1));
        record.state = state;
        match variant {
            Variant::Plain => {}
            Variant::Override => record.flags |= WmFlags::OVERRIDE_REDIRECT,
            Variant::Transient => record.master = Some(2),
            Variant::IconFor => record.icon_for = Some(2),
            Variant::Embedded => {
                record.flags |= WmFlags::EMBEDDED;
                record.container = Some(NativeHandle(9));
            }
        }
        record
    }

    fn expected_legal(variant: Variant, target: LifecycleState) -> bool {
        match (variant, target) {
            (_, LifecycleState::NeverMapped) => false,
            (Variant::IconFor, _) => false,
            (Variant::Override, LifecycleState::Iconic | LifecycleState::Zoomed) => false,
            (Variant::Transient | Variant::Embedded, LifecycleState::Iconic) => false,
            _ => true,
        }
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        let variants = [
            Variant::Plain,
            Variant::Override,
            Variant::Transient,
            Variant::IconFor,
            Variant::Embedded,
        ];
        for variant in variants {
            for current in LifecycleState::ALL {
                for target in LifecycleState::ALL {
                    let record = record(variant, current);
                    let result = record.check_transition(target, Some(".owner"));
                    assert_eq!(
                        result.is_ok(),
                        expected_legal(variant, target),
                        "{variant:?}: {current} -> {target} gave {result:?}"
                    );
                    assert_eq!(record.state, current);
                }
            }
        }
    }

    #[test]
    fn test_rejection_messages() {
        let err = record(Variant::IconFor, LifecycleState::Withdrawn)
            .check_transition(LifecycleState::Normal, Some(".main"))
            .unwrap_err();
        assert_eq!(err.to_string(), "can't deiconify \".w\": it is an icon for \".main\"");

        let err = record(Variant::Override, LifecycleState::Normal)
            .check_transition(LifecycleState::Iconic, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "can't iconify \".w\": override-redirect flag is set");
    }
}
