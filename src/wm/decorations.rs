//! Decorations Module
//!
//! Derives the decorative frame style of a toplevel from its override-redirect
//! flag, transient relationship and resizable policy. A live frame's style
//! class cannot be changed in place; a stale style means the frame has to be
//! destroyed and recreated.

use bitflags::bitflags;
use serde::Serialize;

use crate::wm::hints::Resizable;

/// The three mutually exclusive style classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecorationStyle {
    /// No decoration, no window-manager placement (menus, tooltips)
    OverridePopup,
    /// Owned dialog frame
    TransientDialog,
    /// Regular application window
    NormalToplevel,
}

bitflags! {
    /// Native style bits of a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StyleBits: u32 {
        const POPUP          = 1 << 0;
        const CAPTION        = 1 << 1;
        const SYSMENU        = 1 << 2;
        const THICKFRAME     = 1 << 3;
        const MINIMIZEBOX    = 1 << 4;
        const MAXIMIZEBOX    = 1 << 5;
        const CLIPCHILDREN   = 1 << 6;
        const CLIPSIBLINGS   = 1 << 7;
        /// Extended: tool window (no taskbar button)
        const TOOLWINDOW     = 1 << 8;
        /// Extended: dialog modal frame
        const DLGMODALFRAME  = 1 << 9;
    }
}

impl StyleBits {
    fn overlapped_window() -> Self {
        Self::CAPTION | Self::SYSMENU | Self::THICKFRAME | Self::MINIMIZEBOX | Self::MAXIMIZEBOX
    }
}

/// Full frame style: class plus native bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStyle {
    pub class: DecorationStyle,
    pub bits: StyleBits,
}

impl FrameStyle {
    /// Derive the frame style for a toplevel
    pub fn derive(override_redirect: bool, has_master: bool, resizable: Resizable) -> Self {
        let fixed = !resizable.width && !resizable.height;
        if override_redirect {
            Self {
                class: DecorationStyle::OverridePopup,
                bits: StyleBits::POPUP
                    | StyleBits::CLIPCHILDREN
                    | StyleBits::CLIPSIBLINGS
                    | StyleBits::TOOLWINDOW,
            }
        } else if has_master {
            let mut bits = StyleBits::POPUP
                | StyleBits::CAPTION
                | StyleBits::SYSMENU
                | StyleBits::CLIPSIBLINGS
                | StyleBits::CLIPCHILDREN
                | StyleBits::DLGMODALFRAME;
            if !fixed {
                bits |= StyleBits::THICKFRAME;
            }
            Self {
                class: DecorationStyle::TransientDialog,
                bits,
            }
        } else {
            let mut bits = StyleBits::overlapped_window()
                | StyleBits::CLIPCHILDREN
                | StyleBits::CLIPSIBLINGS;
            if fixed {
                bits.remove(StyleBits::MAXIMIZEBOX | StyleBits::THICKFRAME);
            }
            Self {
                class: DecorationStyle::NormalToplevel,
                bits,
            }
        }
    }

    pub fn is_sizable(&self) -> bool {
        self.bits.contains(StyleBits::THICKFRAME)
    }
}
