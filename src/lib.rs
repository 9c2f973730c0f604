//! winwm
//!
//! Toplevel window-manager reconciler: keeps each toolkit toplevel's
//! declared geometry, decoration and lifecycle state in sync with its
//! native frame, and translates native notifications back into toolkit
//! events.

pub mod config;
pub mod platform;
pub mod shared;
pub mod wm;

pub use config::Config;
pub use wm::WindowManager;
pub use wm::error::WmError;
