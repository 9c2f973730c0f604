//! Shared value types

pub mod geometry;

pub use geometry::{Insets, Point, Rect, Size};
