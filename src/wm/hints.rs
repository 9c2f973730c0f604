//! Hints Module
//!
//! Size hints for toplevel records: gridding, min/max constraints, aspect
//! bounds and the resizable policy. Computes the pixel size the reconciler
//! asks the native window for, the tracking limits reported during
//! interactive resizing, and the constraint applied to a proposed size.

use serde::Serialize;

use crate::platform::SystemMetrics;
use crate::shared::{Insets, Size};
use crate::wm::WindowId;
use crate::wm::record::WindowRecord;

/// Gridding information. Requested sizes are in grid units while present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridState {
    /// Window that owns gridding for the toplevel
    pub controller: WindowId,
    /// Grid size that corresponds to the content's natural pixel size
    pub base_width: i32,
    pub base_height: i32,
    /// Pixels per grid unit
    pub width_inc: i32,
    pub height_inc: i32,
}

impl GridState {
    /// Grid units to pixels, relative to the content's natural size `req`.
    /// Saturates at the `i32` range.
    pub fn size_to_pixels(&self, req: Size, units: Size) -> Size {
        let axis = |req: i32, units: i32, base: i32, inc: i32| {
            saturate(i64::from(req) + (i64::from(units) - i64::from(base)) * i64::from(inc))
        };
        Size::new(
            axis(req.width, units.width, self.base_width, self.width_inc),
            axis(req.height, units.height, self.base_height, self.height_inc),
        )
    }

    /// Pixels to grid units, relative to the content's natural size `req`
    pub fn size_to_units(&self, req: Size, pixels: Size) -> Size {
        let axis = |req: i32, pixels: i32, base: i32, inc: i32| {
            saturate(i64::from(base) + (i64::from(pixels) - i64::from(req)) / i64::from(inc))
        };
        Size::new(
            axis(req.width, pixels.width, self.base_width, self.width_inc),
            axis(req.height, pixels.height, self.base_height, self.height_inc),
        )
    }

    /// Pixel size of a zero-unit grid, never negative
    fn origin(&self, req: Size) -> Size {
        Size::new(
            req.width.saturating_sub(self.base_width.saturating_mul(self.width_inc)).max(0),
            req.height.saturating_sub(self.base_height.saturating_mul(self.height_inc)).max(0),
        )
    }

    pub fn same_layout(&self, other: &GridState) -> bool {
        self.base_width == other.base_width
            && self.base_height == other.base_height
            && self.width_inc == other.width_inc
            && self.height_inc == other.height_inc
    }
}

/// Min/max size (grid units when gridded, else pixels). A max of 0 means
/// "use the OS maximum tracking size".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeConstraints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: 0,
            max_height: 0,
        }
    }
}

/// Aspect ratio bounds: min_numer/min_denom <= width/height <= max_numer/max_denom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AspectConstraints {
    pub min_numer: i32,
    pub min_denom: i32,
    pub max_numer: i32,
    pub max_denom: i32,
}

/// Independent width/height resizability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resizable {
    pub width: bool,
    pub height: bool,
}

impl Default for Resizable {
    fn default() -> Self {
        Self {
            width: true,
            height: true,
        }
    }
}

/// Frame-size limits for interactive tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackLimits {
    pub min: Size,
    pub max: Size,
}

impl WindowRecord {
    /// Min size in client pixels
    pub fn min_size_pixels(&self) -> Size {
        let min = Size::new(self.constraints.min_width, self.constraints.min_height);
        match &self.grid {
            Some(grid) => grid.size_to_pixels(self.req_size, min),
            None => min,
        }
    }

    /// Max size in client pixels, defaulting each unset axis to the OS
    /// maximum tracking size less the frame
    pub fn max_size_pixels(&self, metrics: &SystemMetrics, insets: Insets) -> Size {
        let explicit = Size::new(self.constraints.max_width, self.constraints.max_height);
        let converted = match &self.grid {
            Some(grid) => grid.size_to_pixels(self.req_size, explicit),
            None => explicit,
        };
        Size::new(
            if explicit.width > 0 {
                converted.width
            } else {
                metrics.max_track.width - insets.horizontal()
            },
            if explicit.height > 0 {
                converted.height
            } else {
                metrics.max_track.height - insets.vertical()
            },
        )
    }

    /// Client pixel size the next reconciliation pass asks for
    pub fn target_client_size(&self, metrics: &SystemMetrics, insets: Insets) -> Size {
        let wanted = match (self.requested_size, &self.grid) {
            (None, _) => self.req_size,
            (Some(units), Some(grid)) => grid.size_to_pixels(self.req_size, units),
            (Some(pixels), None) => pixels,
        };
        let min = self.min_size_pixels();
        let max = self.max_size_pixels(metrics, insets);
        Size::new(
            clamp_axis(wanted.width, min.width, max.width),
            clamp_axis(wanted.height, min.height, max.height),
        )
    }

    /// Frame-size limits for interactive moves and resizes
    pub fn track_limits(&self, metrics: &SystemMetrics, insets: Insets) -> TrackLimits {
        let mut limits = match &self.grid {
            Some(grid) => {
                let origin = grid.origin(self.req_size);
                let max = self.max_size_pixels(metrics, insets);
                TrackLimits {
                    min: Size::new(
                        origin
                            .width
                            .saturating_add(self.constraints.min_width.saturating_mul(grid.width_inc))
                            .saturating_add(insets.horizontal()),
                        origin
                            .height
                            .saturating_add(self.constraints.min_height.saturating_mul(grid.height_inc))
                            .saturating_add(insets.vertical()),
                    ),
                    max: Size::new(
                        max.width.saturating_add(insets.horizontal()),
                        max.height.saturating_add(insets.vertical()),
                    ),
                }
            }
            None => {
                let min = self.min_size_pixels();
                let max = self.max_size_pixels(metrics, insets);
                TrackLimits {
                    min: Size::new(
                        min.width.saturating_add(insets.horizontal()),
                        min.height.saturating_add(insets.vertical()),
                    ),
                    max: Size::new(
                        max.width.saturating_add(insets.horizontal()),
                        max.height.saturating_add(insets.vertical()),
                    ),
                }
            }
        };

        if !self.resizable.width {
            let pinned = self.applied_client.width + insets.horizontal();
            limits.min.width = pinned;
            limits.max.width = pinned;
        }
        if !self.resizable.height {
            let pinned = self.applied_client.height + insets.vertical();
            limits.min.height = pinned;
            limits.max.height = pinned;
        }
        limits
    }

    /// Constrain a proposed client size during an interactive resize: min/max,
    /// grid increments, aspect bounds, then pinned axes
    pub fn constrain_size(&self, proposed: Size, metrics: &SystemMetrics, insets: Insets) -> Size {
        let min = self.min_size_pixels();
        let max = self.max_size_pixels(metrics, insets);
        let mut size = Size::new(
            clamp_axis(proposed.width, min.width, max.width),
            clamp_axis(proposed.height, min.height, max.height),
        );

        // Snap down to whole grid units
        if let Some(grid) = &self.grid {
            let origin = grid.origin(self.req_size);
            size.width = origin.width + ((size.width - origin.width) / grid.width_inc) * grid.width_inc;
            size.height = origin.height + ((size.height - origin.height) / grid.height_inc) * grid.height_inc;
            while size.width < min.width {
                size.width = size.width.saturating_add(grid.width_inc);
            }
            while size.height < min.height {
                size.height = size.height.saturating_add(grid.height_inc);
            }
        }

        if let Some(aspect) = &self.aspect {
            let (w, h) = (i64::from(size.width), i64::from(size.height));
            if w * i64::from(aspect.min_denom) < h * i64::from(aspect.min_numer) {
                // Too narrow: give up height
                let height = w * i64::from(aspect.min_denom) / i64::from(aspect.min_numer);
                size.height = i32::try_from(height).unwrap_or(size.height).max(1);
            } else if w * i64::from(aspect.max_denom) > h * i64::from(aspect.max_numer) {
                // Too wide: give up width
                let width = h * i64::from(aspect.max_numer) / i64::from(aspect.max_denom);
                size.width = i32::try_from(width).unwrap_or(size.width).max(1);
            }
        }

        if !self.resizable.width {
            size.width = self.applied_client.width;
        }
        if !self.resizable.height {
            size.height = self.applied_client.height;
        }
        size
    }
}

/// At least one pixel, then min, then max
fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

fn clamp_axis(value: i32, min: i32, max: i32) -> i32 {
    let mut value = value.max(1);
    if value < min {
        value = min;
    } else if max > 0 && value > max {
        value = max;
    }
    value.max(1)
}
