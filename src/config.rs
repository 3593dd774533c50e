//! Tunables for the layout engine.
//!
//! The engine itself never reads the environment; hosts build a
//! [`LayoutConfig`] (usually via [`LayoutConfig::builder`]) and hand it over.

use crate::types::{EPSILON_GENERAL, Size};
use crate::viewport::ZoomLimits;

/// Configuration for placement, booking and interaction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Edge length of one booking-grid cell in grid units.
    pub cell_size: f64,
    /// Upper bound for the booking grid's cell count; containers needing more
    /// cells are rejected.
    pub max_grid_cells: usize,
    /// Step of the first-fit scan (smaller = finer placement, slower scan).
    pub scan_step: f64,
    /// Largest item width accepted by `validate_dimensions`.
    pub max_item_width: f64,
    /// Largest item height accepted by `validate_dimensions`.
    pub max_item_height: f64,
    /// Outer authoring canvas; the container origin is clamped to
    /// `[0, canvas - container size]` on group moves.
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Width of the band along an item's edge that grabs the whole container.
    pub border_tolerance: f64,
    /// General numerical tolerance.
    pub epsilon: f64,
}

impl LayoutConfig {
    pub const DEFAULT_CELL_SIZE: f64 = 1.0;
    pub const DEFAULT_MAX_GRID_CELLS: usize = 4096 * 4096;
    pub const DEFAULT_SCAN_STEP: f64 = 1.0;
    pub const DEFAULT_MAX_ITEM_WIDTH: f64 = 10_000.0;
    pub const DEFAULT_MAX_ITEM_HEIGHT: f64 = 10_000.0;
    pub const DEFAULT_CANVAS_WIDTH: f64 = 10_000.0;
    pub const DEFAULT_CANVAS_HEIGHT: f64 = 10_000.0;
    pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
    pub const DEFAULT_MAX_ZOOM: f64 = 5.0;
    pub const DEFAULT_BORDER_TOLERANCE: f64 = 0.5;
    pub const DEFAULT_EPSILON: f64 = EPSILON_GENERAL;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }

    /// Largest accepted item size.
    pub fn max_item_size(&self) -> Size {
        Size::new(self.max_item_width, self.max_item_height)
    }

    /// Size of the outer authoring canvas.
    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits::new(self.min_zoom, self.max_zoom)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_size: Self::DEFAULT_CELL_SIZE,
            max_grid_cells: Self::DEFAULT_MAX_GRID_CELLS,
            scan_step: Self::DEFAULT_SCAN_STEP,
            max_item_width: Self::DEFAULT_MAX_ITEM_WIDTH,
            max_item_height: Self::DEFAULT_MAX_ITEM_HEIGHT,
            canvas_width: Self::DEFAULT_CANVAS_WIDTH,
            canvas_height: Self::DEFAULT_CANVAS_HEIGHT,
            min_zoom: Self::DEFAULT_MIN_ZOOM,
            max_zoom: Self::DEFAULT_MAX_ZOOM,
            border_tolerance: Self::DEFAULT_BORDER_TOLERANCE,
            epsilon: Self::DEFAULT_EPSILON,
        }
    }
}

/// Builder for [`LayoutConfig`].
///
/// Non-positive values for strictly positive settings are ignored and the
/// previous value is kept.
#[derive(Clone, Debug, Default)]
pub struct LayoutConfigBuilder {
    config: LayoutConfig,
}

impl LayoutConfigBuilder {
    pub fn cell_size(mut self, size: f64) -> Self {
        if size > 0.0 {
            self.config.cell_size = size;
        }
        self
    }

    pub fn max_grid_cells(mut self, cells: usize) -> Self {
        if cells > 0 {
            self.config.max_grid_cells = cells;
        }
        self
    }

    pub fn scan_step(mut self, step: f64) -> Self {
        if step > 0.0 {
            self.config.scan_step = step;
        }
        self
    }

    pub fn max_item_size(mut self, width: f64, height: f64) -> Self {
        if width > 0.0 {
            self.config.max_item_width = width;
        }
        if height > 0.0 {
            self.config.max_item_height = height;
        }
        self
    }

    pub fn canvas_size(mut self, width: f64, height: f64) -> Self {
        if width > 0.0 {
            self.config.canvas_width = width;
        }
        if height > 0.0 {
            self.config.canvas_height = height;
        }
        self
    }

    /// Sets the zoom range; ignored unless `0 < min <= max`.
    pub fn zoom_range(mut self, min: f64, max: f64) -> Self {
        if min > 0.0 && min <= max {
            self.config.min_zoom = min;
            self.config.max_zoom = max;
        }
        self
    }

    pub fn border_tolerance(mut self, tolerance: f64) -> Self {
        if tolerance >= 0.0 {
            self.config.border_tolerance = tolerance;
        }
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        if epsilon > 0.0 {
            self.config.epsilon = epsilon;
        }
        self
    }

    pub fn build(self) -> LayoutConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = LayoutConfig::builder()
            .cell_size(10.0)
            .max_grid_cells(500)
            .scan_step(5.0)
            .max_item_size(300.0, 200.0)
            .zoom_range(0.5, 2.0)
            .build();
        assert_eq!(config.cell_size, 10.0);
        assert_eq!(config.max_grid_cells, 500);
        assert_eq!(config.scan_step, 5.0);
        assert_eq!(config.max_item_size(), Size::new(300.0, 200.0));
        assert_eq!(config.min_zoom, 0.5);
        assert_eq!(config.max_zoom, 2.0);
    }

    #[test]
    fn builder_ignores_invalid_values() {
        let config = LayoutConfig::builder()
            .cell_size(0.0)
            .max_grid_cells(0)
            .scan_step(-1.0)
            .zoom_range(3.0, 1.0)
            .build();
        assert_eq!(config, LayoutConfig::default());
    }
}
