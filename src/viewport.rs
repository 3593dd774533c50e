//! Zoom and pan mapping between grid space and screen pixels.
//!
//! `screen = model * zoom + pan`. The transform knows nothing about the
//! layout; placement validity never depends on it.

use crate::model::Container;
use crate::types::{Point, Size};

/// Allowed zoom range. Values outside are clamped silently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl ZoomLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self::new(0.1, 5.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    zoom: f64,
    pan: Point,
    limits: ZoomLimits,
}

impl ViewportTransform {
    /// Identity transform (zoom 1, no pan), clamped into `limits`.
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            zoom: limits.clamp(1.0),
            pan: Point::zero(),
            limits,
        }
    }

    /// Transform with explicit zoom and pan; zoom is clamped into `limits`.
    pub fn with_state(zoom: f64, pan: Point, limits: ZoomLimits) -> Self {
        Self {
            zoom: limits.clamp(zoom),
            pan,
            limits,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn screen_to_model(&self, p: Point) -> Point {
        (p - self.pan) * (1.0 / self.zoom)
    }

    pub fn model_to_screen(&self, p: Point) -> Point {
        p * self.zoom + self.pan
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.limits.clamp(zoom);
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan + delta;
    }

    /// Changes the zoom while keeping `screen_point` over the same model point.
    pub fn zoom_at(&mut self, screen_point: Point, new_zoom: f64) {
        let anchor = self.screen_to_model(screen_point);
        self.zoom = self.limits.clamp(new_zoom);
        self.pan = screen_point - anchor * self.zoom;
    }

    /// Centres the container in a screen of `screen` pixels with `margin`
    /// pixels on the tighter side.
    pub fn fit(&mut self, container: &Container, screen: Size, margin: f64) {
        let avail_w = (screen.width - 2.0 * margin).max(1.0);
        let avail_h = (screen.height - 2.0 * margin).max(1.0);
        let zoom = (avail_w / container.width).min(avail_h / container.height);
        self.zoom = self.limits.clamp(zoom);
        let centre = Point::new(
            container.origin_x + container.width / 2.0,
            container.origin_y + container.height / 2.0,
        );
        let screen_centre = Point::new(screen.width / 2.0, screen.height / 2.0);
        self.pan = screen_centre - centre * self.zoom;
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}
