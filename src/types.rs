//! Common types and traits for 2D layout geometry.
//!
//! All quantities are expressed in grid units (the host decides how many
//! centimetres one unit represents). Screen-space pixels never appear here;
//! see [`crate::viewport`] for that mapping.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used as the default for [`crate::config::LayoutConfig::epsilon`].
pub const EPSILON_GENERAL: f64 = 1e-6;

/// A point or displacement in grid space (or screen space, for the viewport).
///
/// # Examples
/// ```
/// use plate_layout::types::Point;
///
/// let origin = Point::new(10.0, 20.0);
/// let delta = Point::new(5.0, -5.0);
/// assert_eq!(origin + delta, Point::new(15.0, 15.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The origin (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise rounding to the nearest multiple of `step`.
    ///
    /// A non-positive step returns the point unchanged.
    #[inline]
    pub fn snapped(&self, step: f64) -> Self {
        if step <= 0.0 {
            return *self;
        }
        Self::new((self.x / step).round() * step, (self.y / step).round() * step)
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from(tuple: (f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// Width and height of a rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Checks if both components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Checks if this size fits within another one (component-wise <=).
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.width <= outer.width + tolerance && self.height <= outer.height + tolerance
    }
}

impl From<(f64, f64)> for Size {
    #[inline]
    fn from(tuple: (f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// Axis-aligned rectangle: top-left corner plus size.
///
/// `right()` and `bottom()` are exclusive edges, so two rectangles sharing an
/// edge do not overlap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    #[inline]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// The same rectangle moved by `delta`.
    #[inline]
    pub fn translated(&self, delta: Point) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// The same rectangle moved so that its top-left corner is `origin`.
    #[inline]
    pub fn with_origin(&self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    /// Checks if a point lies inside the rectangle (edges inclusive).
    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// The rectangle shrunk by `inset` on every side; collapses to zero size
    /// rather than inverting.
    #[inline]
    pub fn inset(&self, inset: f64) -> Self {
        let width = (self.width - 2.0 * inset).max(0.0);
        let height = (self.height - 2.0 * inset).max(0.0);
        Self::new(self.x + inset, self.y + inset, width, height)
    }
}

/// Trait for objects with a 2D extent.
pub trait Dimensional {
    fn dimensions(&self) -> Size;

    fn area(&self) -> f64 {
        self.dimensions().area()
    }
}

/// Trait for objects with a top-left position in grid space.
pub trait Positioned {
    fn position(&self) -> Point;
}

/// Validation helpers shared by the planner and the serializer.
pub mod validation {
    /// Validates a single dimension against `(0, max]`.
    ///
    /// Returns every violated rule as its own message.
    pub fn dimension_violations(value: f64, name: &str, max: f64) -> Vec<String> {
        let mut reasons = Vec::new();
        if value.is_nan() {
            reasons.push(format!("{} must be a number", name));
            return reasons;
        }
        if value.is_infinite() {
            reasons.push(format!("{} must be finite", name));
            return reasons;
        }
        if value <= 0.0 {
            reasons.push(format!("{} must be greater than 0, got: {}", name, value));
        }
        if value > max {
            reasons.push(format!("{} must not exceed {}, got: {}", name, max, value));
        }
        reasons
    }

    /// Validates a finite coordinate.
    pub fn validate_coordinate(value: f64, name: &str) -> Result<(), String> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(format!("{} must be finite, got: {}", name, value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_operations() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);

        assert_eq!(a + b, Point::new(5.0, 8.0));
        assert_eq!(b - a, Point::new(3.0, 4.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(-a, Point::new(-1.0, -2.0));
    }

    #[test]
    fn test_point_snapping() {
        assert_eq!(Point::new(4.6, 5.4).snapped(1.0), Point::new(5.0, 5.0));
        assert_eq!(Point::new(12.0, 17.0).snapped(5.0), Point::new(10.0, 15.0));
        assert_eq!(Point::new(1.3, 1.7).snapped(0.0), Point::new(1.3, 1.7));
    }

    #[test]
    fn test_rect_edges_and_translation() {
        let r = Rect::new(5.0, 10.0, 20.0, 30.0);
        assert_eq!(r.right(), 25.0);
        assert_eq!(r.bottom(), 40.0);
        assert_eq!(r.translated(Point::new(1.0, -1.0)), Rect::new(6.0, 9.0, 20.0, 30.0));
        assert!((r.area() - 600.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_rect_inset_collapses() {
        let r = Rect::new(0.0, 0.0, 2.0, 10.0);
        let shrunk = r.inset(2.0);
        assert_eq!(shrunk.width, 0.0);
        assert_eq!(shrunk.height, 6.0);
    }

    #[test]
    fn test_size_fits_within() {
        let small = Size::new(5.0, 5.0);
        let large = Size::new(10.0, 10.0);
        assert!(small.fits_within(&large, EPSILON_GENERAL));
        assert!(!large.fits_within(&small, EPSILON_GENERAL));
        assert!(!Size::new(0.0, 1.0).is_valid_dimension());
        assert!(!Size::new(f64::NAN, 1.0).is_valid_dimension());
    }

    #[test]
    fn test_dimension_violations_collects_all() {
        assert!(validation::dimension_violations(10.0, "Width", 100.0).is_empty());
        assert_eq!(validation::dimension_violations(0.0, "Width", 100.0).len(), 1);
        assert_eq!(validation::dimension_violations(200.0, "Width", 100.0).len(), 1);
        assert_eq!(validation::dimension_violations(f64::NAN, "Width", 100.0).len(), 1);
        // Both rules fire when the maximum itself is non-positive.
        assert_eq!(validation::dimension_violations(-1.0, "Width", -5.0).len(), 2);
    }
}
