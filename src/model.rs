//! Data model and the authoritative layout state.
//!
//! This module defines the fundamental data structures of a cutting layout:
//! - `Container`: the base plate items are cut from
//! - `Item`: a placed cut with position and size
//! - `LayoutModel`: the single mutation surface that keeps every item inside
//!   the container and free of overlaps
//!
//! Rejected moves are values (`MoveOutcome::Rejected`), never errors: the model
//! is left untouched and the caller presents a snap-back.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::booking::BookingGrid;
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::{overlaps_with_tolerance, within_with_tolerance};
use crate::planner::{
    self, ItemRequest, PlacementEvent, PlacementReport, dimension_limits, find_position,
    is_region_available, validate_dimensions,
};
use crate::types::{Dimensional, Point, Positioned, Rect, Size, validation};

/// Stable identifier of an item. Ids are never reused within a layout.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The base plate.
///
/// # Fields
/// * `width`, `height` - Size in grid units
/// * `origin_x`, `origin_y` - Top-left corner in absolute grid space
/// * `weight` - Optional plate weight in kg, used for remaining-weight display
/// * `color`, `label` - Display metadata, not interpreted by the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Container {
    /// Creates a container at the origin after validating its size.
    ///
    /// # Examples
    /// ```
    /// use plate_layout::model::Container;
    /// use plate_layout::types::Size;
    ///
    /// assert!(Container::new(Size::new(100.0, 80.0)).is_ok());
    /// assert!(Container::new(Size::new(-1.0, 80.0)).is_err());
    /// ```
    pub fn new(size: Size) -> Result<Self, LayoutError> {
        let container = Self {
            width: size.width,
            height: size.height,
            origin_x: 0.0,
            origin_y: 0.0,
            weight: None,
            color: None,
            label: None,
        };
        container.validate()?;
        Ok(container)
    }

    /// Moves the container to `origin` (builder style).
    pub fn at(mut self, origin: Point) -> Self {
        self.origin_x = origin.x;
        self.origin_y = origin.y;
        self
    }

    /// Stores display metadata (builder style).
    pub fn with_meta(mut self, weight: Option<f64>, color: Option<String>, label: Option<String>) -> Self {
        self.weight = weight;
        self.color = color;
        self.label = label;
        self
    }

    /// Checks size, origin and weight.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut reasons =
            validation::dimension_violations(self.width, "Container width", f64::MAX);
        reasons.extend(validation::dimension_violations(
            self.height,
            "Container height",
            f64::MAX,
        ));
        for (value, name) in [(self.origin_x, "Container origin x"), (self.origin_y, "Container origin y")] {
            if let Err(reason) = validation::validate_coordinate(value, name) {
                reasons.push(reason);
            }
        }
        if let Some(weight) = self.weight {
            if !(weight.is_finite() && weight >= 0.0) {
                reasons.push(format!("Container weight must be non-negative, got: {}", weight));
            }
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(LayoutError::InvalidDimensions(reasons))
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.origin_x, self.origin_y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.origin_x, self.origin_y, self.width, self.height)
    }

    /// Total plate area.
    pub fn total_area(&self) -> f64 {
        self.width * self.height
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Size {
        self.size()
    }
}

impl Positioned for Container {
    fn position(&self) -> Point {
        self.origin()
    }
}

/// A placed cut.
///
/// `(x, y)` is the top-left corner in absolute grid space, not relative to
/// the container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: ItemId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub locked: bool,
}

impl Item {
    pub fn new(id: ItemId, rect: Rect) -> Self {
        Self {
            id,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            locked: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Position relative to the container's top-left corner.
    pub fn offset_in(&self, container: &Container) -> Point {
        self.position() - container.origin()
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Positioned for Item {
    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Why a move was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    OutOfBounds,
    Overlap,
    Locked,
    UnknownItem,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::OutOfBounds => "out_of_bounds",
            RejectReason::Overlap => "overlap",
            RejectReason::Locked => "locked",
            RejectReason::UnknownItem => "unknown_item",
        }
    }

    /// The matching error value, naming the item.
    pub fn into_error(self, id: ItemId) -> LayoutError {
        match self {
            RejectReason::OutOfBounds => LayoutError::OutOfBounds { item_ids: vec![id] },
            RejectReason::Overlap => LayoutError::Overlap { item_ids: vec![id] },
            RejectReason::Locked => LayoutError::Locked(id),
            RejectReason::UnknownItem => LayoutError::UnknownItem(id),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::OutOfBounds => write!(f, "Item would leave the container"),
            RejectReason::Overlap => write!(f, "Item would overlap another item"),
            RejectReason::Locked => write!(f, "Item is locked"),
            RejectReason::UnknownItem => write!(f, "Item does not exist"),
        }
    }
}

/// Result of a move request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum MoveOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted)
    }
}

/// Owned copy of the layout for renderers.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub revision: u64,
    pub container: Container,
    pub items: Vec<Item>,
    pub efficiency: f64,
    pub remaining_area: f64,
    pub remaining_weight: Option<f64>,
}

/// The authoritative layout: one container and its items in insertion order.
#[derive(Clone, Debug)]
pub struct LayoutModel {
    container: Container,
    items: Vec<Item>,
    grid: BookingGrid,
    config: LayoutConfig,
    next_id: u64,
    revision: u64,
}

impl LayoutModel {
    /// Creates an empty layout.
    ///
    /// Fails with `InvalidDimensions` if the container is malformed, leaves the
    /// authoring canvas or needs more booking cells than configured.
    pub fn new(container: Container, config: LayoutConfig) -> Result<Self, LayoutError> {
        container.validate()?;
        check_on_canvas(&container, &config)?;
        let grid = BookingGrid::new(&container.bounds(), config.cell_size, config.max_grid_cells)?;
        Ok(Self {
            container,
            items: Vec::new(),
            grid,
            config,
            next_id: 1,
            revision: 0,
        })
    }

    /// Creates a layout from existing items after checking every invariant.
    ///
    /// The whole set is rejected if any item is invalid; the error names all
    /// offending ids.
    pub fn from_parts(
        container: Container,
        items: Vec<Item>,
        config: LayoutConfig,
    ) -> Result<Self, LayoutError> {
        container.validate()?;
        let as_format = |err: LayoutError| LayoutError::invalid_format(format!("container: {}", err));
        check_on_canvas(&container, &config).map_err(as_format)?;
        let mut grid = BookingGrid::new(&container.bounds(), config.cell_size, config.max_grid_cells)
            .map_err(as_format)?;

        let mut seen = BTreeSet::new();
        let duplicates: Vec<ItemId> = items
            .iter()
            .filter(|item| !seen.insert(item.id))
            .map(|item| item.id)
            .collect();
        if !duplicates.is_empty() {
            return Err(LayoutError::InvalidFormat {
                reason: "duplicate item ids".to_string(),
                item_ids: duplicates,
            });
        }

        let malformed: Vec<ItemId> = items
            .iter()
            .filter(|item| !item.dimensions().is_valid_dimension() || !item.position().is_finite())
            .map(|item| item.id)
            .collect();
        if !malformed.is_empty() {
            return Err(LayoutError::InvalidFormat {
                reason: "items with invalid position or size".to_string(),
                item_ids: malformed,
            });
        }

        let outside = items_outside(&container, &items, config.epsilon);
        if !outside.is_empty() {
            return Err(LayoutError::InvalidFormat {
                reason: "items outside the container".to_string(),
                item_ids: outside,
            });
        }

        let overlapping = overlapping_items(&items, config.epsilon);
        if !overlapping.is_empty() {
            return Err(LayoutError::InvalidFormat {
                reason: "overlapping items".to_string(),
                item_ids: overlapping,
            });
        }

        let next_id = items.iter().map(|item| item.id.0).max().unwrap_or(0) + 1;
        let rects: Vec<Rect> = items.iter().map(Item::rect).collect();
        grid.rebuild(container.origin(), rects.iter());

        Ok(Self {
            container,
            items,
            grid,
            config,
            next_id,
            revision: 0,
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn grid(&self) -> &BookingGrid {
        &self.grid
    }

    /// Incremented on every state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Id the next created item will receive.
    pub fn next_id(&self) -> ItemId {
        ItemId(self.next_id)
    }

    /// Raises the id counter; never lowers it below an existing id.
    pub(crate) fn reserve_ids_up_to(&mut self, next: u64) {
        self.next_id = self.next_id.max(next);
    }

    /// Places a new item at the first free position (row-major scan).
    ///
    /// # Returns
    /// The created item, `InvalidDimensions` if the size fails validation, or
    /// `NoSpaceAvailable` if the scan found no free spot.
    pub fn add_item(&mut self, size: Size) -> Result<Item, LayoutError> {
        validate_dimensions(size, dimension_limits(&self.container, &self.config))?;

        let Some(position) = find_position(
            &self.container,
            &self.items,
            size,
            Some(&self.grid),
            &self.config,
        ) else {
            debug!(width = size.width, height = size.height, "no space for item");
            return Err(LayoutError::NoSpaceAvailable {
                width: size.width,
                height: size.height,
            });
        };

        Ok(self.insert(Rect::from_origin_size(position, size)))
    }

    /// Places an item at an explicit position.
    pub fn place_item(&mut self, rect: Rect) -> Result<Item, LayoutError> {
        validate_dimensions(rect.size(), dimension_limits(&self.container, &self.config))?;
        if !rect.origin().is_finite()
            || !within_with_tolerance(&rect, &self.container.bounds(), self.config.epsilon)
        {
            return Err(LayoutError::OutOfBounds { item_ids: vec![] });
        }
        if !is_region_available(&rect, &self.items, &self.grid, None, self.config.epsilon) {
            let blocking = self
                .items
                .iter()
                .filter(|item| overlaps_with_tolerance(&rect, &item.rect(), self.config.epsilon))
                .map(|item| item.id)
                .collect();
            return Err(LayoutError::Overlap { item_ids: blocking });
        }
        Ok(self.insert(rect))
    }

    /// Places quantities of items in request order, reporting every step.
    pub fn add_items(
        &mut self,
        requests: &[ItemRequest],
        on_event: impl FnMut(&PlacementEvent),
    ) -> PlacementReport {
        planner::place_requests_with_progress(self, requests, on_event)
    }

    fn insert(&mut self, rect: Rect) -> Item {
        let item = Item::new(ItemId(self.next_id), rect);
        self.next_id += 1;
        self.grid.reserve(&rect);
        self.items.push(item.clone());
        self.bump();
        debug!(id = %item.id, x = item.x, y = item.y, width = item.width, height = item.height, "item placed");
        item
    }

    /// Removes an item. Absent ids are ignored.
    ///
    /// # Returns
    /// `true` if an item was removed
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };
        let item = self.items.remove(index);
        self.grid.release(&item.rect());
        self.bump();
        debug!(id = %id, "item removed");
        true
    }

    /// Removes every listed item; absent ids are ignored.
    ///
    /// # Returns
    /// Number of items removed
    pub fn remove_items(&mut self, ids: impl IntoIterator<Item = ItemId>) -> usize {
        let ids: BTreeSet<ItemId> = ids.into_iter().collect();
        let before = self.items.len();
        let grid = &mut self.grid;
        self.items.retain(|item| {
            if ids.contains(&item.id) {
                grid.release(&item.rect());
                false
            } else {
                true
            }
        });
        let removed = before - self.items.len();
        if removed > 0 {
            self.bump();
            debug!(removed, "items removed");
        }
        removed
    }

    /// Moves an item so that its top-left corner is `(x, y)`.
    ///
    /// The candidate must stay inside the container and must not overlap any
    /// other item. On rejection the item keeps its position.
    pub fn move_item(&mut self, id: ItemId, x: f64, y: f64) -> MoveOutcome {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return MoveOutcome::Rejected(RejectReason::UnknownItem);
        };
        let current = self.items[index].rect();
        if self.items[index].locked {
            return MoveOutcome::Rejected(RejectReason::Locked);
        }

        let target = Point::new(x, y);
        let candidate = current.with_origin(target);
        if !target.is_finite()
            || !within_with_tolerance(&candidate, &self.container.bounds(), self.config.epsilon)
        {
            return MoveOutcome::Rejected(RejectReason::OutOfBounds);
        }
        if candidate == current {
            return MoveOutcome::Accepted;
        }

        // The item's own cells must not count against it.
        self.grid.release(&current);
        if !is_region_available(&candidate, &self.items, &self.grid, Some(id), self.config.epsilon) {
            self.grid.reserve(&current);
            return MoveOutcome::Rejected(RejectReason::Overlap);
        }
        self.grid.reserve(&candidate);

        let item = &mut self.items[index];
        item.x = x;
        item.y = y;
        self.bump();
        MoveOutcome::Accepted
    }

    /// Moves the container and every item whose top-left corner lies inside it.
    ///
    /// The delta is clamped so the container stays on the authoring canvas
    /// (`[0, canvas - container size]` per axis). Only the requested delta is
    /// shortened: an axis with a zero delta never moves.
    ///
    /// # Returns
    /// The delta actually applied
    pub fn move_container(&mut self, dx: f64, dy: f64) -> Point {
        if !dx.is_finite() || !dy.is_finite() {
            return Point::zero();
        }
        let old_bounds = self.container.bounds();
        let canvas = self.config.canvas_size();
        let applied = Point::new(
            clamp_delta(old_bounds.x, dx, canvas.width - self.container.width),
            clamp_delta(old_bounds.y, dy, canvas.height - self.container.height),
        );
        let new_origin = old_bounds.origin() + applied;
        if applied == Point::zero() {
            return applied;
        }

        let mut moved = 0usize;
        for item in &mut self.items {
            let inside = item.x >= old_bounds.x
                && item.x < old_bounds.right()
                && item.y >= old_bounds.y
                && item.y < old_bounds.bottom();
            if inside {
                item.x += applied.x;
                item.y += applied.y;
                moved += 1;
            }
        }

        self.container.origin_x = new_origin.x;
        self.container.origin_y = new_origin.y;
        if moved == self.items.len() {
            self.grid.translate(applied);
        } else {
            self.rebuild_grid();
        }
        self.bump();
        debug!(dx = applied.x, dy = applied.y, moved, "container moved");
        applied
    }

    /// Changes the container size, keeping its origin.
    ///
    /// Fails with `OutOfBounds` naming every item that would no longer fit, or
    /// with `InvalidDimensions` if the new size leaves the canvas or needs
    /// more booking cells than configured.
    pub fn resize_container(&mut self, size: Size) -> Result<(), LayoutError> {
        let mut resized = self.container.clone();
        resized.width = size.width;
        resized.height = size.height;
        resized.validate()?;
        check_on_canvas(&resized, &self.config)?;

        let outside = items_outside(&resized, &self.items, self.config.epsilon);
        if !outside.is_empty() {
            return Err(LayoutError::OutOfBounds { item_ids: outside });
        }

        let mut grid =
            BookingGrid::new(&resized.bounds(), self.config.cell_size, self.config.max_grid_cells)?;
        let rects: Vec<Rect> = self.items.iter().map(Item::rect).collect();
        grid.rebuild(resized.origin(), rects.iter());
        self.grid = grid;
        self.container = resized;
        self.bump();
        info!(width = size.width, height = size.height, "container resized");
        Ok(())
    }

    /// Discards every item and starts over with `container`.
    pub fn reset(&mut self, container: Container) -> Result<(), LayoutError> {
        container.validate()?;
        check_on_canvas(&container, &self.config)?;
        self.grid =
            BookingGrid::new(&container.bounds(), self.config.cell_size, self.config.max_grid_cells)?;
        self.container = container;
        self.items.clear();
        self.next_id = 1;
        self.bump();
        info!("layout reset");
        Ok(())
    }

    /// Flips `locked` on every listed item; absent ids are ignored.
    ///
    /// # Returns
    /// Number of items toggled
    pub fn toggle_lock(&mut self, ids: impl IntoIterator<Item = ItemId>) -> usize {
        let ids: BTreeSet<ItemId> = ids.into_iter().collect();
        let mut toggled = 0;
        for item in self.items.iter_mut().filter(|item| ids.contains(&item.id)) {
            item.locked = !item.locked;
            toggled += 1;
        }
        if toggled > 0 {
            self.bump();
        }
        toggled
    }

    /// Sum of item areas.
    pub fn used_area(&self) -> f64 {
        self.items.iter().map(|item| item.area()).sum()
    }

    pub fn remaining_area(&self) -> f64 {
        (self.container.total_area() - self.used_area()).max(0.0)
    }

    /// Plate weight not yet assigned to cuts, proportional to free area.
    pub fn remaining_weight(&self) -> Option<f64> {
        let weight = self.container.weight?;
        let total = self.container.total_area();
        if total <= 0.0 {
            return Some(0.0);
        }
        Some(weight * self.remaining_area() / total)
    }

    /// Used area in percent of the container, clamped to `[0, 100]`.
    pub fn efficiency(&self) -> f64 {
        let total = self.container.total_area();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_area() / total * 100.0).clamp(0.0, 100.0)
    }

    /// Ids of items that leave the container or overlap another item.
    ///
    /// Empty for any layout built through this type's mutation surface.
    pub fn audit(&self) -> Vec<ItemId> {
        let mut offenders: BTreeSet<ItemId> =
            items_outside(&self.container, &self.items, self.config.epsilon)
                .into_iter()
                .collect();
        offenders.extend(overlapping_items(&self.items, self.config.epsilon));
        offenders.into_iter().collect()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            revision: self.revision,
            container: self.container.clone(),
            items: self.items.clone(),
            efficiency: self.efficiency(),
            remaining_area: self.remaining_area(),
            remaining_weight: self.remaining_weight(),
        }
    }

    fn rebuild_grid(&mut self) {
        let rects: Vec<Rect> = self.items.iter().map(Item::rect).collect();
        self.grid.rebuild(self.container.origin(), rects.iter());
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

/// Shortens `delta` so that `origin + delta` stays in `[0, max(limit, 0)]`.
///
/// Never moves against the requested direction, even from an origin that is
/// already outside the range.
fn clamp_delta(origin: f64, delta: f64, limit: f64) -> f64 {
    let limit = limit.max(0.0);
    if delta > 0.0 {
        delta.min((limit - origin).max(0.0))
    } else if delta < 0.0 {
        delta.max((-origin).min(0.0))
    } else {
        0.0
    }
}

/// Checks that the container fits on the authoring canvas and its origin is
/// within `[0, canvas - container size]` per axis.
fn check_on_canvas(container: &Container, config: &LayoutConfig) -> Result<(), LayoutError> {
    let canvas = config.canvas_size();
    let eps = config.epsilon;
    let mut reasons = Vec::new();
    for (origin, size, canvas_len, axis) in [
        (container.origin_x, container.width, canvas.width, "x"),
        (container.origin_y, container.height, canvas.height, "y"),
    ] {
        let limit = canvas_len - size;
        if limit < -eps {
            reasons.push(format!(
                "Container extent along {} exceeds the canvas ({} > {})",
                axis, size, canvas_len
            ));
        } else if origin < -eps || origin > limit.max(0.0) + eps {
            reasons.push(format!(
                "Container origin {} must be within [0, {}], got: {}",
                axis,
                limit.max(0.0),
                origin
            ));
        }
    }
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(LayoutError::InvalidDimensions(reasons))
    }
}

fn items_outside(container: &Container, items: &[Item], eps: f64) -> Vec<ItemId> {
    let bounds = container.bounds();
    items
        .iter()
        .filter(|item| !within_with_tolerance(&item.rect(), &bounds, eps))
        .map(|item| item.id)
        .collect()
}

fn overlapping_items(items: &[Item], eps: f64) -> Vec<ItemId> {
    let mut offenders = BTreeSet::new();
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            if overlaps_with_tolerance(&a.rect(), &b.rect(), eps) {
                offenders.insert(a.id);
                offenders.insert(b.id);
            }
        }
    }
    offenders.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(width: f64, height: f64) -> LayoutModel {
        LayoutModel::new(
            Container::new(Size::new(width, height)).unwrap(),
            LayoutConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn add_item_uses_first_fit_order() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 30.0)).unwrap();
        let b = m.add_item(Size::new(20.0, 30.0)).unwrap();
        assert_eq!(a.position(), Point::new(0.0, 0.0));
        assert_eq!(b.position(), Point::new(20.0, 0.0));
        assert_eq!(a.id, ItemId(1));
        assert_eq!(b.id, ItemId(2));
        assert_eq!(m.revision(), 2);
    }

    #[test]
    fn oversized_item_fails_dimension_gate() {
        let mut m = model(100.0, 80.0);
        let err = m.add_item(Size::new(200.0, 10.0)).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDimensions(_)));
        assert!(m.is_empty());
        assert_eq!(m.revision(), 0);
    }

    #[test]
    fn full_layout_reports_no_space() {
        let mut m = model(40.0, 30.0);
        m.add_item(Size::new(40.0, 30.0)).unwrap();
        let err = m.add_item(Size::new(1.0, 1.0)).unwrap_err();
        assert_eq!(
            err,
            LayoutError::NoSpaceAvailable {
                width: 1.0,
                height: 1.0
            }
        );
    }

    #[test]
    fn move_item_accepts_free_target() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 30.0)).unwrap();
        assert_eq!(m.move_item(a.id, 5.0, 10.0), MoveOutcome::Accepted);
        assert_eq!(m.item(a.id).unwrap().position(), Point::new(5.0, 10.0));
        assert!(m.audit().is_empty());
    }

    #[test]
    fn move_item_rejects_out_of_bounds_and_keeps_position() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 30.0)).unwrap();
        let revision = m.revision();
        assert_eq!(
            m.move_item(a.id, 90.0, 10.0),
            MoveOutcome::Rejected(RejectReason::OutOfBounds)
        );
        assert_eq!(m.item(a.id).unwrap().position(), Point::zero());
        assert_eq!(m.revision(), revision);
    }

    #[test]
    fn move_item_rejects_overlap_and_restores_booking() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 20.0)).unwrap();
        let b = m.add_item(Size::new(20.0, 20.0)).unwrap();
        assert_eq!(
            m.move_item(b.id, 10.0, 10.0),
            MoveOutcome::Rejected(RejectReason::Overlap)
        );
        assert_eq!(m.item(b.id).unwrap().position(), Point::new(20.0, 0.0));
        // b's cells must still be booked after the failed attempt.
        assert_eq!(
            m.move_item(a.id, 20.0, 0.0),
            MoveOutcome::Rejected(RejectReason::Overlap)
        );
    }

    #[test]
    fn move_item_may_overlap_its_own_old_rectangle() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 20.0)).unwrap();
        assert_eq!(m.move_item(a.id, 1.0, 1.0), MoveOutcome::Accepted);
        assert_eq!(m.grid().occupied_cells(), 400);
    }

    #[test]
    fn locked_and_unknown_items_are_rejected() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 20.0)).unwrap();
        assert_eq!(m.toggle_lock([a.id]), 1);
        assert_eq!(
            m.move_item(a.id, 30.0, 0.0),
            MoveOutcome::Rejected(RejectReason::Locked)
        );
        assert_eq!(m.toggle_lock([a.id, ItemId(99)]), 1);
        assert_eq!(m.move_item(a.id, 30.0, 0.0), MoveOutcome::Accepted);
        assert_eq!(
            m.move_item(ItemId(99), 0.0, 0.0),
            MoveOutcome::Rejected(RejectReason::UnknownItem)
        );
    }

    #[test]
    fn remove_is_idempotent_and_frees_cells() {
        let mut m = model(100.0, 80.0);
        let a = m.add_item(Size::new(20.0, 30.0)).unwrap();
        assert!(m.remove_item(a.id));
        let revision = m.revision();
        assert!(!m.remove_item(a.id));
        assert_eq!(m.revision(), revision);
        assert_eq!(m.grid().occupied_cells(), 0);
        // Ids are not reused.
        let b = m.add_item(Size::new(20.0, 30.0)).unwrap();
        assert_eq!(b.id, ItemId(2));
    }

    #[test]
    fn remove_items_in_bulk() {
        let mut m = model(100.0, 80.0);
        let ids: Vec<ItemId> = (0..4)
            .map(|_| m.add_item(Size::new(10.0, 10.0)).unwrap().id)
            .collect();
        assert_eq!(m.remove_items([ids[0], ids[2], ItemId(42)]), 2);
        assert_eq!(m.len(), 2);
        assert_eq!(m.grid().occupied_cells(), 200);
    }

    #[test]
    fn place_item_checks_bounds_and_overlap() {
        let mut m = model(100.0, 80.0);
        let a = m.place_item(Rect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        assert_eq!(
            m.place_item(Rect::new(10.0, 10.0, 20.0, 20.0)).unwrap_err(),
            LayoutError::Overlap {
                item_ids: vec![a.id]
            }
        );
        assert!(matches!(
            m.place_item(Rect::new(90.0, 0.0, 20.0, 20.0)).unwrap_err(),
            LayoutError::OutOfBounds { .. }
        ));
        assert!(m.place_item(Rect::new(20.0, 0.0, 20.0, 20.0)).is_ok());
    }

    #[test]
    fn move_container_carries_items_and_clamps() {
        let mut config = LayoutConfig::default();
        config.canvas_width = 200.0;
        config.canvas_height = 200.0;
        let container = Container::new(Size::new(100.0, 80.0))
            .unwrap()
            .at(Point::new(10.0, 10.0));
        let mut m = LayoutModel::new(container, config).unwrap();
        let a = m.add_item(Size::new(20.0, 30.0)).unwrap();
        assert_eq!(a.position(), Point::new(10.0, 10.0));

        let applied = m.move_container(15.0, 5.0);
        assert_eq!(applied, Point::new(15.0, 5.0));
        assert_eq!(m.item(a.id).unwrap().position(), Point::new(25.0, 15.0));

        let applied = m.move_container(500.0, -500.0);
        assert_eq!(applied, Point::new(75.0, -15.0));
        assert_eq!(m.container().origin(), Point::new(100.0, 0.0));
        assert_eq!(m.item(a.id).unwrap().position(), Point::new(100.0, 0.0));
        assert!(m.audit().is_empty());
        // Grid followed the container.
        let b = m.add_item(Size::new(20.0, 30.0)).unwrap();
        assert_eq!(b.position(), Point::new(120.0, 0.0));
    }

    #[test]
    fn zero_delta_never_moves_container() {
        let mut m = model(100.0, 80.0);
        m.move_container(30.0, 20.0);
        let revision = m.revision();
        assert_eq!(m.move_container(0.0, 0.0), Point::zero());
        assert_eq!(m.move_container(0.0, -5.0), Point::new(0.0, -5.0));
        assert_eq!(m.container().origin(), Point::new(30.0, 15.0));
        assert_eq!(m.revision(), revision + 1);
    }

    #[test]
    fn clamp_delta_follows_requested_direction() {
        assert_eq!(clamp_delta(10.0, 5.0, 100.0), 5.0);
        assert_eq!(clamp_delta(98.0, 5.0, 100.0), 2.0);
        assert_eq!(clamp_delta(3.0, -5.0, 100.0), -3.0);
        assert_eq!(clamp_delta(-50.0, 0.0, 100.0), 0.0);
        // Outside the range already: no jump back.
        assert_eq!(clamp_delta(-50.0, -1.0, 100.0), 0.0);
        assert_eq!(clamp_delta(150.0, 1.0, 100.0), 0.0);
    }

    #[test]
    fn container_off_canvas_is_rejected() {
        let config = LayoutConfig::builder().canvas_size(200.0, 200.0).build();
        let off = Container::new(Size::new(100.0, 80.0))
            .unwrap()
            .at(Point::new(-50.0, 150.0));
        match LayoutModel::new(off.clone(), config).unwrap_err() {
            LayoutError::InvalidDimensions(reasons) => assert_eq!(reasons.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            LayoutModel::from_parts(off.clone(), vec![], config).unwrap_err().code(),
            "invalid_format"
        );
        let mut m = LayoutModel::new(Container::new(Size::new(100.0, 80.0)).unwrap(), config).unwrap();
        assert!(m.reset(off).is_err());
        assert!(matches!(
            m.resize_container(Size::new(250.0, 80.0)),
            Err(LayoutError::InvalidDimensions(_))
        ));
        assert_eq!(m.container().width, 100.0);
    }

    #[test]
    fn oversized_booking_grid_is_rejected_on_every_path() {
        let config = LayoutConfig::builder()
            .canvas_size(1e11, 1e11)
            .max_grid_cells(10_000)
            .build();
        let huge = Container::new(Size::new(1e10, 1e10)).unwrap();
        assert!(matches!(
            LayoutModel::new(huge.clone(), config),
            Err(LayoutError::InvalidDimensions(_))
        ));
        assert!(LayoutModel::new(huge.clone(), LayoutConfig::default()).is_err());
        assert_eq!(
            LayoutModel::from_parts(huge.clone(), vec![], config).unwrap_err().code(),
            "invalid_format"
        );

        let mut m = LayoutModel::new(Container::new(Size::new(100.0, 80.0)).unwrap(), config).unwrap();
        m.add_item(Size::new(10.0, 10.0)).unwrap();
        assert!(matches!(m.reset(huge), Err(LayoutError::InvalidDimensions(_))));
        assert!(matches!(
            m.resize_container(Size::new(200.0, 80.0)),
            Err(LayoutError::InvalidDimensions(_))
        ));
        // Failed calls leave the layout untouched.
        assert_eq!(m.container().size(), Size::new(100.0, 80.0));
        assert_eq!(m.len(), 1);
        assert_eq!(m.grid().cols(), 100);
    }

    #[test]
    fn resize_rejects_when_items_would_leave() {
        let mut m = model(100.0, 80.0);
        let a = m.place_item(Rect::new(70.0, 0.0, 20.0, 20.0)).unwrap();
        assert_eq!(
            m.resize_container(Size::new(80.0, 80.0)).unwrap_err(),
            LayoutError::OutOfBounds {
                item_ids: vec![a.id]
            }
        );
        assert_eq!(m.container().width, 100.0);
        m.resize_container(Size::new(90.0, 40.0)).unwrap();
        assert_eq!(m.grid().cols(), 90);
        assert_eq!(m.grid().rows(), 40);
    }

    #[test]
    fn efficiency_and_remaining_weight() {
        let container = Container::new(Size::new(100.0, 80.0))
            .unwrap()
            .with_meta(Some(64.0), Some("#cccccc".into()), None);
        let mut m = LayoutModel::new(container, LayoutConfig::default()).unwrap();
        m.add_item(Size::new(20.0, 40.0)).unwrap();
        assert!((m.efficiency() - 10.0).abs() < 1e-9);
        assert!((m.remaining_area() - 7200.0).abs() < 1e-9);
        assert!((m.remaining_weight().unwrap() - 57.6).abs() < 1e-9);
    }

    #[test]
    fn reset_discards_items() {
        let mut m = model(100.0, 80.0);
        m.add_item(Size::new(20.0, 30.0)).unwrap();
        m.reset(Container::new(Size::new(50.0, 50.0)).unwrap()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.grid().cols(), 50);
        let broken = Container::new(Size::new(50.0, 50.0))
            .unwrap()
            .at(Point::new(f64::NAN, 0.0));
        assert!(m.reset(broken).is_err());
    }

    #[test]
    fn from_parts_names_every_offender() {
        let container = Container::new(Size::new(100.0, 80.0)).unwrap();
        let items = vec![
            Item::new(ItemId(1), Rect::new(0.0, 0.0, 20.0, 20.0)),
            Item::new(ItemId(2), Rect::new(10.0, 10.0, 20.0, 20.0)),
            Item::new(ItemId(3), Rect::new(50.0, 50.0, 10.0, 10.0)),
        ];
        let err = LayoutModel::from_parts(container, items, LayoutConfig::default()).unwrap_err();
        match err {
            LayoutError::InvalidFormat { item_ids, .. } => {
                assert_eq!(item_ids, vec![ItemId(1), ItemId(2)])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn from_parts_continues_id_sequence() {
        let container = Container::new(Size::new(100.0, 80.0)).unwrap();
        let items = vec![Item::new(ItemId(7), Rect::new(0.0, 0.0, 20.0, 20.0))];
        let mut m = LayoutModel::from_parts(container, items, LayoutConfig::default()).unwrap();
        assert_eq!(m.add_item(Size::new(10.0, 10.0)).unwrap().id, ItemId(8));
    }
}
