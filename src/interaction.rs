//! Pointer-driven state machine on top of [`LayoutModel`].
//!
//! Every `pointer_move` is an independent attempt against the current model:
//! valid intermediate positions are committed immediately and stick, rejected
//! ones only change the preview. Releasing or cancelling therefore leaves the
//! item at its last valid position, never at the drag-start position.
//!
//! Pointer-down targets:
//! - item body: drag the item
//! - item border band, or an empty spot inside the container: drag the whole
//!   container
//! - outside the container: pan the viewport
//!
//! A press on empty canvas pans only outside the container.
//!
//! Visual updates are coalesced: the controller keeps at most one pending
//! [`FrameUpdate`] and each move overwrites it.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::LayoutConfig;
use crate::model::{ItemId, LayoutModel, MoveOutcome};
use crate::types::Point;
use crate::viewport::ViewportTransform;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    DraggingItem {
        id: ItemId,
        /// Pointer position minus item origin, in grid units.
        grab_offset: Point,
        last_valid: Point,
    },
    DraggingContainer {
        /// Pointer position minus container origin, in grid units.
        grab_offset: Point,
    },
    Panning {
        last_screen: Point,
    },
}

/// What lies under the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum HitTarget {
    ItemBody(ItemId),
    /// Edge band of an item; grabs the whole container.
    ItemBorder(ItemId),
    Container,
    Canvas,
}

/// Latest visual change produced by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameUpdate {
    ItemPreview {
        id: ItemId,
        /// Where the pointer wants the item.
        preview: Point,
        /// Where the item actually is.
        committed: Point,
        outcome: MoveOutcome,
    },
    ContainerMoved {
        origin: Point,
        delta: Point,
    },
    Viewport {
        zoom: f64,
        pan: Point,
    },
}

/// Summary returned when a drag or pan session ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEnd {
    None,
    Item { id: ItemId, position: Point },
    Container { origin: Point },
    Pan { pan: Point },
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    state: InteractionState,
    selection: BTreeSet<ItemId>,
    pending: Option<FrameUpdate>,
    border_tolerance: f64,
    snap_step: f64,
}

impl InteractionController {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            selection: BTreeSet::new(),
            pending: None,
            border_tolerance: config.border_tolerance,
            snap_step: config.scan_step,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    /// Classifies a grid-space point. Later items are on top.
    pub fn hit_test(&self, model: &LayoutModel, point: Point) -> HitTarget {
        let tol = self.border_tolerance;
        for item in model.items().iter().rev() {
            let rect = item.rect();
            if !rect.contains_point(point) {
                continue;
            }
            // Small items have no border band.
            let has_band = tol > 0.0 && rect.width > 4.0 * tol && rect.height > 4.0 * tol;
            if has_band && !rect.inset(tol).contains_point(point) {
                return HitTarget::ItemBorder(item.id);
            }
            return HitTarget::ItemBody(item.id);
        }
        if model.container().bounds().contains_point(point) {
            HitTarget::Container
        } else {
            HitTarget::Canvas
        }
    }

    /// Starts a drag or pan session. Ignored unless idle.
    pub fn pointer_down(
        &mut self,
        model: &LayoutModel,
        viewport: &ViewportTransform,
        screen: Point,
    ) -> Option<HitTarget> {
        if !self.is_idle() {
            trace!(state = ?self.state, "pointer down ignored while busy");
            return None;
        }
        let point = viewport.screen_to_model(screen);
        let target = self.hit_test(model, point);

        self.state = match target {
            HitTarget::ItemBody(id) => {
                // hit_test only returns ids of existing items
                let origin = model.item(id).map(|item| item.rect().origin()).unwrap_or(point);
                self.selection.clear();
                self.selection.insert(id);
                InteractionState::DraggingItem {
                    id,
                    grab_offset: point - origin,
                    last_valid: origin,
                }
            }
            HitTarget::ItemBorder(_) | HitTarget::Container => InteractionState::DraggingContainer {
                grab_offset: point - model.container().origin(),
            },
            HitTarget::Canvas => InteractionState::Panning {
                last_screen: screen,
            },
        };
        debug!(?target, "pointer session started");
        Some(target)
    }

    /// Advances the current session. Returns the frame update it produced.
    pub fn pointer_move(
        &mut self,
        model: &mut LayoutModel,
        viewport: &mut ViewportTransform,
        screen: Point,
    ) -> Option<FrameUpdate> {
        let update = match self.state {
            InteractionState::Idle => return None,
            InteractionState::DraggingItem {
                id,
                grab_offset,
                last_valid,
            } => {
                let point = viewport.screen_to_model(screen);
                let preview = self.snap(model, point - grab_offset);
                let outcome = if preview == last_valid {
                    MoveOutcome::Accepted
                } else {
                    model.move_item(id, preview.x, preview.y)
                };
                let committed = if outcome.is_accepted() { preview } else { last_valid };
                if let MoveOutcome::Rejected(reason) = outcome {
                    trace!(id = %id, ?reason, "drag preview rejected");
                }
                self.state = InteractionState::DraggingItem {
                    id,
                    grab_offset,
                    last_valid: committed,
                };
                FrameUpdate::ItemPreview {
                    id,
                    preview,
                    committed,
                    outcome,
                }
            }
            InteractionState::DraggingContainer { grab_offset } => {
                let point = viewport.screen_to_model(screen);
                let desired = self.snap(model, point - grab_offset);
                let delta = desired - model.container().origin();
                let applied = model.move_container(delta.x, delta.y);
                FrameUpdate::ContainerMoved {
                    origin: model.container().origin(),
                    delta: applied,
                }
            }
            InteractionState::Panning { last_screen } => {
                viewport.pan_by(screen - last_screen);
                self.state = InteractionState::Panning {
                    last_screen: screen,
                };
                FrameUpdate::Viewport {
                    zoom: viewport.zoom(),
                    pan: viewport.pan(),
                }
            }
        };
        self.pending = Some(update);
        Some(update)
    }

    /// Ends the current session; the model keeps its last valid state.
    pub fn pointer_up(&mut self, model: &LayoutModel, viewport: &ViewportTransform) -> SessionEnd {
        let end = match self.state {
            InteractionState::Idle => SessionEnd::None,
            InteractionState::DraggingItem { id, last_valid, .. } => SessionEnd::Item {
                id,
                position: model
                    .item(id)
                    .map(|item| item.rect().origin())
                    .unwrap_or(last_valid),
            },
            InteractionState::DraggingContainer { .. } => SessionEnd::Container {
                origin: model.container().origin(),
            },
            InteractionState::Panning { .. } => SessionEnd::Pan {
                pan: viewport.pan(),
            },
        };
        self.state = InteractionState::Idle;
        debug!(?end, "pointer session ended");
        end
    }

    /// Explicit cancel; behaves like releasing the pointer.
    pub fn cancel(&mut self, model: &LayoutModel, viewport: &ViewportTransform) -> SessionEnd {
        self.pointer_up(model, viewport)
    }

    /// Zooms by `factor` around the cursor. Allowed in any state.
    pub fn wheel(&mut self, viewport: &mut ViewportTransform, screen: Point, factor: f64) -> FrameUpdate {
        if factor.is_finite() && factor > 0.0 {
            viewport.zoom_at(screen, viewport.zoom() * factor);
        }
        let update = FrameUpdate::Viewport {
            zoom: viewport.zoom(),
            pan: viewport.pan(),
        };
        self.pending = Some(update);
        update
    }

    /// Drains the pending frame update, if any.
    pub fn take_frame(&mut self) -> Option<FrameUpdate> {
        self.pending.take()
    }

    pub fn selection(&self) -> &BTreeSet<ItemId> {
        &self.selection
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(&id)
    }

    /// Replaces the selection with a single item.
    pub fn select(&mut self, id: ItemId) {
        self.selection.clear();
        self.selection.insert(id);
    }

    /// Adds or removes one item (shift-click).
    pub fn toggle_selected(&mut self, id: ItemId) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn select_all(&mut self, model: &LayoutModel) {
        self.selection = model.items().iter().map(|item| item.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Deletes every selected item and clears the selection.
    pub fn delete_selection(&mut self, model: &mut LayoutModel) -> usize {
        let ids = std::mem::take(&mut self.selection);
        model.remove_items(ids)
    }

    pub fn toggle_lock_selection(&mut self, model: &mut LayoutModel) -> usize {
        model.toggle_lock(self.selection.iter().copied())
    }

    /// Snaps to the scan step, relative to the container origin.
    fn snap(&self, model: &LayoutModel, point: Point) -> Point {
        let origin = model.container().origin();
        origin + (point - origin).snapped(self.snap_step)
    }
}
