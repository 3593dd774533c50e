//! Interactive 2D cutting-layout engine.
//!
//! One rectangular container (a base plate) holds rectangular items (cuts).
//! Items are placed first-fit, moved by dragging and persisted as documents;
//! every mutation goes through [`model::LayoutModel`], which guarantees that
//! items stay inside the container and never overlap.

pub mod booking;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod planner;
pub mod serializer;
pub mod types;
pub mod viewport;

pub use config::LayoutConfig;
pub use error::LayoutError;
pub use interaction::{FrameUpdate, HitTarget, InteractionController, InteractionState, SessionEnd};
pub use model::{Container, Item, ItemId, LayoutModel, LayoutSnapshot, MoveOutcome, RejectReason};
pub use planner::{ItemRequest, PlacementEvent, PlacementReport};
pub use serializer::{LayoutDocument, export, import};
pub use types::{Point, Rect, Size};
pub use viewport::{ViewportTransform, ZoomLimits};
