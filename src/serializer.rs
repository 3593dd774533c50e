//! Persisted layout documents.
//!
//! A document carries the container, all items in absolute grid coordinates,
//! the booking cell size and the viewport. Import never trusts the document:
//! every item is re-checked and the whole document is rejected on the first
//! problem, naming the offending item ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::model::{Container, Item, LayoutModel};
use crate::types::Point;
use crate::viewport::ViewportTransform;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    pub version: u32,
    pub container: Container,
    pub items: Vec<Item>,
    pub grid_size: f64,
    pub zoom: f64,
    pub pan_offset: Point,
    /// Id the next created item receives; absent in hand-written documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<u64>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

/// Derived figures, informational only. Recomputed on import.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub item_count: usize,
    #[serde(default)]
    pub locked_count: usize,
    #[serde(default)]
    pub remaining_area: f64,
    /// Free-form host annotations (customer, order number, ...).
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

impl LayoutDocument {
    pub fn to_json(&self) -> Result<String, LayoutError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| LayoutError::invalid_format(format!("cannot encode document: {}", err)))
    }

    /// Parses a document. Structural problems become `InvalidFormat`.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        serde_json::from_str(json)
            .map_err(|err| LayoutError::invalid_format(format!("malformed JSON: {}", err)))
    }
}

/// Captures the model and viewport as a document.
pub fn export(model: &LayoutModel, viewport: &ViewportTransform) -> LayoutDocument {
    let items = model.items().to_vec();
    let locked_count = items.iter().filter(|item| item.locked).count();
    LayoutDocument {
        version: DOCUMENT_VERSION,
        container: model.container().clone(),
        grid_size: model.config().cell_size,
        zoom: viewport.zoom(),
        pan_offset: viewport.pan(),
        next_id: Some(model.next_id().0),
        metadata: DocumentMetadata {
            efficiency: model.efficiency(),
            item_count: items.len(),
            locked_count,
            remaining_area: model.remaining_area(),
            notes: BTreeMap::new(),
        },
        items,
    }
}

/// Rebuilds a model and viewport from a document.
///
/// # Parameters
/// * `doc` - The document; consumed
/// * `config` - Base configuration; `gridSize` from the document overrides
///   its `cell_size`
///
/// # Returns
/// The restored pair, or `InvalidFormat` without any partial state.
pub fn import(
    doc: LayoutDocument,
    config: &LayoutConfig,
) -> Result<(LayoutModel, ViewportTransform), LayoutError> {
    if doc.version != DOCUMENT_VERSION {
        return Err(LayoutError::invalid_format(format!(
            "unsupported version {} (expected {})",
            doc.version, DOCUMENT_VERSION
        )));
    }
    if !(doc.grid_size.is_finite() && doc.grid_size > 0.0) {
        return Err(LayoutError::invalid_format(format!(
            "gridSize must be positive, got: {}",
            doc.grid_size
        )));
    }
    if !(doc.zoom.is_finite() && doc.zoom > 0.0) {
        return Err(LayoutError::invalid_format(format!(
            "zoom must be positive, got: {}",
            doc.zoom
        )));
    }
    if !doc.pan_offset.is_finite() {
        return Err(LayoutError::invalid_format("panOffset must be finite"));
    }
    if let Err(err) = doc.container.validate() {
        return Err(LayoutError::invalid_format(format!("container: {}", err)));
    }

    let mut config = *config;
    config.cell_size = doc.grid_size;

    let item_count = doc.items.len();
    let mut model = LayoutModel::from_parts(doc.container, doc.items, config).inspect_err(|err| {
        warn!(error = %err, "layout document rejected");
    })?;
    if let Some(next) = doc.next_id {
        model.reserve_ids_up_to(next);
    }

    let viewport = ViewportTransform::with_state(doc.zoom, doc.pan_offset, config.zoom_limits());
    info!(items = item_count, "layout document imported");
    Ok((model, viewport))
}
