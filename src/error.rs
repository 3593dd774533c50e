//! Error values returned by the layout engine.
//!
//! Every failure is an explicit value so the host can present it however it
//! likes (toast, alert, HTTP body). `code()` gives a stable machine-readable
//! identifier next to the human-readable `Display` text.

use thiserror::Error;

use crate::model::ItemId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Non-positive, non-finite or over-maximum size. Lists every violated rule.
    #[error("Invalid dimensions: {}", .0.join("; "))]
    InvalidDimensions(Vec<String>),

    #[error("No free position for a {width} x {height} item")]
    NoSpaceAvailable { width: f64, height: f64 },

    #[error("Item leaves the container bounds{}", format_ids(.item_ids))]
    OutOfBounds { item_ids: Vec<ItemId> },

    #[error("Item overlaps another item{}", format_ids(.item_ids))]
    Overlap { item_ids: Vec<ItemId> },

    #[error("Item {0} is locked")]
    Locked(ItemId),

    #[error("Item {0} does not exist")]
    UnknownItem(ItemId),

    #[error("Invalid layout document: {reason}{}", format_ids(.item_ids))]
    InvalidFormat {
        reason: String,
        item_ids: Vec<ItemId>,
    },
}

impl LayoutError {
    pub fn code(&self) -> &'static str {
        match self {
            LayoutError::InvalidDimensions(_) => "invalid_dimensions",
            LayoutError::NoSpaceAvailable { .. } => "no_space_available",
            LayoutError::OutOfBounds { .. } => "out_of_bounds",
            LayoutError::Overlap { .. } => "overlap",
            LayoutError::Locked(_) => "locked",
            LayoutError::UnknownItem(_) => "unknown_item",
            LayoutError::InvalidFormat { .. } => "invalid_format",
        }
    }

    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        LayoutError::InvalidFormat {
            reason: reason.into(),
            item_ids: Vec::new(),
        }
    }
}

fn format_ids(ids: &[ItemId]) -> String {
    if ids.is_empty() {
        return String::new();
    }
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(" (items: {})", joined)
}
