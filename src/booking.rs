//! Occupancy cache over the container area.
//!
//! The grid is derived from the item rectangles and never authoritative. Cells
//! hold reservation counts so that releasing one item keeps a shared,
//! partially-covered cell booked for its neighbour.

use tracing::trace;

use crate::error::LayoutError;
use crate::geometry::{GridIndices, is_cell_aligned, to_grid_indices};
use crate::types::{Point, Rect};

#[derive(Clone, Debug, PartialEq)]
pub struct BookingGrid {
    origin: Point,
    cell_size: f64,
    rows: usize,
    cols: usize,
    cells: Vec<u16>,
    /// Number of reservations that do not sit exactly on cell boundaries.
    unaligned: usize,
}

impl BookingGrid {
    /// Creates an empty (all free) grid covering `bounds`.
    ///
    /// Fails with `InvalidDimensions` if `cell_size` is not positive or the
    /// grid would need more than `max_cells` cells.
    pub fn new(bounds: &Rect, cell_size: f64, max_cells: usize) -> Result<Self, LayoutError> {
        let (rows, cols) = grid_shape(bounds, cell_size, max_cells)?;
        Ok(Self {
            origin: bounds.origin(),
            cell_size,
            rows,
            cols,
            cells: vec![0; rows * cols],
            unaligned: 0,
        })
    }

    /// Clears the grid, moves it to `origin` and reserves every item rectangle.
    ///
    /// The grid shape is kept; a container of a different size needs a new grid.
    pub fn rebuild<'a>(&mut self, origin: Point, items: impl IntoIterator<Item = &'a Rect>) {
        self.origin = origin;
        self.cells.fill(0);
        self.unaligned = 0;
        let mut count = 0usize;
        for rect in items {
            self.reserve(rect);
            count += 1;
        }
        trace!(rows = self.rows, cols = self.cols, items = count, "booking grid rebuilt");
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Moves the grid without touching its cells.
    ///
    /// Valid only when every reserved rectangle moved by the same delta.
    pub fn translate(&mut self, delta: Point) {
        self.origin = self.origin + delta;
    }

    /// Whether the cell at `(row, col)` is free. Out-of-range cells are never free.
    pub fn is_cell_free(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col] == 0
    }

    /// Cell range of `rect` relative to the grid origin.
    pub fn indices(&self, rect: &Rect) -> GridIndices {
        let local = rect.translated(-self.origin);
        to_grid_indices(&local, self.cell_size)
    }

    /// Checks that every cell covered by `rect` lies inside the grid and is free.
    pub fn is_free(&self, rect: &Rect) -> bool {
        let idx = self.indices(rect);
        if !idx.fits_grid(self.rows, self.cols) {
            return false;
        }
        (idx.row_start as usize..idx.row_end as usize).all(|row| {
            let base = row * self.cols;
            self.cells[base + idx.col_start as usize..base + idx.col_end as usize]
                .iter()
                .all(|&count| count == 0)
        })
    }

    /// Rightmost booked column inside the cell range of `rect`, if any.
    pub fn last_blocked_col(&self, rect: &Rect) -> Option<usize> {
        let idx = self.indices(rect).clamped(self.rows, self.cols);
        (idx.col_start as usize..idx.col_end as usize)
            .rev()
            .find(|&col| {
                (idx.row_start as usize..idx.row_end as usize)
                    .any(|row| self.cells[row * self.cols + col] > 0)
            })
    }

    /// Whether an occupied answer from [`Self::is_free`] for `rect` is exact.
    ///
    /// Holds when both the query and every reservation sit on cell boundaries;
    /// otherwise partially-covered cells may report a conflict that the
    /// rectangles themselves do not have.
    pub fn is_exact_for(&self, rect: &Rect) -> bool {
        self.unaligned == 0 && is_cell_aligned(&rect.translated(-self.origin), self.cell_size)
    }

    /// Books every cell covered by `rect`, clamped to the grid.
    pub fn reserve(&mut self, rect: &Rect) {
        if !is_cell_aligned(&rect.translated(-self.origin), self.cell_size) {
            self.unaligned += 1;
        }
        self.apply(rect, |count| *count = count.saturating_add(1));
    }

    /// Releases every cell covered by `rect`, clamped to the grid.
    pub fn release(&mut self, rect: &Rect) {
        if !is_cell_aligned(&rect.translated(-self.origin), self.cell_size) {
            self.unaligned = self.unaligned.saturating_sub(1);
        }
        self.apply(rect, |count| *count = count.saturating_sub(1));
    }

    /// Number of booked cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|&&count| count > 0).count()
    }

    fn apply(&mut self, rect: &Rect, mut op: impl FnMut(&mut u16)) {
        let idx = self.indices(rect).clamped(self.rows, self.cols);
        for row in idx.row_start as usize..idx.row_end as usize {
            let base = row * self.cols;
            for cell in &mut self.cells[base + idx.col_start as usize..base + idx.col_end as usize] {
                op(cell);
            }
        }
    }
}

/// Rows and columns needed to cover `bounds`, bounded by `max_cells`.
fn grid_shape(bounds: &Rect, cell_size: f64, max_cells: usize) -> Result<(usize, usize), LayoutError> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(LayoutError::InvalidDimensions(vec![format!(
            "Cell size must be positive, got: {}",
            cell_size
        )]));
    }
    let cols = (bounds.width / cell_size).ceil().max(0.0);
    let rows = (bounds.height / cell_size).ceil().max(0.0);
    let too_large = || {
        LayoutError::InvalidDimensions(vec![format!(
            "Booking grid of {} x {} cells exceeds the limit of {} cells",
            rows, cols, max_cells
        )])
    };
    // Bound each axis before the cast so the product below cannot be garbage.
    if !(cols <= max_cells as f64 && rows <= max_cells as f64) {
        return Err(too_large());
    }
    let (rows, cols) = (rows as usize, cols as usize);
    match rows.checked_mul(cols) {
        Some(cells) if cells <= max_cells => Ok((rows, cols)),
        _ => Err(too_large()),
    }
}
