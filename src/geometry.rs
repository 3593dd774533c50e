//! Geometrische Hilfsfunktionen für 2D-Kollisionserkennung und Rasterabbildung.
//!
//! Reine Funktionen ohne Zustand: Überlappungstest, Enthaltenseinstest und
//! Umrechnung eines Rechtecks in einen Bereich von Rasterzellen.

use crate::types::{EPSILON_GENERAL, Rect};

/// Prüft, ob sich zwei Rechtecke überschneiden.
///
/// Zwei Rechtecke überschneiden sich NICHT, wenn eines vollständig links,
/// rechts, oberhalb oder unterhalb des anderen liegt. Berührende Kanten
/// (`a.right() == b.x`) gelten nicht als Überschneidung.
///
/// Die Kantenvergleiche nutzen die absolute Toleranz `EPSILON_GENERAL`
/// (1e-6 Rastereinheiten): Überschneidungen von höchstens dieser Tiefe gelten
/// als Berührung. Gedacht für Koordinaten in Rastereinheiten (cm-Bereich);
/// für andere Größenordnungen [`overlaps_with_tolerance`] verwenden.
///
/// # Parameter
/// * `a` - Erstes Rechteck
/// * `b` - Zweites Rechteck
///
/// # Rückgabewert
/// `true` wenn sich die Rechtecke überschneiden, sonst `false`
///
/// # Beispiel
/// ```
/// use plate_layout::geometry::overlaps;
/// use plate_layout::types::Rect;
///
/// let a = Rect::new(0.0, 0.0, 20.0, 20.0);
/// assert!(overlaps(&a, &Rect::new(10.0, 10.0, 20.0, 20.0)));
/// assert!(!overlaps(&a, &Rect::new(20.0, 0.0, 20.0, 20.0)));
/// ```
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    overlaps_with_tolerance(a, b, EPSILON_GENERAL)
}

/// Wie [`overlaps`], aber mit expliziter Toleranz für die Kantenvergleiche.
///
/// Mit `epsilon = 0.0` ist der Rand exakt exklusiv.
pub fn overlaps_with_tolerance(a: &Rect, b: &Rect, epsilon: f64) -> bool {
    // Separating Axis Theorem: getrennt, sobald eine Achse trennt
    !(a.right() <= b.x + epsilon
        || b.right() <= a.x + epsilon
        || a.bottom() <= b.y + epsilon
        || b.bottom() <= a.y + epsilon)
}

/// Prüft, ob ein Rechteck vollständig innerhalb der Grenzen liegt.
///
/// # Parameter
/// * `rect` - Das zu prüfende Rechteck
/// * `bounds` - Die umgebenden Grenzen (z. B. der Container)
pub fn within(rect: &Rect, bounds: &Rect) -> bool {
    within_with_tolerance(rect, bounds, EPSILON_GENERAL)
}

/// Wie [`within`], aber mit expliziter Toleranz.
pub fn within_with_tolerance(rect: &Rect, bounds: &Rect, epsilon: f64) -> bool {
    rect.x >= bounds.x - epsilon
        && rect.y >= bounds.y - epsilon
        && rect.right() <= bounds.right() + epsilon
        && rect.bottom() <= bounds.bottom() + epsilon
}

/// Bereich von Rasterzellen, den ein Rechteck berührt.
///
/// `row_end` und `col_end` sind exklusiv. Die Werte sind vorzeichenbehaftet und
/// NICHT auf das Raster begrenzt; Aufrufer müssen vor dem Indizieren prüfen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridIndices {
    pub row_start: i64,
    pub row_end: i64,
    pub col_start: i64,
    pub col_end: i64,
}

impl GridIndices {
    /// Prüft, ob alle Indizes innerhalb eines Rasters `rows × cols` liegen.
    pub fn fits_grid(&self, rows: usize, cols: usize) -> bool {
        self.row_start >= 0
            && self.col_start >= 0
            && self.row_end <= rows as i64
            && self.col_end <= cols as i64
    }

    /// Begrenzt den Bereich auf ein Raster `rows × cols`.
    pub fn clamped(&self, rows: usize, cols: usize) -> Self {
        let rows = rows as i64;
        let cols = cols as i64;
        Self {
            row_start: self.row_start.clamp(0, rows),
            row_end: self.row_end.clamp(0, rows),
            col_start: self.col_start.clamp(0, cols),
            col_end: self.col_end.clamp(0, cols),
        }
    }
}

/// Rechnet ein Rechteck (relativ zum Rasterursprung) in Zellindizes um.
///
/// Start wird abgerundet, Ende aufgerundet: teilweise überdeckte Zellen zählen
/// immer mit.
///
/// # Parameter
/// * `rect` - Rechteck in Rasterkoordinaten (Ursprung = Zelle (0, 0))
/// * `cell_size` - Kantenlänge einer Zelle, muss > 0 sein
pub fn to_grid_indices(rect: &Rect, cell_size: f64) -> GridIndices {
    let eps = EPSILON_GENERAL;
    let col_start = (rect.x / cell_size + eps).floor() as i64;
    let row_start = (rect.y / cell_size + eps).floor() as i64;
    let col_end = ((rect.right() / cell_size - eps).ceil() as i64).max(col_start + 1);
    let row_end = ((rect.bottom() / cell_size - eps).ceil() as i64).max(row_start + 1);
    GridIndices {
        row_start,
        row_end,
        col_start,
        col_end,
    }
}

/// Prüft, ob ein Rechteck exakt auf Zellgrenzen liegt.
pub fn is_cell_aligned(rect: &Rect, cell_size: f64) -> bool {
    let aligned = |v: f64| {
        let q = v / cell_size;
        (q - q.round()).abs() <= EPSILON_GENERAL
    };
    aligned(rect.x) && aligned(rect.y) && aligned(rect.right()) && aligned(rect.bottom())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 20.0, 30.0);
        let right = Rect::new(20.0, 0.0, 20.0, 30.0);
        let below = Rect::new(0.0, 30.0, 20.0, 30.0);
        assert!(!overlaps(&a, &right));
        assert!(!overlaps(&a, &below));
        assert!(!overlaps(&right, &a));
    }

    #[test]
    fn overlapping_and_nested_rectangles() {
        let a = Rect::new(0.0, 0.0, 20.0, 20.0);
        assert!(overlaps(&a, &Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(overlaps(&a, &Rect::new(5.0, 5.0, 2.0, 2.0)));
        assert!(overlaps(&Rect::new(5.0, 5.0, 2.0, 2.0), &a));
    }

    #[test]
    fn overlap_depth_below_tolerance_counts_as_touching() {
        let a = Rect::new(0.0, 0.0, 20.0, 20.0);
        let sliver = Rect::new(20.0 - 1e-7, 0.0, 20.0, 20.0);
        assert!(!overlaps(&a, &sliver));
        assert!(overlaps_with_tolerance(&a, &sliver, 0.0));
        assert!(!overlaps_with_tolerance(&a, &Rect::new(20.0, 0.0, 5.0, 5.0), 0.0));
    }

    #[test]
    fn within_checks_all_four_extremes() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 80.0);
        assert!(within(&Rect::new(0.0, 0.0, 100.0, 80.0), &bounds));
        assert!(within(&Rect::new(80.0, 50.0, 20.0, 30.0), &bounds));
        assert!(!within(&Rect::new(90.0, 10.0, 20.0, 30.0), &bounds));
        assert!(!within(&Rect::new(-1.0, 10.0, 20.0, 30.0), &bounds));
        assert!(!within(&Rect::new(0.0, 60.0, 20.0, 30.0), &bounds));
    }

    #[test]
    fn grid_indices_cover_partial_cells() {
        let idx = to_grid_indices(&Rect::new(5.0, 0.0, 10.0, 10.0), 10.0);
        assert_eq!(
            idx,
            GridIndices {
                row_start: 0,
                row_end: 1,
                col_start: 0,
                col_end: 2
            }
        );
    }

    #[test]
    fn grid_indices_exact_multiple() {
        let idx = to_grid_indices(&Rect::new(20.0, 0.0, 20.0, 30.0), 1.0);
        assert_eq!(idx.col_start, 20);
        assert_eq!(idx.col_end, 40);
        assert_eq!(idx.row_end, 30);
    }

    #[test]
    fn grid_indices_clamp_and_fit() {
        let idx = to_grid_indices(&Rect::new(-2.0, 5.0, 4.0, 10.0), 1.0);
        assert!(!idx.fits_grid(20, 20));
        let clamped = idx.clamped(20, 20);
        assert_eq!(clamped.col_start, 0);
        assert!(clamped.fits_grid(20, 20));
    }

    #[test]
    fn cell_alignment() {
        assert!(is_cell_aligned(&Rect::new(10.0, 20.0, 30.0, 10.0), 10.0));
        assert!(!is_cell_aligned(&Rect::new(15.0, 20.0, 30.0, 10.0), 10.0));
    }
}
