//! Platzierungslogik für neue Zuschnitte auf der Grundplatte.
//!
//! Dieses Modul implementiert eine deterministische First-Fit-Suche:
//! - Kandidaten werden zeilenweise (erst y, dann x) von links oben abgetastet
//! - Der erste freie Kandidat gewinnt, es wird NICHT nach einer optimalen Lösung gesucht
//! - Das Buchungsraster beschleunigt die Prüfung, paarweise Tests liefern dieselbe Entscheidung

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::booking::BookingGrid;
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::overlaps_with_tolerance;
use crate::model::{Container, Item, ItemId, LayoutModel};
use crate::types::{Point, Rect, Size, validation};

/// Prüft die Abmessungen eines neuen Zuschnitts.
///
/// Breite und Höhe müssen > 0 und <= `limits` sein. Es werden ALLE Verstöße
/// gesammelt, nicht nur der erste.
///
/// # Parameter
/// * `size` - Die angefragte Größe
/// * `limits` - Maximal zulässige Breite/Höhe
///
/// # Rückgabewert
/// `Ok(())` bei gültigen Werten, sonst `LayoutError::InvalidDimensions`
pub fn validate_dimensions(size: Size, limits: Size) -> Result<(), LayoutError> {
    let mut reasons = validation::dimension_violations(size.width, "Width", limits.width);
    reasons.extend(validation::dimension_violations(
        size.height,
        "Height",
        limits.height,
    ));
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(LayoutError::InvalidDimensions(reasons))
    }
}

/// Effektive Obergrenze für Zuschnitte: Konfiguration, aber nie größer als der Container.
pub fn dimension_limits(container: &Container, config: &LayoutConfig) -> Size {
    let max = config.max_item_size();
    Size::new(max.width.min(container.width), max.height.min(container.height))
}

/// Findet die erste freie Position für einen neuen Zuschnitt.
///
/// Äußere Schleife über y, innere über x, jeweils in `scan_step`-Schritten ab
/// dem Container-Ursprung. Mit Raster wird `BookingGrid::is_free` verwendet,
/// ohne Raster paarweise Überlappungstests; beide Wege treffen dieselbe Entscheidung.
///
/// # Parameter
/// * `container` - Die Grundplatte
/// * `items` - Bereits platzierte Zuschnitte
/// * `size` - Größe des neuen Zuschnitts
/// * `grid` - Optionales Buchungsraster (muss zu `items` passen)
/// * `config` - Konfigurationsparameter
///
/// # Rückgabewert
/// `Some(Point)` (linke obere Ecke) bei Erfolg, sonst `None`
pub fn find_position(
    container: &Container,
    items: &[Item],
    size: Size,
    grid: Option<&BookingGrid>,
    config: &LayoutConfig,
) -> Option<Point> {
    let eps = config.epsilon;
    if !size.is_valid_dimension() || !size.fits_within(&container.size(), eps) {
        return None;
    }

    let bounds = container.bounds();
    let xs = axis_positions(bounds.x, bounds.width, size.width, config.scan_step, eps);
    let ys = axis_positions(bounds.y, bounds.height, size.height, config.scan_step, eps);

    for &y in &ys {
        let mut i = 0;
        while i < xs.len() {
            let candidate = Rect::new(xs[i], y, size.width, size.height);
            match grid {
                Some(grid) => {
                    if grid.is_free(&candidate) {
                        return Some(candidate.origin());
                    }
                    if grid.is_exact_for(&candidate) {
                        // Exakte Belegung: alle x bis hinter die blockierende Spalte sind ebenfalls belegt
                        if let Some(col) = grid.last_blocked_col(&candidate) {
                            let next_x = grid.origin().x + (col as f64 + 1.0) * grid.cell_size();
                            let skip = xs.partition_point(|&x| x < next_x - eps);
                            i = skip.max(i + 1);
                            continue;
                        }
                    } else if fits_pairwise(&candidate, items, None, eps) {
                        return Some(candidate.origin());
                    }
                }
                None => {
                    if fits_pairwise(&candidate, items, None, eps) {
                        return Some(candidate.origin());
                    }
                }
            }
            i += 1;
        }
    }

    None
}

/// Prüft einen Kandidaten paarweise gegen alle Zuschnitte (außer `exclude`).
pub fn fits_pairwise(candidate: &Rect, items: &[Item], exclude: Option<ItemId>, eps: f64) -> bool {
    !items
        .iter()
        .filter(|item| Some(item.id) != exclude)
        .any(|item| overlaps_with_tolerance(candidate, &item.rect(), eps))
}

/// Prüft, ob ein Bereich frei ist: erst über das Raster, im Zweifel paarweise.
///
/// Das Raster muss die Reservierung von `exclude` bereits freigegeben haben.
pub(crate) fn is_region_available(
    candidate: &Rect,
    items: &[Item],
    grid: &BookingGrid,
    exclude: Option<ItemId>,
    eps: f64,
) -> bool {
    if grid.is_free(candidate) {
        return true;
    }
    !grid.is_exact_for(candidate) && fits_pairwise(candidate, items, exclude, eps)
}

/// Generiert mögliche Positionen entlang einer Achse.
///
/// Erstellt ein Raster von Positionen mit der angegebenen Schrittweite ab
/// `origin`; die bündige Endposition wird immer ergänzt.
///
/// # Parameter
/// * `origin` - Startkoordinate des Containers
/// * `container_len` - Länge des Containers in dieser Dimension
/// * `object_len` - Länge des Objekts in dieser Dimension
/// * `step` - Schrittweite des Rasters
/// * `epsilon` - Numerische Toleranz
fn axis_positions(origin: f64, container_len: f64, object_len: f64, step: f64, epsilon: f64) -> Vec<f64> {
    let max_offset = (container_len - object_len).max(0.0);
    if max_offset <= epsilon {
        return vec![origin];
    }

    let steps = (max_offset / step + epsilon).floor() as usize;
    let mut positions: Vec<f64> = (0..=steps).map(|i| origin + i as f64 * step).collect();

    if let Some(&last) = positions.last() {
        if (last - (origin + max_offset)).abs() > epsilon {
            positions.push(origin + max_offset);
        }
    }
    positions
}

/// Anfrage für mehrere gleich große Zuschnitte.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemRequest {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl ItemRequest {
    pub fn new(width: f64, height: f64, quantity: u32) -> Self {
        Self {
            width,
            height,
            quantity,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Ereignisse während einer Serienplatzierung, z. B. für Live-Anzeige.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PlacementEvent {
    /// Ein Zuschnitt wurde platziert.
    ItemPlaced {
        request_index: usize,
        id: ItemId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        efficiency: f64,
    },
    /// Zuschnitte einer Anfrage konnten nicht platziert werden.
    ItemRejected {
        request_index: usize,
        width: f64,
        height: f64,
        count: u32,
        reason_code: String,
        reason_text: String,
    },
    /// Serienplatzierung abgeschlossen.
    Finished { placed: usize, unplaced: u32 },
}

/// Zuschnitte, die nicht platziert werden konnten.
#[derive(Clone, Debug, PartialEq)]
pub struct UnplacedRequest {
    pub request_index: usize,
    pub size: Size,
    pub count: u32,
    pub error: LayoutError,
}

/// Ergebnis einer Serienplatzierung.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementReport {
    pub placed: Vec<Item>,
    pub unplaced: Vec<UnplacedRequest>,
}

impl PlacementReport {
    /// Gibt an, ob alle Zuschnitte platziert wurden.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Anzahl nicht platzierter Zuschnitte.
    pub fn unplaced_count(&self) -> u32 {
        self.unplaced.iter().map(|u| u.count).sum()
    }
}

/// Platziert alle Anfragen in Reihenfolge und meldet jeden Schritt.
///
/// Schlägt ein Exemplar fehl, scheitern auch alle weiteren Exemplare derselben
/// Anfrage (das Modell wird nur voller); sie werden gesammelt gemeldet.
pub fn place_requests_with_progress(
    model: &mut LayoutModel,
    requests: &[ItemRequest],
    mut on_event: impl FnMut(&PlacementEvent),
) -> PlacementReport {
    let mut report = PlacementReport::default();

    for (request_index, request) in requests.iter().enumerate() {
        for copy in 0..request.quantity {
            match model.add_item(request.size()) {
                Ok(item) => {
                    on_event(&PlacementEvent::ItemPlaced {
                        request_index,
                        id: item.id,
                        x: item.x,
                        y: item.y,
                        width: item.width,
                        height: item.height,
                        efficiency: model.efficiency(),
                    });
                    report.placed.push(item);
                }
                Err(error) => {
                    let count = request.quantity - copy;
                    on_event(&PlacementEvent::ItemRejected {
                        request_index,
                        width: request.width,
                        height: request.height,
                        count,
                        reason_code: error.code().to_string(),
                        reason_text: error.to_string(),
                    });
                    report.unplaced.push(UnplacedRequest {
                        request_index,
                        size: request.size(),
                        count,
                        error,
                    });
                    break;
                }
            }
        }
    }

    debug!(
        placed = report.placed.len(),
        unplaced = report.unplaced_count(),
        "batch placement finished"
    );
    on_event(&PlacementEvent::Finished {
        placed: report.placed.len(),
        unplaced: report.unplaced_count(),
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(width: f64, height: f64) -> Container {
        Container::new(Size::new(width, height)).unwrap()
    }

    fn item(id: u64, x: f64, y: f64, w: f64, h: f64) -> Item {
        Item::new(ItemId(id), Rect::new(x, y, w, h))
    }

    #[test]
    fn validate_collects_every_violation() {
        let err = validate_dimensions(Size::new(0.0, 500.0), Size::new(100.0, 80.0)).unwrap_err();
        match err {
            LayoutError::InvalidDimensions(reasons) => assert_eq!(reasons.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_dimensions(Size::new(20.0, 30.0), Size::new(100.0, 80.0)).is_ok());
    }

    #[test]
    fn limits_never_exceed_container() {
        let config = LayoutConfig::default();
        let limits = dimension_limits(&container(100.0, 80.0), &config);
        assert_eq!(limits, Size::new(100.0, 80.0));
    }

    #[test]
    fn empty_container_places_at_origin() {
        let config = LayoutConfig::default();
        let c = container(100.0, 80.0).at(Point::new(10.0, 5.0));
        let pos = find_position(&c, &[], Size::new(20.0, 30.0), None, &config);
        assert_eq!(pos, Some(Point::new(10.0, 5.0)));
    }

    #[test]
    fn scan_is_row_major() {
        let config = LayoutConfig::default();
        let c = container(100.0, 80.0);
        let items = vec![item(1, 0.0, 0.0, 20.0, 30.0)];
        let pos = find_position(&c, &items, Size::new(20.0, 30.0), None, &config);
        assert_eq!(pos, Some(Point::new(20.0, 0.0)));
    }

    #[test]
    fn grid_and_pairwise_agree_with_unaligned_items() {
        let config = LayoutConfig::builder().cell_size(10.0).build();
        let c = container(100.0, 80.0);
        let items = vec![item(1, 0.0, 0.0, 15.0, 10.0), item(2, 27.0, 0.0, 13.0, 12.0)];
        let mut grid = BookingGrid::new(&c.bounds(), config.cell_size, config.max_grid_cells).unwrap();
        for it in &items {
            grid.reserve(&it.rect());
        }
        let size = Size::new(12.0, 10.0);
        let with_grid = find_position(&c, &items, size, Some(&grid), &config);
        let without = find_position(&c, &items, size, None, &config);
        assert_eq!(with_grid, without);
        assert_eq!(with_grid, Some(Point::new(15.0, 0.0)));
    }

    #[test]
    fn skipping_blocked_columns_keeps_first_fit() {
        let config = LayoutConfig::default();
        let c = container(100.0, 80.0);
        let items = vec![item(1, 0.0, 0.0, 50.0, 80.0), item(2, 60.0, 0.0, 10.0, 10.0)];
        let mut grid = BookingGrid::new(&c.bounds(), config.cell_size, config.max_grid_cells).unwrap();
        for it in &items {
            grid.reserve(&it.rect());
        }
        let size = Size::new(10.0, 10.0);
        assert_eq!(
            find_position(&c, &items, size, Some(&grid), &config),
            Some(Point::new(50.0, 0.0))
        );
        let wide = Size::new(15.0, 10.0);
        assert_eq!(
            find_position(&c, &items, wide, Some(&grid), &config),
            find_position(&c, &items, wide, None, &config)
        );
    }

    #[test]
    fn oversized_item_is_not_found() {
        let config = LayoutConfig::default();
        let c = container(100.0, 80.0);
        assert_eq!(find_position(&c, &[], Size::new(200.0, 10.0), None, &config), None);
    }

    #[test]
    fn full_container_is_not_found() {
        let config = LayoutConfig::default();
        let c = container(40.0, 30.0);
        let items = vec![item(1, 0.0, 0.0, 20.0, 30.0), item(2, 20.0, 0.0, 20.0, 30.0)];
        assert_eq!(find_position(&c, &items, Size::new(1.0, 1.0), None, &config), None);
    }

    #[test]
    fn axis_positions_include_flush_end() {
        let positions = axis_positions(0.0, 100.0, 30.0, 25.0, 1e-6);
        assert_eq!(positions, vec![0.0, 25.0, 50.0, 70.0]);
        assert_eq!(axis_positions(5.0, 10.0, 10.0, 1.0, 1e-6), vec![5.0]);
    }

    #[test]
    fn batch_reports_remaining_copies_once() {
        let mut model = LayoutModel::new(container(40.0, 30.0), LayoutConfig::default()).unwrap();
        let mut events = Vec::new();
        let report = place_requests_with_progress(
            &mut model,
            &[ItemRequest::new(20.0, 30.0, 5), ItemRequest::new(0.0, 1.0, 1)],
            |evt| events.push(evt.clone()),
        );
        assert_eq!(report.placed.len(), 2);
        assert_eq!(report.unplaced.len(), 2);
        assert_eq!(report.unplaced[0].count, 3);
        assert!(matches!(
            report.unplaced[0].error,
            LayoutError::NoSpaceAvailable { .. }
        ));
        assert!(matches!(
            report.unplaced[1].error,
            LayoutError::InvalidDimensions(_)
        ));
        assert_eq!(report.unplaced_count(), 4);
        assert!(matches!(
            events.last(),
            Some(PlacementEvent::Finished {
                placed: 2,
                unplaced: 4
            })
        ));
    }
}
