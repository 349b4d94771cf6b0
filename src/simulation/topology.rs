//! Topology resolver
//!
//! Toggling a cell re-derives the edge signature of the cell and of every
//! affected road neighbour, then maps each changed signature onto one of the
//! canonical tiles. Planning is pure: it reads the grid through an overlay
//! and produces a `TopologyDiff` that is applied in one step.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, warn};
use thiserror::Error;

use super::grid::{Grid, Occupancy, Signature};
use super::shapes::{self, ResolvedTile};
use super::types::{CellCoord, RoadClass, Side};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("cell {cell} is outside the grid")]
    OutOfBounds { cell: CellCoord },
    #[error("no canonical tile for signature {signature} at {cell}")]
    UnresolvedTopology { cell: CellCoord, signature: Signature },
}

/// New state of one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub coord: CellCoord,
    pub occupancy: Occupancy,
    pub signature: Signature,
    pub tile: Option<ResolvedTile>,
    pub previous_tile: Option<ResolvedTile>,
}

impl CellChange {
    /// Whether the rendered tile (and so the lane graph) must be replaced
    pub fn tile_changed(&self) -> bool {
        self.tile != self.previous_tile
    }
}

/// All cell changes caused by one edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopologyDiff {
    pub changes: Vec<CellChange>,
}

impl TopologyDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, coord: CellCoord) -> Option<&CellChange> {
        self.changes.iter().find(|change| change.coord == coord)
    }

    /// Changes whose tile differs from the one currently shown
    pub fn tile_changes(&self) -> impl Iterator<Item = &CellChange> {
        self.changes.iter().filter(|change| change.tile_changed())
    }
}

/// Grid view with pending writes layered on top
struct Overlay<'a> {
    grid: &'a Grid,
    cells: HashMap<CellCoord, (Occupancy, Signature)>,
}

impl<'a> Overlay<'a> {
    fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            cells: HashMap::new(),
        }
    }

    fn occupancy(&self, coord: CellCoord) -> Occupancy {
        match self.cells.get(&coord) {
            Some((occupancy, _)) => *occupancy,
            None => self.grid.occupancy(coord),
        }
    }

    fn signature(&self, coord: CellCoord) -> Signature {
        match self.cells.get(&coord) {
            Some((_, signature)) => *signature,
            None => self
                .grid
                .get(coord)
                .map_or(Signature::EMPTY, |cell| cell.signature),
        }
    }

    fn is_road(&self, coord: CellCoord) -> bool {
        self.occupancy(coord).is_road()
    }

    fn road_neighbors(&self, coord: CellCoord) -> Vec<Side> {
        Side::ALL
            .into_iter()
            .filter(|side| self.is_road(coord.neighbor(*side)))
            .collect()
    }

    fn write(&mut self, coord: CellCoord, occupancy: Occupancy, signature: Signature) {
        self.cells.insert(coord, (occupancy, signature));
    }
}

/// Class a road neighbour presents towards a cell.
///
/// `side` is the side of the reading cell the neighbour lies on and `own` is
/// the reading cell's class. A neighbour with no edge towards the reader that
/// is freshly painted or about to become a junction has not settled yet: the
/// reader keeps `own` there and the junction takes the mixture when it
/// resolves.
fn facing_class(
    view: &Overlay,
    neighbor: CellCoord,
    side: Side,
    own: RoadClass,
) -> Option<RoadClass> {
    let painted = view.occupancy(neighbor).class()?;
    let signature = view.signature(neighbor);

    if let Some(class) = signature.edge(side.opposite()) {
        return Some(class);
    }
    if signature.is_empty() || view.road_neighbors(neighbor).len() >= 3 {
        return Some(own);
    }

    let (a, b) = (
        signature.edge(side.clockwise()),
        signature.edge(side.counter_clockwise()),
    );
    if let (Some(a), Some(b)) = (a, b) {
        if a == b {
            return Some(a);
        }
    }

    let mut edges = signature.0.iter().flatten();
    if let Some(first) = edges.next() {
        if edges.all(|class| class == first) {
            return Some(*first);
        }
    }

    Some(painted)
}

/// Derive the signature of a road cell from its neighbours
fn resolve_signature(view: &Overlay, coord: CellCoord, own: RoadClass) -> Signature {
    let connected: Vec<(Side, RoadClass)> = view
        .road_neighbors(coord)
        .into_iter()
        .filter_map(|side| {
            facing_class(view, coord.neighbor(side), side, own).map(|class| (side, class))
        })
        .collect();

    let mut signature = Signature::EMPTY;
    match connected.as_slice() {
        [] => {
            let previous = view.signature(coord);
            let vertical = previous.edge(Side::Top).is_some() || previous.edge(Side::Bottom).is_some();
            let (a, b) = if vertical {
                (Side::Top, Side::Bottom)
            } else {
                (Side::Left, Side::Right)
            };
            signature = signature.with(a, own).with(b, own);
        }
        [(side, class)] => {
            signature = signature
                .with(*side, *class)
                .with(side.opposite(), own);
        }
        [(a, ca), (b, cb)] => {
            if a.opposite() == *b {
                signature = signature.with(*a, *ca).with(*b, *cb);
            } else {
                let class = RoadClass::dominant(*ca, *cb);
                signature = signature.with(*a, class).with(*b, class);
            }
        }
        [_, _, _] => {
            let sides: Vec<Side> = connected.iter().map(|(side, _)| *side).collect();
            let missing = Side::ALL
                .into_iter()
                .find(|side| !sides.contains(side))
                .unwrap_or(Side::Top);
            let class_of = |side: Side| {
                connected
                    .iter()
                    .find(|(s, _)| *s == side)
                    .map_or(own, |(_, class)| *class)
            };
            let stem = missing.opposite();
            let through = RoadClass::dominant(
                class_of(missing.clockwise()),
                class_of(missing.counter_clockwise()),
            );
            signature = signature
                .with(missing.clockwise(), through)
                .with(missing.counter_clockwise(), through)
                .with(stem, class_of(stem));
        }
        _ => {
            for (side, class) in &connected {
                signature.set(*side, Some(*class));
            }
            let vertical_mixed = signature.edge(Side::Top) != signature.edge(Side::Bottom);
            let horizontal_mixed = signature.edge(Side::Left) != signature.edge(Side::Right);
            if vertical_mixed && horizontal_mixed {
                signature.set(Side::Top, Some(RoadClass::Main));
                signature.set(Side::Bottom, Some(RoadClass::Main));
            }
        }
    }
    signature
}

/// Look a signature up in the canonical table
pub fn resolve_tile(cell: CellCoord, signature: Signature) -> Result<ResolvedTile, TopologyError> {
    shapes::lookup(&signature).ok_or(TopologyError::UnresolvedTopology { cell, signature })
}

/// Plan the toggle of `cell`: an existing road is removed, an empty cell
/// becomes a road of `class`. The grid is not modified.
pub fn plan_toggle(
    grid: &Grid,
    cell: CellCoord,
    class: RoadClass,
) -> Result<TopologyDiff, TopologyError> {
    if !grid.contains(cell) {
        return Err(TopologyError::OutOfBounds { cell });
    }

    let mut view = Overlay::new(grid);
    let occupancy = if grid.is_road(cell) {
        Occupancy::Empty
    } else {
        Occupancy::Road(class)
    };
    view.write(cell, occupancy, Signature::EMPTY);

    let mut candidates: Vec<CellCoord> = view
        .road_neighbors(cell)
        .into_iter()
        .map(|side| cell.neighbor(side))
        .collect();
    if occupancy.is_road() {
        candidates.push(cell);
    }
    // connectivity is read from the snapshot before anything is resolved
    candidates.sort_by_key(|coord| (view.road_neighbors(*coord).len(), coord.row, coord.col));

    let mut queue: VecDeque<CellCoord> = candidates.into_iter().collect();
    let mut queued: HashSet<CellCoord> = queue.iter().copied().collect();
    let limit = 4 * grid.cells().len().max(1);
    let mut iterations = 0;

    while let Some(coord) = queue.pop_front() {
        queued.remove(&coord);
        iterations += 1;
        if iterations > limit {
            warn!(
                "Topology cascade from {} stopped after {} iterations",
                cell, limit
            );
            break;
        }

        let Some(own) = view.occupancy(coord).class() else {
            continue;
        };
        let signature = resolve_signature(&view, coord, own);
        view.write(coord, Occupancy::Road(own), signature);

        for side in view.road_neighbors(coord) {
            let neighbor = coord.neighbor(side);
            if view.signature(neighbor).edge(side.opposite()) != signature.edge(side)
                && queued.insert(neighbor)
            {
                queue.push_back(neighbor);
            }
        }
    }

    let mut coords: Vec<CellCoord> = view.cells.keys().copied().collect();
    coords.sort_by_key(|coord| (coord.row, coord.col));

    let mut changes = Vec::new();
    for coord in coords {
        let (occupancy, signature) = view.cells[&coord];
        let Some(current) = grid.get(coord) else {
            continue;
        };
        if current.occupancy == occupancy && current.signature == signature {
            continue;
        }
        let tile = if occupancy.is_road() {
            Some(resolve_tile(coord, signature)?)
        } else {
            None
        };
        changes.push(CellChange {
            coord,
            occupancy,
            signature,
            tile,
            previous_tile: current.tile,
        });
    }

    Ok(TopologyDiff { changes })
}

/// Write every change of `diff` into the grid
pub fn apply_diff(grid: &mut Grid, diff: &TopologyDiff) {
    for change in &diff.changes {
        if let Some(cell) = grid.get_mut(change.coord) {
            if change.tile_changed() {
                debug!(
                    "Tile at {}: {:?} -> {:?} ({})",
                    change.coord,
                    cell.tile.map(|t| t.shape),
                    change.tile.map(|t| t.shape),
                    change.signature
                );
            }
            cell.occupancy = change.occupancy;
            cell.signature = change.signature;
            cell.tile = change.tile;
        }
    }
}
