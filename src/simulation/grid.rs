//! The cell grid the user paints roads onto

use std::fmt;

use super::shapes::ResolvedTile;
use super::types::{CellCoord, Position, RoadClass, Side};

/// What the user placed in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occupancy {
    #[default]
    Empty,
    Road(RoadClass),
}

impl Occupancy {
    pub fn class(self) -> Option<RoadClass> {
        match self {
            Occupancy::Empty => None,
            Occupancy::Road(class) => Some(class),
        }
    }

    pub fn is_road(self) -> bool {
        matches!(self, Occupancy::Road(_))
    }
}

/// Edge classes of a cell, ordered top, right, bottom, left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature(pub [Option<RoadClass>; 4]);

impl Signature {
    pub const EMPTY: Signature = Signature([None; 4]);

    pub fn edge(&self, side: Side) -> Option<RoadClass> {
        self.0[side.index()]
    }

    pub fn set(&mut self, side: Side, class: Option<RoadClass>) {
        self.0[side.index()] = class;
    }

    pub fn with(mut self, side: Side, class: RoadClass) -> Signature {
        self.set(side, Some(class));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Sides that carry an edge
    pub fn sides(&self) -> Vec<Side> {
        Side::ALL
            .into_iter()
            .filter(|side| self.edge(*side).is_some())
            .collect()
    }

    /// Four-character lookup key, e.g. `-M-M`
    pub fn key(&self) -> String {
        self.0
            .iter()
            .map(|edge| edge.map_or('-', RoadClass::symbol))
            .collect()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub coord: CellCoord,
    pub occupancy: Occupancy,
    pub signature: Signature,
    /// `None` for empty cells
    pub tile: Option<ResolvedTile>,
}

impl Cell {
    fn empty(coord: CellCoord) -> Self {
        Self {
            coord,
            occupancy: Occupancy::Empty,
            signature: Signature::EMPTY,
            tile: None,
        }
    }
}

/// Row-major grid of cells
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    length: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, length: usize) -> Self {
        let cells = (0..width * length)
            .map(|i| Cell::empty(CellCoord::new((i % width) as i32, (i / width) as i32)))
            .collect();
        Self {
            width,
            length,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && (coord.col as usize) < self.width
            && (coord.row as usize) < self.length
    }

    /// Linear (row-major) index of a cell
    pub fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.row as usize * self.width + coord.col as usize)
        } else {
            None
        }
    }

    pub fn coord_of(&self, index: usize) -> CellCoord {
        CellCoord::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn get(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub(crate) fn get_mut(&mut self, coord: CellCoord) -> Option<&mut Cell> {
        self.index(coord).map(move |i| &mut self.cells[i])
    }

    pub fn occupancy(&self, coord: CellCoord) -> Occupancy {
        self.get(coord).map_or(Occupancy::Empty, |cell| cell.occupancy)
    }

    pub fn is_road(&self, coord: CellCoord) -> bool {
        self.occupancy(coord).is_road()
    }

    /// Sides of `coord` that have a road neighbour
    pub fn road_neighbors(&self, coord: CellCoord) -> Vec<Side> {
        Side::ALL
            .into_iter()
            .filter(|side| self.is_road(coord.neighbor(*side)))
            .collect()
    }

    /// Number of orthogonal road neighbours (0 to 4)
    pub fn connectivity(&self, coord: CellCoord) -> usize {
        self.road_neighbors(coord).len()
    }

    /// World-space centre of a cell; the grid is centred on the origin
    pub fn world_position(&self, coord: CellCoord) -> Position {
        Position::new(
            (coord.col - (self.width / 2) as i32) as f32,
            (coord.row - (self.length / 2) as i32) as f32,
        )
    }

    /// Cell whose centre is nearest to `position`, if it is on the grid
    pub fn cell_at(&self, position: Position) -> Option<CellCoord> {
        let coord = CellCoord::new(
            position.x.round() as i32 + (self.width / 2) as i32,
            position.z.round() as i32 + (self.length / 2) as i32,
        );
        self.contains(coord).then_some(coord)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn road_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|cell| cell.occupancy.is_road())
    }

    pub fn road_count(&self) -> usize {
        self.road_cells().count()
    }
}
