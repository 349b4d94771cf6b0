//! Core types for the road grid simulation
//!
//! Coordinates, sides, road classes and the tunable constants shared by
//! every component.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Integer grid coordinates of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub col: i32,
    pub row: i32,
}

impl CellCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The coordinate one step towards `side`
    pub fn neighbor(&self, side: Side) -> CellCoord {
        let (dc, dr) = side.offset();
        CellCoord::new(self.col + dc, self.row + dr)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// One of the four sides of a cell, in signature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Right => 1,
            Side::Bottom => 2,
            Side::Left => 3,
        }
    }

    pub fn from_index(index: usize) -> Side {
        Side::ALL[index % 4]
    }

    pub fn opposite(self) -> Side {
        Side::from_index(self.index() + 2)
    }

    pub fn clockwise(self) -> Side {
        Side::from_index(self.index() + 1)
    }

    pub fn counter_clockwise(self) -> Side {
        Side::from_index(self.index() + 3)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }

    /// Grid offset (col, row); rows grow towards the bottom
    pub fn offset(self) -> (i32, i32) {
        match self {
            Side::Top => (0, -1),
            Side::Right => (1, 0),
            Side::Bottom => (0, 1),
            Side::Left => (-1, 0),
        }
    }

    /// Unit vector pointing from a cell centre towards this side
    pub fn direction(self) -> Position {
        let (dc, dr) = self.offset();
        Position::new(dc as f32, dr as f32)
    }
}

/// Road class painted by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoadClass {
    /// Arterial road
    Main,
    /// Local road ("Normal")
    Local,
}

impl RoadClass {
    /// Main wins over Local whenever two classes must merge into one
    pub fn dominant(a: RoadClass, b: RoadClass) -> RoadClass {
        if a == RoadClass::Main || b == RoadClass::Main {
            RoadClass::Main
        } else {
            RoadClass::Local
        }
    }

    pub fn symbol(self) -> char {
        match self {
            RoadClass::Main => 'M',
            RoadClass::Local => 'N',
        }
    }
}

/// Identifier of a vehicle slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

/// A point (or vector) on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        (*other - *self).length()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.z * other.z
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Calculate the angle from this position to another (Y-axis rotation)
    pub fn angle_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let direction_len = (dx * dx + dz * dz).sqrt();
        if direction_len > 0.0 {
            (dx / direction_len).atan2(dz / direction_len)
        } else {
            0.0
        }
    }

    /// Unit vector for a Y-axis rotation as returned by `angle_to`
    pub fn from_heading(heading: f32) -> Position {
        Position::new(heading.sin(), heading.cos())
    }

    /// Calculate perpendicular offset (right side of direction)
    pub fn perpendicular_offset(&self, other: &Position, offset: f32) -> Position {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let len = (dx * dx + dz * dz).sqrt();
        if len > 0.0 {
            Position {
                x: -dz / len * offset,
                z: dx / len * offset,
            }
        } else {
            Position::default()
        }
    }

    pub fn is_close(&self, other: &Position, epsilon: f32) -> bool {
        self.distance(other) <= epsilon
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, rhs: Position) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<f32> for Position {
    type Output = Position;

    fn mul(self, rhs: f32) -> Position {
        Position::new(self.x * rhs, self.z * rhs)
    }
}

impl Neg for Position {
    type Output = Position;

    fn neg(self) -> Position {
        Position::new(-self.x, -self.z)
    }
}

/// Distance from the road centre line to a lane centre
pub const LANE_OFFSET: f32 = 0.15;

/// Number of segments a quarter arc is sampled into
pub const CURVE_STEPS: usize = 5;

/// Upper bound of lane hops needed to cross one tile
pub const HOPS_PER_TILE: usize = CURVE_STEPS + 1;

/// Vehicle footprint in world units
pub const VEHICLE_LENGTH: f32 = 0.18;
pub const VEHICLE_WIDTH: f32 = 0.07;

/// Distance travelled per tick
pub const VEHICLE_SPEED: f32 = 0.016;

/// Depth of the red-light hit-box just inside a junction edge
pub const STOP_LINE_DEPTH: f32 = 0.05;

/// Two waypoints closer than this are the same point
pub const WAYPOINT_EPSILON: f32 = 1e-4;
