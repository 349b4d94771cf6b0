//! Canonical road tile shapes and the signature lookup table

use std::f32::consts::FRAC_PI_2;

use super::grid::Signature;
use super::types::Side;

/// Quarter-turn rotation of a tile model around the Y axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    pub fn degrees(self) -> f32 {
        self.quarter_turns() as f32 * 90.0
    }

    pub fn radians(self) -> f32 {
        self.quarter_turns() as f32 * FRAC_PI_2
    }

    /// Where a side of the canonical (R0) tile ends up after rotation
    pub fn apply(self, side: Side) -> Side {
        Side::from_index(side.index() + 4 - self.quarter_turns() as usize)
    }
}

/// Lane-graph primitive a shape is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFamily {
    Straight,
    Curve,
    TJunction,
    Junction,
}

impl ShapeFamily {
    /// Connected sides of the canonical (R0) orientation
    pub fn canonical_sides(self) -> &'static [Side] {
        match self {
            ShapeFamily::Straight => &[Side::Top, Side::Bottom],
            ShapeFamily::Curve => &[Side::Right, Side::Bottom],
            ShapeFamily::TJunction => &[Side::Right, Side::Bottom, Side::Left],
            ShapeFamily::Junction => &[Side::Top, Side::Right, Side::Bottom, Side::Left],
        }
    }
}

/// One of the canonical road tile models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileShape {
    MainStraight,
    LocalStraight,
    /// Straight tile whose two ends have different classes
    LaneMerge,
    MainCurve,
    LocalCurve,
    MainT,
    LocalT,
    /// Main through road with a Local stem
    LocalOntoMainT,
    /// Local through road with a Main stem
    MainOntoLocalT,
    MainJunction,
    LocalJunction,
    /// Main road crossing a Local road
    CrossJunction,
    /// Three Main approaches, one Local
    MainLocalJunction,
    /// Three Local approaches, one Main
    LocalMainJunction,
}

impl TileShape {
    pub const ALL: [TileShape; 14] = [
        TileShape::MainStraight,
        TileShape::LocalStraight,
        TileShape::LaneMerge,
        TileShape::MainCurve,
        TileShape::LocalCurve,
        TileShape::MainT,
        TileShape::LocalT,
        TileShape::LocalOntoMainT,
        TileShape::MainOntoLocalT,
        TileShape::MainJunction,
        TileShape::LocalJunction,
        TileShape::CrossJunction,
        TileShape::MainLocalJunction,
        TileShape::LocalMainJunction,
    ];

    pub fn family(self) -> ShapeFamily {
        match self {
            TileShape::MainStraight | TileShape::LocalStraight | TileShape::LaneMerge => {
                ShapeFamily::Straight
            }
            TileShape::MainCurve | TileShape::LocalCurve => ShapeFamily::Curve,
            TileShape::MainT
            | TileShape::LocalT
            | TileShape::LocalOntoMainT
            | TileShape::MainOntoLocalT => ShapeFamily::TJunction,
            TileShape::MainJunction
            | TileShape::LocalJunction
            | TileShape::CrossJunction
            | TileShape::MainLocalJunction
            | TileShape::LocalMainJunction => ShapeFamily::Junction,
        }
    }

    pub fn model_url(self) -> &'static str {
        match self {
            TileShape::MainStraight => "models/roads/tile-mainroad-straight.glb",
            TileShape::LocalStraight => "models/roads/tile-road-straight.glb",
            TileShape::LaneMerge => "models/roads/tile-road-to-mainroad.glb",
            TileShape::MainCurve => "models/roads/tile-mainroad-curve.glb",
            TileShape::LocalCurve => "models/roads/tile-road-curve.glb",
            TileShape::MainT => "models/roads/tile-mainroad-intersection-t.glb",
            TileShape::LocalT => "models/roads/tile-road-intersection-t.glb",
            TileShape::LocalOntoMainT => "models/roads/tile-road-mainroad-intersection-t.glb",
            TileShape::MainOntoLocalT => "models/roads/tile-mainroad-road-intersection-t.glb",
            TileShape::MainJunction => "models/roads/tile-mainroad-intersection.glb",
            TileShape::LocalJunction => "models/roads/tile-road-intersection.glb",
            TileShape::CrossJunction => "models/roads/tile-road-mainroad-intersection.glb",
            TileShape::MainLocalJunction => "models/roads/tile-mainroad-road-intersection.glb",
            TileShape::LocalMainJunction => "models/roads/tile-roads-mainroad-intersection.glb",
        }
    }

    pub fn is_junction(self) -> bool {
        matches!(
            self.family(),
            ShapeFamily::TJunction | ShapeFamily::Junction
        )
    }
}

/// A signature resolved to a concrete tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTile {
    pub shape: TileShape,
    pub rotation: Rotation,
    /// Box-drawing character used by the text map
    pub glyph: char,
}

impl ResolvedTile {
    /// Sides this tile's lanes connect, in world orientation
    pub fn connected_sides(&self) -> Vec<Side> {
        self.shape
            .family()
            .canonical_sides()
            .iter()
            .map(|side| self.rotation.apply(*side))
            .collect()
    }
}

use Rotation::{R0, R180, R270, R90};
use TileShape::*;

/// Signature key -> tile. Keys list edges as top, right, bottom, left.
pub const SHAPE_TABLE: [(&str, TileShape, Rotation, char); 44] = [
    // straight
    ("M-M-", MainStraight, R0, '┃'),
    ("-M-M", MainStraight, R90, '━'),
    ("N-N-", LocalStraight, R0, '│'),
    ("-N-N", LocalStraight, R90, '─'),
    // lane merge, Main end first at R0
    ("M-N-", LaneMerge, R0, '╿'),
    ("-N-M", LaneMerge, R90, '╾'),
    ("N-M-", LaneMerge, R180, '╽'),
    ("-M-N", LaneMerge, R270, '╼'),
    // curve
    ("-MM-", MainCurve, R0, '┏'),
    ("MM--", MainCurve, R90, '┗'),
    ("M--M", MainCurve, R180, '┛'),
    ("--MM", MainCurve, R270, '┓'),
    ("-NN-", LocalCurve, R0, '┌'),
    ("NN--", LocalCurve, R90, '└'),
    ("N--N", LocalCurve, R180, '┘'),
    ("--NN", LocalCurve, R270, '┐'),
    // T, the empty side gives the rotation
    ("-MMM", MainT, R0, '┳'),
    ("MMM-", MainT, R90, '┣'),
    ("MM-M", MainT, R180, '┻'),
    ("M-MM", MainT, R270, '┫'),
    ("-NNN", LocalT, R0, '┬'),
    ("NNN-", LocalT, R90, '├'),
    ("NN-N", LocalT, R180, '┴'),
    ("N-NN", LocalT, R270, '┤'),
    ("-MNM", LocalOntoMainT, R0, '┯'),
    ("MNM-", LocalOntoMainT, R90, '┠'),
    ("NM-M", LocalOntoMainT, R180, '┷'),
    ("M-MN", LocalOntoMainT, R270, '┨'),
    ("-NMN", MainOntoLocalT, R0, '┰'),
    ("NMN-", MainOntoLocalT, R90, '┝'),
    ("MN-N", MainOntoLocalT, R180, '┸'),
    ("N-NM", MainOntoLocalT, R270, '┥'),
    // four-way
    ("MMMM", MainJunction, R0, '╋'),
    ("NNNN", LocalJunction, R0, '┼'),
    ("MNMN", CrossJunction, R0, '╂'),
    ("NMNM", CrossJunction, R90, '┿'),
    ("MMMN", MainLocalJunction, R0, '╊'),
    ("MMNM", MainLocalJunction, R90, '╇'),
    ("MNMM", MainLocalJunction, R180, '╉'),
    ("NMMM", MainLocalJunction, R270, '╈'),
    ("MNNN", LocalMainJunction, R0, '╀'),
    ("NNNM", LocalMainJunction, R90, '┽'),
    ("NNMN", LocalMainJunction, R180, '╁'),
    ("NMNN", LocalMainJunction, R270, '┾'),
];

/// Find the canonical tile of a signature
pub fn lookup(signature: &Signature) -> Option<ResolvedTile> {
    let key = signature.key();
    SHAPE_TABLE
        .iter()
        .find(|(k, ..)| *k == key)
        .map(|&(_, shape, rotation, glyph)| ResolvedTile {
            shape,
            rotation,
            glyph,
        })
}
