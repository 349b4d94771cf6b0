//! Lane graph generation and stitching
//!
//! Every resolved tile owns a small arena of lane nodes. Nodes are addressed
//! by `LaneHandle` (tile coordinate + slot), so edges that cross a tile
//! boundary are plain handles into the neighbour's arena. Adjacent tiles are
//! joined by linking each tile's exit node on the shared edge to the
//! neighbour's entry node on the same edge.

use std::collections::{BTreeMap, HashMap};
use std::f32::consts::FRAC_PI_2;

use log::debug;
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::config::WalkConfig;
use super::shapes::{ResolvedTile, Rotation, TileShape};
use super::types::{CellCoord, Position, Side, CURVE_STEPS, LANE_OFFSET, WAYPOINT_EPSILON};

/// Address of a lane node: owning tile plus slot in that tile's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneHandle {
    pub tile: CellCoord,
    pub slot: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneNode {
    pub position: Position,
    /// Outgoing edges, in creation order
    pub children: Vec<LaneHandle>,
    /// Exit node the chain through this node leads to. An exit points at
    /// itself; a junction entry branches to several exits and has none.
    pub end: Option<LaneHandle>,
    /// No other tile has attached an incoming edge yet
    pub is_root: bool,
}

/// Entry and exit node of a tile on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacingBundle {
    pub root: u16,
    pub end: u16,
}

/// Point where traffic entering through `side` crosses the tile edge
pub fn entry_point(center: Position, side: Side) -> Position {
    let edge = center + side.direction() * 0.5;
    edge + right_of(-side.direction()) * LANE_OFFSET
}

/// Point where traffic leaving through `side` crosses the tile edge
pub fn exit_point(center: Position, side: Side) -> Position {
    let edge = center + side.direction() * 0.5;
    edge + right_of(side.direction()) * LANE_OFFSET
}

fn right_of(direction: Position) -> Position {
    Position::new(-direction.z, direction.x)
}

/// The lane nodes of one resolved tile
#[derive(Debug, Clone)]
pub struct TileLaneGraph {
    pub coord: CellCoord,
    pub shape: TileShape,
    pub rotation: Rotation,
    pub nodes: Vec<LaneNode>,
    /// Indexed by `Side::index`
    pub facing: [Option<FacingBundle>; 4],
    /// Set once the side has been stitched to a neighbour
    pub joined: [bool; 4],
}

impl TileLaneGraph {
    /// Generate the canonical lane bundle of `tile` centred on `center`.
    ///
    /// Each connected side gets one shared entry and one shared exit node.
    /// Straight and curve primitives are then laid between them: opposite
    /// sides are joined by a straight lane, adjacent sides by a quarter arc
    /// around their common corner. Junction shapes are the union of these
    /// primitives over every ordered pair of their sides.
    pub fn build(coord: CellCoord, tile: &ResolvedTile, center: Position) -> Self {
        let mut graph = TileLaneGraph {
            coord,
            shape: tile.shape,
            rotation: tile.rotation,
            nodes: Vec::new(),
            facing: [None; 4],
            joined: [false; 4],
        };

        let sides = tile.connected_sides();
        for side in &sides {
            let root = graph.push_node(entry_point(center, *side), None, true);
            let end = graph.push_node(exit_point(center, *side), None, false);
            graph.set_end(end, end);
            graph.facing[side.index()] = Some(FacingBundle { root, end });
        }

        for from in &sides {
            for to in &sides {
                if from == to {
                    continue;
                }
                let (Some(entry), Some(exit)) =
                    (graph.facing[from.index()], graph.facing[to.index()])
                else {
                    continue;
                };
                if from.opposite() == *to {
                    graph.straight_lane(entry.root, exit.end);
                } else {
                    graph.curve_lane(center, *from, *to, entry.root, exit.end);
                }
                if sides.len() == 2 {
                    graph.set_end(entry.root, exit.end);
                }
            }
        }

        graph
    }

    fn push_node(&mut self, position: Position, end: Option<LaneHandle>, is_root: bool) -> u16 {
        let slot = self.nodes.len() as u16;
        self.nodes.push(LaneNode {
            position,
            children: Vec::new(),
            end,
            is_root,
        });
        slot
    }

    fn set_end(&mut self, slot: u16, end: u16) {
        let end = self.handle(end);
        if let Some(node) = self.nodes.get_mut(slot as usize) {
            node.end = Some(end);
        }
    }

    fn handle(&self, slot: u16) -> LaneHandle {
        LaneHandle {
            tile: self.coord,
            slot,
        }
    }

    fn link(&mut self, from: u16, to: u16) {
        let child = self.handle(to);
        if let Some(node) = self.nodes.get_mut(from as usize) {
            node.children.push(child);
        }
    }

    fn position(&self, slot: u16) -> Position {
        self.nodes
            .get(slot as usize)
            .map(|node| node.position)
            .unwrap_or_default()
    }

    fn straight_lane(&mut self, root: u16, end: u16) {
        self.link(root, end);
    }

    /// Quarter arc from the entry on `from` to the exit on `to`, sampled in
    /// `CURVE_STEPS` segments around the corner both sides share
    fn curve_lane(&mut self, center: Position, from: Side, to: Side, root: u16, end: u16) {
        let corner = center + (from.direction() + to.direction()) * 0.5;
        let start = self.position(root) - corner;
        let finish = self.position(end) - corner;
        let end_handle = self.handle(end);

        let mut previous = root;
        for step in 1..CURVE_STEPS {
            let angle = step as f32 / CURVE_STEPS as f32 * FRAC_PI_2;
            let position = corner + start * angle.cos() + finish * angle.sin();
            let slot = self.push_node(position, Some(end_handle), false);
            self.link(previous, slot);
            previous = slot;
        }
        self.link(previous, end);
    }

    pub fn bundle(&self, side: Side) -> Option<FacingBundle> {
        self.facing[side.index()]
    }

    /// Slots of nodes nothing links into
    pub fn roots(&self) -> Vec<u16> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_root)
            .map(|(slot, _)| slot as u16)
            .collect()
    }
}

/// Directed lane graph exported for path search and analysis
pub struct RoutingGraph {
    pub graph: DiGraph<LaneHandle, u32>,
    pub index: HashMap<LaneHandle, NodeIndex>,
}

/// The lane graph spanning the whole grid
#[derive(Default)]
pub struct LaneGraph {
    tiles: BTreeMap<CellCoord, TileLaneGraph>,
    default_max_hops: usize,
    routing: Option<RoutingGraph>,
    path_cache: HashMap<(LaneHandle, LaneHandle), Vec<LaneHandle>>,
}

impl LaneGraph {
    /// `max_hops` is the walk cap used when a `WalkConfig` does not set one
    pub fn new(max_hops: usize) -> Self {
        Self {
            default_max_hops: max_hops,
            ..Self::default()
        }
    }

    /// Replace the lanes of one tile and stitch it to its neighbours
    pub fn rebuild(&mut self, coord: CellCoord, tile: &ResolvedTile, center: Position) {
        self.unstitch(coord);
        self.tiles
            .insert(coord, TileLaneGraph::build(coord, tile, center));
        for side in Side::ALL {
            let neighbor = coord.neighbor(side);
            if self.tiles.contains_key(&neighbor) {
                self.stitch(coord, neighbor, side);
            }
        }
        self.invalidate();
    }

    /// Drop the lanes of a tile, detaching its neighbours first
    pub fn remove(&mut self, coord: CellCoord) -> Option<TileLaneGraph> {
        self.unstitch(coord);
        self.invalidate();
        self.tiles.remove(&coord)
    }

    /// Join tile `a` with tile `b`, which lies on `direction` of `a`.
    ///
    /// Returns whether any edge was added. Joining an already joined pair,
    /// or a pair without facing lanes on the shared edge, does nothing.
    pub fn stitch(&mut self, a: CellCoord, b: CellCoord, direction: Side) -> bool {
        if a.neighbor(direction) != b {
            return false;
        }
        let back = direction.opposite();
        let (Some(tile_a), Some(tile_b)) = (self.tiles.get(&a), self.tiles.get(&b)) else {
            return false;
        };
        if tile_a.joined[direction.index()] && tile_b.joined[back.index()] {
            return false;
        }
        let (Some(facing_a), Some(facing_b)) = (tile_a.bundle(direction), tile_b.bundle(back))
        else {
            return false;
        };

        if let Some(tile_a) = self.tiles.get_mut(&a) {
            if let Some(end) = tile_a.nodes.get_mut(facing_a.end as usize) {
                end.children.push(LaneHandle {
                    tile: b,
                    slot: facing_b.root,
                });
            }
            if let Some(root) = tile_a.nodes.get_mut(facing_a.root as usize) {
                root.is_root = false;
            }
            tile_a.joined[direction.index()] = true;
        }
        if let Some(tile_b) = self.tiles.get_mut(&b) {
            if let Some(end) = tile_b.nodes.get_mut(facing_b.end as usize) {
                end.children.push(LaneHandle {
                    tile: a,
                    slot: facing_a.root,
                });
            }
            if let Some(root) = tile_b.nodes.get_mut(facing_b.root as usize) {
                root.is_root = false;
            }
            tile_b.joined[back.index()] = true;
        }

        debug!("Stitched {} -> {} ({:?})", a, b, direction);
        self.invalidate();
        true
    }

    /// Remove every edge between `coord` and its neighbours
    pub fn unstitch(&mut self, coord: CellCoord) {
        for side in Side::ALL {
            let neighbor = coord.neighbor(side);
            let back = side.opposite();
            if let Some(tile) = self.tiles.get_mut(&neighbor) {
                if let Some(facing) = tile.bundle(back) {
                    if let Some(end) = tile.nodes.get_mut(facing.end as usize) {
                        end.children.retain(|child| child.tile != coord);
                    }
                    if let Some(root) = tile.nodes.get_mut(facing.root as usize) {
                        root.is_root = true;
                    }
                }
                tile.joined[back.index()] = false;
            }
        }

        if let Some(tile) = self.tiles.get_mut(&coord) {
            for facing in tile.facing.into_iter().flatten() {
                if let Some(end) = tile.nodes.get_mut(facing.end as usize) {
                    end.children.retain(|child| child.tile == coord);
                }
                if let Some(root) = tile.nodes.get_mut(facing.root as usize) {
                    root.is_root = true;
                }
            }
            tile.joined = [false; 4];
        }
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.routing = None;
        self.path_cache.clear();
    }

    pub fn tile(&self, coord: CellCoord) -> Option<&TileLaneGraph> {
        self.tiles.get(&coord)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileLaneGraph> {
        self.tiles.values()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn node(&self, handle: LaneHandle) -> Option<&LaneNode> {
        self.tiles
            .get(&handle.tile)
            .and_then(|tile| tile.nodes.get(handle.slot as usize))
    }

    pub fn position(&self, handle: LaneHandle) -> Option<Position> {
        self.node(handle).map(|node| node.position)
    }

    pub fn children(&self, handle: LaneHandle) -> &[LaneHandle] {
        self.node(handle)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.tiles.values().map(|tile| tile.nodes.len()).sum()
    }

    /// Every root node, ordered by tile then slot
    pub fn roots(&self) -> Vec<LaneHandle> {
        self.tiles
            .values()
            .flat_map(|tile| {
                tile.roots()
                    .into_iter()
                    .map(move |slot| LaneHandle { tile: tile.coord, slot })
            })
            .collect()
    }

    /// Nodes a random walk may start from: the roots, or every tile entry
    /// when the network has no loose ends
    pub fn walk_starts(&self) -> Vec<LaneHandle> {
        let roots = self.roots();
        if !roots.is_empty() {
            return roots;
        }
        self.tiles
            .keys()
            .flat_map(|coord| self.entries(*coord))
            .collect()
    }

    /// Entry nodes of a tile, one per connected side
    pub fn entries(&self, coord: CellCoord) -> Vec<LaneHandle> {
        self.bundles(coord)
            .map(|facing| LaneHandle {
                tile: coord,
                slot: facing.root,
            })
            .collect()
    }

    /// Exit nodes of a tile, one per connected side
    pub fn exits(&self, coord: CellCoord) -> Vec<LaneHandle> {
        self.bundles(coord)
            .map(|facing| LaneHandle {
                tile: coord,
                slot: facing.end,
            })
            .collect()
    }

    fn bundles(&self, coord: CellCoord) -> impl Iterator<Item = FacingBundle> + '_ {
        self.tiles
            .get(&coord)
            .into_iter()
            .flat_map(|tile| tile.facing.into_iter().flatten())
    }

    /// Root closest to `position`
    pub fn nearest_root(&self, position: Position) -> Option<LaneHandle> {
        self.roots().into_iter().min_by_key(|handle| {
            OrderedFloat(
                self.position(*handle)
                    .map_or(f32::INFINITY, |p| p.distance(&position)),
            )
        })
    }

    /// Positions of a handle sequence with consecutive duplicates removed
    pub fn waypoints(&self, handles: &[LaneHandle]) -> Vec<Position> {
        let mut points: Vec<Position> = Vec::with_capacity(handles.len());
        for position in handles.iter().filter_map(|h| self.position(*h)) {
            if points
                .last()
                .is_some_and(|last| last.is_close(&position, WAYPOINT_EPSILON))
            {
                continue;
            }
            points.push(position);
        }
        points
    }

    /// Bounded random walk from `start`.
    ///
    /// The walk may only stop at a tile exit, and continues there with
    /// `continue_probability`. It always stops at a node without children or
    /// after the hop cap.
    pub fn random_path<R: Rng + ?Sized>(
        &self,
        start: LaneHandle,
        rng: &mut R,
        walk: &WalkConfig,
    ) -> Vec<Position> {
        let max_hops = walk.max_hops.unwrap_or(self.default_max_hops);
        let mut handles = vec![start];
        let mut current = start;

        for _ in 0..max_hops {
            let children = self.children(current);
            if children.is_empty() {
                break;
            }
            let at_exit = children.iter().any(|child| child.tile != current.tile);
            if at_exit && !rng.random_bool(walk.continue_probability.clamp(0.0, 1.0)) {
                break;
            }
            let Some(next) = children.choose(rng) else {
                break;
            };
            handles.push(*next);
            current = *next;
        }

        self.waypoints(&handles)
    }

    /// Directed graph of all lanes; edge weights are lengths scaled to integers
    pub fn routing_graph(&self) -> RoutingGraph {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for tile in self.tiles.values() {
            for slot in 0..tile.nodes.len() {
                let handle = LaneHandle {
                    tile: tile.coord,
                    slot: slot as u16,
                };
                index.insert(handle, graph.add_node(handle));
            }
        }

        for tile in self.tiles.values() {
            for (slot, node) in tile.nodes.iter().enumerate() {
                let from = LaneHandle {
                    tile: tile.coord,
                    slot: slot as u16,
                };
                for child in &node.children {
                    let (Some(a), Some(b), Some(target)) =
                        (index.get(&from), index.get(child), self.position(*child))
                    else {
                        continue;
                    };
                    let weight = ((node.position.distance(&target) * 100.0) as u32).max(1);
                    graph.add_edge(*a, *b, weight);
                }
            }
        }

        RoutingGraph { graph, index }
    }

    /// Shortest lane route between two nodes using A* (Dijkstra with null heuristic)
    pub fn shortest_path(&mut self, from: LaneHandle, to: LaneHandle) -> Option<Vec<LaneHandle>> {
        if let Some(path) = self.path_cache.get(&(from, to)) {
            return Some(path.clone());
        }
        if self.routing.is_none() {
            self.routing = Some(self.routing_graph());
        }
        let routing = self.routing.as_ref()?;
        let start = *routing.index.get(&from)?;
        let goal = *routing.index.get(&to)?;

        let (_, nodes) = astar(
            &routing.graph,
            start,
            |node| node == goal,
            |edge| *edge.weight(),
            |_| 0,
        )?;

        let path: Vec<LaneHandle> = nodes
            .iter()
            .filter_map(|node| routing.graph.node_weight(*node).copied())
            .collect();
        self.path_cache.insert((from, to), path.clone());
        Some(path)
    }
}
