//! Main simulation world that ties everything together
//!
//! Owns the grid, lane graph, lights and vehicles, and keeps the render
//! backend in step with them.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::config::SimConfig;
use super::grid::Grid;
use super::lanes::LaneGraph;
use super::render::{
    BatchKey, HeadlessRenderer, InstanceKey, ObjectKind, PointerCoord, RenderBackend, SceneSync,
    Transform, WorldObject,
};
use super::shapes::TileShape;
use super::stats::SimulationStats;
use super::topology::{apply_diff, plan_toggle, TopologyDiff};
use super::traffic_light::{TrafficLight, TrafficLights};
use super::types::{CellCoord, Position, RoadClass, Side};
use super::vehicle::VehicleUpdateResult;
use super::vehicle_pool::{SpawnOutcome, TickReport, VehiclePool};

/// Result of a road edit
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied(TopologyDiff),
    /// A tile model could not be loaded; nothing was changed
    AssetUnavailable(TileShape),
}

/// The main simulation world
pub struct SimWorld<R: RenderBackend = HeadlessRenderer> {
    config: SimConfig,
    grid: Grid,
    lanes: LaneGraph,
    lights: TrafficLights,
    vehicles: VehiclePool,
    scene: SceneSync,
    renderer: R,
    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
    stats: SimulationStats,
}

impl SimWorld<HeadlessRenderer> {
    pub fn new(config: SimConfig) -> Self {
        Self::with_renderer(config, HeadlessRenderer::new())
    }

    /// Create the demo layout: a Local ring road crossed by two Main avenues
    pub fn create_test_world(config: SimConfig) -> Result<Self> {
        Self::build_test_world(Self::new(config))
    }
}

impl<R: RenderBackend> SimWorld<R> {
    pub fn with_renderer(config: SimConfig, renderer: R) -> Self {
        let grid = Grid::new(config.grid_width, config.grid_length);
        let mut world = Self {
            lanes: LaneGraph::new(config.max_hops()),
            lights: TrafficLights::new(config.light_timings),
            vehicles: VehiclePool::new(config.vehicle_capacity, config.vehicle_speed),
            scene: SceneSync::new(),
            rng: config.seed.map(StdRng::seed_from_u64),
            stats: SimulationStats::default(),
            grid,
            renderer,
            config,
        };
        for index in 0..world.grid.cells().len() {
            world.show_grass(index);
        }
        world
    }

    /// Lay the demo roads onto an empty world, Main winning where they overlap
    pub fn build_test_world(mut world: Self) -> Result<Self> {
        let width = world.grid.width() as i32;
        let length = world.grid.length() as i32;
        let mut cells: BTreeMap<CellCoord, RoadClass> = BTreeMap::new();

        if width >= 3 && length >= 3 {
            // ring road
            for col in 1..width - 1 {
                cells.insert(CellCoord::new(col, 1), RoadClass::Local);
                cells.insert(CellCoord::new(col, length - 2), RoadClass::Local);
            }
            for row in 1..length - 1 {
                cells.insert(CellCoord::new(1, row), RoadClass::Local);
                cells.insert(CellCoord::new(width - 2, row), RoadClass::Local);
            }
        }
        // avenues
        for col in 1..(width - 1).max(1) {
            cells.insert(CellCoord::new(col, length / 2), RoadClass::Main);
        }
        for row in 1..(length - 1).max(1) {
            cells.insert(CellCoord::new(width / 2, row), RoadClass::Main);
        }

        // crossings go last so each one sees the classes of the roads it joins
        let mut order: Vec<_> = cells.iter().map(|(cell, class)| (*cell, *class)).collect();
        order.sort_by_key(|(cell, _)| {
            Side::ALL
                .into_iter()
                .filter(|side| cells.contains_key(&cell.neighbor(*side)))
                .count()
                >= 3
        });

        for (cell, class) in order {
            if world.grid.contains(cell) && !world.grid.is_road(cell) {
                world
                    .add_road(cell, class)
                    .with_context(|| format!("Failed to build demo road at {}", cell))?;
            }
        }
        Ok(world)
    }

    /// Toggle a road cell and propagate the change to its neighbours,
    /// the lane graph, the junction lights and the renderer.
    ///
    /// The edit is all-or-nothing: when a tile model it needs cannot be
    /// loaded the grid is left untouched.
    pub fn add_road(&mut self, cell: CellCoord, class: RoadClass) -> Result<EditOutcome> {
        let diff = plan_toggle(&self.grid, cell, class)?;

        for change in diff.tile_changes() {
            if let Some(tile) = change.tile {
                if !self
                    .scene
                    .is_available(&mut self.renderer, BatchKey::Tile(tile.shape))
                {
                    return Ok(EditOutcome::AssetUnavailable(tile.shape));
                }
            }
        }

        apply_diff(&mut self.grid, &diff);

        for change in diff.tile_changes() {
            let index = self
                .grid
                .index(change.coord)
                .context("Changed cell is outside the grid")?;
            let center = self.grid.world_position(change.coord);
            match change.tile {
                Some(tile) => {
                    self.lanes.rebuild(change.coord, &tile, center);
                    let object = WorldObject::new(
                        ObjectKind::Road(tile),
                        Transform::new(center, tile.rotation.radians()),
                    );
                    self.scene
                        .place(&mut self.renderer, InstanceKey::Tile(index), &object);
                    self.scene.hide(&mut self.renderer, InstanceKey::Grass(index));
                    self.sync_lights(change.coord, index, center, &tile.connected_sides());
                }
                None => {
                    self.lanes.remove(change.coord);
                    self.scene.hide(&mut self.renderer, InstanceKey::Tile(index));
                    self.show_grass(index);
                    self.sync_lights(change.coord, index, center, &[]);
                }
            }
        }

        self.stats.road_cells = self.grid.road_count() as u32;
        self.stats.junctions = self.lights.len() as u32;
        Ok(EditOutcome::Applied(diff))
    }

    fn show_grass(&mut self, index: usize) {
        let center = self.grid.world_position(self.grid.coord_of(index));
        let object = WorldObject::new(ObjectKind::Grass, Transform::new(center, 0.0));
        self.scene
            .place(&mut self.renderer, InstanceKey::Grass(index), &object);
    }

    fn sync_lights(&mut self, cell: CellCoord, index: usize, center: Position, sides: &[Side]) {
        self.lights.sync(cell, center, sides);
        for side in Side::ALL {
            self.scene
                .hide(&mut self.renderer, InstanceKey::Light(index * 4 + side.index()));
        }
        let lights: Vec<TrafficLight> = self
            .lights
            .junction(cell)
            .map(|junction| junction.lights.clone())
            .unwrap_or_default();
        for light in &lights {
            self.show_light(index, light);
        }
    }

    fn show_light(&mut self, index: usize, light: &TrafficLight) {
        let travel = -light.approach.direction();
        let object = WorldObject::new(
            ObjectKind::Light(light.phase),
            Transform::new(
                light.stop_box.center(),
                Position::default().angle_to(&travel),
            ),
        );
        self.scene.place(
            &mut self.renderer,
            InstanceKey::Light(index * 4 + light.approach.index()),
            &object,
        );
    }

    /// Start a vehicle on `path`. Not spawning is an outcome, not an error.
    pub fn spawn_vehicle(&mut self, path: Vec<Position>) -> SpawnOutcome {
        let outcome = if self
            .scene
            .is_available(&mut self.renderer, BatchKey::Vehicle)
        {
            self.vehicles.spawn(path)
        } else {
            SpawnOutcome::AssetUnavailable
        };

        if let SpawnOutcome::Spawned(id) = outcome {
            if let Some(vehicle) = self.vehicles.get(id) {
                self.scene.place(
                    &mut self.renderer,
                    InstanceKey::Vehicle(id.0),
                    &WorldObject::from(vehicle),
                );
            }
        }
        self.stats.record_spawn(outcome);
        self.stats.active_vehicles = self.vehicles.active_count() as u32;
        outcome
    }

    /// Spawn a vehicle on a random walk from a random root, or from a random
    /// tile entry on a closed network
    pub fn spawn_random_vehicle(&mut self) -> SpawnOutcome {
        let starts = self.lanes.walk_starts();
        let Some(start) = self.choose_random(&starts) else {
            return self.spawn_vehicle(Vec::new());
        };
        let path = match &mut self.rng {
            Some(rng) => self.lanes.random_path(start, rng, &self.config.walk),
            None => self
                .lanes
                .random_path(start, &mut rand::rng(), &self.config.walk),
        };
        self.spawn_vehicle(path)
    }

    /// Spawn a vehicle on the shortest lane route from one road cell to another
    pub fn spawn_vehicle_between(&mut self, from: CellCoord, to: CellCoord) -> Result<SpawnOutcome> {
        if !self.grid.is_road(from) {
            bail!("Cell {} is not a road", from);
        }
        if !self.grid.is_road(to) {
            bail!("Cell {} is not a road", to);
        }

        let entries = self.lanes.entries(from);
        let exits = self.lanes.exits(to);
        let mut best: Option<(f32, Vec<Position>)> = None;
        for entry in &entries {
            for exit in &exits {
                let Some(route) = self.lanes.shortest_path(*entry, *exit) else {
                    continue;
                };
                let path = self.lanes.waypoints(&route);
                let length: f32 = path.windows(2).map(|w| w[0].distance(&w[1])).sum();
                if best
                    .as_ref()
                    .map_or(true, |(shortest, _)| length < *shortest)
                {
                    best = Some((length, path));
                }
            }
        }

        let path = best.map(|(_, path)| path).unwrap_or_default();
        Ok(self.spawn_vehicle(path))
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self) -> TickReport {
        for change in self.lights.tick() {
            let Some(index) = self.grid.index(change.cell) else {
                continue;
            };
            let light = self
                .lights
                .junction(change.cell)
                .and_then(|junction| junction.light(change.approach))
                .cloned();
            if let Some(light) = light {
                self.show_light(index, &light);
            }
        }

        let report = self.vehicles.tick(&self.lights, &self.grid);
        for (id, result) in &report.results {
            if *result == VehicleUpdateResult::Departed {
                self.scene
                    .hide(&mut self.renderer, InstanceKey::Vehicle(id.0));
            } else if let Some(vehicle) = self.vehicles.get(*id) {
                self.scene.place(
                    &mut self.renderer,
                    InstanceKey::Vehicle(id.0),
                    &WorldObject::from(vehicle),
                );
            }
        }

        self.stats.record_tick(&report);
        self.stats.active_vehicles = self.vehicles.active_count() as u32;
        report
    }

    /// Cell under the pointer, from the first tile or grass instance hit
    pub fn pick_cell(&self, pointer: PointerCoord) -> Option<CellCoord> {
        self.renderer
            .hit_test(pointer)
            .into_iter()
            .find_map(|(handle, index)| match self.scene.instance_at(handle, index) {
                Some(InstanceKey::Tile(cell) | InstanceKey::Grass(cell)) => {
                    Some(self.grid.coord_of(cell))
                }
                _ => None,
            })
    }

    /// Pick a random element, using the seeded RNG if available
    fn choose_random<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        match &mut self.rng {
            Some(rng) => items.choose(rng).copied(),
            None => items.choose(&mut rand::rng()).copied(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn lanes(&self) -> &LaneGraph {
        &self.lanes
    }

    pub fn lanes_mut(&mut self) -> &mut LaneGraph {
        &mut self.lanes
    }

    pub fn lights(&self) -> &TrafficLights {
        &self.lights
    }

    pub fn vehicles(&self) -> &VehiclePool {
        &self.vehicles
    }

    pub fn scene(&self) -> &SceneSync {
        &self.scene
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Tick: {}", self.stats.ticks);
        println!(
            "Grid: {}x{}, road cells: {}, lane nodes: {}",
            self.grid.width(),
            self.grid.length(),
            self.grid.road_count(),
            self.lanes.node_count()
        );
        println!("Junctions with lights: {}", self.lights.len());
        println!(
            "Vehicles: {}/{} active, {} spawned, {} completed",
            self.vehicles.active_count(),
            self.vehicles.capacity(),
            self.stats.vehicles_spawned,
            self.stats.vehicles_completed
        );

        let active: Vec<_> = self.vehicles.active().collect();
        if !active.is_empty() {
            println!("--- Active Vehicles ---");
            for vehicle in active {
                println!(
                    "  Vehicle {}: position=({:.2}, {:.2}), waypoints_remaining={}",
                    vehicle.id.0,
                    vehicle.position.x,
                    vehicle.position.z,
                    vehicle.waypoints.len().saturating_sub(1)
                );
            }
        }
        println!();
    }

    /// Text map: one glyph per cell, `o` where a vehicle is
    pub fn render_map(&self) -> String {
        let mut rows: Vec<Vec<char>> = (0..self.grid.length())
            .map(|row| {
                (0..self.grid.width())
                    .map(|col| {
                        self.grid
                            .get(CellCoord::new(col as i32, row as i32))
                            .and_then(|cell| cell.tile)
                            .map_or('.', |tile| tile.glyph)
                    })
                    .collect()
            })
            .collect();

        for vehicle in self.vehicles.active() {
            if let Some(cell) = self.grid.cell_at(vehicle.position) {
                rows[cell.row as usize][cell.col as usize] = 'o';
            }
        }

        rows.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn draw_map(&self) {
        println!("{}", self.render_map());
    }
}
