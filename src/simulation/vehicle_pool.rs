//! Fixed-capacity vehicle pool and the per-tick motion/collision pass

use log::debug;
use sorted_vec::SortedVec;

use super::geometry::{Collidable, OrientedBox};
use super::grid::Grid;
use super::traffic_light::TrafficLights;
use super::types::{CellCoord, Position, VehicleId, WAYPOINT_EPSILON};
use super::vehicle::{SimVehicle, VehicleUpdateResult};

/// Result of a spawn request. Only `Spawned` creates a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(VehicleId),
    CapacityExceeded,
    InsufficientPath,
    /// The vehicle model could not be loaded
    AssetUnavailable,
}

/// What happened to every active vehicle during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub results: Vec<(VehicleId, VehicleUpdateResult)>,
}

impl TickReport {
    pub fn count(&self, result: VehicleUpdateResult) -> usize {
        self.results.iter().filter(|(_, r)| *r == result).count()
    }

    pub fn departed(&self) -> Vec<VehicleId> {
        self.vehicles_with(VehicleUpdateResult::Departed)
    }

    pub fn vehicles_with(&self, result: VehicleUpdateResult) -> Vec<VehicleId> {
        self.results
            .iter()
            .filter(|(_, r)| *r == result)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn result_of(&self, id: VehicleId) -> Option<VehicleUpdateResult> {
        self.results
            .iter()
            .find(|(vehicle, _)| *vehicle == id)
            .map(|(_, result)| *result)
    }
}

/// Drop consecutive waypoints that coincide
pub fn dedup_path(path: Vec<Position>) -> Vec<Position> {
    let mut out: Vec<Position> = Vec::with_capacity(path.len());
    for point in path {
        if out
            .last()
            .is_some_and(|last| last.is_close(&point, WAYPOINT_EPSILON))
        {
            continue;
        }
        out.push(point);
    }
    out
}

pub struct VehiclePool {
    vehicles: Vec<SimVehicle>,
    /// Lowest free slot is handed out first
    free_slots: SortedVec<usize>,
}

impl VehiclePool {
    pub fn new(capacity: usize, speed: f32) -> Self {
        Self {
            vehicles: (0..capacity)
                .map(|slot| SimVehicle::new(VehicleId(slot), speed))
                .collect(),
            free_slots: SortedVec::from_unsorted((0..capacity).collect()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.vehicles.len()
    }

    pub fn active_count(&self) -> usize {
        self.vehicles.len() - self.free_slots.len()
    }

    pub fn has_free_slot(&self) -> bool {
        !self.free_slots.is_empty()
    }

    pub fn get(&self, id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.get(id.0).filter(|vehicle| vehicle.active)
    }

    pub fn active(&self) -> impl Iterator<Item = &SimVehicle> {
        self.vehicles.iter().filter(|vehicle| vehicle.active)
    }

    /// Assign `path` to the lowest free slot
    pub fn spawn(&mut self, path: Vec<Position>) -> SpawnOutcome {
        let path = dedup_path(path);
        if path.len() < 2 {
            return SpawnOutcome::InsufficientPath;
        }
        let Some(&slot) = self.free_slots.first() else {
            return SpawnOutcome::CapacityExceeded;
        };
        let Some(vehicle) = self.vehicles.get_mut(slot) else {
            return SpawnOutcome::CapacityExceeded;
        };
        self.free_slots.remove_item(&slot);
        vehicle.assign(path);
        debug!("Spawned vehicle {} with {} waypoints", slot, vehicle.waypoints.len());
        SpawnOutcome::Spawned(VehicleId(slot))
    }

    /// Free a slot; its queue is cleared before the slot can be reused
    pub fn release(&mut self, id: VehicleId) {
        if let Some(vehicle) = self.vehicles.get_mut(id.0) {
            if vehicle.active {
                vehicle.release();
                self.free_slots.insert(id.0);
                debug!("Released vehicle {}", id.0);
            }
        }
    }

    /// Advance every active vehicle by one tick in ascending slot order.
    ///
    /// A vehicle yields when its head box at the proposed position touches
    /// the body of a lower slot processed earlier this tick, and stops when
    /// it touches a red light's stop box in the cells it is heading into.
    pub fn tick(&mut self, lights: &TrafficLights, grid: &Grid) -> TickReport {
        let mut report = TickReport::default();
        let mut bodies: Vec<OrientedBox> = Vec::new();
        let mut departed = Vec::new();

        for vehicle in self.vehicles.iter_mut().filter(|vehicle| vehicle.active) {
            let proposed = vehicle.proposed_position();
            let head = vehicle.head_box(proposed);

            let result = if bodies.iter().any(|body| body.overlaps(&head)) {
                VehicleUpdateResult::Yielded
            } else if lights.blocks(&head, &light_cells(vehicle, &head, grid)) {
                VehicleUpdateResult::StoppedAtLight
            } else {
                vehicle.advance()
            };

            if result == VehicleUpdateResult::Departed {
                departed.push(vehicle.id);
            } else {
                bodies.extend(vehicle.collision_box());
            }
            report.results.push((vehicle.id, result));
        }

        for id in departed {
            self.release(id);
        }
        report
    }
}

/// Cells whose lights a vehicle must respect: the one under its head, the
/// one holding its target and the one the following segment runs through.
/// Waypoints sit on tile edges, so the segment midpoint is what identifies
/// the tile about to be entered.
fn light_cells(vehicle: &SimVehicle, head: &OrientedBox, grid: &Grid) -> Vec<CellCoord> {
    let target = vehicle.waypoints.get(1).copied();
    let beyond = match (target, vehicle.waypoints.get(2)) {
        (Some(target), Some(next)) => Some(target.lerp(next, 0.5)),
        _ => None,
    };

    let mut cells = Vec::with_capacity(3);
    for cell in [Some(head.center()), target, beyond]
        .into_iter()
        .flatten()
        .filter_map(|p| grid.cell_at(p))
    {
        if !cells.contains(&cell) {
            cells.push(cell);
        }
    }
    cells
}
