//! Simulation statistics

use log::info;

use super::vehicle::VehicleUpdateResult;
use super::vehicle_pool::{SpawnOutcome, TickReport};

/// Running counters kept by the world
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub ticks: u64,
    pub vehicles_spawned: u32,
    pub vehicles_completed: u32,
    pub spawn_rejected_capacity: u32,
    pub spawn_rejected_path: u32,
    pub spawn_rejected_asset: u32,
    pub yields: u64,
    pub light_stops: u64,
    pub active_vehicles: u32,
    pub road_cells: u32,
    pub junctions: u32,
}

impl SimulationStats {
    pub fn record_spawn(&mut self, outcome: SpawnOutcome) {
        match outcome {
            SpawnOutcome::Spawned(_) => self.vehicles_spawned += 1,
            SpawnOutcome::CapacityExceeded => self.spawn_rejected_capacity += 1,
            SpawnOutcome::InsufficientPath => self.spawn_rejected_path += 1,
            SpawnOutcome::AssetUnavailable => self.spawn_rejected_asset += 1,
        }
    }

    pub fn record_tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.yields += report.count(VehicleUpdateResult::Yielded) as u64;
        self.light_stops += report.count(VehicleUpdateResult::StoppedAtLight) as u64;
        self.vehicles_completed += report.count(VehicleUpdateResult::Departed) as u32;
    }

    /// Completed vehicles as a percentage of spawned ones
    pub fn completion_rate(&self) -> f32 {
        if self.vehicles_spawned > 0 {
            (self.vehicles_completed as f32 / self.vehicles_spawned as f32) * 100.0
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks: {}", self.ticks);
        info!("Total vehicles spawned: {}", self.vehicles_spawned);
        info!("Total vehicles completed: {}", self.vehicles_completed);
        info!("Active vehicles: {}", self.active_vehicles);
        info!(
            "Spawns rejected: {} (capacity), {} (path), {} (asset)",
            self.spawn_rejected_capacity, self.spawn_rejected_path, self.spawn_rejected_asset
        );
        info!("Yields: {}, light stops: {}", self.yields, self.light_stops);
        info!("Road cells: {}", self.road_cells);
        info!("Junctions with lights: {}", self.junctions);
        info!("Completion rate: {:.1}%", self.completion_rate());
    }
}
