//! Simulation configuration

use super::traffic_light::LightTimings;
use super::types::{HOPS_PER_TILE, VEHICLE_SPEED};

/// Parameters of the random walk used to draw vehicle paths
#[derive(Debug, Clone, PartialEq)]
pub struct WalkConfig {
    /// Chance of continuing into the next tile at each tile exit
    pub continue_probability: f64,
    /// Hard cap on lane hops; derived from the grid size when `None`
    pub max_hops: Option<usize>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            continue_probability: 0.97,
            max_hops: None,
        }
    }
}

impl WalkConfig {
    pub fn max_hops_for(&self, grid_width: usize, grid_length: usize) -> usize {
        self.max_hops
            .unwrap_or((grid_width + grid_length) * HOPS_PER_TILE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub grid_width: usize,
    pub grid_length: usize,
    /// Number of vehicle slots
    pub vehicle_capacity: usize,
    /// Distance travelled per tick
    pub vehicle_speed: f32,
    pub light_timings: LightTimings,
    pub walk: WalkConfig,
    /// Seed for reproducible runs; an unseeded world uses the thread RNG
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_length: 20,
            vehicle_capacity: 64,
            vehicle_speed: VEHICLE_SPEED,
            light_timings: LightTimings::default(),
            walk: WalkConfig::default(),
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn max_hops(&self) -> usize {
        self.walk.max_hops_for(self.grid_width, self.grid_length)
    }
}
