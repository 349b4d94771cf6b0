//! Road grid simulation module
//!
//! Topology resolution, lane graph, traffic lights and vehicle motion. The
//! module holds no render state; drawing goes through `RenderBackend`.

mod config;
mod geometry;
mod grid;
mod input;
mod lanes;
mod render;
mod shapes;
mod stats;
mod topology;
mod traffic_light;
mod types;
mod vehicle;
mod vehicle_pool;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use config::{SimConfig, WalkConfig};
#[allow(unused_imports)]
pub use geometry::{Collidable, OrientedBox};
#[allow(unused_imports)]
pub use grid::{Cell, Grid, Occupancy, Signature};
#[allow(unused_imports)]
pub use input::PointerInput;
#[allow(unused_imports)]
pub use lanes::{
    entry_point, exit_point, FacingBundle, LaneGraph, LaneHandle, LaneNode, RoutingGraph,
    TileLaneGraph,
};
#[allow(unused_imports)]
pub use render::{
    BatchHandle, BatchKey, HeadlessRenderer, InstanceKey, MeshAsset, ObjectKind, PointerCoord,
    RenderBackend, Renderable, SceneSync, Transform, WorldObject,
};
#[allow(unused_imports)]
pub use shapes::{lookup, ResolvedTile, Rotation, ShapeFamily, TileShape, SHAPE_TABLE};
#[allow(unused_imports)]
pub use stats::SimulationStats;
#[allow(unused_imports)]
pub use topology::{
    apply_diff, plan_toggle, resolve_tile, CellChange, TopologyDiff, TopologyError,
};
#[allow(unused_imports)]
pub use traffic_light::{
    JunctionLights, LightPhase, LightSync, LightTimings, PhaseChange, TrafficLight, TrafficLights,
};
#[allow(unused_imports)]
pub use types::{
    CellCoord, Position, RoadClass, Side, VehicleId, CURVE_STEPS, HOPS_PER_TILE, LANE_OFFSET,
    STOP_LINE_DEPTH, VEHICLE_LENGTH, VEHICLE_SPEED, VEHICLE_WIDTH, WAYPOINT_EPSILON,
};
#[allow(unused_imports)]
pub use vehicle::{SimVehicle, VehicleUpdateResult};
#[allow(unused_imports)]
pub use vehicle_pool::{dedup_path, SpawnOutcome, TickReport, VehiclePool};
pub use world::{EditOutcome, SimWorld};
