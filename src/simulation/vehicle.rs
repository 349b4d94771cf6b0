//! Vehicle motion along a waypoint queue
//!
//! A vehicle heads straight for its next waypoint at constant speed. The
//! front of the queue is the waypoint it last reached; the element after it
//! is the current target.

use std::collections::VecDeque;

use super::geometry::{Collidable, OrientedBox};
use super::types::{Position, VehicleId, VEHICLE_LENGTH, VEHICLE_WIDTH};

/// Result of one vehicle update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Moved,
    /// Head box touched a vehicle ahead
    Yielded,
    /// Head box touched a red light's stop box
    StoppedAtLight,
    ReachedWaypoint,
    /// Path exhausted; the slot has been released
    Departed,
}

#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub waypoints: VecDeque<Position>,
    pub position: Position,
    /// Y-axis rotation, see `Position::angle_to`
    pub heading: f32,
    /// Distance left to the target waypoint
    pub distance_to_next: f32,
    /// Displacement per tick
    pub velocity: Position,
    pub speed: f32,
    pub active: bool,
}

impl SimVehicle {
    pub fn new(id: VehicleId, speed: f32) -> Self {
        Self {
            id,
            waypoints: VecDeque::new(),
            position: Position::default(),
            heading: 0.0,
            distance_to_next: 0.0,
            velocity: Position::default(),
            speed,
            active: false,
        }
    }

    /// Start following `path`, which must hold at least two waypoints
    pub fn assign(&mut self, path: Vec<Position>) {
        self.waypoints = path.into();
        self.position = self.waypoints.front().copied().unwrap_or_default();
        self.active = true;
        self.aim();
    }

    /// Clear the path and park the vehicle
    pub fn release(&mut self) {
        self.waypoints.clear();
        self.velocity = Position::default();
        self.distance_to_next = 0.0;
        self.active = false;
    }

    pub fn target(&self) -> Option<Position> {
        self.waypoints.get(1).copied()
    }

    fn aim(&mut self) {
        if let Some(target) = self.target() {
            self.heading = self.position.angle_to(&target);
            self.distance_to_next = self.position.distance(&target);
            self.velocity = Position::from_heading(self.heading) * self.speed;
        }
    }

    /// Position after one more tick of unobstructed travel
    pub fn proposed_position(&self) -> Position {
        match self.target() {
            Some(target) if self.distance_to_next <= self.velocity.length() => target,
            _ => self.position + self.velocity,
        }
    }

    /// Full footprint at `at`
    pub fn body_box(&self, at: Position) -> OrientedBox {
        OrientedBox::new(at, self.heading, VEHICLE_LENGTH, VEHICLE_WIDTH)
    }

    /// Small box at the front bumper used to detect what is ahead
    pub fn head_box(&self, at: Position) -> OrientedBox {
        let center = at + Position::from_heading(self.heading) * (VEHICLE_LENGTH * 0.5);
        OrientedBox::new(
            center,
            self.heading,
            VEHICLE_LENGTH * 0.25,
            VEHICLE_WIDTH * 0.5,
        )
    }

    /// Move one tick towards the target waypoint
    pub fn advance(&mut self) -> VehicleUpdateResult {
        let Some(target) = self.target() else {
            return VehicleUpdateResult::Departed;
        };

        let step = self.velocity.length();
        if self.distance_to_next > step {
            self.position += self.velocity;
            self.distance_to_next -= step;
            return VehicleUpdateResult::Moved;
        }

        self.position = target;
        self.waypoints.pop_front();
        if self.waypoints.len() < 2 {
            return VehicleUpdateResult::Departed;
        }
        self.aim();
        VehicleUpdateResult::ReachedWaypoint
    }
}

impl Collidable for SimVehicle {
    fn collision_box(&self) -> Option<OrientedBox> {
        self.active.then(|| self.body_box(self.position))
    }
}
