//! Traffic-light timing at junctions
//!
//! Every junction tile (three or more approaches) carries one light per
//! approach. Lights run a fixed five-phase cycle driven by tick countdowns and
//! publish a stop-line hit-box while they show red.

use std::collections::BTreeMap;

use log::debug;

use super::geometry::{Collidable, OrientedBox};
use super::lanes::entry_point;
use super::types::{CellCoord, Position, Side, STOP_LINE_DEPTH};

/// Width of the stop box across the inbound lane
const STOP_BOX_WIDTH: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightPhase {
    Green,
    Yellow,
    YellowDelay,
    Red,
    RedDelay,
}

impl LightPhase {
    pub fn successor(self) -> LightPhase {
        match self {
            LightPhase::Green => LightPhase::Yellow,
            LightPhase::Yellow => LightPhase::YellowDelay,
            LightPhase::YellowDelay => LightPhase::Red,
            LightPhase::Red => LightPhase::RedDelay,
            LightPhase::RedDelay => LightPhase::Green,
        }
    }

    /// Phases in which traffic must hold at the stop line
    pub fn is_stop(self) -> bool {
        matches!(self, LightPhase::Red | LightPhase::RedDelay)
    }
}

/// Phase durations in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightTimings {
    pub green: u32,
    pub yellow: u32,
    pub yellow_delay: u32,
    pub red: u32,
    pub red_delay: u32,
}

impl Default for LightTimings {
    fn default() -> Self {
        Self {
            green: 500,
            yellow: 100,
            yellow_delay: 50,
            red: 600,
            red_delay: 150,
        }
    }
}

impl LightTimings {
    pub fn duration(&self, phase: LightPhase) -> u32 {
        let ticks = match phase {
            LightPhase::Green => self.green,
            LightPhase::Yellow => self.yellow,
            LightPhase::YellowDelay => self.yellow_delay,
            LightPhase::Red => self.red,
            LightPhase::RedDelay => self.red_delay,
        };
        ticks.max(1)
    }
}

/// Light facing the traffic that enters a junction through `approach`
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub approach: Side,
    pub phase: LightPhase,
    /// Ticks left in the current phase
    pub remaining: u32,
    /// Published only while the phase is a stop phase
    pub hit_box: Option<OrientedBox>,
    pub stop_box: OrientedBox,
}

impl TrafficLight {
    pub fn new(center: Position, approach: Side, phase: LightPhase, timings: &LightTimings) -> Self {
        let travel = -approach.direction();
        let entry = entry_point(center, approach);
        let stop_box = OrientedBox::new(
            entry + travel * (STOP_LINE_DEPTH * 0.5),
            Position::default().angle_to(&travel),
            STOP_LINE_DEPTH,
            STOP_BOX_WIDTH,
        );
        Self {
            approach,
            phase,
            remaining: timings.duration(phase),
            hit_box: phase.is_stop().then_some(stop_box),
            stop_box,
        }
    }

    /// Count down one tick. Returns the new phase when it switched.
    pub fn tick(&mut self, timings: &LightTimings) -> Option<LightPhase> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return None;
        }
        self.phase = self.phase.successor();
        self.remaining = timings.duration(self.phase);
        self.hit_box = self.phase.is_stop().then_some(self.stop_box);
        Some(self.phase)
    }
}

impl Collidable for TrafficLight {
    fn collision_box(&self) -> Option<OrientedBox> {
        self.hit_box
    }
}

/// The lights of one junction tile
#[derive(Debug, Clone)]
pub struct JunctionLights {
    pub cell: CellCoord,
    pub position: Position,
    pub lights: Vec<TrafficLight>,
}

impl JunctionLights {
    fn new(cell: CellCoord, position: Position, approaches: &[Side], timings: &LightTimings) -> Self {
        let lights = approaches
            .iter()
            .map(|side| {
                let phase = if side.is_vertical() {
                    LightPhase::Green
                } else {
                    LightPhase::Red
                };
                TrafficLight::new(position, *side, phase, timings)
            })
            .collect();
        Self {
            cell,
            position,
            lights,
        }
    }

    pub fn approaches(&self) -> Vec<Side> {
        self.lights.iter().map(|light| light.approach).collect()
    }

    pub fn light(&self, approach: Side) -> Option<&TrafficLight> {
        self.lights.iter().find(|light| light.approach == approach)
    }
}

/// What `TrafficLights::sync` did with a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightSync {
    Unchanged,
    Created,
    Rebuilt,
    Removed,
}

/// A light that changed phase during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub cell: CellCoord,
    pub approach: Side,
    pub phase: LightPhase,
}

#[derive(Debug, Clone, Default)]
pub struct TrafficLights {
    junctions: BTreeMap<CellCoord, JunctionLights>,
    timings: LightTimings,
}

impl TrafficLights {
    pub fn new(timings: LightTimings) -> Self {
        Self {
            junctions: BTreeMap::new(),
            timings,
        }
    }

    pub fn timings(&self) -> &LightTimings {
        &self.timings
    }

    /// Bring the lights of `cell` in line with its connected sides
    pub fn sync(&mut self, cell: CellCoord, center: Position, connected: &[Side]) -> LightSync {
        if connected.len() < 3 {
            return match self.junctions.remove(&cell) {
                Some(_) => {
                    debug!("Removed traffic lights at {}", cell);
                    LightSync::Removed
                }
                None => LightSync::Unchanged,
            };
        }

        let mut approaches = connected.to_vec();
        approaches.sort();
        let outcome = match self.junctions.get(&cell) {
            Some(existing) if existing.approaches() == approaches => return LightSync::Unchanged,
            Some(_) => LightSync::Rebuilt,
            None => LightSync::Created,
        };

        debug!("{:?} traffic lights at {} for {:?}", outcome, cell, approaches);
        self.junctions.insert(
            cell,
            JunctionLights::new(cell, center, &approaches, &self.timings),
        );
        outcome
    }

    /// Advance every light by one tick
    pub fn tick(&mut self) -> Vec<PhaseChange> {
        let timings = self.timings;
        let mut changes = Vec::new();
        for junction in self.junctions.values_mut() {
            for light in &mut junction.lights {
                if let Some(phase) = light.tick(&timings) {
                    changes.push(PhaseChange {
                        cell: junction.cell,
                        approach: light.approach,
                        phase,
                    });
                }
            }
        }
        changes
    }

    /// Whether `head` touches a red hit-box at any of `cells`
    pub fn blocks(&self, head: &OrientedBox, cells: &[CellCoord]) -> bool {
        cells
            .iter()
            .filter_map(|cell| self.junctions.get(cell))
            .flat_map(|junction| junction.lights.iter())
            .filter_map(|light| light.collision_box())
            .any(|hit_box| hit_box.overlaps(head))
    }

    pub fn junction(&self, cell: CellCoord) -> Option<&JunctionLights> {
        self.junctions.get(&cell)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &JunctionLights> {
        self.junctions.values()
    }

    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }
}
