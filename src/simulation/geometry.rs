//! Oriented bounding boxes for vehicle and traffic-light collision tests

use super::types::Position;

/// Anything that can block a vehicle's head box
pub trait Collidable {
    fn collision_box(&self) -> Option<OrientedBox>;
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub corners: [Position; 4],
}

impl OrientedBox {
    /// `heading` is a Y-axis rotation (see `Position::angle_to`); `length`
    /// runs along the heading and `width` across it.
    pub fn new(center: Position, heading: f32, length: f32, width: f32) -> Self {
        let forward = Position::from_heading(heading) * (length * 0.5);
        let right = Position::new(-forward.z, forward.x) * (width / length.max(f32::EPSILON));
        Self {
            corners: [
                center - forward - right,
                center - forward + right,
                center + forward + right,
                center + forward - right,
            ],
        }
    }

    pub fn center(&self) -> Position {
        (self.corners[0] + self.corners[2]) * 0.5
    }

    /// Edge vectors across and along the box
    pub fn axes(&self) -> [Position; 2] {
        [
            self.corners[1] - self.corners[0],
            self.corners[3] - self.corners[0],
        ]
    }

    /// Checks the two axes of `self` only. Both directions are needed for
    /// a full separating-axis test.
    fn overlaps_one_way(&self, other: &OrientedBox) -> bool {
        for axis in self.axes() {
            let magnitude2 = axis.dot(&axis);
            if magnitude2 <= 0.0 {
                return false;
            }
            // scaled so the edge of self spans exactly [origin, origin + 1]
            let axis = axis * (1.0 / magnitude2);
            let origin = self.corners[0].dot(&axis);

            let mut t_min = f32::INFINITY;
            let mut t_max = f32::NEG_INFINITY;
            for corner in &other.corners {
                let t = corner.dot(&axis);
                t_min = t_min.min(t);
                t_max = t_max.max(t);
            }

            if t_min > origin + 1.0 || t_max < origin {
                return false;
            }
        }
        true
    }

    /// Separating-axis overlap test
    pub fn overlaps(&self, other: &OrientedBox) -> bool {
        self.overlaps_one_way(other) && other.overlaps_one_way(self)
    }

    pub fn contains(&self, p: Position) -> bool {
        (0..4).all(|i| {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            (b - a).dot(&(p - a)) >= 0.0
        })
    }
}
