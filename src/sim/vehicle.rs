//! Vehicle kinematics
//!
//! No physics: speed converges toward a ceiling, steering either slides the
//! car across the road or turns it, and the position is integrated once per
//! frame with a clamped delta.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::tuning::{Boundary, SpeedPolicy, SteeringMode, Tuning};
use crate::{approach, forward, normalize_angle, speed_fraction};

/// Rate at which cosmetic roll/yaw follow the steer input
const TILT_RATE: f32 = 8.0;

/// Clamp a frame delta to what the simulation will integrate
#[inline]
pub fn clamp_dt(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(MAX_FRAME_DT)
}

/// Hard-clamp a position to the drivable area. Speed is left alone, so the
/// car can slide along the edge while it turns away.
pub fn clamp_to_boundary(position: Vec3, boundary: Boundary) -> Vec3 {
    match boundary {
        Boundary::Square { half_extent } => Vec3::new(
            position.x.clamp(-half_extent, half_extent),
            position.y,
            position.z.clamp(-half_extent, half_extent),
        ),
        Boundary::Radius { radius } => {
            let flat = Vec2::new(position.x, position.z);
            if flat.length() <= radius {
                return position;
            }
            let edge = flat.normalize_or_zero() * radius;
            Vec3::new(edge.x, position.y, edge.y)
        }
    }
}

/// The player's car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub position: Vec3,
    /// Radians; 0 faces -Z, positive turns toward +X
    pub heading: f32,
    pub speed: f32,
    /// Offset from the road center (lane mode)
    pub lateral: f32,
    /// Cosmetic body roll, does not affect the trajectory
    pub roll: f32,
    /// Cosmetic body yaw in lane mode
    pub yaw: f32,
    /// Distance driven this run
    pub distance: f32,
}

impl Vehicle {
    pub fn new(base_speed: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            heading: 0.0,
            speed: base_speed,
            lateral: 0.0,
            roll: 0.0,
            yaw: 0.0,
            distance: 0.0,
        }
    }

    /// Back to the start line
    pub fn reset(&mut self, base_speed: f32) {
        *self = Self::new(base_speed);
    }

    pub fn forward(&self) -> Vec3 {
        forward(self.heading)
    }

    fn next_speed(&self, steer: f32, dt: f32, tuning: &Tuning, boost: f32) -> f32 {
        let (base, max) = (tuning.base_speed, tuning.max_speed);
        let speed = match tuning.speed {
            SpeedPolicy::Linear { accel } => self.speed + accel * boost * dt,
            SpeedPolicy::Smoothed {
                rate,
                target_fraction,
                drag,
            } => {
                let target = (max * (target_fraction - drag * steer.abs())).clamp(base, max);
                approach(self.speed, target, rate * boost, dt)
            }
        };
        speed.clamp(base, max)
    }

    /// Advance one frame. `boost` scales the speed approach (1.0 when not boosted).
    pub fn advance(&mut self, steer: f32, dt: f32, tuning: &Tuning, boost: f32) {
        let dt = clamp_dt(dt);
        let steer = if steer.is_finite() {
            steer.clamp(-1.0, 1.0)
        } else {
            0.0
        };

        self.speed = self.next_speed(steer, dt, tuning, boost.max(1.0));
        let s = speed_fraction(self.speed, tuning.max_speed);

        match tuning.steering {
            SteeringMode::LaneOffset {
                lateral_speed,
                limit,
            } => {
                self.heading = 0.0;
                self.lateral = (self.lateral + steer * lateral_speed * dt).clamp(-limit, limit);
                self.position.x = self.lateral;
                self.position.z -= self.speed * dt;
                self.distance += self.speed * dt;
                self.yaw = approach(self.yaw, -steer * MAX_YAW, TILT_RATE, dt);
                self.roll = approach(self.roll, steer * MAX_ROLL, TILT_RATE, dt);
            }
            SteeringMode::FreeHeading {
                turn_rate,
                boundary,
            } => {
                self.heading = normalize_angle(self.heading + steer * turn_rate * s * dt);
                let before = self.position;
                let moved = self.position + forward(self.heading) * self.speed * dt;
                self.position = clamp_to_boundary(moved, boundary);
                self.distance += (self.position - before).length();
                self.roll = approach(self.roll, steer * MAX_ROLL * s, TILT_RATE, dt);
            }
        }
    }
}
