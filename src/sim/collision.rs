//! Hazard contact detection
//!
//! Zones are axis-aligned boxes around the player: a narrow collision box
//! inside a wider near-miss box, both sharing the same longitudinal depth.
//! An obstacle on a collision course therefore reaches the collision zone
//! without ever being classified as a near miss first.

use glam::Vec3;

use super::state::{Hazard, HazardKind};
use crate::platform::EntityId;
use crate::tuning::HazardTuning;

/// Where an obstacle sits relative to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Collision,
    NearMiss,
    Clear,
}

/// Something the player touched this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Collision { id: EntityId },
    NearMiss { id: EntityId },
    Pickup { id: EntityId },
}

/// Classify an obstacle offset (obstacle minus player). The zones never overlap.
#[inline]
pub fn classify(dx: f32, dz: f32, tuning: &HazardTuning) -> Zone {
    let (dx, dz) = (dx.abs(), dz.abs());
    if !(dz < tuning.contact_depth) {
        // Also catches NaN
        return Zone::Clear;
    }
    if dx < tuning.collision_lateral {
        Zone::Collision
    } else if dx < tuning.near_miss_lateral {
        Zone::NearMiss
    } else {
        Zone::Clear
    }
}

/// Boost pads trigger inside a square footprint
#[inline]
pub fn pad_reached(dx: f32, dz: f32, tuning: &HazardTuning) -> bool {
    dx.abs() < tuning.pad_radius && dz.abs() < tuning.pad_radius
}

/// All contacts for the player position, in hazard order. Inactive hazards
/// are skipped.
pub fn detect(player: Vec3, hazards: &[Hazard], tuning: &HazardTuning) -> Vec<Contact> {
    hazards
        .iter()
        .filter(|h| h.active)
        .filter_map(|h| {
            let dx = h.position.x - player.x;
            let dz = h.position.z - player.z;
            match h.kind {
                HazardKind::Obstacle => match classify(dx, dz, tuning) {
                    Zone::Collision => Some(Contact::Collision { id: h.id }),
                    Zone::NearMiss => Some(Contact::NearMiss { id: h.id }),
                    Zone::Clear => None,
                },
                HazardKind::Pad => pad_reached(dx, dz, tuning).then_some(Contact::Pickup { id: h.id }),
            }
        })
        .collect()
}
