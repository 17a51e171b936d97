//! Obstacle and boost pad spawning for the Runner variant
//!
//! Rows are laid out ahead of the car at a spacing that tightens with the
//! distance driven. Each row blocks one lane and sometimes carries a boost
//! pad in another lane.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::{Hazard, HazardKind};
use super::terrain::Prop;
use crate::consts::LANES;
use crate::platform::{SceneGraph, release_entity};
use crate::tuning::HazardTuning;

/// Row spacing for a given distance, before jitter
#[inline]
pub fn base_interval(distance: f32, tuning: &HazardTuning) -> f32 {
    (tuning.interval_start - tuning.interval_decay * distance.max(0.0)).max(tuning.interval_min)
}

#[derive(Debug, Clone)]
pub struct Spawner {
    rng: Pcg32,
    /// Z of the next row to place
    next_z: f32,
}

impl Spawner {
    pub fn new(seed: u64, tuning: &HazardTuning) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            next_z: -tuning.first_gap,
        }
    }

    /// Start over at the start line with a fresh stream
    pub fn reset(&mut self, seed: u64, tuning: &HazardTuning) {
        *self = Self::new(seed, tuning);
    }

    pub fn next_z(&self) -> f32 {
        self.next_z
    }

    fn interval(&mut self, distance: f32, tuning: &HazardTuning) -> f32 {
        let base = base_interval(distance, tuning);
        let jitter = if tuning.interval_jitter > 0.0 {
            self.rng
                .random_range(-tuning.interval_jitter..=tuning.interval_jitter)
        } else {
            0.0
        };
        (base * (1.0 + jitter)).max(tuning.interval_min)
    }

    /// Place rows until the spawn horizon is covered. Returns the number of
    /// hazards created.
    pub fn fill<S: SceneGraph + ?Sized>(
        &mut self,
        player_z: f32,
        hazards: &mut Vec<Hazard>,
        tuning: &HazardTuning,
        scene: &mut S,
    ) -> usize {
        let before = hazards.len();
        while self.next_z > player_z - tuning.spawn_ahead {
            let z = self.next_z;
            let lane = self.rng.random_range(0..LANES.len());
            let position = Vec3::new(LANES[lane], 0.0, z);
            hazards.push(Hazard {
                id: scene.spawn(&Prop::obstacle(position)),
                kind: HazardKind::Obstacle,
                position,
                lane,
                active: true,
            });

            if self.rng.random_bool(tuning.pad_chance.clamp(0.0, 1.0)) {
                let pad_lane = (lane + self.rng.random_range(1..LANES.len())) % LANES.len();
                let position = Vec3::new(LANES[pad_lane], 0.0, z);
                hazards.push(Hazard {
                    id: scene.spawn(&Prop::boost_pad(position)),
                    kind: HazardKind::Pad,
                    position,
                    lane: pad_lane,
                    active: true,
                });
            }

            self.next_z -= self.interval(-z, tuning);
        }

        let spawned = hazards.len() - before;
        if spawned > 0 {
            log::trace!("Spawned {} hazards, next row at z={:.1}", spawned, self.next_z);
        }
        spawned
    }

    /// Remove hazards left behind the car. Returns the number removed.
    pub fn cull<S: SceneGraph + ?Sized>(
        &mut self,
        player_z: f32,
        hazards: &mut Vec<Hazard>,
        tuning: &HazardTuning,
        scene: &mut S,
    ) -> usize {
        let mut removed = 0;
        // Backward so removal never skips an element
        for i in (0..hazards.len()).rev() {
            if hazards[i].position.z > player_z + tuning.despawn_behind {
                let hazard = hazards.remove(i);
                release_entity(scene, hazard.id);
                removed += 1;
            }
        }
        removed
    }
}
