//! World streaming
//!
//! Keeps the regions around a moving reference point alive and releases the
//! rest. Two addressing modes share the same contract:
//! - Chunks along the travel axis, appended ahead of a frontier pointer
//! - Tiles on a grid, reconciled by set difference every call
//!
//! Regions are created inside the visible radius and only released once they
//! fall outside the (wider) retention radius, so the boundary never thrashes.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::terrain::generate_region;
use crate::platform::{EntityId, SceneGraph, release_entity};
use crate::tuning::StreamLayout;

/// Coordinate of a streamed region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegionKey {
    /// Chunk `k` spans z in [k * length, (k + 1) * length)
    Chunk(i32),
    /// Tile (x, z) spans [x * size, (x + 1) * size) on both axes
    Tile(i32, i32),
}

/// A live region and the scene entities it owns
#[derive(Debug, Clone)]
pub struct Region {
    pub key: RegionKey,
    pub entities: Vec<EntityId>,
}

/// What one `ensure_coverage` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub created: usize,
    pub released: usize,
}

impl StreamStats {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.released == 0
    }
}

/// Chunk index containing a z coordinate
#[inline]
pub fn chunk_index(z: f32, length: f32) -> i32 {
    (z / length).floor() as i32
}

/// Inclusive index range of chunks whose span intersects (z - radius, z + radius).
/// The first element is the most advanced (lowest) index.
pub fn chunk_range(z: f32, radius: f32, length: f32) -> (i32, i32) {
    let lo = ((z - radius) / length).floor() as i32;
    let hi = ((z + radius) / length).ceil() as i32 - 1;
    (lo, hi)
}

/// Tile containing a position
#[inline]
pub fn tile_of(position: Vec3, size: f32) -> (i32, i32) {
    (
        (position.x / size).floor() as i32,
        (position.z / size).floor() as i32,
    )
}

/// Streams regions around a reference position
#[derive(Debug)]
pub struct WorldStreamer {
    layout: StreamLayout,
    density: f32,
    seed: u64,
    regions: BTreeMap<RegionKey, Region>,
    /// Most advanced chunk index generated so far (chunk layout only)
    frontier: Option<i32>,
}

impl WorldStreamer {
    pub fn new(layout: StreamLayout, density: f32, seed: u64) -> Self {
        Self {
            layout,
            density,
            seed,
            regions: BTreeMap::new(),
            frontier: None,
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn contains(&self, key: RegionKey) -> bool {
        self.regions.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = RegionKey> + '_ {
        self.regions.keys().copied()
    }

    pub fn region(&self, key: RegionKey) -> Option<&Region> {
        self.regions.get(&key)
    }

    pub fn frontier(&self) -> Option<i32> {
        self.frontier
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Make sure every region within the visible radius exists, then release
    /// every region outside the retention radius.
    pub fn ensure_coverage<S: SceneGraph + ?Sized>(
        &mut self,
        reference: Vec3,
        scene: &mut S,
    ) -> StreamStats {
        let stats = match self.layout {
            StreamLayout::Chunks {
                length,
                visible,
                retention,
            } => self.cover_chunks(reference.z, length, visible, retention, scene),
            StreamLayout::Tiles {
                size,
                visible,
                retention,
            } => self.cover_tiles(reference, size, visible, retention, scene),
        };

        if !stats.is_noop() {
            log::debug!(
                "Streaming: +{} -{} regions ({} live)",
                stats.created,
                stats.released,
                self.regions.len()
            );
        }
        stats
    }

    fn cover_chunks<S: SceneGraph + ?Sized>(
        &mut self,
        z: f32,
        length: f32,
        visible: f32,
        retention: f32,
        scene: &mut S,
    ) -> StreamStats {
        let mut stats = StreamStats::default();
        let (lo, hi) = chunk_range(z, visible, length);

        // Only ever append ahead of the frontier
        let start = match self.frontier {
            None => hi,
            Some(frontier) => (frontier - 1).min(hi),
        };
        for k in (lo..=start).rev() {
            if self.create(RegionKey::Chunk(k), length, scene) {
                stats.created += 1;
            }
        }
        self.frontier = Some(self.frontier.map_or(lo, |f| f.min(lo)));

        let (keep_lo, keep_hi) = chunk_range(z, retention, length);
        let expired: Vec<RegionKey> = self
            .regions
            .keys()
            .copied()
            .filter(|key| match *key {
                RegionKey::Chunk(k) => k < keep_lo || k > keep_hi,
                RegionKey::Tile(..) => true,
            })
            .collect();
        for key in expired {
            self.release(key, scene);
            stats.released += 1;
        }

        stats
    }

    fn cover_tiles<S: SceneGraph + ?Sized>(
        &mut self,
        reference: Vec3,
        size: f32,
        visible: i32,
        retention: i32,
        scene: &mut S,
    ) -> StreamStats {
        let mut stats = StreamStats::default();
        let (cx, cz) = tile_of(reference, size);

        for dz in -visible..=visible {
            for dx in -visible..=visible {
                if self.create(RegionKey::Tile(cx + dx, cz + dz), size, scene) {
                    stats.created += 1;
                }
            }
        }

        let expired: Vec<RegionKey> = self
            .regions
            .keys()
            .copied()
            .filter(|key| match *key {
                RegionKey::Tile(x, z) => (x - cx).abs().max((z - cz).abs()) > retention,
                RegionKey::Chunk(_) => true,
            })
            .collect();
        for key in expired {
            self.release(key, scene);
            stats.released += 1;
        }

        stats
    }

    /// Create a region if it does not exist yet. Returns whether it was created.
    fn create<S: SceneGraph + ?Sized>(&mut self, key: RegionKey, extent: f32, scene: &mut S) -> bool {
        if self.regions.contains_key(&key) {
            return false;
        }
        let entities = generate_region(key, extent, self.density, self.seed)
            .iter()
            .map(|prop| scene.spawn(prop))
            .collect();
        self.regions.insert(key, Region { key, entities });
        true
    }

    /// Release a region's entities, then forget its key
    fn release<S: SceneGraph + ?Sized>(&mut self, key: RegionKey, scene: &mut S) {
        if let Some(region) = self.regions.get(&key) {
            for &id in &region.entities {
                release_entity(scene, id);
            }
        }
        self.regions.remove(&key);
    }

    /// Release every region and forget the frontier
    pub fn reset<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) {
        let keys: Vec<RegionKey> = self.regions.keys().copied().collect();
        let count = keys.len();
        for key in keys {
            self.release(key, scene);
        }
        self.frontier = None;
        log::debug!("Streaming reset: released {} regions", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessScene;
    use proptest::prelude::*;

    const LENGTH: f32 = 40.0;
    const VISIBLE: f32 = 200.0;
    const RETENTION: f32 = 280.0;

    fn chunks() -> WorldStreamer {
        WorldStreamer::new(
            StreamLayout::Chunks {
                length: LENGTH,
                visible: VISIBLE,
                retention: RETENTION,
            },
            1.0,
            42,
        )
    }

    fn tiles() -> WorldStreamer {
        WorldStreamer::new(
            StreamLayout::Tiles {
                size: 60.0,
                visible: 2,
                retention: 3,
            },
            1.0,
            42,
        )
    }

    fn chunk_span_intersects(k: i32, z: f32, radius: f32) -> bool {
        let start = k as f32 * LENGTH;
        let end = start + LENGTH;
        start < z + radius && end > z - radius
    }

    #[test]
    fn test_chunk_range_boundaries() {
        // Exactly on a boundary: spans that only touch the interval are excluded
        assert_eq!(chunk_range(0.0, 40.0, 40.0), (-1, 0));
        assert_eq!(chunk_range(-10.0, 40.0, 40.0), (-2, 0));
    }

    #[test]
    fn test_initial_chunk_coverage() {
        let mut scene = HeadlessScene::new();
        let mut world = chunks();
        let stats = world.ensure_coverage(Vec3::ZERO, &mut scene);

        let (lo, hi) = chunk_range(0.0, VISIBLE, LENGTH);
        assert_eq!(stats.created, (hi - lo + 1) as usize);
        assert_eq!(stats.released, 0);
        assert_eq!(world.frontier(), Some(lo));
        for k in lo..=hi {
            assert!(world.contains(RegionKey::Chunk(k)));
        }
        assert!(scene.live_count() > 0);
    }

    #[test]
    fn test_chunks_append_ahead_and_drop_behind() {
        let mut scene = HeadlessScene::new();
        let mut world = chunks();
        world.ensure_coverage(Vec3::ZERO, &mut scene);

        let mut z = 0.0;
        for _ in 0..200 {
            z -= 7.5;
            world.ensure_coverage(Vec3::new(0.0, 0.0, z), &mut scene);
        }

        let (lo, _) = chunk_range(z, VISIBLE, LENGTH);
        assert_eq!(world.frontier(), Some(lo));
        for key in world.keys() {
            let RegionKey::Chunk(k) = key else {
                panic!("tile in chunk world");
            };
            assert!(chunk_span_intersects(k, z, RETENTION));
        }
        // Nothing far behind survives
        assert!(!world.contains(RegionKey::Chunk(0)));
    }

    #[test]
    fn test_chunk_released_entities_leave_scene() {
        let mut scene = HeadlessScene::new();
        let mut world = chunks();
        world.ensure_coverage(Vec3::ZERO, &mut scene);
        let owned: Vec<EntityId> = world
            .region(RegionKey::Chunk(0))
            .map(|r| r.entities.clone())
            .unwrap_or_default();
        assert!(!owned.is_empty());

        world.ensure_coverage(Vec3::new(0.0, 0.0, -1000.0), &mut scene);
        assert!(!world.contains(RegionKey::Chunk(0)));
        for id in owned {
            assert!(!scene.is_live(id));
        }
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut scene = HeadlessScene::new();
        let mut world = chunks();
        world.ensure_coverage(Vec3::new(0.0, 0.0, -500.0), &mut scene);
        assert!(!world.is_empty());

        world.reset(&mut scene);
        assert!(world.is_empty());
        assert_eq!(world.frontier(), None);
        assert_eq!(scene.live_count(), 0);
        assert_eq!(scene.detached_count(), 0);

        // Ready to regenerate from scratch, behind the old frontier too
        let stats = world.ensure_coverage(Vec3::ZERO, &mut scene);
        assert!(stats.created > 0);
        assert!(world.contains(RegionKey::Chunk(0)));
    }

    #[test]
    fn test_regeneration_after_reset_is_identical() {
        let mut scene = HeadlessScene::new();
        let mut world = chunks();
        world.ensure_coverage(Vec3::ZERO, &mut scene);
        let before = scene.props_snapshot();

        world.reset(&mut scene);
        world.ensure_coverage(Vec3::ZERO, &mut scene);
        assert_eq!(before, scene.props_snapshot());
    }

    #[test]
    fn test_tile_coverage_and_hysteresis() {
        let mut scene = HeadlessScene::new();
        let mut world = tiles();
        let stats = world.ensure_coverage(Vec3::new(30.0, 0.0, 30.0), &mut scene);
        assert_eq!(stats.created, 25);
        assert!(world.contains(RegionKey::Tile(-2, -2)));
        assert!(world.contains(RegionKey::Tile(2, 2)));

        // One tile east: column x = -2 is still inside retention
        let stats = world.ensure_coverage(Vec3::new(90.0, 0.0, 30.0), &mut scene);
        assert_eq!(stats.created, 5);
        assert_eq!(stats.released, 0);
        assert!(world.contains(RegionKey::Tile(-2, 0)));

        // Two more tiles east: columns -2 and -1 drop out
        let stats = world.ensure_coverage(Vec3::new(210.0, 0.0, 30.0), &mut scene);
        assert_eq!(stats.released, 10);
        assert!(!world.contains(RegionKey::Tile(-2, 0)));

        // Stepping back one tile recreates nothing (retention kept it)
        let stats = world.ensure_coverage(Vec3::new(150.0, 0.0, 30.0), &mut scene);
        assert_eq!(stats.created, 0);
    }

    #[test]
    fn test_tiles_negative_coordinates() {
        assert_eq!(tile_of(Vec3::new(-0.1, 0.0, -60.0), 60.0), (-1, -1));
        assert_eq!(tile_of(Vec3::new(59.9, 0.0, 60.0), 60.0), (0, 1));
    }

    proptest! {
        #[test]
        fn prop_chunk_coverage_and_idempotence(steps in prop::collection::vec(0.0f32..12.0, 1..60)) {
            let mut scene = HeadlessScene::new();
            let mut world = chunks();
            let mut z = 0.0f32;
            world.ensure_coverage(Vec3::ZERO, &mut scene);

            for step in steps {
                z -= step;
                let reference = Vec3::new(0.0, 0.0, z);
                world.ensure_coverage(reference, &mut scene);

                let (lo, hi) = chunk_range(z, VISIBLE, LENGTH);
                for k in lo..=hi {
                    prop_assert!(world.contains(RegionKey::Chunk(k)));
                }
                for key in world.keys() {
                    if let RegionKey::Chunk(k) = key {
                        prop_assert!(chunk_span_intersects(k, z, RETENTION));
                    }
                }

                let live = scene.live_count();
                let again = world.ensure_coverage(reference, &mut scene);
                prop_assert!(again.is_noop());
                prop_assert_eq!(live, scene.live_count());
            }
        }

        #[test]
        fn prop_tile_coverage_and_idempotence(
            moves in prop::collection::vec((-90.0f32..90.0, -90.0f32..90.0), 1..30)
        ) {
            let mut scene = HeadlessScene::new();
            let mut world = tiles();
            let mut pos = Vec3::ZERO;

            for (dx, dz) in moves {
                pos += Vec3::new(dx, 0.0, dz);
                world.ensure_coverage(pos, &mut scene);

                let (cx, cz) = tile_of(pos, 60.0);
                for z in cz - 2..=cz + 2 {
                    for x in cx - 2..=cx + 2 {
                        prop_assert!(world.contains(RegionKey::Tile(x, z)));
                    }
                }
                for key in world.keys() {
                    if let RegionKey::Tile(x, z) = key {
                        prop_assert!((x - cx).abs().max((z - cz).abs()) <= 3);
                    }
                }

                let again = world.ensure_coverage(pos, &mut scene);
                prop_assert!(again.is_noop());
            }
        }
    }
}
