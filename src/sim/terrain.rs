//! Procedural region content
//!
//! Structural pieces (ground, road, markings) are laid out deterministically;
//! decorations are scattered with rejection sampling so nothing lands on a
//! road strip. Each region draws from its own RNG stream seeded by its key.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::world::RegionKey;
use crate::consts::*;

/// Spacing of dashed lane markings
const DASH_SPACING: f32 = 8.0;
const DASH_LENGTH: f32 = 3.0;
/// Gap kept between decorations and the road edge
const ROAD_CLEARANCE: f32 = 2.0;
/// Smallest tile that still leaves ground beside both cross roads
pub const MIN_TILE_SIZE: f32 = 2.0 * (TILE_ROAD_HALF_WIDTH + ROAD_CLEARANCE);
/// Extra gap for ponds, which look wrong near traffic
const POND_CLEARANCE: f32 = 6.0;
/// Samples tried before a decoration is dropped
const PLACEMENT_ATTEMPTS: usize = 4;

const BUILDING_TINTS: [u32; 5] = [0x2b2d42, 0x3a0ca3, 0x4361ee, 0x7209b7, 0x1b263b];
const TREE_TINTS: [u32; 3] = [0x2d6a4f, 0x40916c, 0x1b4332];

/// What a prop looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropKind {
    Ground,
    Road,
    LaneMarking,
    CenterLine,
    EdgeLine,
    Building,
    /// Trunk and crown grouped together
    Tree,
    Pond,
    Obstacle,
    BoostPad,
}

impl PropKind {
    /// Whether the entity owns geometry/material directly. Grouped props
    /// only own children, which the renderer frees with the group.
    pub fn owns_resources(&self) -> bool {
        !matches!(self, PropKind::Tree)
    }
}

/// A renderable piece of world content
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub kind: PropKind,
    /// Center of the footprint, y at the base or surface
    pub position: Vec3,
    pub size: Vec3,
    /// Rotation about Y (radians)
    pub rotation: f32,
    /// 0xRRGGBB
    pub tint: u32,
}

impl Prop {
    pub fn new(kind: PropKind, position: Vec3, size: Vec3, tint: u32) -> Self {
        Self {
            kind,
            position,
            size,
            rotation: 0.0,
            tint,
        }
    }

    pub fn obstacle(position: Vec3) -> Self {
        Self::new(PropKind::Obstacle, position, Vec3::new(1.6, 1.2, 3.2), 0xff3860)
    }

    pub fn boost_pad(position: Vec3) -> Self {
        Self::new(PropKind::BoostPad, position, Vec3::new(2.4, 0.05, 3.0), 0x00f5d4)
    }
}

/// Stable seed for a region's RNG stream
pub fn region_seed(world_seed: u64, key: RegionKey) -> u64 {
    let (tag, a, b) = match key {
        RegionKey::Chunk(k) => (1u64, k as i64 as u64, 0u64),
        RegionKey::Tile(x, z) => (2u64, x as i64 as u64, z as i64 as u64),
    };

    let mut h = world_seed ^ tag.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= a.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = h.rotate_left(31) ^ b.wrapping_mul(0x94D0_49BB_1331_11EB);

    // splitmix64 finalizer
    h ^= h >> 30;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^ (h >> 31)
}

/// RNG for a region
pub fn region_rng(world_seed: u64, key: RegionKey) -> Pcg32 {
    Pcg32::seed_from_u64(region_seed(world_seed, key))
}

/// Number of decorations for a base count at a density multiplier
fn scaled(count: f32, density: f32) -> usize {
    (count * density.max(0.0)).round() as usize
}

fn pick<T: Copy>(rng: &mut Pcg32, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

/// Build the content of one highway chunk
pub fn generate_chunk(index: i32, length: f32, density: f32, rng: &mut Pcg32) -> Vec<Prop> {
    let z0 = index as f32 * length;
    let zc = z0 + length * 0.5;
    let mut props = Vec::with_capacity(32);

    props.push(Prop::new(
        PropKind::Ground,
        Vec3::new(0.0, -0.05, zc),
        Vec3::new(GROUND_HALF_WIDTH * 2.0, 0.1, length),
        0x0b132b,
    ));
    props.push(Prop::new(
        PropKind::Road,
        Vec3::new(0.0, 0.0, zc),
        Vec3::new(ROAD_HALF_WIDTH * 2.0, 0.02, length),
        0x1c1c24,
    ));
    for side in [-1.0, 1.0] {
        props.push(Prop::new(
            PropKind::EdgeLine,
            Vec3::new(side * (ROAD_HALF_WIDTH - 0.3), 0.015, zc),
            Vec3::new(0.2, 0.01, length),
            0xf8f9fa,
        ));
    }

    // Dashed dividers between neighbouring lanes
    let dashes = (length / DASH_SPACING).floor() as usize;
    for pair in LANES.windows(2) {
        let x = (pair[0] + pair[1]) * 0.5;
        for j in 0..dashes {
            let z = z0 + (j as f32 + 0.5) * DASH_SPACING;
            props.push(Prop::new(
                PropKind::LaneMarking,
                Vec3::new(x, 0.015, z),
                Vec3::new(0.15, 0.01, DASH_LENGTH),
                0xffd166,
            ));
        }
    }

    let x_range = GROUND_HALF_WIDTH - 5.0;

    for _ in 0..scaled(6.0, density) {
        let size = Vec3::new(
            rng.random_range(6.0..14.0),
            rng.random_range(8.0..40.0),
            rng.random_range(6.0..14.0),
        );
        let half = size.x.max(size.z) * 0.5;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = rng.random_range(-x_range..x_range);
            if x.abs() < ROAD_HALF_WIDTH + half + ROAD_CLEARANCE {
                continue;
            }
            let z = rng.random_range(z0..z0 + length);
            let mut prop = Prop::new(
                PropKind::Building,
                Vec3::new(x, size.y * 0.5, z),
                size,
                pick(rng, &BUILDING_TINTS),
            );
            prop.rotation = rng.random_range(-0.2..0.2);
            props.push(prop);
            break;
        }
    }

    for _ in 0..scaled(10.0, density) {
        let radius = rng.random_range(0.8..1.6);
        let height = rng.random_range(4.0..8.0);
        for _ in 0..PLACEMENT_ATTEMPTS {
            let x = rng.random_range(-x_range..x_range);
            if x.abs() < ROAD_HALF_WIDTH + radius + ROAD_CLEARANCE {
                continue;
            }
            let z = rng.random_range(z0..z0 + length);
            props.push(Prop::new(
                PropKind::Tree,
                Vec3::new(x, 0.0, z),
                Vec3::new(radius * 2.0, height, radius * 2.0),
                pick(rng, &TREE_TINTS),
            ));
            break;
        }
    }

    if rng.random_bool((0.15 * density as f64).clamp(0.0, 1.0)) {
        let radius = rng.random_range(4.0..9.0);
        let x = rng.random_range(-x_range..x_range);
        if x.abs() >= ROAD_HALF_WIDTH + radius + POND_CLEARANCE {
            let z = rng.random_range(z0..z0 + length);
            props.push(Prop::new(
                PropKind::Pond,
                Vec3::new(x, 0.01, z),
                Vec3::new(radius * 2.0, 0.02, radius * 2.0),
                0x0077b6,
            ));
        }
    }

    props
}

/// Whether a footprint of `half` extent at tile-local offset overlaps a cross road
fn on_tile_road(local_x: f32, local_z: f32, half: f32, clearance: f32) -> bool {
    let reach = TILE_ROAD_HALF_WIDTH + half + clearance;
    local_x.abs() < reach || local_z.abs() < reach
}

/// Build the content of one grid tile: two crossing roads plus scenery
pub fn generate_tile(tx: i32, tz: i32, size: f32, density: f32, rng: &mut Pcg32) -> Vec<Prop> {
    let center = Vec3::new((tx as f32 + 0.5) * size, 0.0, (tz as f32 + 0.5) * size);
    let half_tile = size * 0.5;
    let mut props = Vec::with_capacity(24);

    props.push(Prop::new(
        PropKind::Ground,
        center + Vec3::new(0.0, -0.05, 0.0),
        Vec3::new(size, 0.1, size),
        0x0b132b,
    ));
    props.push(Prop::new(
        PropKind::Road,
        center,
        Vec3::new(size, 0.02, TILE_ROAD_HALF_WIDTH * 2.0),
        0x1c1c24,
    ));
    props.push(Prop::new(
        PropKind::Road,
        center,
        Vec3::new(TILE_ROAD_HALF_WIDTH * 2.0, 0.02, size),
        0x1c1c24,
    ));
    props.push(Prop::new(
        PropKind::CenterLine,
        center + Vec3::new(0.0, 0.015, 0.0),
        Vec3::new(size, 0.01, 0.25),
        0xffd166,
    ));
    props.push(Prop::new(
        PropKind::CenterLine,
        center + Vec3::new(0.0, 0.015, 0.0),
        Vec3::new(0.25, 0.01, size),
        0xffd166,
    ));

    let inner = half_tile - ROAD_CLEARANCE;
    if inner <= TILE_ROAD_HALF_WIDTH {
        return props;
    }

    for _ in 0..scaled(4.0, density) {
        let footprint = Vec3::new(
            rng.random_range(6.0..12.0),
            rng.random_range(8.0..36.0),
            rng.random_range(6.0..12.0),
        );
        let half = footprint.x.max(footprint.z) * 0.5;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let lx = rng.random_range(-inner..inner);
            let lz = rng.random_range(-inner..inner);
            if on_tile_road(lx, lz, half, ROAD_CLEARANCE) {
                continue;
            }
            props.push(Prop::new(
                PropKind::Building,
                center + Vec3::new(lx, footprint.y * 0.5, lz),
                footprint,
                pick(rng, &BUILDING_TINTS),
            ));
            break;
        }
    }

    for _ in 0..scaled(8.0, density) {
        let radius = rng.random_range(0.8..1.6);
        let height = rng.random_range(4.0..8.0);
        for _ in 0..PLACEMENT_ATTEMPTS {
            let lx = rng.random_range(-inner..inner);
            let lz = rng.random_range(-inner..inner);
            if on_tile_road(lx, lz, radius, ROAD_CLEARANCE) {
                continue;
            }
            props.push(Prop::new(
                PropKind::Tree,
                center + Vec3::new(lx, 0.0, lz),
                Vec3::new(radius * 2.0, height, radius * 2.0),
                pick(rng, &TREE_TINTS),
            ));
            break;
        }
    }

    if rng.random_bool((0.25 * density as f64).clamp(0.0, 1.0)) {
        let radius = rng.random_range(3.0..7.0);
        let lx = rng.random_range(-inner..inner);
        let lz = rng.random_range(-inner..inner);
        if !on_tile_road(lx, lz, radius, POND_CLEARANCE) {
            props.push(Prop::new(
                PropKind::Pond,
                center + Vec3::new(lx, 0.01, lz),
                Vec3::new(radius * 2.0, 0.02, radius * 2.0),
                0x0077b6,
            ));
        }
    }

    props
}

/// Build the content for any region key
pub fn generate_region(key: RegionKey, extent: f32, density: f32, world_seed: u64) -> Vec<Prop> {
    let mut rng = region_rng(world_seed, key);
    match key {
        RegionKey::Chunk(k) => generate_chunk(k, extent, density, &mut rng),
        RegionKey::Tile(x, z) => generate_tile(x, z, extent, density, &mut rng),
    }
}
