//! Frame-driven simulation module
//!
//! All gameplay logic lives here. Rules for this module:
//! - Delta time is clamped before anything integrates it
//! - Seeded RNG only (world seed, region seed, run seed)
//! - Stable iteration order (`BTreeMap` keys, hazard spawn order)
//! - Rendering, audio and storage only through the `platform` traits

pub mod camera;
pub mod clock;
pub mod collision;
pub mod input;
pub mod session;
pub mod spawner;
pub mod state;
pub mod terrain;
pub mod vehicle;
pub mod world;

pub use camera::{CameraFrame, CameraRig};
pub use clock::FrameClock;
pub use collision::{Contact, Zone, classify, detect};
pub use input::{InputNormalizer, Key, RawInput, SteerControl, TickInput};
pub use session::{FrameView, Session, VehiclePose};
pub use spawner::Spawner;
pub use state::{GameEvent, GamePhase, GameState, Hazard, HazardKind, HudView};
pub use vehicle::{Vehicle, clamp_dt};
pub use world::{RegionKey, StreamStats, WorldStreamer};
