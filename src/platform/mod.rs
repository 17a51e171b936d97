//! Platform abstraction layer
//!
//! The simulation talks to the outside world only through these traits:
//! - `SceneGraph` / `RenderService`: entity lifecycle and per-frame drawing
//! - `AudioService`: continuous engine state plus one-shot cues
//! - `ScoreStore`: the single persisted best score
//!
//! `headless` backs native runs and tests; `web` bridges to the page script.

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{HeadlessAudio, HeadlessScene};

use crate::sim::FrameView;
use crate::sim::terrain::Prop;

/// Opaque handle for an entity living in the render service's scene
pub type EntityId = u32;

/// Scene mutation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("Entity {0} has no disposable resources")]
    NothingToDispose(EntityId),

    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// Score persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Persistent storage unavailable")]
    Unavailable,

    #[error("Failed to encode or decode score: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage write rejected: {0}")]
    Write(String),
}

/// Entity lifecycle in the render service's scene
pub trait SceneGraph {
    /// Add an entity for a prop and return its handle
    fn spawn(&mut self, prop: &Prop) -> EntityId;

    /// Detach an entity from the scene. Its resources stay allocated until
    /// `dispose`; go through `release_entity` to do both.
    fn remove(&mut self, id: EntityId);

    /// Free GPU-side resources owned by an entity
    fn dispose(&mut self, id: EntityId) -> Result<(), SceneError>;
}

/// The full render collaborator: scene plus a per-frame draw
pub trait RenderService: SceneGraph {
    fn draw(&mut self, frame: &FrameView);
}

/// Discrete sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Collision,
    Pickup,
    NearMiss,
    /// UI click (start/restart)
    Click,
    /// Hard steering at speed
    Skid,
}

/// The audio collaborator
pub trait AudioService {
    /// Begin the engine loop (only after a user gesture in browsers)
    fn start(&mut self);

    fn stop(&mut self);

    /// Retune the continuous engine sound
    fn set_drive(&mut self, speed_fraction: f32, steer: f32);

    fn trigger(&mut self, cue: Cue);
}

/// The persisted best score
pub trait ScoreStore {
    fn load_best(&self) -> Result<u64, StoreError>;

    fn save_best(&mut self, score: u64) -> Result<(), StoreError>;
}

/// Release one entity, tolerating entities without disposable resources
pub fn release_entity<S: SceneGraph + ?Sized>(scene: &mut S, id: EntityId) {
    scene.remove(id);
    match scene.dispose(id) {
        Ok(()) => {}
        Err(SceneError::NothingToDispose(_)) => {
            log::trace!("Entity {} had nothing to dispose", id);
        }
        Err(e) => log::warn!("Dispose failed: {}", e),
    }
}
