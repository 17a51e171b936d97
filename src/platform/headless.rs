//! Headless collaborators
//!
//! Used by the native demo run and by tests: the scene tracks live entities
//! instead of drawing them, and the audio sink records what it was asked to do.

use std::collections::BTreeMap;

use super::{AudioService, Cue, EntityId, RenderService, SceneError, SceneGraph};
use crate::sim::FrameView;
use crate::sim::terrain::Prop;

/// In-memory scene with no GPU behind it
#[derive(Debug, Default)]
pub struct HeadlessScene {
    live: BTreeMap<EntityId, Prop>,
    /// Removed from the scene but not yet disposed
    detached: BTreeMap<EntityId, Prop>,
    next_id: EntityId,
    frames: u64,
    last_frame: Option<FrameView>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Entities that were removed without a matching dispose
    pub fn detached_count(&self) -> usize {
        self.detached.len()
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn prop(&self, id: EntityId) -> Option<&Prop> {
        self.live.get(&id)
    }

    /// Live props in spawn order
    pub fn props_snapshot(&self) -> Vec<Prop> {
        self.live.values().copied().collect()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameView> {
        self.last_frame.as_ref()
    }
}

impl SceneGraph for HeadlessScene {
    fn spawn(&mut self, prop: &Prop) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, *prop);
        id
    }

    fn remove(&mut self, id: EntityId) {
        log::trace!("remove entity {}", id);
        if let Some(prop) = self.live.remove(&id) {
            self.detached.insert(id, prop);
        }
    }

    fn dispose(&mut self, id: EntityId) -> Result<(), SceneError> {
        let prop = self
            .detached
            .remove(&id)
            .or_else(|| self.live.remove(&id))
            .ok_or(SceneError::UnknownEntity(id))?;
        if prop.kind.owns_resources() {
            Ok(())
        } else {
            Err(SceneError::NothingToDispose(id))
        }
    }
}

impl RenderService for HeadlessScene {
    fn draw(&mut self, frame: &FrameView) {
        self.frames += 1;
        self.last_frame = Some(frame.clone());
    }
}

/// Audio sink that remembers cues and the latest engine state
#[derive(Debug, Default)]
pub struct HeadlessAudio {
    pub running: bool,
    pub cues: Vec<Cue>,
    pub speed_fraction: f32,
    pub steer: f32,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.cues.iter().filter(|&&c| c == cue).count()
    }
}

impl AudioService for HeadlessAudio {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn set_drive(&mut self, speed_fraction: f32, steer: f32) {
        self.speed_fraction = speed_fraction;
        self.steer = steer;
    }

    fn trigger(&mut self, cue: Cue) {
        log::trace!("cue {:?}", cue);
        self.cues.push(cue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::release_entity;
    use crate::sim::terrain::PropKind;
    use glam::Vec3;

    #[test]
    fn test_release_tolerates_grouped_props() {
        let mut scene = HeadlessScene::new();
        let tree = scene.spawn(&Prop::new(PropKind::Tree, Vec3::ZERO, Vec3::ONE, 0));
        let road = scene.spawn(&Prop::new(PropKind::Road, Vec3::ZERO, Vec3::ONE, 0));
        assert_eq!(scene.live_count(), 2);

        assert_eq!(scene.dispose(tree), Err(SceneError::NothingToDispose(tree)));
        assert!(!scene.is_live(tree));

        release_entity(&mut scene, road);
        assert!(!scene.is_live(road));

        // A second release of an unknown id only logs
        release_entity(&mut scene, road);
        assert_eq!(scene.live_count(), 0);
        assert_eq!(scene.detached_count(), 0);
    }

    #[test]
    fn test_remove_without_dispose_is_visible() {
        let mut scene = HeadlessScene::new();
        let pond = scene.spawn(&Prop::new(PropKind::Pond, Vec3::ZERO, Vec3::ONE, 0));

        scene.remove(pond);
        assert!(!scene.is_live(pond));
        assert_eq!(scene.live_count(), 0);
        assert_eq!(scene.detached_count(), 1);

        assert_eq!(scene.dispose(pond), Ok(()));
        assert_eq!(scene.detached_count(), 0);
    }

    #[test]
    fn test_audio_records_cues() {
        let mut audio = HeadlessAudio::new();
        audio.start();
        audio.trigger(Cue::NearMiss);
        audio.trigger(Cue::NearMiss);
        audio.set_drive(0.5, -0.2);
        assert!(audio.running);
        assert_eq!(audio.count(Cue::NearMiss), 2);
        assert_eq!(audio.speed_fraction, 0.5);
    }
}
