//! The per-frame orchestrator
//!
//! A `Session` owns the game state, the world streamer, the spawner, the
//! camera rig and the input normalizer, plus the three collaborators it
//! talks to. One call to `frame()` runs the whole update in a fixed order:
//! input, vehicle, streaming, hazards, contacts, timers, camera, audio, draw.

use glam::Vec3;

use super::camera::{CameraFrame, CameraRig};
use super::collision::{Contact, detect};
use super::input::{InputNormalizer, RawInput, SteerControl};
use super::spawner::Spawner;
use super::state::{GameEvent, GamePhase, GameState, Hazard, HazardKind, HudView};
use super::terrain::Prop;
use super::vehicle::clamp_dt;
use super::world::WorldStreamer;
use crate::consts::REVEAL_DELAY;
use crate::platform::{
    AudioService, Cue, EntityId, RenderService, SceneGraph, ScoreStore, release_entity,
};
use crate::speed_fraction;
use crate::tuning::{HazardTuning, Tuning};

/// Steer magnitude that counts as a hard turn
const SKID_STEER: f32 = 0.8;
/// Minimum speed fraction for a hard turn to skid
const SKID_SPEED: f32 = 0.5;

/// Vehicle transform for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehiclePose {
    pub position: Vec3,
    pub heading: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Everything drawn in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub phase: GamePhase,
    pub camera: CameraFrame,
    pub vehicle: VehiclePose,
    pub boosted: bool,
    /// Session time in seconds, for shader animation
    pub time: f32,
    pub hud: HudView,
}

/// Seed for the spawner on a given run
fn run_seed(world_seed: u64, run: u32) -> u64 {
    world_seed ^ u64::from(run).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct Session<R: RenderService, A: AudioService, P: ScoreStore> {
    tuning: Tuning,
    state: GameState,
    streamer: WorldStreamer,
    spawner: Option<Spawner>,
    camera: CameraRig,
    input: InputNormalizer,
    render: R,
    audio: A,
    store: P,
    seed: u64,
    run: u32,
    skidding: bool,
}

impl<R: RenderService, A: AudioService, P: ScoreStore> Session<R, A, P> {
    /// Build a session and generate the starting regions. Free-drive
    /// variants begin playing immediately; the runner waits on the menu.
    pub fn new(tuning: Tuning, seed: u64, render: R, audio: A, store: P) -> Self {
        let best = match store.load_best() {
            Ok(best) => best,
            Err(e) => {
                log::warn!("Best score unavailable: {}", e);
                0
            }
        };

        let state = GameState::new(tuning.variant, tuning.base_speed, best);
        let camera = CameraRig::new(&state.vehicle, &tuning.camera);
        let spawner = tuning.hazards.map(|h| Spawner::new(run_seed(seed, 0), &h));

        let mut session = Self {
            streamer: WorldStreamer::new(tuning.streaming, tuning.prop_density, seed),
            state,
            spawner,
            camera,
            input: InputNormalizer::new(SteerControl::Surface { width: 1.0 }),
            render,
            audio,
            store,
            seed,
            run: 0,
            skidding: false,
            tuning,
        };

        let stats = session
            .streamer
            .ensure_coverage(session.state.vehicle.position, &mut session.render);
        log::info!(
            "{} session ready: {} regions, best {}",
            session.tuning.variant.as_str(),
            stats.created,
            best
        );

        if !session.tuning.variant.has_failure() {
            session.state.phase = GamePhase::Playing;
        }
        session
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Events raised by the most recent frame
    pub fn events(&self) -> &[GameEvent] {
        &self.state.events
    }

    pub fn streamer(&self) -> &WorldStreamer {
        &self.streamer
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn input_mut(&mut self) -> &mut InputNormalizer {
        &mut self.input
    }

    /// Queue a raw input event for the next frame
    pub fn handle_input(&mut self, event: RawInput) {
        self.input.handle(event);
    }

    /// Put a hazard on the road outside the regular spawn pattern
    pub fn place_hazard(&mut self, kind: HazardKind, position: Vec3) -> EntityId {
        let prop = match kind {
            HazardKind::Obstacle => Prop::obstacle(position),
            HazardKind::Pad => Prop::boost_pad(position),
        };
        let id = self.render.spawn(&prop);
        let lane = crate::consts::LANES
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - position.x).abs().total_cmp(&(b.1 - position.x).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.state.hazards.push(Hazard {
            id,
            kind,
            position,
            lane,
            active: true,
        });
        id
    }

    /// Leave the menu
    pub fn start(&mut self) {
        if self.state.phase != GamePhase::Menu {
            return;
        }
        self.audio.start();
        self.camera.snap(&self.state.vehicle, &self.tuning.camera);
        self.state.phase = GamePhase::Playing;
        self.state.events.push(GameEvent::Started);
        log::info!("Run started");
    }

    /// Tear the run down and start over from the start line
    pub fn restart(&mut self) {
        for hazard in self.state.hazards.drain(..) {
            release_entity(&mut self.render, hazard.id);
        }
        self.streamer.reset(&mut self.render);
        self.state.reset_run(self.tuning.base_speed);

        self.run += 1;
        if let (Some(spawner), Some(hazards)) = (self.spawner.as_mut(), self.tuning.hazards) {
            spawner.reset(run_seed(self.seed, self.run), &hazards);
        }

        self.streamer
            .ensure_coverage(self.state.vehicle.position, &mut self.render);
        self.camera.snap(&self.state.vehicle, &self.tuning.camera);
        self.skidding = false;

        self.audio.start();
        self.state.phase = GamePhase::Playing;
        self.state.events.push(GameEvent::Restarted);
        log::info!("Run {} started", self.run + 1);
    }

    /// Advance one display frame
    pub fn frame(&mut self, raw_dt: f32) -> FrameView {
        let dt = clamp_dt(raw_dt);
        self.state.events.clear();

        let input = self.input.poll();
        if input.action {
            match self.state.phase {
                GamePhase::Menu => self.start(),
                GamePhase::GameOver | GamePhase::Results => self.restart(),
                GamePhase::Playing => {}
            }
        }

        match self.state.phase {
            GamePhase::Playing => self.step_playing(input.steer, dt),
            GamePhase::Menu => {
                // Keep the world around the idle car for the flythrough
                self.streamer
                    .ensure_coverage(self.state.vehicle.position, &mut self.render);
            }
            GamePhase::GameOver => {
                self.state.reveal_timer -= dt;
                if self.state.reveal_timer <= 0.0 {
                    self.state.reveal_timer = 0.0;
                    self.state.phase = GamePhase::Results;
                    self.state.events.push(GameEvent::ResultsRevealed);
                }
            }
            GamePhase::Results => {}
        }
        self.state.time += dt;

        let camera = match self.state.phase {
            GamePhase::Menu => {
                self.camera
                    .flythrough(self.state.vehicle.position, &self.tuning.camera, dt)
            }
            _ => self.camera.follow(
                &self.state.vehicle,
                self.tuning.max_speed,
                &self.tuning.camera,
                dt,
            ),
        };

        self.update_audio();

        let vehicle = &self.state.vehicle;
        let view = FrameView {
            phase: self.state.phase,
            camera,
            vehicle: VehiclePose {
                position: vehicle.position,
                heading: vehicle.heading,
                roll: vehicle.roll,
                yaw: vehicle.yaw,
            },
            boosted: self.state.is_boosted(),
            time: self.state.time,
            hud: self.state.hud(&self.tuning),
        };
        self.render.draw(&view);
        view
    }

    fn step_playing(&mut self, steer: f32, dt: f32) {
        let boost = match self.tuning.hazards {
            Some(h) if self.state.is_boosted() => h.boost_rate_multiplier,
            _ => 1.0,
        };
        self.state.steer = steer;
        self.state.vehicle.advance(steer, dt, &self.tuning, boost);

        let position = self.state.vehicle.position;
        self.streamer.ensure_coverage(position, &mut self.render);

        if let Some(hazards) = self.tuning.hazards {
            if let Some(spawner) = self.spawner.as_mut() {
                spawner.fill(position.z, &mut self.state.hazards, &hazards, &mut self.render);
                spawner.cull(position.z, &mut self.state.hazards, &hazards, &mut self.render);
            }

            for contact in detect(position, &self.state.hazards, &hazards) {
                self.apply_contact(contact, &hazards);
                if self.state.phase != GamePhase::Playing {
                    break;
                }
            }
        }

        self.state.tick_timers(dt);

        let s = speed_fraction(self.state.vehicle.speed, self.tuning.max_speed);
        let hard = steer.abs() >= SKID_STEER && s >= SKID_SPEED;
        if hard && !self.skidding {
            self.state.events.push(GameEvent::Skid);
        }
        self.skidding = hard;
    }

    fn apply_contact(&mut self, contact: Contact, tuning: &HazardTuning) {
        match contact {
            Contact::Collision { .. } => self.end_run(),
            Contact::NearMiss { id } => {
                if let Some(hazard) = self.state.hazards.iter_mut().find(|h| h.id == id) {
                    hazard.active = false;
                }
                let event = self
                    .state
                    .register_near_miss(tuning.base_points, tuning.combo_window);
                self.state.events.push(event);
            }
            Contact::Pickup { id } => {
                if let Some(index) = self.state.hazards.iter().position(|h| h.id == id) {
                    let pad = self.state.hazards.remove(index);
                    release_entity(&mut self.render, pad.id);
                }
                self.state.boost_timer = tuning.boost_duration;
                self.state.events.push(GameEvent::Pickup);
            }
        }
    }

    fn end_run(&mut self) {
        self.state.phase = GamePhase::GameOver;
        self.state.reveal_timer = REVEAL_DELAY;
        self.state.events.push(GameEvent::Collision);
        self.camera.kick(self.tuning.camera.shake_kick);
        self.audio.stop();

        let score = self.state.score();
        let new_record = self.state.record_best();
        if new_record {
            match self.store.save_best(self.state.best_score) {
                Ok(()) => log::info!("New best score: {}", score),
                Err(e) => log::warn!("Failed to save best score: {}", e),
            }
        }
        self.state.events.push(GameEvent::GameOver { score, new_record });
        log::info!("Game over: score {}", score);
    }

    fn update_audio(&mut self) {
        if self.state.phase == GamePhase::Playing {
            let s = speed_fraction(self.state.vehicle.speed, self.tuning.max_speed);
            self.audio.set_drive(s, self.state.steer);
        } else {
            self.audio.set_drive(0.0, 0.0);
        }

        for event in &self.state.events {
            let cue = match event {
                GameEvent::Started | GameEvent::Restarted => Cue::Click,
                GameEvent::NearMiss { .. } => Cue::NearMiss,
                GameEvent::Pickup => Cue::Pickup,
                GameEvent::Collision => Cue::Collision,
                GameEvent::Skid => Cue::Skid,
                GameEvent::GameOver { .. } | GameEvent::ResultsRevealed => continue,
            };
            self.audio.trigger(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::best_score::MemoryStore;
    use crate::platform::{HeadlessAudio, HeadlessScene};
    use crate::sim::world::RegionKey;

    const DT: f32 = 1.0 / 60.0;

    type TestSession = Session<HeadlessScene, HeadlessAudio, MemoryStore>;

    fn session(tuning: Tuning) -> TestSession {
        Session::new(
            tuning,
            42,
            HeadlessScene::new(),
            HeadlessAudio::new(),
            MemoryStore::new(),
        )
    }

    /// Runner tuning with the regular spawn pattern pushed out of reach
    fn quiet_runner() -> Tuning {
        let mut tuning = Tuning::runner();
        if let Some(h) = tuning.hazards.as_mut() {
            h.first_gap = 10_000.0;
        }
        tuning
    }

    fn run_for(session: &mut TestSession, seconds: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let frames = (seconds / DT).round() as usize;
        for _ in 0..frames {
            session.frame(DT);
            events.extend_from_slice(session.events());
        }
        events
    }

    /// Drive until the run ends, returning the events up to the crash
    fn run_until_crash(session: &mut TestSession) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..600 {
            session.frame(DT);
            events.extend_from_slice(session.events());
            if session.phase() == GamePhase::GameOver {
                return events;
            }
        }
        panic!("no collision");
    }

    fn start(session: &mut TestSession) {
        session.handle_input(RawInput::Action);
        session.frame(DT);
        assert_eq!(session.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_menu_idles_without_scoring() {
        let mut s = session(Tuning::runner());
        let regions = s.streamer().len();
        let first = s.frame(DT);
        run_for(&mut s, 1.0);
        let later = s.render().last_frame().cloned().unwrap();

        assert_eq!(s.phase(), GamePhase::Menu);
        assert_eq!(s.state().vehicle.position, Vec3::ZERO);
        assert_eq!(s.state().score(), 0);
        assert_eq!(s.streamer().len(), regions);
        assert!(later.hud.show_start);
        // Flythrough moves
        assert_ne!(first.camera.eye, later.camera.eye);
        assert_eq!(s.render().frames_drawn(), 61);
    }

    #[test]
    fn test_combo_scoring() {
        let mut s = session(quiet_runner());
        start(&mut s);
        s.place_hazard(HazardKind::Obstacle, Vec3::new(2.0, 0.0, -20.0));
        s.place_hazard(HazardKind::Obstacle, Vec3::new(2.0, 0.0, -45.0));
        s.place_hazard(HazardKind::Obstacle, Vec3::new(2.0, 0.0, -70.0));

        let events = run_for(&mut s, 4.0);
        let misses: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::NearMiss { points, multiplier } => Some((*multiplier, *points)),
                _ => None,
            })
            .collect();

        assert_eq!(misses, vec![(1, 50), (2, 100), (3, 150)]);
        assert_eq!(s.state().bonus, 300);
        assert_eq!(s.phase(), GamePhase::Playing);
        assert!(s.state().hazards.iter().all(|h| !h.active));
        assert_eq!(s.audio().count(Cue::NearMiss), 3);
    }

    #[test]
    fn test_pad_boosts_and_is_removed() {
        let mut s = session(quiet_runner());
        start(&mut s);
        let pad = s.place_hazard(HazardKind::Pad, Vec3::new(0.0, 0.0, -10.0));

        let events = run_for(&mut s, 1.0);
        assert!(events.contains(&GameEvent::Pickup));
        assert!(s.state().is_boosted());
        assert!(s.state().hazards.is_empty());
        assert!(!s.render().is_live(pad));
        assert_eq!(s.audio().count(Cue::Pickup), 1);
    }

    #[test]
    fn test_collision_reveal_and_best_score() {
        let mut s = session(quiet_runner());
        start(&mut s);
        s.place_hazard(HazardKind::Obstacle, Vec3::new(0.0, 0.0, -10.0));

        let events = run_until_crash(&mut s);
        assert!(events.contains(&GameEvent::Collision));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::NearMiss { .. })));
        assert!(s.camera.shake() > 0.0);
        assert!(!s.audio().running);
        assert_eq!(s.audio().count(Cue::Collision), 1);

        let score = s.state().score();
        assert!(score > 0);
        assert!(events.contains(&GameEvent::GameOver {
            score,
            new_record: true
        }));
        assert_eq!(s.store().load_best().unwrap(), score);
        assert_eq!(s.store().writes(), 1);

        // Frozen while waiting for the reveal
        let frozen = s.state().vehicle.position;
        let events = run_for(&mut s, 1.0);
        assert_eq!(s.state().vehicle.position, frozen);
        assert!(!events.contains(&GameEvent::ResultsRevealed));
        assert_eq!(s.phase(), GamePhase::GameOver);

        let events = run_for(&mut s, 0.5);
        assert!(events.contains(&GameEvent::ResultsRevealed));
        assert_eq!(s.phase(), GamePhase::Results);
        assert!(s.render().last_frame().unwrap().hud.show_results);
    }

    #[test]
    fn test_restart_before_reveal_cancels_it() {
        let mut s = session(quiet_runner());
        start(&mut s);
        s.place_hazard(HazardKind::Obstacle, Vec3::new(0.0, 0.0, -10.0));
        run_until_crash(&mut s);
        run_for(&mut s, 0.5);

        s.handle_input(RawInput::Action);
        let events = run_for(&mut s, 3.0);
        assert!(events.contains(&GameEvent::Restarted));
        assert!(!events.contains(&GameEvent::ResultsRevealed));
        assert_eq!(s.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_restart_regenerates_start() {
        let mut s = session(Tuning::runner());
        let initial_keys: Vec<RegionKey> = s.streamer().keys().collect();
        let initial_live = s.render().live_count();

        start(&mut s);
        run_for(&mut s, 20.0);
        s.restart();

        let state = s.state();
        assert_eq!(state.vehicle.position, Vec3::ZERO);
        assert_eq!(state.vehicle.speed, s.tuning().base_speed);
        assert_eq!(state.bonus, 0);
        assert_eq!(state.combo, 0);
        assert_eq!(state.boost_timer, 0.0);
        assert!(state.hazards.is_empty());
        assert_eq!(s.streamer().keys().collect::<Vec<_>>(), initial_keys);
        // No hazard entities left behind
        assert_eq!(s.render().live_count(), initial_live);
    }

    #[test]
    fn test_free_drive_starts_playing_and_never_fails() {
        for tuning in [Tuning::cruiser(), Tuning::explorer()] {
            let mut s = session(tuning);
            assert_eq!(s.phase(), GamePhase::Playing);

            s.handle_input(crate::sim::input::RawInput::KeyDown(
                crate::sim::input::Key::Right,
            ));
            run_for(&mut s, 10.0);

            assert_eq!(s.phase(), GamePhase::Playing);
            assert!(s.state().hazards.is_empty());
            assert!(s.state().vehicle.distance > 0.0);
            let hud = &s.render().last_frame().unwrap().hud;
            assert!(hud.score_text.ends_with(" m") || hud.score_text.ends_with(" km"));
            assert!(!hud.show_start);
        }
    }

    #[test]
    fn test_stalled_frame_is_clamped() {
        let mut stalled = session(quiet_runner());
        let mut capped = session(quiet_runner());
        stalled.handle_input(RawInput::Action);
        capped.handle_input(RawInput::Action);
        stalled.frame(2.0);
        capped.frame(crate::consts::MAX_FRAME_DT);
        assert_eq!(stalled.state().vehicle.position, capped.state().vehicle.position);
    }

    #[test]
    fn test_hard_turn_skids_once() {
        let mut tuning = Tuning::cruiser();
        tuning.base_speed = tuning.max_speed * 0.8;
        let mut s = session(tuning);
        s.handle_input(RawInput::KeyDown(crate::sim::input::Key::Left));
        let events = run_for(&mut s, 1.0);
        assert_eq!(events.iter().filter(|e| **e == GameEvent::Skid).count(), 1);
        assert_eq!(s.audio().count(Cue::Skid), 1);
        assert!(s.audio().steer < 0.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let drive = || {
            let mut s = session(Tuning::runner());
            start(&mut s);
            for i in 0..600 {
                let steer_key = if (i / 90) % 2 == 0 {
                    crate::sim::input::Key::Left
                } else {
                    crate::sim::input::Key::Right
                };
                s.handle_input(RawInput::KeyDown(steer_key));
                s.frame(DT);
                s.handle_input(RawInput::KeyUp(steer_key));
            }
            (s.state().score(), s.phase(), s.state().vehicle.position)
        };
        assert_eq!(drive(), drive());
    }
}
