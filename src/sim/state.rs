//! Game state and core simulation types
//!
//! Everything the session mutates per frame lives here; the render service
//! only ever sees entity handles and derived views.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::vehicle::Vehicle;
use crate::format_distance;
use crate::platform::EntityId;
use crate::tuning::{Tuning, Variant};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, camera flythrough, no scoring
    Menu,
    /// Full simulation
    Playing,
    /// Crashed; simulation frozen until the results are revealed
    GameOver,
    /// Results screen visible, waiting for restart
    Results,
}

/// Hazard types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardKind {
    Obstacle,
    /// Boost pad
    Pad,
}

/// An obstacle or pad on the road, linked to its scene entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: EntityId,
    pub kind: HazardKind,
    pub position: Vec3,
    pub lane: usize,
    /// Inactive hazards can no longer trigger anything
    pub active: bool,
}

/// Things that happened during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Started,
    Restarted,
    NearMiss { points: u64, multiplier: u32 },
    Pickup,
    Collision,
    Skid,
    GameOver { score: u64, new_record: bool },
    ResultsRevealed,
}

/// What the presentation surface shows this frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HudView {
    pub score_text: String,
    pub speed_text: String,
    /// Only while a combo of 2+ is running
    pub combo_text: Option<String>,
    pub best_text: String,
    /// Steering indicator in [-1, 1]
    pub steer: f32,
    pub show_start: bool,
    pub show_game_over: bool,
    pub show_results: bool,
    pub new_record: bool,
}

/// Complete session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub variant: Variant,
    pub phase: GamePhase,
    pub vehicle: Vehicle,
    /// Live hazards in spawn order
    pub hazards: Vec<Hazard>,
    /// Near-miss points on top of distance
    pub bonus: u64,
    pub combo: u32,
    /// Seconds until the combo lapses
    pub combo_timer: f32,
    /// Seconds of boost left
    pub boost_timer: f32,
    pub best_score: u64,
    /// This run beat the stored best
    pub new_record: bool,
    /// Seconds until the results screen is revealed
    pub reveal_timer: f32,
    /// Steer applied this frame
    pub steer: f32,
    /// Seconds since the session started
    pub time: f32,
    /// Events raised during the current frame
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(variant: Variant, base_speed: f32, best_score: u64) -> Self {
        Self {
            variant,
            phase: GamePhase::Menu,
            vehicle: Vehicle::new(base_speed),
            hazards: Vec::new(),
            bonus: 0,
            combo: 0,
            combo_timer: 0.0,
            boost_timer: 0.0,
            best_score,
            new_record: false,
            reveal_timer: 0.0,
            steer: 0.0,
            time: 0.0,
            events: Vec::new(),
        }
    }

    /// Distance points plus near-miss bonus
    pub fn score(&self) -> u64 {
        self.vehicle.distance.max(0.0).floor() as u64 + self.bonus
    }

    pub fn is_boosted(&self) -> bool {
        self.boost_timer > 0.0
    }

    /// Clear everything belonging to the current run. Hazard entities must
    /// already have been released from the scene.
    pub fn reset_run(&mut self, base_speed: f32) {
        self.vehicle.reset(base_speed);
        self.hazards.clear();
        self.bonus = 0;
        self.combo = 0;
        self.combo_timer = 0.0;
        self.boost_timer = 0.0;
        self.new_record = false;
        self.reveal_timer = 0.0;
        self.steer = 0.0;
    }

    /// Score a near miss: the multiplier is the combo length including this one
    pub fn register_near_miss(&mut self, base_points: u64, window: f32) -> GameEvent {
        self.combo += 1;
        self.combo_timer = window;
        let points = base_points * u64::from(self.combo);
        self.bonus += points;
        GameEvent::NearMiss {
            points,
            multiplier: self.combo,
        }
    }

    /// Decay the combo and boost timers
    pub fn tick_timers(&mut self, dt: f32) {
        if self.combo_timer > 0.0 {
            self.combo_timer -= dt;
            if self.combo_timer <= 0.0 {
                self.combo_timer = 0.0;
                self.combo = 0;
            }
        }
        self.boost_timer = (self.boost_timer - dt).max(0.0);
    }

    /// Fold the current score into the best score. Returns true on a new record.
    pub fn record_best(&mut self) -> bool {
        let score = self.score();
        if score > self.best_score {
            self.best_score = score;
            self.new_record = true;
        }
        self.new_record
    }

    pub fn hud(&self, tuning: &Tuning) -> HudView {
        let score_text = match self.variant {
            Variant::Runner => self.score().to_string(),
            Variant::Cruiser | Variant::Explorer => format_distance(self.vehicle.distance),
        };
        let kmh = (self.vehicle.speed.clamp(0.0, tuning.max_speed) * 3.6).round() as u32;
        let combo_text = (self.combo > 1).then(|| format!("x{} COMBO", self.combo));

        HudView {
            score_text,
            speed_text: format!("{} km/h", kmh),
            combo_text,
            best_text: self.best_score.to_string(),
            steer: self.steer,
            show_start: self.phase == GamePhase::Menu,
            show_game_over: matches!(self.phase, GamePhase::GameOver | GamePhase::Results),
            show_results: self.phase == GamePhase::Results,
            new_record: self.new_record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_multiplier_sequence() {
        let mut state = GameState::new(Variant::Runner, 20.0, 0);
        let mut points = Vec::new();
        for _ in 0..3 {
            if let GameEvent::NearMiss { points: p, multiplier } = state.register_near_miss(50, 2.0) {
                points.push((multiplier, p));
            }
            state.tick_timers(0.5);
        }
        assert_eq!(points, vec![(1, 50), (2, 100), (3, 150)]);
        assert_eq!(state.bonus, 300);
    }

    #[test]
    fn test_combo_lapses_after_window() {
        let mut state = GameState::new(Variant::Runner, 20.0, 0);
        state.register_near_miss(50, 2.0);
        state.register_near_miss(50, 2.0);
        state.tick_timers(1.9);
        assert_eq!(state.combo, 2);
        state.tick_timers(0.2);
        assert_eq!(state.combo, 0);
        assert_eq!(state.combo_timer, 0.0);

        // A lapsed combo starts over at x1
        assert_eq!(
            state.register_near_miss(50, 2.0),
            GameEvent::NearMiss {
                points: 50,
                multiplier: 1
            }
        );
    }

    #[test]
    fn test_best_score_is_monotonic() {
        let mut state = GameState::new(Variant::Runner, 20.0, 500);
        state.vehicle.distance = 120.0;
        assert!(!state.record_best());
        assert_eq!(state.best_score, 500);

        state.bonus = 450;
        assert!(state.record_best());
        assert_eq!(state.best_score, 570);
    }

    #[test]
    fn test_hud_texts() {
        let tuning = Tuning::runner();
        let mut state = GameState::new(Variant::Runner, 20.0, 0);
        state.vehicle.distance = 42.7;
        state.bonus = 100;
        let hud = state.hud(&tuning);
        assert_eq!(hud.score_text, "142");
        assert_eq!(hud.speed_text, "72 km/h");
        assert_eq!(hud.combo_text, None);
        assert!(hud.show_start);

        state.combo = 3;
        state.phase = GamePhase::Results;
        let hud = state.hud(&tuning);
        assert_eq!(hud.combo_text.as_deref(), Some("x3 COMBO"));
        assert!(hud.show_game_over && hud.show_results && !hud.show_start);

        let mut free = GameState::new(Variant::Explorer, 6.0, 0);
        free.vehicle.distance = 2500.0;
        assert_eq!(free.hud(&Tuning::explorer()).score_text, "2.50 km");
    }
}
