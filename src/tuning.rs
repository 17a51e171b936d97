//! Data-driven game balance
//!
//! One preset per variant. Presets can be overridden from JSON; every loaded
//! tuning is validated before a session uses it.

use serde::{Deserialize, Serialize};

use crate::sim::terrain::MIN_TILE_SIZE;

/// Which flavor of the game is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Variant {
    /// Lane-based endless runner with obstacles, pads and a failure state
    #[default]
    Runner,
    /// Open-road free drive along the chunked highway
    Cruiser,
    /// Free-heading drive over a streamed tile grid
    Explorer,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Runner => "Runner",
            Variant::Cruiser => "Cruiser",
            Variant::Explorer => "Explorer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "runner" | "endless" => Some(Variant::Runner),
            "cruiser" | "cruise" => Some(Variant::Cruiser),
            "explorer" | "explore" | "open" => Some(Variant::Explorer),
            _ => None,
        }
    }

    /// Whether a collision can end the run
    pub fn has_failure(&self) -> bool {
        matches!(self, Variant::Runner)
    }
}

/// How speed converges toward its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeedPolicy {
    /// Constant acceleration, clamped at max speed
    Linear { accel: f32 },
    /// Exponential approach toward `max * (target_fraction - drag * |steer|)`
    Smoothed {
        rate: f32,
        target_fraction: f32,
        drag: f32,
    },
}

/// Hard limit on where a free-heading vehicle may go
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    Square { half_extent: f32 },
    Radius { radius: f32 },
}

/// How steering input moves the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SteeringMode {
    /// Fixed heading; steer slides the car across the road
    LaneOffset { lateral_speed: f32, limit: f32 },
    /// Steer turns the car; it drives along its heading
    FreeHeading { turn_rate: f32, boundary: Boundary },
}

/// Region addressing for the world streamer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StreamLayout {
    /// Chunks along the Z travel axis; radii are world distances
    Chunks {
        length: f32,
        visible: f32,
        retention: f32,
    },
    /// Square tiles on the XZ plane; radii are in tiles
    Tiles {
        size: f32,
        visible: i32,
        retention: i32,
    },
}

/// Obstacle, pad and scoring balance (Runner only)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardTuning {
    /// Lateral half-extent of the fatal zone
    pub collision_lateral: f32,
    /// Lateral half-extent of the near-miss zone
    pub near_miss_lateral: f32,
    /// Longitudinal half-extent shared by both zones
    pub contact_depth: f32,
    /// Pickup distance for boost pads (both axes)
    pub pad_radius: f32,
    /// Points for the first near miss of a combo
    pub base_points: u64,
    /// Seconds a combo survives without another near miss
    pub combo_window: f32,
    /// Seconds a boost pad keeps the boost active
    pub boost_duration: f32,
    /// Speed approach multiplier while boosted
    pub boost_rate_multiplier: f32,
    /// How far ahead of the car rows are spawned
    pub spawn_ahead: f32,
    /// Empty road in front of the start line
    pub first_gap: f32,
    /// Row spacing at the start of a run
    pub interval_start: f32,
    /// Row spacing floor
    pub interval_min: f32,
    /// Spacing lost per unit of distance driven
    pub interval_decay: f32,
    /// Random spacing variation, as a fraction of the interval
    pub interval_jitter: f32,
    /// Hazards further than this behind the car are removed
    pub despawn_behind: f32,
    /// Chance that a row also carries a boost pad
    pub pad_chance: f64,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            collision_lateral: 1.3,
            near_miss_lateral: 2.8,
            contact_depth: 2.0,
            pad_radius: 2.0,
            base_points: 50,
            combo_window: 2.0,
            boost_duration: 3.0,
            boost_rate_multiplier: 3.0,
            spawn_ahead: 160.0,
            first_gap: 60.0,
            interval_start: 28.0,
            interval_min: 10.0,
            interval_decay: 0.004,
            interval_jitter: 0.2,
            despawn_behind: 20.0,
            pad_chance: 0.2,
        }
    }
}

/// Camera framing and post-processing curves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTuning {
    pub behind: f32,
    pub height: f32,
    /// Fraction of the remaining gap closed each frame
    pub smoothing: f32,
    pub look_ahead: f32,
    pub look_ahead_gain: f32,
    pub fov_base: f32,
    pub fov_gain: f32,
    pub bloom_base: f32,
    pub bloom_gain: f32,
    pub blur_gain: f32,
    /// Shake magnitude applied on a collision
    pub shake_kick: f32,
    /// Per-frame shake multiplier
    pub shake_decay: f32,
    /// Menu flythrough orbit radius and angular speed
    pub orbit_radius: f32,
    pub orbit_speed: f32,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            behind: 8.0,
            height: 3.5,
            smoothing: 0.1,
            look_ahead: 6.0,
            look_ahead_gain: 10.0,
            fov_base: 60.0,
            fov_gain: 25.0,
            bloom_base: 0.4,
            bloom_gain: 1.0,
            blur_gain: 0.6,
            shake_kick: 0.8,
            shake_decay: 0.9,
            orbit_radius: 14.0,
            orbit_speed: 0.25,
        }
    }
}

/// Complete balance for one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub variant: Variant,
    pub base_speed: f32,
    pub max_speed: f32,
    pub speed: SpeedPolicy,
    pub steering: SteeringMode,
    pub streaming: StreamLayout,
    /// Decoration density multiplier for region generation
    pub prop_density: f32,
    pub hazards: Option<HazardTuning>,
    pub camera: CameraTuning,
}

/// Rejected tuning values
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("Failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Speed range is empty: base {base} > max {max}")]
    SpeedRange { base: f32, max: f32 },

    #[error("Retention radius must not be smaller than the visible radius")]
    Retention,

    #[error("Collision zone must sit inside the near-miss zone")]
    HazardZones,

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("Tile size {0} leaves no room beside the cross roads (minimum {min})", min = MIN_TILE_SIZE)]
    TileTooSmall(f32),
}

fn positive(value: f32, name: &'static str) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TuningError::NonPositive(name))
    }
}

impl Tuning {
    pub fn runner() -> Self {
        Self {
            variant: Variant::Runner,
            base_speed: 20.0,
            max_speed: 60.0,
            speed: SpeedPolicy::Linear { accel: 0.8 },
            steering: SteeringMode::LaneOffset {
                lateral_speed: 9.0,
                limit: 4.5,
            },
            streaming: StreamLayout::Chunks {
                length: 40.0,
                visible: 200.0,
                retention: 280.0,
            },
            prop_density: 1.0,
            hazards: Some(HazardTuning::default()),
            camera: CameraTuning::default(),
        }
    }

    pub fn cruiser() -> Self {
        Self {
            variant: Variant::Cruiser,
            base_speed: 12.0,
            max_speed: 45.0,
            speed: SpeedPolicy::Smoothed {
                rate: 0.6,
                target_fraction: 0.85,
                drag: 0.15,
            },
            steering: SteeringMode::LaneOffset {
                lateral_speed: 7.0,
                limit: 5.0,
            },
            streaming: StreamLayout::Chunks {
                length: 40.0,
                visible: 200.0,
                retention: 280.0,
            },
            prop_density: 1.2,
            hazards: None,
            camera: CameraTuning {
                fov_gain: 18.0,
                blur_gain: 0.35,
                ..CameraTuning::default()
            },
        }
    }

    pub fn explorer() -> Self {
        Self {
            variant: Variant::Explorer,
            base_speed: 6.0,
            max_speed: 40.0,
            speed: SpeedPolicy::Smoothed {
                rate: 0.8,
                target_fraction: 0.9,
                drag: 0.2,
            },
            steering: SteeringMode::FreeHeading {
                turn_rate: 1.6,
                boundary: Boundary::Square { half_extent: 1500.0 },
            },
            streaming: StreamLayout::Tiles {
                size: 60.0,
                visible: 2,
                retention: 3,
            },
            prop_density: 1.0,
            hazards: None,
            camera: CameraTuning {
                behind: 10.0,
                height: 4.5,
                fov_gain: 15.0,
                blur_gain: 0.3,
                ..CameraTuning::default()
            },
        }
    }

    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Runner => Self::runner(),
            Variant::Cruiser => Self::cruiser(),
            Variant::Explorer => Self::explorer(),
        }
    }

    /// Parse and validate a JSON tuning override
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.base_speed < 0.0 || self.base_speed > self.max_speed {
            return Err(TuningError::SpeedRange {
                base: self.base_speed,
                max: self.max_speed,
            });
        }
        if self.max_speed <= 0.0 {
            return Err(TuningError::NonPositive("max_speed"));
        }

        match self.steering {
            SteeringMode::LaneOffset {
                lateral_speed,
                limit,
            } => {
                positive(lateral_speed, "lateral_speed")?;
                positive(limit, "lane limit")?;
            }
            SteeringMode::FreeHeading {
                turn_rate,
                boundary,
            } => {
                positive(turn_rate, "turn_rate")?;
                match boundary {
                    Boundary::Square { half_extent } => positive(half_extent, "half_extent")?,
                    Boundary::Radius { radius } => positive(radius, "boundary radius")?,
                }
            }
        }

        if !self.prop_density.is_finite() || self.prop_density < 0.0 {
            return Err(TuningError::NonPositive("prop_density"));
        }

        match self.streaming {
            StreamLayout::Chunks {
                length,
                visible,
                retention,
            } => {
                positive(length, "chunk length")?;
                if retention < visible {
                    return Err(TuningError::Retention);
                }
            }
            StreamLayout::Tiles {
                size,
                visible,
                retention,
            } => {
                if !size.is_finite() || size < MIN_TILE_SIZE {
                    return Err(TuningError::TileTooSmall(size));
                }
                if retention < visible {
                    return Err(TuningError::Retention);
                }
            }
        }

        if let Some(h) = &self.hazards {
            if h.collision_lateral >= h.near_miss_lateral {
                return Err(TuningError::HazardZones);
            }
            if h.contact_depth <= 0.0 {
                return Err(TuningError::NonPositive("contact_depth"));
            }
            if h.interval_min <= 0.0 {
                return Err(TuningError::NonPositive("interval_min"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for variant in [Variant::Runner, Variant::Cruiser, Variant::Explorer] {
            let tuning = Tuning::for_variant(variant);
            assert_eq!(tuning.variant, variant);
            assert!(tuning.validate().is_ok(), "{} preset invalid", variant.as_str());
        }
    }

    #[test]
    fn test_only_runner_has_hazards() {
        assert!(Tuning::runner().hazards.is_some());
        assert!(Tuning::cruiser().hazards.is_none());
        assert!(Tuning::explorer().hazards.is_none());
    }

    #[test]
    fn test_json_override_roundtrip() {
        let mut tuning = Tuning::cruiser();
        tuning.max_speed = 50.0;
        let json = serde_json::to_string(&tuning).unwrap();
        let loaded = Tuning::from_json(&json).unwrap();
        assert_eq!(loaded.max_speed, 50.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut tuning = Tuning::runner();
        tuning.base_speed = 80.0;
        assert!(matches!(tuning.validate(), Err(TuningError::SpeedRange { .. })));

        let mut tuning = Tuning::runner();
        tuning.streaming = StreamLayout::Chunks {
            length: 40.0,
            visible: 200.0,
            retention: 100.0,
        };
        assert!(matches!(tuning.validate(), Err(TuningError::Retention)));

        let mut tuning = Tuning::runner();
        if let Some(h) = tuning.hazards.as_mut() {
            h.collision_lateral = 3.0;
        }
        assert!(matches!(tuning.validate(), Err(TuningError::HazardZones)));

        let mut tuning = Tuning::runner();
        tuning.steering = SteeringMode::LaneOffset {
            lateral_speed: 8.0,
            limit: -1.0,
        };
        let json = serde_json::to_string(&tuning).unwrap();
        assert!(matches!(
            Tuning::from_json(&json),
            Err(TuningError::NonPositive("lane limit"))
        ));

        tuning.steering = SteeringMode::LaneOffset {
            lateral_speed: f32::NAN,
            limit: 3.0,
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NonPositive("lateral_speed"))
        ));

        let mut tuning = Tuning::explorer();
        tuning.steering = SteeringMode::FreeHeading {
            turn_rate: -1.0,
            boundary: Boundary::Radius { radius: 100.0 },
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NonPositive("turn_rate"))
        ));
        tuning.steering = SteeringMode::FreeHeading {
            turn_rate: 1.5,
            boundary: Boundary::Square { half_extent: -10.0 },
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NonPositive("half_extent"))
        ));
        tuning.steering = SteeringMode::FreeHeading {
            turn_rate: 1.5,
            boundary: Boundary::Radius { radius: 0.0 },
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NonPositive("boundary radius"))
        ));

        let mut tuning = Tuning::explorer();
        tuning.streaming = StreamLayout::Tiles {
            size: 4.0,
            visible: 1,
            retention: 1,
        };
        assert!(matches!(tuning.validate(), Err(TuningError::TileTooSmall(_))));

        let mut tuning = Tuning::cruiser();
        tuning.prop_density = f32::NAN;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::NonPositive("prop_density"))
        ));

        assert!(matches!(
            Tuning::from_json("{not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!(Variant::from_str("Explorer"), Some(Variant::Explorer));
        assert_eq!(Variant::from_str("cruise"), Some(Variant::Cruiser));
        assert_eq!(Variant::from_str("kart"), None);
        assert!(Variant::Runner.has_failure());
        assert!(!Variant::Explorer.has_failure());
    }
}
