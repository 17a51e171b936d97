//! Chase camera and speed-driven post-processing
//!
//! The rig trails the vehicle with a fixed per-frame smoothing factor. Field
//! of view, bloom and motion blur grow with the square of the speed fraction
//! so the effect stays subtle at cruising speed.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::vehicle::Vehicle;
use crate::speed_fraction;
use crate::tuning::CameraTuning;

/// Shake below this is snapped to zero
const SHAKE_EPSILON: f32 = 0.001;

/// Everything the renderer needs from the camera this frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraFrame {
    /// Eye position, shake included
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub bloom: f32,
    pub blur: f32,
    /// Shake offset already folded into `eye`
    pub shake: Vec3,
}

#[inline]
pub fn fov_for(s: f32, tuning: &CameraTuning) -> f32 {
    tuning.fov_base + tuning.fov_gain * s * s
}

#[inline]
pub fn bloom_for(s: f32, tuning: &CameraTuning) -> f32 {
    tuning.bloom_base + tuning.bloom_gain * s * s
}

#[inline]
pub fn blur_for(s: f32, tuning: &CameraTuning) -> f32 {
    tuning.blur_gain * s * s
}

/// Where the camera wants to be: behind and above the car, along its heading
pub fn chase_eye(vehicle: &Vehicle, tuning: &CameraTuning) -> Vec3 {
    vehicle.position
        + Quat::from_rotation_y(-vehicle.heading) * Vec3::new(0.0, tuning.height, tuning.behind)
}

#[derive(Debug, Clone, Default)]
pub struct CameraRig {
    /// Smoothed eye, without shake
    eye: Vec3,
    shake: f32,
    time: f32,
}

impl CameraRig {
    pub fn new(vehicle: &Vehicle, tuning: &CameraTuning) -> Self {
        let mut rig = Self::default();
        rig.snap(vehicle, tuning);
        rig
    }

    /// Jump straight to the chase position and drop any shake
    pub fn snap(&mut self, vehicle: &Vehicle, tuning: &CameraTuning) {
        self.eye = chase_eye(vehicle, tuning);
        self.shake = 0.0;
    }

    /// Add shake; overlapping kicks keep the strongest
    pub fn kick(&mut self, magnitude: f32) {
        self.shake = self.shake.max(magnitude);
    }

    pub fn shake(&self) -> f32 {
        self.shake
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    fn shake_offset(&self) -> Vec3 {
        if self.shake == 0.0 {
            return Vec3::ZERO;
        }
        let t = self.time;
        Vec3::new((t * 47.0).sin(), (t * 31.0).cos() * 0.6, (t * 23.0).sin() * 0.3) * self.shake
    }

    fn decay_shake(&mut self, tuning: &CameraTuning) {
        self.shake *= tuning.shake_decay;
        if self.shake < SHAKE_EPSILON {
            self.shake = 0.0;
        }
    }

    /// Chase the vehicle for one frame
    pub fn follow(
        &mut self,
        vehicle: &Vehicle,
        max_speed: f32,
        tuning: &CameraTuning,
        dt: f32,
    ) -> CameraFrame {
        self.time += dt;
        let s = speed_fraction(vehicle.speed, max_speed);

        let desired = chase_eye(vehicle, tuning);
        self.eye = self.eye.lerp(desired, tuning.smoothing.clamp(0.0, 1.0));
        let target = vehicle.position
            + vehicle.forward() * (tuning.look_ahead + tuning.look_ahead_gain * s)
            + Vec3::Y;

        let shake = self.shake_offset();
        self.decay_shake(tuning);

        CameraFrame {
            eye: self.eye + shake,
            target,
            fov: fov_for(s, tuning),
            bloom: bloom_for(s, tuning),
            blur: blur_for(s, tuning),
            shake,
        }
    }

    /// Slow orbit around a point for the title screen
    pub fn flythrough(&mut self, center: Vec3, tuning: &CameraTuning, dt: f32) -> CameraFrame {
        self.time += dt;
        self.decay_shake(tuning);
        let angle = self.time * tuning.orbit_speed;
        self.eye = center
            + Vec3::new(
                angle.cos() * tuning.orbit_radius,
                tuning.height * 1.5,
                angle.sin() * tuning.orbit_radius,
            );

        CameraFrame {
            eye: self.eye,
            target: center + Vec3::Y,
            fov: tuning.fov_base,
            bloom: tuning.bloom_base,
            blur: 0.0,
            shake: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_effects_grow_with_speed() {
        let t = CameraTuning::default();
        assert_eq!(fov_for(0.0, &t), t.fov_base);
        assert_eq!(fov_for(1.0, &t), t.fov_base + t.fov_gain);
        assert_eq!(blur_for(0.0, &t), 0.0);
        // Quadratic: half speed gives a quarter of the gain
        assert!((bloom_for(0.5, &t) - (t.bloom_base + t.bloom_gain * 0.25)).abs() < 1e-6);

        let mut last = fov_for(0.0, &t);
        for i in 1..=10 {
            let fov = fov_for(i as f32 / 10.0, &t);
            assert!(fov > last);
            last = fov;
        }
    }

    #[test]
    fn test_chase_eye_sits_behind_heading() {
        let t = CameraTuning::default();
        let mut car = Vehicle::new(10.0);
        // Heading 0 drives toward -Z, so the camera is at +Z
        let eye = chase_eye(&car, &t);
        assert!((eye - Vec3::new(0.0, t.height, t.behind)).length() < 1e-5);

        car.heading = FRAC_PI_2;
        let eye = chase_eye(&car, &t);
        assert!((eye - Vec3::new(-t.behind, t.height, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_follow_converges() {
        let t = CameraTuning::default();
        let mut car = Vehicle::new(10.0);
        let mut rig = CameraRig::new(&car, &t);
        car.position = Vec3::new(0.0, 0.0, -50.0);

        let first = rig.follow(&car, 60.0, &t, 1.0 / 60.0);
        // One frame only closes a fraction of the gap
        assert!(first.eye.z > chase_eye(&car, &t).z + 1.0);

        for _ in 0..200 {
            rig.follow(&car, 60.0, &t, 1.0 / 60.0);
        }
        assert!((rig.eye() - chase_eye(&car, &t)).length() < 1e-3);
    }

    #[test]
    fn test_shake_decays_to_zero() {
        let t = CameraTuning::default();
        let car = Vehicle::new(10.0);
        let mut rig = CameraRig::new(&car, &t);
        rig.kick(t.shake_kick);
        rig.kick(0.1);
        assert_eq!(rig.shake(), t.shake_kick);

        let mut frames = 0;
        while rig.shake() > 0.0 {
            rig.follow(&car, 60.0, &t, 1.0 / 60.0);
            frames += 1;
            assert!(frames < 100);
        }
        let settled = rig.follow(&car, 60.0, &t, 1.0 / 60.0);
        assert_eq!(settled.shake, Vec3::ZERO);
    }

    #[test]
    fn test_flythrough_orbits_center() {
        let t = CameraTuning::default();
        let mut rig = CameraRig::default();
        let center = Vec3::new(5.0, 0.0, -20.0);
        let a = rig.flythrough(center, &t, 1.0);
        let b = rig.flythrough(center, &t, 1.0);
        assert_ne!(a.eye, b.eye);
        for frame in [a, b] {
            let flat = Vec3::new(frame.eye.x - center.x, 0.0, frame.eye.z - center.z);
            assert!((flat.length() - t.orbit_radius).abs() < 1e-3);
            assert_eq!(frame.blur, 0.0);
        }
    }
}
