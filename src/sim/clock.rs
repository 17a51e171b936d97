//! Frame timing
//!
//! Turns display-frame timestamps into clamped simulation deltas and keeps a
//! short rolling FPS estimate for the debug readout.

use super::vehicle::clamp_dt;
use crate::consts::NOMINAL_FRAME_DT;

const FPS_WINDOW: usize = 60;

#[derive(Debug, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
    frame_times: [f64; FPS_WINDOW],
    frame_index: usize,
    frames: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_ms: None,
            frame_times: [0.0; FPS_WINDOW],
            frame_index: 0,
            frames: 0,
        }
    }

    /// Register a frame at `now_ms` and return the delta to simulate.
    /// The first frame uses a nominal delta; stalls and clock jumps are clamped.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => clamp_dt(((now_ms - last) / 1000.0) as f32),
            None => NOMINAL_FRAME_DT,
        };
        self.last_ms = Some(now_ms);
        self.frame_times[self.frame_index] = now_ms;
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;
        self.frames += 1;
        dt
    }

    /// Forget the previous timestamp (tab hidden, loop paused)
    pub fn resync(&mut self) {
        self.last_ms = None;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Average FPS over the last window, 0 until the window has filled once
    pub fn fps(&self) -> f32 {
        if self.frames < FPS_WINDOW as u64 {
            return 0.0;
        }
        let newest = self.frame_times[(self.frame_index + FPS_WINDOW - 1) % FPS_WINDOW];
        let oldest = self.frame_times[self.frame_index];
        let span = newest - oldest;
        if span > 0.0 {
            ((FPS_WINDOW - 1) as f64 * 1000.0 / span) as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_FRAME_DT;

    #[test]
    fn test_first_frame_is_nominal() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(12_345.0), NOMINAL_FRAME_DT);
        let dt = clock.tick(12_345.0 + 16.0);
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_stall_and_backwards_clock() {
        let mut clock = FrameClock::new();
        clock.tick(0.0);
        assert_eq!(clock.tick(5_000.0), MAX_FRAME_DT);
        assert_eq!(clock.tick(4_000.0), 0.0);

        clock.resync();
        assert_eq!(clock.tick(9_000.0), NOMINAL_FRAME_DT);
    }

    #[test]
    fn test_fps_estimate() {
        let mut clock = FrameClock::new();
        for i in 0..120 {
            clock.tick(i as f64 * 20.0);
        }
        assert!((clock.fps() - 50.0).abs() < 0.01);
        assert_eq!(clock.frames(), 120);
    }
}
