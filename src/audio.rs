//! Audio system using Web Audio API
//!
//! A continuous engine drone retuned every frame from the speed fraction,
//! plus procedurally generated one-shot cues. No external files.

use web_sys::{
    AudioContext, AudioContextState, BiquadFilterNode, BiquadFilterType, GainNode, OscillatorNode,
    OscillatorType,
};

use crate::platform::{AudioService, Cue};
use crate::settings::Settings;

/// Seconds for engine parameters to settle toward a new target
const ENGINE_GLIDE: f64 = 0.05;

/// The running engine graph: two oscillators through a lowpass
struct Engine {
    body: OscillatorNode,
    whine: OscillatorNode,
    filter: BiquadFilterNode,
    gain: GainNode,
}

impl Engine {
    fn build(ctx: &AudioContext) -> Option<Self> {
        let body = ctx.create_oscillator().ok()?;
        let whine = ctx.create_oscillator().ok()?;
        let filter = ctx.create_biquad_filter().ok()?;
        let gain = ctx.create_gain().ok()?;

        body.set_type(OscillatorType::Sawtooth);
        body.frequency().set_value(55.0);
        whine.set_type(OscillatorType::Square);
        whine.frequency().set_value(110.0);
        filter.set_type(BiquadFilterType::Lowpass);
        filter.frequency().set_value(400.0);
        gain.gain().set_value(0.0);

        body.connect_with_audio_node(&filter).ok()?;
        whine.connect_with_audio_node(&filter).ok()?;
        filter.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        body.start().ok()?;
        whine.start().ok()?;
        Some(Self {
            body,
            whine,
            filter,
            gain,
        })
    }

    fn retune(&self, t: f64, speed_fraction: f32, steer: f32, volume: f32) {
        let s = speed_fraction.clamp(0.0, 1.0);
        let turn = steer.abs().min(1.0);
        let pitch = 55.0 + 165.0 * s;

        self.body
            .frequency()
            .set_target_at_time(pitch, t, ENGINE_GLIDE)
            .ok();
        self.whine
            .frequency()
            .set_target_at_time(pitch * (2.0 + 0.3 * turn), t, ENGINE_GLIDE)
            .ok();
        self.filter
            .frequency()
            .set_target_at_time(400.0 + 2600.0 * s, t, ENGINE_GLIDE)
            .ok();
        self.gain
            .gain()
            .set_target_at_time(volume * (0.04 + 0.12 * s), t, ENGINE_GLIDE)
            .ok();
    }

    fn shut_down(&self, t: f64) {
        self.gain.gain().set_target_at_time(0.0, t, ENGINE_GLIDE).ok();
        self.body.stop_with_when(t + 0.3).ok();
        self.whine.stop_with_when(t + 0.3).ok();
    }
}

/// Audio manager for the game
pub struct WebAudio {
    ctx: Option<AudioContext>,
    engine: Option<Engine>,
    engine_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl WebAudio {
    pub fn new(settings: &Settings) -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            engine: None,
            engine_volume: settings.engine_gain(),
            sfx_volume: settings.sfx_gain(),
            muted: false,
        }
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(ctx) = &self.ctx {
            if muted {
                let _ = ctx.suspend();
            } else {
                let _ = ctx.resume();
            }
        }
    }

    fn sfx(&self) -> f32 {
        if self.muted { 0.0 } else { self.sfx_volume }
    }

    // === Sound generators ===

    /// Create an oscillator with gain envelope
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Crash - low square drop plus a noisy sawtooth crunch
    fn play_collision(ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();
        if let Some((osc, gain)) = Self::create_osc(ctx, 120.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.6)
                .ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(30.0, t + 0.6)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.65).ok();
        }
        if let Some((osc, gain)) = Self::create_osc(ctx, 900.0, OscillatorType::Sawtooth) {
            gain.gain().set_value_at_time(vol * 0.25, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                .ok();
            osc.frequency().set_value_at_time(900.0, t).ok();
            osc.frequency().set_value_at_time(200.0, t + 0.03).ok();
            osc.frequency().set_value_at_time(700.0, t + 0.06).ok();
            osc.frequency().set_value_at_time(150.0, t + 0.1).ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.3).ok();
        }
    }

    /// Boost pad - rising sweep
    fn play_pickup(ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = Self::create_osc(ctx, 300.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.35, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.35)
            .ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(1400.0, t + 0.3)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.4).ok();
    }

    /// Near miss - short doppler whoosh
    fn play_near_miss(ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = Self::create_osc(ctx, 880.0, OscillatorType::Triangle) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.2)
            .ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(330.0, t + 0.2)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.22).ok();
    }

    /// UI click - soft tap
    fn play_click(ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = Self::create_osc(ctx, 600.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.2, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.06)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.08).ok();
    }

    /// Skid - wobbling high sawtooth
    fn play_skid(ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = Self::create_osc(ctx, 1800.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.08, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.4)
            .ok();
        for i in 0..8 {
            let step = t + f64::from(i) * 0.05;
            let freq = if i % 2 == 0 { 1800.0 } else { 1500.0 };
            osc.frequency().set_value_at_time(freq, step).ok();
        }

        osc.start().ok();
        osc.stop_with_when(t + 0.45).ok();
    }
}

impl AudioService for WebAudio {
    fn start(&mut self) {
        let Some(ctx) = &self.ctx else { return };

        // Browsers keep the context suspended until a user gesture
        if ctx.state() == AudioContextState::Suspended && !self.muted {
            let _ = ctx.resume();
        }
        if self.engine.is_none() {
            self.engine = Engine::build(ctx);
            if self.engine.is_none() {
                log::warn!("Failed to build engine sound");
            }
        }
    }

    fn stop(&mut self) {
        if let (Some(ctx), Some(engine)) = (&self.ctx, self.engine.take()) {
            engine.shut_down(ctx.current_time());
        }
    }

    fn set_drive(&mut self, speed_fraction: f32, steer: f32) {
        let (Some(ctx), Some(engine)) = (&self.ctx, &self.engine) else {
            return;
        };
        let volume = if self.muted { 0.0 } else { self.engine_volume };
        engine.retune(ctx.current_time(), speed_fraction, steer, volume);
    }

    fn trigger(&mut self, cue: Cue) {
        let vol = self.sfx();
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        match cue {
            Cue::Collision => Self::play_collision(ctx, vol),
            Cue::Pickup => Self::play_pickup(ctx, vol),
            Cue::NearMiss => Self::play_near_miss(ctx, vol),
            Cue::Click => Self::play_click(ctx, vol),
            Cue::Skid => Self::play_skid(ctx, vol),
        }
    }
}
