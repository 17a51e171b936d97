//! Neon Drive entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent, PointerEvent, TouchEvent};

    use neon_drive::Settings;
    use neon_drive::audio::WebAudio;
    use neon_drive::best_score::LocalStore;
    use neon_drive::platform::AudioService;
    use neon_drive::platform::web::JsScene;
    use neon_drive::sim::{FrameClock, HudView, Key, RawInput, Session, SteerControl};

    type WebSession = Session<JsScene, WebAudio, LocalStore>;

    /// Game instance holding all state
    struct Game {
        session: WebSession,
        clock: FrameClock,
        settings: Settings,
        /// Audio may only start after a user gesture
        audio_unlocked: bool,
    }

    impl Game {
        fn new(settings: Settings, seed: u64, width: f32, height: f32) -> Self {
            let tuning = settings.tuning();
            let audio = WebAudio::new(&settings);
            let session = Session::new(tuning, seed, JsScene::new(width, height), audio, LocalStore);
            Self {
                session,
                clock: FrameClock::new(),
                settings,
                audio_unlocked: false,
            }
        }

        fn input(&mut self, event: RawInput) {
            if !self.audio_unlocked {
                self.audio_unlocked = true;
                self.session.audio_mut().start();
            }
            self.session.handle_input(event);
        }

        fn frame(&mut self, time: f64) {
            let dt = self.clock.tick(time);
            let view = self.session.frame(dt);
            update_hud(&view.hud, self.settings.show_fps.then(|| self.clock.fps()));
        }

        fn set_focus(&mut self, focused: bool) {
            if !focused {
                self.session.input_mut().release_all();
                self.clock.resync();
            }
            if self.settings.mute_on_blur {
                self.session.audio_mut().set_muted(!focused);
            }
        }
    }

    fn set_visible(document: &Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn set_text(document: &Document, selector: &str, text: &str) {
        if let Some(el) = document.query_selector(selector).ok().flatten() {
            el.set_text_content(Some(text));
        }
    }

    /// Update HUD elements in DOM
    fn update_hud(hud: &HudView, fps: Option<f32>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        set_text(&document, "#hud-score .hud-value", &hud.score_text);
        set_text(&document, "#hud-speed .hud-value", &hud.speed_text);
        set_text(&document, "#hud-best .hud-value", &hud.best_text);
        if let Some(fps) = fps {
            set_text(&document, "#hud-fps .hud-value", &format!("{:.0}", fps));
        }

        // Combo only shows while 2+ near misses are chained
        match &hud.combo_text {
            Some(text) => {
                set_text(&document, "#hud-combo .hud-value", text);
                set_visible(&document, "hud-combo", true);
            }
            None => set_visible(&document, "hud-combo", false),
        }

        if let Some(el) = document.get_element_by_id("steer-indicator") {
            let _ = el.set_attribute(
                "style",
                &format!("transform: translateX({:.1}%)", hud.steer * 50.0),
            );
        }

        set_visible(&document, "start-screen", hud.show_start);
        set_visible(&document, "game-over", hud.show_game_over);
        set_visible(&document, "results", hud.show_results);
        set_visible(&document, "new-record", hud.show_results && hud.new_record);
    }

    /// Steering geometry from the canvas, or the on-screen stick when present
    fn steer_control(document: &Document, canvas: &HtmlCanvasElement) -> SteerControl {
        if let Some(stick) = document.get_element_by_id("steer-stick") {
            let rect = stick.get_bounding_client_rect();
            let canvas_rect = canvas.get_bounding_client_rect();
            return SteerControl::Stick {
                center: glam::Vec2::new(
                    (rect.x() - canvas_rect.x() + rect.width() / 2.0) as f32,
                    (rect.y() - canvas_rect.y() + rect.height() / 2.0) as f32,
                ),
                radius: (rect.width() / 2.0) as f32,
            };
        }
        SteerControl::Surface {
            width: canvas.client_width() as f32,
        }
    }

    /// First touch position relative to the canvas
    fn touch_point(canvas: &HtmlCanvasElement, event: &TouchEvent) -> Option<(f32, f32)> {
        let touch = event.touches().get(0)?;
        let rect = canvas.get_bounding_client_rect();
        Some((
            (f64::from(touch.client_x()) - rect.x()) as f32,
            (f64::from(touch.client_y()) - rect.y()) as f32,
        ))
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Neon Drive starting...");

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };
        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("Canvas element #canvas not found");
            return;
        };

        let width = canvas.client_width() as f32;
        let height = canvas.client_height() as f32;
        let entropy = (js_sys::Math::random() * 4_294_967_296.0) as u64;
        let seed = (js_sys::Date::now() as u64) ^ (entropy << 32);
        let settings = Settings::load();
        log::info!(
            "Variant {} ({} quality), seed {}",
            settings.variant.as_str(),
            settings.quality.as_str(),
            seed
        );

        let game = Rc::new(RefCell::new(Game::new(settings, seed, width, height)));
        game.borrow_mut()
            .session
            .input_mut()
            .set_control(steer_control(&document, &canvas));

        setup_input_handlers(&canvas, game.clone());
        setup_buttons(&document, game.clone());
        setup_resize(&canvas, game.clone());
        setup_auto_mute(game.clone());

        request_animation_frame(game);
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        // Pointer (mouse and pen)
        for (name, kind) in [("pointerdown", 0u8), ("pointermove", 1), ("pointerup", 2)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                if event.pointer_type() == "touch" {
                    return;
                }
                let (x, y) = (event.offset_x() as f32, event.offset_y() as f32);
                let raw = match kind {
                    0 => RawInput::PointerDown { x, y },
                    1 => RawInput::PointerMove { x, y },
                    _ => RawInput::PointerUp,
                };
                game.borrow_mut().input(raw);
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch
        for (name, kind) in [("touchstart", 0u8), ("touchmove", 1), ("touchend", 2)] {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let raw = match (kind, touch_point(&canvas_clone, &event)) {
                    (0, Some((x, y))) => RawInput::TouchStart { x, y },
                    (1, Some((x, y))) => RawInput::TouchMove { x, y },
                    (1, None) => return,
                    _ => RawInput::TouchEnd,
                };
                game.borrow_mut().input(raw);
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        for (name, down) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let Some(key) = Key::from_dom(&event.key()) else {
                    return;
                };
                if event.repeat() {
                    return;
                }
                event.prevent_default();
                let raw = if down {
                    RawInput::KeyDown(key)
                } else {
                    RawInput::KeyUp(key)
                };
                game.borrow_mut().input(raw);
            });
            let _ = document.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        for id in ["start-btn", "restart-btn"] {
            if let Some(btn) = document.get_element_by_id(id) {
                let game = game.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                    game.borrow_mut().input(RawInput::Action);
                });
                let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }

    fn setup_resize(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let canvas = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let mut g = game.borrow_mut();
            g.session.render_mut().resize(
                canvas.client_width() as f32,
                canvas.client_height() as f32,
            );
            g.session
                .input_mut()
                .set_control(steer_control(&document, &canvas));
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_auto_mute(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let visible = document_clone.visibility_state() == web_sys::VisibilityState::Visible;
                game.borrow_mut().set_focus(visible);
                log::info!("Tab {}", if visible { "visible" } else { "hidden" });
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur / focus
        for (name, focused) in [("blur", false), ("focus", true)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().set_focus(focused);
            });
            let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Neon Drive (native) starting...");
    log::info!("Native mode runs a headless demo - run with `trunk serve` for the web version");

    let mut args = std::env::args().skip(1);
    let variant = args
        .next()
        .and_then(|s| neon_drive::Variant::from_str(&s))
        .unwrap_or_default();
    let frames = args.next().and_then(|s| s.parse().ok()).unwrap_or(3600);
    let quality = args
        .next()
        .and_then(|s| neon_drive::QualityPreset::from_str(&s))
        .unwrap_or_default();

    headless_demo(variant, quality, frames);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Drive a session without a window: scripted weaving, automatic restarts
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo(variant: neon_drive::Variant, quality: neon_drive::QualityPreset, frames: usize) {
    use neon_drive::best_score::MemoryStore;
    use neon_drive::platform::{Cue, HeadlessAudio, HeadlessScene};
    use neon_drive::sim::{GamePhase, RawInput, Session, SteerControl};
    use neon_drive::{Settings, Tuning};

    const DT: f32 = 1.0 / 60.0;
    const WIDTH: f32 = 100.0;

    let settings = Settings {
        variant,
        quality,
        ..Settings::default()
    };
    let tuning = match std::env::var("NEON_DRIVE_TUNING") {
        Ok(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| Tuning::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            Err(e) => {
                log::warn!("Ignoring tuning override {}: {}", path, e);
                settings.tuning()
            }
        },
        Err(_) => settings.tuning(),
    };

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5EED);

    let mut session = Session::new(
        tuning,
        seed,
        HeadlessScene::new(),
        HeadlessAudio::new(),
        MemoryStore::new(),
    );
    session
        .input_mut()
        .set_control(SteerControl::Surface { width: WIDTH });

    let mut runs = 0u32;
    let mut time = 0.0f32;
    session.handle_input(RawInput::Action);
    session.handle_input(RawInput::PointerDown { x: WIDTH / 2.0, y: 0.0 });

    for _ in 0..frames {
        time += DT;
        let x = WIDTH / 2.0 + (time * 0.7).sin() * WIDTH * 0.45;
        session.handle_input(RawInput::PointerMove { x, y: 0.0 });
        let view = session.frame(DT);

        if view.phase == GamePhase::Results {
            runs += 1;
            log::info!("Run {} over: {}", runs, view.hud.score_text);
            session.handle_input(RawInput::Action);
        }
    }

    let state = session.state();
    let audio = session.audio();
    println!(
        "\n{} demo ({} quality) after {} frames",
        variant.as_str(),
        quality.as_str(),
        frames
    );
    println!("  seed:            {}", seed);
    println!("  phase:           {:?}", state.phase);
    println!("  score:           {}", state.score());
    println!("  best:            {}", state.best_score);
    println!("  finished runs:   {}", runs);
    println!("  regions live:    {}", session.streamer().len());
    println!("  entities live:   {}", session.render().live_count());
    println!("  near misses:     {}", audio.count(Cue::NearMiss));
    println!("  pickups:         {}", audio.count(Cue::Pickup));
}
