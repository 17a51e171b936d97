//! Browser scene bridge
//!
//! The page script owns the actual 3D scene. It exposes a small
//! `window.neonDrive` object; this module forwards entity lifecycle calls
//! and the packed per-frame uniforms to it.

use wasm_bindgen::prelude::*;

use super::{EntityId, RenderService, SceneError, SceneGraph};
use crate::renderer::FrameUniforms;
use crate::sim::FrameView;
use crate::sim::terrain::Prop;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = neonDrive, js_name = spawnProp)]
    fn spawn_prop(kind: u32, position: &[f32], size: &[f32], rotation: f32, tint: u32) -> u32;

    #[wasm_bindgen(js_namespace = neonDrive, js_name = removeEntity)]
    fn remove_entity(id: u32);

    /// Resolves to false when the entity had no geometry or material of its own
    #[wasm_bindgen(catch, js_namespace = neonDrive, js_name = disposeEntity)]
    fn dispose_entity(id: u32) -> Result<bool, JsValue>;

    #[wasm_bindgen(js_namespace = neonDrive, js_name = drawFrame)]
    fn draw_frame(uniforms: &[u8], phase: u32);
}

/// Scene living in the page's renderer
#[derive(Debug, Default)]
pub struct JsScene {
    width: f32,
    height: f32,
}

impl JsScene {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }
}

impl SceneGraph for JsScene {
    fn spawn(&mut self, prop: &Prop) -> EntityId {
        spawn_prop(
            prop.kind as u32,
            &prop.position.to_array(),
            &prop.size.to_array(),
            prop.rotation,
            prop.tint,
        )
    }

    fn remove(&mut self, id: EntityId) {
        remove_entity(id);
    }

    fn dispose(&mut self, id: EntityId) -> Result<(), SceneError> {
        match dispose_entity(id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SceneError::NothingToDispose(id)),
            Err(_) => Err(SceneError::UnknownEntity(id)),
        }
    }
}

impl RenderService for JsScene {
    fn draw(&mut self, frame: &FrameView) {
        let uniforms = FrameUniforms::from_view(frame, self.width, self.height);
        draw_frame(uniforms.as_bytes(), frame.phase as u32);
    }
}
