//! Per-frame uniform block
//!
//! Layout must match the page shader's `Frame` struct.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat};

use crate::sim::FrameView;

const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 2000.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],     // offset 0
    pub vehicle_model: [[f32; 4]; 4], // offset 64
    pub eye: [f32; 3],                // offset 128
    pub time: f32,                    // offset 140
    pub resolution: [f32; 2],         // offset 144
    pub fov: f32,                     // offset 152
    pub bloom: f32,                   // offset 156
    pub blur: f32,                    // offset 160
    pub boost: f32,                   // offset 164 - 1 while boosted
    pub steer: f32,                   // offset 168
    pub _pad: u32,                    // pad to 176 bytes
}

impl FrameUniforms {
    pub fn from_view(view: &FrameView, width: f32, height: f32) -> Self {
        let aspect = if width > 0.0 && height > 0.0 {
            width / height
        } else {
            1.0
        };
        let camera = &view.camera;
        let proj = Mat4::perspective_rh(camera.fov.to_radians(), aspect, NEAR_PLANE, FAR_PLANE);
        let look = Mat4::look_at_rh(camera.eye, camera.target, glam::Vec3::Y);

        let pose = &view.vehicle;
        let rotation =
            Quat::from_rotation_y(pose.yaw - pose.heading) * Quat::from_rotation_z(-pose.roll);
        let model = Mat4::from_rotation_translation(rotation, pose.position);

        Self {
            view_proj: (proj * look).to_cols_array_2d(),
            vehicle_model: model.to_cols_array_2d(),
            eye: camera.eye.to_array(),
            time: view.time,
            resolution: [width, height],
            fov: camera.fov,
            bloom: camera.bloom,
            blur: camera.blur,
            boost: if view.boosted { 1.0 } else { 0.0 },
            steer: view.hud.steer,
            _pad: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CameraFrame, GamePhase, HudView, VehiclePose};
    use glam::Vec3;

    fn view() -> FrameView {
        FrameView {
            phase: GamePhase::Playing,
            camera: CameraFrame {
                eye: Vec3::new(0.0, 3.5, 8.0),
                target: Vec3::new(0.0, 1.0, -6.0),
                fov: 60.0,
                bloom: 0.4,
                blur: 0.1,
                shake: Vec3::ZERO,
            },
            vehicle: VehiclePose {
                position: Vec3::new(1.5, 0.0, -3.0),
                ..Default::default()
            },
            boosted: true,
            time: 2.5,
            hud: HudView::default(),
        }
    }

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 176);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        let u = FrameUniforms::from_view(&view(), 800.0, 600.0);
        assert_eq!(u.as_bytes().len(), 176);
        assert_eq!(u.boost, 1.0);
        assert_eq!(u.vehicle_model[3], [1.5, 0.0, -3.0, 1.0]);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let v = view();
        let u = FrameUniforms::from_view(&v, 800.0, 600.0);
        let clip = Mat4::from_cols_array_2d(&u.view_proj) * v.camera.target.extend(1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(clip.w > 0.0);
    }

    #[test]
    fn test_zero_height_surface() {
        let u = FrameUniforms::from_view(&view(), 0.0, 0.0);
        assert!(u.view_proj.iter().flatten().all(|x| x.is_finite()));
    }
}
