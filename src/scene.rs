// scene.rs - camera orientation and the drag-to-look interaction

use glam::{Mat4, Vec2, Vec3};

use crate::projector::spherical_to_world;

pub const FOV_Y_DEG: f32 = 75.0;
pub const NEAR: f32 = 0.25;
pub const FAR: f32 = 10.0;
/// Radius of the small orbit the camera sits on while looking at the origin.
pub const CAMERA_DISTANCE: f32 = 0.5;
pub const LAT_LIMIT: f32 = 85.0;
/// Degrees of rotation per pixel of pointer travel.
pub const DRAG_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_SPHERE_RADIUS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraOrientation {
    pub lon: f32,
    pub lat: f32,
}

impl CameraOrientation {
    pub fn clamp_lat(&mut self) {
        self.lat = self.lat.clamp(-LAT_LIMIT, LAT_LIMIT);
    }

    /// Camera position on the orbit sphere.
    pub fn eye(&self, distance: f32) -> Vec3 {
        let phi = (90.0 - self.lat).to_radians();
        let theta = self.lon.to_radians();
        Vec3::new(
            distance * phi.sin() * theta.cos(),
            distance * phi.cos(),
            distance * phi.sin() * theta.sin(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        start: Vec2,
        start_orientation: CameraOrientation,
    },
}

/// Matrices and vectors for one rendered frame.
#[derive(Debug, Clone, Copy)]
pub struct CameraView {
    pub eye: Vec3,
    pub forward: Vec3,
    pub view_proj: Mat4,
}

impl CameraView {
    pub fn new(orientation: CameraOrientation, aspect: f32) -> Self {
        let eye = orientation.eye(CAMERA_DISTANCE);
        let forward = (-eye).normalize_or_zero();
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect.max(1e-3), NEAR, FAR);
        Self {
            eye,
            forward,
            view_proj: proj * view,
        }
    }

    /// World-space direction of the ray through `ndc` (x, y in [-1, 1]).
    pub fn ray_direction(&self, ndc: Vec2) -> Vec3 {
        let inv = self.view_proj.inverse();
        let near = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        (far - near).normalize_or_zero()
    }
}

/// Owns the camera state that every other component reads.
pub struct SceneHost {
    pub sphere_radius: f32,
    pub orientation: CameraOrientation,
    pub sensitivity: f32,
    drag: DragState,
    modal_open: bool,
}

impl SceneHost {
    pub fn new(sphere_radius: f32) -> Self {
        Self {
            sphere_radius,
            orientation: CameraOrientation::default(),
            sensitivity: DRAG_SENSITIVITY,
            drag: DragState::Idle,
            modal_open: false,
        }
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    /// Suspends (or resumes) drag input. Any drag in progress is dropped.
    pub fn set_modal_open(&mut self, open: bool) {
        self.modal_open = open;
        self.drag = DragState::Idle;
    }

    /// Returns whether a drag started.
    pub fn pointer_down(&mut self, pos: Vec2) -> bool {
        if self.modal_open {
            return false;
        }
        self.drag = DragState::Dragging {
            start: pos,
            start_orientation: self.orientation,
        };
        true
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        if self.modal_open {
            return;
        }
        if let DragState::Dragging {
            start,
            start_orientation,
        } = self.drag
        {
            self.orientation.lon = (start.x - pos.x) * self.sensitivity + start_orientation.lon;
            self.orientation.lat = (start.y - pos.y) * self.sensitivity + start_orientation.lat;
            self.orientation.clamp_lat();
        }
    }

    /// Pointer released or left the window.
    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn reset_view(&mut self) {
        self.orientation = CameraOrientation::default();
        self.drag = DragState::Idle;
    }

    /// Per-frame camera update; runs before spots are repositioned.
    pub fn update_frame(&mut self, aspect: f32) -> CameraView {
        self.orientation.clamp_lat();
        CameraView::new(self.orientation, aspect)
    }

    pub fn spherical_to_world(&self, lon_deg: f32, lat_deg: f32) -> Vec3 {
        spherical_to_world(lon_deg, lat_deg, self.sphere_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_left_rotates_longitude() {
        let mut host = SceneHost::new(DEFAULT_SPHERE_RADIUS);
        assert!(host.pointer_down(Vec2::new(100.0, 100.0)));
        host.pointer_move(Vec2::new(60.0, 100.0));
        assert!((host.orientation.lon - 4.0).abs() < 1e-5);
        assert_eq!(host.orientation.lat, 0.0);

        host.pointer_up();
        assert_eq!(host.drag_state(), DragState::Idle);
        host.pointer_move(Vec2::new(0.0, 0.0));
        assert!((host.orientation.lon - 4.0).abs() < 1e-5);
    }

    #[test]
    fn drag_is_relative_to_the_press_position() {
        let mut host = SceneHost::new(DEFAULT_SPHERE_RADIUS);
        host.orientation.lon = 10.0;
        host.pointer_down(Vec2::new(0.0, 0.0));
        host.pointer_move(Vec2::new(-50.0, 0.0));
        host.pointer_move(Vec2::new(-20.0, 0.0));
        assert!((host.orientation.lon - 12.0).abs() < 1e-5);
    }

    #[test]
    fn latitude_is_pinned_at_the_poles() {
        let mut host = SceneHost::new(DEFAULT_SPHERE_RADIUS);
        host.pointer_down(Vec2::new(0.0, 0.0));
        host.pointer_move(Vec2::new(0.0, -5000.0));
        assert_eq!(host.orientation.lat, LAT_LIMIT);
        host.pointer_move(Vec2::new(0.0, 5000.0));
        assert_eq!(host.orientation.lat, -LAT_LIMIT);

        host.orientation.lat = 120.0;
        host.update_frame(1.0);
        assert_eq!(host.orientation.lat, LAT_LIMIT);
    }

    #[test]
    fn modal_suspends_dragging() {
        let mut host = SceneHost::new(DEFAULT_SPHERE_RADIUS);
        host.pointer_down(Vec2::new(100.0, 100.0));
        host.set_modal_open(true);
        assert_eq!(host.drag_state(), DragState::Idle);

        assert!(!host.pointer_down(Vec2::new(100.0, 100.0)));
        host.pointer_move(Vec2::new(0.0, 0.0));
        assert_eq!(host.orientation, CameraOrientation::default());

        host.set_modal_open(false);
        assert!(host.pointer_down(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn camera_orbits_and_looks_at_origin() {
        let mut host = SceneHost::new(DEFAULT_SPHERE_RADIUS);
        host.orientation = CameraOrientation { lon: 90.0, lat: 0.0 };
        let view = host.update_frame(16.0 / 9.0);
        assert!((view.eye.length() - CAMERA_DISTANCE).abs() < 1e-5);
        assert!((view.eye - Vec3::new(0.0, 0.0, CAMERA_DISTANCE)).length() < 1e-5);
        assert!((view.forward + Vec3::Z).length() < 1e-5);

        let center = view.ray_direction(Vec2::ZERO);
        assert!((center - view.forward).length() < 1e-4);
    }
}
