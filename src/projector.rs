// projector.rs - spherical authoring coordinates -> world -> screen

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene::CameraView;

/// Converts authoring coordinates to a point on the sphere of `radius`.
///
/// Elevation is measured from the +Y pole (`phi = 90 - lat`) and azimuth runs
/// around Y starting at +Z. Authored spots only line up with the panorama if
/// this convention is kept exactly.
pub fn spherical_to_world(lon_deg: f32, lat_deg: f32, radius: f32) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = lon_deg.to_radians();

    Vec3::new(
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
        radius * phi.sin() * theta.cos(),
    )
}

/// Inverse of [`spherical_to_world`]. Returns `(lon_deg, lat_deg)`.
pub fn world_to_spherical(v: Vec3) -> (f32, f32) {
    let r = v.length();
    if r <= f32::EPSILON {
        return (0.0, 0.0);
    }
    let phi = (v.y / r).clamp(-1.0, 1.0).acos();
    let lat = 90.0 - phi.to_degrees();
    let lon = v.x.atan2(v.z).to_degrees();
    (lon, lat)
}

/// How spots that are not in front of the camera are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum CullPolicy {
    /// Hide when the camera forward vector and the camera->spot vector point apart.
    #[default]
    #[serde(rename = "dot")]
    #[value(name = "dot")]
    DotProduct,
    /// Hide when the projected depth falls outside the clip range.
    #[serde(rename = "depth")]
    #[value(name = "depth")]
    Depth,
    /// Never hide; everything is clamped into view.
    #[serde(rename = "none")]
    #[value(name = "none")]
    Off,
}

/// Canvas rectangle plus the area spots are clamped into, in the same units
/// as the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub canvas_min: Vec2,
    pub canvas_size: Vec2,
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
}

impl Viewport {
    /// Canvas and bounds covering the whole screen.
    pub fn fullscreen(width: f32, height: f32) -> Self {
        Self {
            canvas_min: Vec2::ZERO,
            canvas_size: Vec2::new(width, height),
            bounds_min: Vec2::ZERO,
            bounds_max: Vec2::new(width, height),
        }
    }

    /// Narrows the clamp area, e.g. to the space left between toolbars.
    pub fn with_bounds(mut self, min: Vec2, max: Vec2) -> Self {
        self.bounds_min = min.max(self.bounds_min);
        self.bounds_max = max.min(self.bounds_max).max(self.bounds_min);
        self
    }

    pub fn aspect(&self) -> f32 {
        if self.canvas_size.y > 0.0 {
            self.canvas_size.x / self.canvas_size.y
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Not drawn and not clickable this frame.
    Hidden,
    /// Top-left corner of the spot element.
    Visible(Vec2),
}

impl Placement {
    pub fn is_visible(&self) -> bool {
        matches!(self, Placement::Visible(_))
    }
}

pub fn ndc_to_pixels(ndc: Vec3, viewport: &Viewport) -> Vec2 {
    Vec2::new(
        (ndc.x * 0.5 + 0.5) * viewport.canvas_size.x + viewport.canvas_min.x,
        (-ndc.y * 0.5 + 0.5) * viewport.canvas_size.y + viewport.canvas_min.y,
    )
}

/// Keeps an element of `element_size` with top-left `pos` fully inside the bounds.
pub fn clamp_to_viewport(pos: Vec2, element_size: Vec2, viewport: &Viewport) -> Vec2 {
    let mut out = pos;
    let (min, max) = (viewport.bounds_min, viewport.bounds_max);

    if out.x < min.x {
        out.x = min.x;
    } else if out.x + element_size.x > max.x {
        out.x = max.x - element_size.x;
    }

    if out.y < min.y {
        out.y = min.y;
    } else if out.y + element_size.y > max.y {
        out.y = max.y - element_size.y;
    }

    out
}

/// One frame of projection for a single world point.
pub fn project(
    world: Vec3,
    camera: &CameraView,
    element_size: Vec2,
    viewport: &Viewport,
    policy: CullPolicy,
) -> Placement {
    if policy == CullPolicy::DotProduct {
        let to_spot = (world - camera.eye).normalize_or_zero();
        if camera.forward.dot(to_spot) <= 0.0 {
            return Placement::Hidden;
        }
    }

    let ndc = camera.view_proj.project_point3(world);
    if !ndc.is_finite() {
        return Placement::Hidden;
    }

    // wgpu clip depth is [0, 1]
    if policy == CullPolicy::Depth && !(0.0..=1.0).contains(&ndc.z) {
        return Placement::Hidden;
    }

    let px = ndc_to_pixels(ndc, viewport);
    Placement::Visible(clamp_to_viewport(px, element_size, viewport))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{CameraOrientation, SceneHost};

    const EPS: f32 = 1e-4;

    fn camera_at(lon: f32, lat: f32, aspect: f32) -> CameraView {
        let mut host = SceneHost::new(5.0);
        host.orientation = CameraOrientation { lon, lat };
        host.update_frame(aspect)
    }

    #[test]
    fn spherical_points_lie_on_the_sphere() {
        let radius = 5.0;
        for lat in (-85..=85).step_by(17) {
            for lon in (-180..=180).step_by(30) {
                let p = spherical_to_world(lon as f32, lat as f32, radius);
                assert!((p.length() - radius).abs() < EPS, "lon={lon} lat={lat} -> {p:?}");
            }
        }
    }

    #[test]
    fn spherical_axes_follow_pole_convention() {
        let r = 2.0;
        let front = spherical_to_world(0.0, 0.0, r);
        assert!((front - Vec3::new(0.0, 0.0, r)).length() < EPS);

        let east = spherical_to_world(90.0, 0.0, r);
        assert!((east - Vec3::new(r, 0.0, 0.0)).length() < EPS);

        let up = spherical_to_world(0.0, 90.0, r);
        assert!((up - Vec3::new(0.0, r, 0.0)).length() < EPS);
    }

    #[test]
    fn world_to_spherical_inverts_projection() {
        for (lon, lat) in [(35.0, 8.0), (-60.0, -12.0), (120.0, 18.0), (-179.0, 84.0)] {
            let (lon2, lat2) = world_to_spherical(spherical_to_world(lon, lat, 5.0));
            assert!((lon - lon2).abs() < 1e-3, "{lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-3, "{lat} vs {lat2}");
        }
        assert_eq!(world_to_spherical(Vec3::ZERO), (0.0, 0.0));
    }

    #[test]
    fn clamp_keeps_bounding_box_on_screen() {
        let vp = Viewport::fullscreen(800.0, 600.0);
        let size = Vec2::new(40.0, 20.0);

        assert_eq!(clamp_to_viewport(Vec2::new(-30.0, -5.0), size, &vp), Vec2::ZERO);
        assert_eq!(
            clamp_to_viewport(Vec2::new(790.0, 595.0), size, &vp),
            Vec2::new(760.0, 580.0)
        );
        assert_eq!(
            clamp_to_viewport(Vec2::new(100.0, 200.0), size, &vp),
            Vec2::new(100.0, 200.0)
        );
    }

    #[test]
    fn clamp_stays_between_toolbars() {
        let vp = Viewport::fullscreen(800.0, 600.0).with_bounds(Vec2::new(0.0, 24.0), Vec2::new(800.0, 576.0));
        let size = Vec2::new(40.0, 20.0);

        assert_eq!(clamp_to_viewport(Vec2::new(100.0, 5.0), size, &vp), Vec2::new(100.0, 24.0));
        assert_eq!(clamp_to_viewport(Vec2::new(100.0, 570.0), size, &vp), Vec2::new(100.0, 556.0));
        // projection still uses the whole canvas
        assert_eq!(ndc_to_pixels(Vec3::ZERO, &vp), Vec2::new(400.0, 300.0));

        // ahead of the camera and just inside the top edge of the canvas
        let camera = camera_at(0.0, 0.0, vp.aspect());
        let near_top = camera.eye + camera.forward * 5.0 + Vec3::Y * 3.75;
        match project(near_top, &camera, size, &vp, CullPolicy::DotProduct) {
            Placement::Visible(p) => assert_eq!(p.y, 24.0),
            Placement::Hidden => panic!("spot ahead should be visible"),
        }
    }

    #[test]
    fn ndc_maps_to_canvas_pixels() {
        let vp = Viewport {
            canvas_min: Vec2::new(10.0, 20.0),
            canvas_size: Vec2::new(200.0, 100.0),
            bounds_min: Vec2::ZERO,
            bounds_max: Vec2::new(400.0, 300.0),
        };
        assert_eq!(ndc_to_pixels(Vec3::ZERO, &vp), Vec2::new(110.0, 70.0));
        assert_eq!(ndc_to_pixels(Vec3::new(-1.0, 1.0, 0.0), &vp), Vec2::new(10.0, 20.0));
        assert_eq!(ndc_to_pixels(Vec3::new(1.0, -1.0, 0.0), &vp), Vec2::new(210.0, 120.0));
    }

    #[test]
    fn spot_ahead_is_centered_and_antipode_hidden() {
        let vp = Viewport::fullscreen(800.0, 600.0);
        let camera = camera_at(0.0, 0.0, vp.aspect());

        // The camera orbits at lon=0 on +X and looks back through the origin.
        let ahead = camera.eye + camera.forward * 5.0;
        let (lon, lat) = world_to_spherical(ahead);
        let ahead = spherical_to_world(lon, lat, 5.0);

        match project(ahead, &camera, Vec2::ZERO, &vp, CullPolicy::DotProduct) {
            Placement::Visible(p) => {
                assert!((p.x - 400.0).abs() < 0.5, "{p:?}");
                assert!((p.y - 300.0).abs() < 0.5, "{p:?}");
            }
            Placement::Hidden => panic!("spot ahead must be visible"),
        }

        let behind = -ahead;
        assert_eq!(
            project(behind, &camera, Vec2::ZERO, &vp, CullPolicy::DotProduct),
            Placement::Hidden
        );
        assert_eq!(
            project(behind, &camera, Vec2::ZERO, &vp, CullPolicy::Depth),
            Placement::Hidden
        );
    }

    #[test]
    fn no_cull_clamps_everything_into_view() {
        let vp = Viewport::fullscreen(640.0, 480.0);
        let camera = camera_at(30.0, 10.0, vp.aspect());
        let size = Vec2::new(32.0, 32.0);

        for lon in (-180..180).step_by(20) {
            let world = spherical_to_world(lon as f32, 0.0, 5.0);
            match project(world, &camera, size, &vp, CullPolicy::Off) {
                Placement::Visible(p) => {
                    assert!(p.x >= 0.0 && p.x + size.x <= 640.0, "{p:?}");
                    assert!(p.y >= 0.0 && p.y + size.y <= 480.0, "{p:?}");
                }
                Placement::Hidden => panic!("nothing is hidden without culling"),
            }
        }
    }
}
