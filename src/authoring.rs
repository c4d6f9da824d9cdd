// authoring.rs - click-to-place helper that prints a ready-to-paste spot entry

use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::projector::{spherical_to_world, world_to_spherical, Viewport};
use crate::scene::CameraView;
use crate::spot::SphericalCoords;

pub const NEW_SPOT_LABEL: &str = "Nuevo spot";

fn round_to(v: f32, decimals: i32) -> f32 {
    let f = 10f32.powi(decimals);
    (v * f).round() / f
}

/// Field order matches what authors paste into `spots`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotSnippet {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub spherical: SphericalCoords,
    pub radius: f32,
    pub description: String,
    pub media: String,
    pub cartesian: [f32; 3],
}

impl SpotSnippet {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Where the ray from the eye through `ndc` leaves the sphere of `radius`.
/// The eye is inside the sphere, so the far root is the one that counts.
pub fn ray_sphere_exit(origin: Vec3, dir: Vec3, radius: f32) -> Option<Vec3> {
    let dir = dir.try_normalize()?;
    let b = origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b + disc.sqrt();
    (t > 0.0).then(|| origin + dir * t)
}

/// Overlay position -> normalised device coordinates of the canvas.
pub fn pixels_to_ndc(pos: Vec2, viewport: &Viewport) -> Option<Vec2> {
    let size = viewport.canvas_size;
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    let rel = (pos - viewport.canvas_min) / size;
    Some(Vec2::new(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0))
}

/// Builds the snippet for a click at `pos`.
pub fn pick(
    pos: Vec2,
    camera: &CameraView,
    viewport: &Viewport,
    radius: f32,
    millis: u128,
) -> Option<SpotSnippet> {
    let ndc = pixels_to_ndc(pos, viewport)?;
    let hit = ray_sphere_exit(camera.eye, camera.ray_direction(ndc), radius)?;
    let (lon, lat) = world_to_spherical(hit);
    let (lon, lat) = (round_to(lon, 2), round_to(lat, 2));
    let c = spherical_to_world(lon, lat, radius);
    log::debug!("marker pick at lon {lon} lat {lat}");
    Some(SpotSnippet {
        id: format!("spot-{millis}"),
        kind: "photo".to_string(),
        label: NEW_SPOT_LABEL.to_string(),
        spherical: SphericalCoords { lon, lat },
        radius,
        description: String::new(),
        media: String::new(),
        cartesian: [round_to(c.x, 3), round_to(c.y, 3), round_to(c.z, 3)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{project, CullPolicy, Placement};
    use crate::scene::{CameraOrientation, DEFAULT_SPHERE_RADIUS};

    #[test]
    fn rounding() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(-0.00049, 3), -0.0);
    }

    #[test]
    fn exit_point_is_on_the_sphere() {
        let hit = ray_sphere_exit(Vec3::new(0.5, 0.0, 0.0), Vec3::NEG_X, 5.0).unwrap();
        assert!((hit - Vec3::new(-5.0, 0.0, 0.0)).length() < 1e-4);
        assert!(ray_sphere_exit(Vec3::ZERO, Vec3::ZERO, 5.0).is_none());
    }

    #[test]
    fn centre_click_points_where_the_camera_looks() {
        let view = Viewport::fullscreen(800.0, 600.0);
        let camera = CameraView::new(CameraOrientation::default(), view.aspect());
        let snippet = pick(Vec2::new(400.0, 300.0), &camera, &view, DEFAULT_SPHERE_RADIUS, 42).unwrap();
        assert_eq!(snippet.id, "spot-42");
        assert!((snippet.spherical.lon - -90.0).abs() < 0.05, "{:?}", snippet.spherical);
        assert!(snippet.spherical.lat.abs() < 0.05);
        assert!((snippet.cartesian[0] + 5.0).abs() < 1e-2);
    }

    #[test]
    fn picked_spot_projects_back_under_the_cursor() {
        let view = Viewport::fullscreen(1024.0, 768.0);
        let orientation = CameraOrientation { lon: 30.0, lat: 10.0 };
        let camera = CameraView::new(orientation, view.aspect());
        let click = Vec2::new(700.0, 250.0);
        let s = pick(click, &camera, &view, DEFAULT_SPHERE_RADIUS, 0).unwrap();

        let world = spherical_to_world(s.spherical.lon, s.spherical.lat, DEFAULT_SPHERE_RADIUS);
        match project(world, &camera, Vec2::ZERO, &view, CullPolicy::DotProduct) {
            Placement::Visible(p) => assert!((p - click).length() < 2.0, "{p:?}"),
            Placement::Hidden => panic!("picked spot is hidden"),
        }
    }

    #[test]
    fn snippet_json_keeps_field_order() {
        let s = SpotSnippet {
            id: "spot-1".into(),
            kind: "photo".into(),
            label: NEW_SPOT_LABEL.into(),
            spherical: SphericalCoords { lon: 1.5, lat: -2.0 },
            radius: 5.0,
            description: String::new(),
            media: String::new(),
            cartesian: [0.0, 0.0, 5.0],
        };
        let json = s.to_json();
        let id = json.find("\"id\"").unwrap();
        let kind = json.find("\"type\"").unwrap();
        let cart = json.find("\"cartesian\"").unwrap();
        assert!(id < kind && kind < cart);
    }
}
