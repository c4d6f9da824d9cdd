// spot.rs - hotspot records and the per-frame registry

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::TourError;
use crate::projector::{project, spherical_to_world, CullPolicy, Placement, Viewport};
use crate::scene::CameraView;

pub const DEFAULT_SPOT_COLOR: &str = "#ffffff";
pub const DEFAULT_SPOT_LABEL: &str = "●";
/// Used until a spot has been laid out once and its real size is known.
const ESTIMATED_SPOT_SIZE: Vec2 = Vec2::new(56.0, 28.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpotKind {
    Photo,
    Gallery,
    Audio,
    Unknown,
}

impl SpotKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => SpotKind::Photo,
            "gallery" => SpotKind::Gallery,
            "audio" => SpotKind::Audio,
            _ => SpotKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub title: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpotContent {
    Photo {
        media: Option<String>,
        caption: Option<String>,
    },
    /// Inline items, or a selector into the tour's gallery table.
    Gallery {
        items: Vec<GalleryItem>,
        target: Option<String>,
    },
    /// Inline track list, or a selector naming one audio element to toggle.
    Audio {
        tracks: Vec<AudioTrack>,
        target: Option<String>,
    },
    Unknown {
        type_name: String,
    },
}

impl SpotContent {
    pub fn kind(&self) -> SpotKind {
        match self {
            SpotContent::Photo { .. } => SpotKind::Photo,
            SpotContent::Gallery { .. } => SpotKind::Gallery,
            SpotContent::Audio { .. } => SpotKind::Audio,
            SpotContent::Unknown { .. } => SpotKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpotPosition {
    Spherical { lon: f32, lat: f32 },
    /// Precomputed direction; scaled by `radius` or the sphere radius.
    Direction { unit: Vec3, radius: Option<f32> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    pub id: String,
    pub label: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: String,
    pub position: SpotPosition,
    pub content: SpotContent,
}

impl Spot {
    pub fn kind(&self) -> SpotKind {
        self.content.kind()
    }

    pub fn world_position(&self, sphere_radius: f32) -> Vec3 {
        match self.position {
            SpotPosition::Spherical { lon, lat } => spherical_to_world(lon, lat, sphere_radius),
            SpotPosition::Direction { unit, radius } => unit * radius.unwrap_or(sphere_radius),
        }
    }

    /// Title shown in the modal header.
    pub fn modal_title<'a>(&'a self, fallback: &'a str) -> &'a str {
        if !self.label.is_empty() && self.label != DEFAULT_SPOT_LABEL {
            return &self.label;
        }
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => fallback,
        }
    }

    /// Selector of the audio element this spot toggles, if any.
    pub fn audio_target(&self) -> Option<&str> {
        match &self.content {
            SpotContent::Audio {
                target: Some(t), ..
            } => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalCoords {
    pub lon: f32,
    pub lat: f32,
}

/// Declarative spot entry as written in a tour file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub spherical: Option<SphericalCoords>,
    #[serde(default)]
    pub cartesian: Option<[f32; 3]>,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<GalleryItem>>,
    #[serde(default)]
    pub audios: Option<Vec<AudioTrack>>,
}

/// Attribute-style spot definition (`data-type`, `data-lon`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Marker {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attrs: HashMap<String, String>,
}

pub fn generated_id(millis: u128, index: usize) -> String {
    format!("spot-{millis}-{index}")
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn build_content(
    kind: &str,
    media: Option<String>,
    caption: Option<String>,
    items: Vec<GalleryItem>,
    tracks: Vec<AudioTrack>,
    target: Option<String>,
) -> SpotContent {
    match SpotKind::parse(kind) {
        SpotKind::Photo => SpotContent::Photo { media, caption },
        SpotKind::Gallery => SpotContent::Gallery { items, target },
        SpotKind::Audio => SpotContent::Audio { tracks, target },
        SpotKind::Unknown => SpotContent::Unknown {
            type_name: kind.to_string(),
        },
    }
}

impl SpotRecord {
    pub fn into_spot(self, index: usize, millis: u128) -> Spot {
        let position = match (self.spherical, self.cartesian) {
            (Some(s), _) => SpotPosition::Spherical {
                lon: s.lon,
                lat: s.lat,
            },
            (None, Some(c)) => SpotPosition::Direction {
                unit: Vec3::from_array(c).normalize_or_zero(),
                radius: self.radius,
            },
            (None, None) => SpotPosition::Spherical { lon: 0.0, lat: 0.0 },
        };

        let content = build_content(
            &self.kind,
            non_empty(self.media),
            non_empty(self.caption),
            self.items.unwrap_or_default(),
            self.audios.unwrap_or_default(),
            non_empty(self.target),
        );

        Spot {
            id: non_empty(self.id).unwrap_or_else(|| generated_id(millis, index)),
            label: non_empty(self.label).unwrap_or_else(|| DEFAULT_SPOT_LABEL.to_string()),
            title: non_empty(self.title),
            description: non_empty(self.description),
            color: non_empty(self.color).unwrap_or_else(|| DEFAULT_SPOT_COLOR.to_string()),
            position,
            content,
        }
    }
}

impl Marker {
    fn attr(&self, name: &str) -> Option<String> {
        non_empty(self.attrs.get(name).cloned())
    }

    /// Numbers that do not parse fall back to 0.
    fn attr_f32(&self, name: &str) -> f32 {
        self.attr(name)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn into_spot(self, index: usize, millis: u128) -> Spot {
        let kind = self.attr("data-type").unwrap_or_default();
        let lon = self.attr_f32("data-lon");
        let lat = self.attr_f32("data-lat");
        let label = self
            .attr("data-label")
            .or_else(|| non_empty(self.text.clone()))
            .unwrap_or_else(|| DEFAULT_SPOT_LABEL.to_string());
        let color = self
            .attr("data-color")
            .unwrap_or_else(|| DEFAULT_SPOT_COLOR.to_string());
        let content = build_content(
            &kind,
            self.attr("data-media"),
            self.attr("data-caption"),
            Vec::new(),
            Vec::new(),
            self.attr("data-target"),
        );

        Spot {
            id: non_empty(self.id.clone()).unwrap_or_else(|| generated_id(millis, index)),
            label,
            title: self.attr("data-title"),
            description: self.attr("data-description"),
            color,
            position: SpotPosition::Spherical { lon, lat },
            content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotEntry {
    pub spot: Spot,
    /// Last measured size of the on-screen element.
    pub element_size: Vec2,
    pub placement: Placement,
    /// Content for this spot is currently playing.
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct SpotRegistry {
    entries: Vec<SpotEntry>,
    index: HashMap<String, usize>,
}

impl SpotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from declarative records first, then markers.
    pub fn from_definitions(records: Vec<SpotRecord>, markers: Vec<Marker>) -> Result<Self, TourError> {
        let millis = now_millis();
        let mut registry = Self::new();
        let record_count = records.len();
        for (i, record) in records.into_iter().enumerate() {
            registry.insert(record.into_spot(i, millis))?;
        }
        for (i, marker) in markers.into_iter().enumerate() {
            registry.insert(marker.into_spot(record_count + i, millis))?;
        }
        log::info!("registered {} spots", registry.len());
        Ok(registry)
    }

    pub fn insert(&mut self, spot: Spot) -> Result<(), TourError> {
        if self.index.contains_key(&spot.id) {
            return Err(TourError::DuplicateSpot(spot.id));
        }
        self.index.insert(spot.id.clone(), self.entries.len());
        self.entries.push(SpotEntry {
            spot,
            element_size: ESTIMATED_SPOT_SIZE,
            placement: Placement::Hidden,
            active: false,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Spot> {
        self.index.get(id).map(|&i| &self.entries[i].spot)
    }

    pub fn entries(&self) -> &[SpotEntry] {
        &self.entries
    }

    pub fn spots(&self) -> impl Iterator<Item = &Spot> {
        self.entries.iter().map(|e| &e.spot)
    }

    pub fn set_element_size(&mut self, id: &str, size: Vec2) {
        if let Some(&i) = self.index.get(id) {
            self.entries[i].element_size = size;
        }
    }

    /// Marks every spot that toggles `selector` as (in)active.
    pub fn set_active_for_target(&mut self, selector: &str, active: bool) {
        for entry in &mut self.entries {
            if entry.spot.audio_target() == Some(selector) {
                entry.active = active;
            }
        }
    }

    /// Recomputes every spot's placement for this frame's camera.
    pub fn update_positions(
        &mut self,
        camera: &CameraView,
        viewport: &Viewport,
        sphere_radius: f32,
        policy: CullPolicy,
    ) {
        for entry in &mut self.entries {
            let world = entry.spot.world_position(sphere_radius);
            entry.placement = project(world, camera, entry.element_size, viewport, policy);
        }
        log::trace!("{}/{} spots visible ({policy:?})", self.visible_count(), self.entries.len());
    }

    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.placement.is_visible()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{CameraOrientation, SceneHost};

    fn record(json: &str) -> SpotRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn record_type_selects_content_variant() {
        let photo = record(
            r##"{"id":"spot-foto-1","type":"photo","label":"Foto","media":"./img/foto1.jpg",
                "caption":"Rescate visual 1998","color":"#f97316","spherical":{"lon":35,"lat":8}}"##,
        )
        .into_spot(0, 1);
        assert_eq!(photo.id, "spot-foto-1");
        assert_eq!(photo.kind(), SpotKind::Photo);
        assert_eq!(
            photo.content,
            SpotContent::Photo {
                media: Some("./img/foto1.jpg".into()),
                caption: Some("Rescate visual 1998".into())
            }
        );
        assert_eq!(photo.position, SpotPosition::Spherical { lon: 35.0, lat: 8.0 });

        let gallery = record(
            r#"{"type":"gallery","items":[{"src":"a.jpg","alt":"A"},{"src":"b.jpg"}]}"#,
        )
        .into_spot(3, 42);
        assert_eq!(gallery.id, "spot-42-3");
        match gallery.content {
            SpotContent::Gallery { items, target } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].alt, "");
                assert!(target.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let odd = record(r#"{"id":"x","type":"video"}"#).into_spot(0, 0);
        assert_eq!(
            odd.content,
            SpotContent::Unknown {
                type_name: "video".into()
            }
        );
        assert_eq!(odd.label, DEFAULT_SPOT_LABEL);
        assert_eq!(odd.color, DEFAULT_SPOT_COLOR);
    }

    #[test]
    fn cartesian_is_normalized_and_scaled() {
        let spot = record(r#"{"id":"c","type":"photo","radius":5,"cartesian":[4.554,-0.954,-1.83]}"#)
            .into_spot(0, 0);
        let p = spot.world_position(10.0);
        assert!((p.length() - 5.0).abs() < 1e-4);

        let spot = record(r#"{"id":"d","type":"photo","cartesian":[0,2,0]}"#).into_spot(0, 0);
        assert!((spot.world_position(7.0) - Vec3::new(0.0, 7.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn markers_parse_attributes_leniently() {
        let mut attrs = HashMap::new();
        attrs.insert("data-type".to_string(), "audio".to_string());
        attrs.insert("data-target".to_string(), "#clip-a".to_string());
        attrs.insert("data-lon".to_string(), "12.5".to_string());
        attrs.insert("data-lat".to_string(), "north".to_string());
        let spot = Marker {
            id: None,
            text: Some("Clip".into()),
            attrs,
        }
        .into_spot(1, 99);

        assert_eq!(spot.id, "spot-99-1");
        assert_eq!(spot.label, "Clip");
        assert_eq!(spot.position, SpotPosition::Spherical { lon: 12.5, lat: 0.0 });
        assert_eq!(spot.audio_target(), Some("#clip-a"));

        let bare = Marker::default().into_spot(0, 0);
        assert_eq!(bare.label, DEFAULT_SPOT_LABEL);
        assert_eq!(bare.kind(), SpotKind::Unknown);
    }

    #[test]
    fn modal_title_prefers_label_then_title() {
        let mut spot = record(r#"{"id":"a","type":"photo","label":"Foto","title":"Archivo"}"#).into_spot(0, 0);
        assert_eq!(spot.modal_title("Spot"), "Foto");
        spot.label = DEFAULT_SPOT_LABEL.into();
        assert_eq!(spot.modal_title("Spot"), "Archivo");
        spot.title = None;
        assert_eq!(spot.modal_title("Spot"), "Spot");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let records = vec![
            record(r#"{"id":"same","type":"photo"}"#),
            record(r#"{"id":"same","type":"audio"}"#),
        ];
        match SpotRegistry::from_definitions(records, vec![]) {
            Err(TourError::DuplicateSpot(id)) => assert_eq!(id, "same"),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn update_positions_hides_spots_behind_camera() {
        let records = vec![
            // camera at lon=0 looks down -X, which is spot lon=-90
            record(r#"{"id":"ahead","type":"photo","spherical":{"lon":-90,"lat":0}}"#),
            record(r#"{"id":"behind","type":"photo","spherical":{"lon":90,"lat":0}}"#),
        ];
        let mut registry = SpotRegistry::from_definitions(records, vec![]).unwrap();
        let mut host = SceneHost::new(5.0);
        host.orientation = CameraOrientation::default();
        let vp = Viewport::fullscreen(1000.0, 500.0);
        let camera = host.update_frame(vp.aspect());

        registry.update_positions(&camera, &vp, host.sphere_radius, CullPolicy::DotProduct);
        let entries = registry.entries();
        assert!(entries[0].placement.is_visible());
        assert_eq!(entries[1].placement, Placement::Hidden);
        assert_eq!(registry.visible_count(), 1);
    }
}
