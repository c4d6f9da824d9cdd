// config.rs - tour file loading and startup validation

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TourError;
use crate::projector::CullPolicy;
use crate::scene::DEFAULT_SPHERE_RADIUS;
use crate::spot::{GalleryItem, Marker, SpotContent, SpotKind, SpotRecord};

fn default_radius() -> f32 {
    DEFAULT_SPHERE_RADIUS
}

fn default_true() -> bool {
    true
}

/// Named audio elements plus the ambient/interview cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    /// selector (e.g. `#ambient-audio`) -> file
    #[serde(default)]
    pub elements: HashMap<String, String>,
    #[serde(default)]
    pub ambient: Option<String>,
    #[serde(default)]
    pub interviews: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroConfig {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourConfig {
    #[serde(default = "default_radius")]
    pub sphere_radius: f32,
    #[serde(default = "default_true")]
    pub enable_modal: bool,
    /// Looping panorama source (animated GIF/WebP or a still image).
    #[serde(default)]
    pub panorama: String,
    #[serde(default)]
    pub cull_policy: CullPolicy,
    #[serde(default)]
    pub spots: Vec<SpotRecord>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// selector -> items; gallery spots may point here through `target`
    #[serde(default)]
    pub galleries: HashMap<String, Vec<GalleryItem>>,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub intro: Option<IntroConfig>,
    /// Directory relative media paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Non-fatal findings from [`TourConfig::validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

impl TourConfig {
    pub fn load(path: &Path) -> Result<Self, TourError> {
        let text = std::fs::read_to_string(path).map_err(|e| TourError::io(path, e))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json_str(&text, base_dir).map_err(|source| TourError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(text: &str, base_dir: PathBuf) -> Result<Self, serde_json::Error> {
        let mut config: TourConfig = serde_json::from_str(text)?;
        config.base_dir = base_dir;
        if !(config.sphere_radius.is_finite() && config.sphere_radius > 0.0) {
            log::warn!(
                "sphere_radius {} is not usable, falling back to {}",
                config.sphere_radius,
                DEFAULT_SPHERE_RADIUS
            );
            config.sphere_radius = DEFAULT_SPHERE_RADIUS;
        }
        Ok(config)
    }

    /// Resolves a media reference against the tour directory. Remote URLs pass through.
    pub fn resolve(&self, media: &str) -> PathBuf {
        let p = Path::new(media);
        if is_remote(media) || p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn panorama_path(&self) -> PathBuf {
        self.resolve(&self.panorama)
    }

    /// Selector -> resolved path for every named audio element.
    pub fn audio_library(&self) -> HashMap<String, PathBuf> {
        self.audio
            .elements
            .iter()
            .map(|(sel, path)| (sel.clone(), self.resolve(path)))
            .collect()
    }

    pub fn validate(&self) -> Result<ValidationReport, TourError> {
        self.validate_with(|p| p.exists())
    }

    /// Checks every referenced resource once. Required ones are collected into a
    /// single error; optional ones become warnings.
    pub fn validate_with(&self, exists: impl Fn(&Path) -> bool) -> Result<ValidationReport, TourError> {
        let mut missing = Vec::new();
        let mut report = ValidationReport::default();

        let mut check_file = |media: &str, what: String, required: bool, report: &mut ValidationReport| {
            if is_remote(media) {
                return;
            }
            if media.trim().is_empty() || !exists(&self.resolve(media)) {
                let msg = format!("{what} ({media})");
                if required {
                    missing.push(msg);
                } else {
                    report.warnings.push(msg);
                }
            }
        };

        check_file(&self.panorama, "panorama".to_string(), true, &mut report);

        let mut cycle_refs: Vec<(&str, &str)> = Vec::new();
        if let Some(ambient) = &self.audio.ambient {
            cycle_refs.push(("ambient audio", ambient.as_str()));
        }
        for sel in &self.audio.interviews {
            cycle_refs.push(("interview audio", sel.as_str()));
        }

        for (sel, path) in &self.audio.elements {
            check_file(path, format!("audio element {sel}"), false, &mut report);
        }

        for record in &self.spots {
            let id = record.id.as_deref().unwrap_or("<unnamed>");
            match SpotKind::parse(&record.kind) {
                SpotKind::Photo => {
                    if let Some(media) = &record.media {
                        check_file(media, format!("photo for spot {id}"), false, &mut report);
                    }
                }
                SpotKind::Gallery => {
                    for item in record.items.iter().flatten() {
                        check_file(&item.src, format!("gallery item for spot {id}"), false, &mut report);
                    }
                }
                SpotKind::Audio => {
                    for track in record.audios.iter().flatten() {
                        check_file(&track.src, format!("audio track for spot {id}"), false, &mut report);
                    }
                }
                SpotKind::Unknown => {}
            }
        }

        for items in self.galleries.values() {
            for item in items {
                check_file(&item.src, "gallery item".to_string(), false, &mut report);
            }
        }

        for (what, sel) in cycle_refs {
            if !self.audio.elements.contains_key(sel) {
                missing.push(format!("{what} element {sel}"));
            }
        }

        self.check_targets(&mut report);

        if !missing.is_empty() {
            return Err(TourError::MissingResources(missing));
        }
        for w in &report.warnings {
            log::warn!("missing optional resource: {w}");
        }
        Ok(report)
    }

    fn check_targets(&self, report: &mut ValidationReport) {
        let millis = 0;
        let records = self.spots.iter().cloned().enumerate().map(|(i, r)| r.into_spot(i, millis));
        let markers = self.markers.iter().cloned().enumerate().map(|(i, m)| m.into_spot(i, millis));
        for spot in records.chain(markers) {
            match &spot.content {
                SpotContent::Gallery {
                    items,
                    target: Some(target),
                } if items.is_empty() && !self.galleries.contains_key(target) => {
                    report
                        .warnings
                        .push(format!("gallery {target} for spot {}", spot.id));
                }
                SpotContent::Audio {
                    target: Some(target),
                    ..
                } if !self.audio.elements.contains_key(target) => {
                    report
                        .warnings
                        .push(format!("audio element {target} for spot {}", spot.id));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOUR: &str = r##"{
        "panorama": "video/pasaje.gif",
        "cull_policy": "depth",
        "spots": [
            {"id": "spot-foto-1", "type": "photo", "media": "img/foto1.jpg", "spherical": {"lon": 35, "lat": 8}},
            {"id": "s1", "type": "audio", "target": "#clip-a"},
            {"id": "g", "type": "gallery", "target": "#galeria-1"}
        ],
        "galleries": {"#galeria-1": [{"src": "img/foto2.jpg", "alt": "Detalle 1"}]},
        "audio": {
            "elements": {"#ambient-audio": "audio/ambiente.mp3", "#clip-a": "audio/clip-a.mp3"},
            "ambient": "#ambient-audio",
            "interviews": ["#clip-a"]
        }
    }"##;

    fn config() -> TourConfig {
        TourConfig::from_json_str(TOUR, PathBuf::from("tour")).unwrap()
    }

    #[test]
    fn defaults_and_overrides_are_parsed() {
        let c = config();
        assert_eq!(c.sphere_radius, DEFAULT_SPHERE_RADIUS);
        assert!(c.enable_modal);
        assert_eq!(c.cull_policy, CullPolicy::Depth);
        assert_eq!(c.spots.len(), 3);
        assert_eq!(c.panorama_path(), PathBuf::from("tour").join("video/pasaje.gif"));
        assert_eq!(c.resolve("https://cdn.example/a.mp3"), PathBuf::from("https://cdn.example/a.mp3"));
    }

    #[test]
    fn bad_radius_falls_back() {
        let c = TourConfig::from_json_str(r#"{"sphere_radius": -2, "panorama": "p.png"}"#, PathBuf::new()).unwrap();
        assert_eq!(c.sphere_radius, DEFAULT_SPHERE_RADIUS);
    }

    #[test]
    fn everything_present_validates_cleanly() {
        let report = config().validate_with(|_| true).unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn missing_optional_media_only_warns() {
        let report = config()
            .validate_with(|p| !p.ends_with("img/foto1.jpg"))
            .unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("spot-foto-1"));
    }

    #[test]
    fn missing_required_resources_are_listed_together() {
        let mut c = config();
        c.audio.elements.remove("#ambient-audio");
        match c.validate_with(|p| !p.ends_with("video/pasaje.gif")) {
            Err(TourError::MissingResources(list)) => {
                assert_eq!(list.len(), 2, "{list:?}");
                assert!(list[0].contains("panorama"));
                assert!(list[1].contains("#ambient-audio"));
            }
            other => panic!("expected missing resources, got {other:?}"),
        }
    }

    #[test]
    fn dangling_targets_are_reported() {
        let mut c = config();
        c.galleries.clear();
        c.audio.elements.remove("#clip-a");
        c.audio.interviews.clear();
        let report = c.validate_with(|_| true).unwrap();
        assert_eq!(report.warnings.len(), 2, "{:?}", report.warnings);
    }
}
