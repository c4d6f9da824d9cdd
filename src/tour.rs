// tour.rs - wires spots, router, modal and audio into one interactive tour

use std::collections::{BTreeSet, HashMap};

use glam::Vec2;

use crate::audio::{AudioBackend, AudioCycle, AudioPresenter};
use crate::authoring::{self, SpotSnippet};
use crate::config::{TourConfig, ValidationReport};
use crate::error::TourError;
use crate::modal::{CloseReason, ModalPresenter};
use crate::projector::{CullPolicy, Viewport};
use crate::router::{ClickEvent, Command, ContentRouter};
use crate::scene::{CameraView, SceneHost};
use crate::spot::{now_millis, GalleryItem, Spot, SpotKind, SpotRegistry};

/// Pointer travel below which a press/release pair counts as a click.
const CLICK_SLOP: f32 = 3.0;

/// Everything a routed click may act on.
pub struct Presenters {
    pub scene: SceneHost,
    pub modal: ModalPresenter,
    pub audio: AudioPresenter,
    pub galleries: HashMap<String, Vec<GalleryItem>>,
    pub enable_modal: bool,
}

impl Presenters {
    pub fn open_spot_modal(&mut self, spot: &Spot) {
        if !self.enable_modal {
            log::debug!("modal disabled, ignoring {}", spot.id);
            return;
        }
        self.modal.open(spot, &self.galleries, &mut self.scene);
    }

    pub fn close_spot_modal(&mut self, reason: CloseReason) -> bool {
        self.modal.close(&mut self.scene, reason)
    }

    pub fn toggle_spot_audio(&mut self, spot: &Spot) {
        match spot.audio_target() {
            Some(target) => {
                self.audio.toggle(target);
            }
            None => log::warn!("spot {} has no audio target", spot.id),
        }
    }
}

fn build_router() -> ContentRouter<Presenters> {
    let mut router = ContentRouter::new();
    router.register_manager(SpotKind::Photo, |p: &mut Presenters, spot, _| p.open_spot_modal(spot));
    router.register_manager(SpotKind::Gallery, |p: &mut Presenters, spot, _| p.open_spot_modal(spot));
    router.register_manager(SpotKind::Audio, |p: &mut Presenters, spot, _| {
        if spot.audio_target().is_some() {
            p.toggle_spot_audio(spot);
        } else {
            p.open_spot_modal(spot);
        }
    });
    // unknown types still get a dialog, with placeholder content
    router.register_manager(SpotKind::Unknown, |p: &mut Presenters, spot, _| p.open_spot_modal(spot));

    router.on_command(Command::OpenSpotModal, |p: &mut Presenters, spot, _| match spot {
        Some(spot) => p.open_spot_modal(spot),
        None => log::warn!("--open-spot-modal without a spot"),
    });
    router.on_command(Command::CloseSpotModal, |p: &mut Presenters, _, _| {
        p.close_spot_modal(CloseReason::Command);
    });
    router.on_command(Command::ToggleAudio, |p: &mut Presenters, spot, _| match spot {
        Some(spot) => p.toggle_spot_audio(spot),
        None => log::warn!("--toggle-audio without a spot"),
    });
    router
}

pub struct Tour {
    pub config: TourConfig,
    pub spots: SpotRegistry,
    pub presenters: Presenters,
    pub cull_policy: CullPolicy,
    pub marker_mode: bool,
    pub last_pick: Option<SpotSnippet>,
    pub intro_visible: bool,
    pub warnings: Vec<String>,
    router: ContentRouter<Presenters>,
    audio_targets: BTreeSet<String>,
    press: Option<Vec2>,
    last_frame: Option<(CameraView, Viewport)>,
}

impl Tour {
    pub fn new(
        config: TourConfig,
        report: ValidationReport,
        backend: Box<dyn AudioBackend>,
    ) -> Result<Self, TourError> {
        let spots = SpotRegistry::from_definitions(config.spots.clone(), config.markers.clone())?;
        let audio_targets = spots
            .spots()
            .filter_map(|s| s.audio_target().map(str::to_string))
            .collect();

        let cycle = (config.audio.ambient.is_some() || !config.audio.interviews.is_empty()).then(|| {
            AudioCycle::new(config.audio.ambient.clone(), config.audio.interviews.clone())
        });
        let audio = AudioPresenter::new(backend, config.audio_library(), cycle);

        let presenters = Presenters {
            scene: SceneHost::new(config.sphere_radius),
            modal: ModalPresenter::new(crate::i18n::tr("modal.default_title")),
            audio,
            galleries: config.galleries.clone(),
            enable_modal: config.enable_modal,
        };

        Ok(Self {
            cull_policy: config.cull_policy,
            intro_visible: config.intro.is_some(),
            config,
            spots,
            presenters,
            marker_mode: false,
            last_pick: None,
            warnings: report.warnings,
            router: build_router(),
            audio_targets,
            press: None,
            last_frame: None,
        })
    }

    /// Starts the ambient loop; call once the window is up.
    pub fn start(&mut self) {
        self.presenters.audio.start_ambient();
    }

    /// Camera first, then spots, then audio outcomes.
    pub fn frame(&mut self, viewport: &Viewport) -> CameraView {
        let camera = self.presenters.scene.update_frame(viewport.aspect());
        self.spots
            .update_positions(&camera, viewport, self.config.sphere_radius, self.cull_policy);

        self.presenters.audio.poll();
        for target in &self.audio_targets {
            let active = self.presenters.audio.is_active(target);
            self.spots.set_active_for_target(target, active);
        }

        self.last_frame = Some((camera, *viewport));
        camera
    }

    pub fn click_spot(&mut self, id: &str, pos: Vec2) -> bool {
        let Some(spot) = self.spots.get(id) else {
            log::warn!("click on unknown spot {id}");
            return false;
        };
        let event = ClickEvent { pos };
        self.router.handle_spot_click(&mut self.presenters, spot, &event)
    }

    pub fn dispatch_attr(&mut self, attr: &str, spot_id: Option<&str>, pos: Vec2) -> bool {
        let spot = spot_id.and_then(|id| self.spots.get(id));
        let event = ClickEvent { pos };
        self.router.dispatch_attr(&mut self.presenters, attr, spot, &event)
    }

    /// Click on the dimmed layer around the dialog.
    pub fn backdrop_click(&mut self, inside_dialog: bool) -> bool {
        let Presenters { modal, scene, .. } = &mut self.presenters;
        modal.handle_backdrop_click(inside_dialog, scene)
    }

    /// Play/pause a track listed inside an audio dialog.
    pub fn toggle_track(&mut self, src: &str) -> bool {
        let path = self.config.resolve(src);
        self.presenters.audio.toggle_path(&path)
    }

    pub fn is_track_active(&self, src: &str) -> bool {
        let path = self.config.resolve(src);
        self.presenters.audio.is_active(&path.display().to_string())
    }

    pub fn resolve_media(&self, media: &str) -> std::path::PathBuf {
        self.config.resolve(media)
    }

    pub fn dismiss_intro(&mut self) {
        self.intro_visible = false;
    }

    /// Press on the bare panorama (overlay widgets did not take it).
    pub fn pointer_pressed(&mut self, pos: Vec2) {
        if self.intro_visible || self.presenters.modal.is_open() {
            return;
        }
        self.press = Some(pos);
        self.presenters.scene.pointer_down(pos);
    }

    pub fn pointer_moved(&mut self, pos: Vec2) {
        self.presenters.scene.pointer_move(pos);
    }

    pub fn pointer_released(&mut self, pos: Vec2) {
        self.presenters.scene.pointer_up();
        let Some(start) = self.press.take() else {
            return;
        };
        if self.marker_mode && start.distance(pos) < CLICK_SLOP {
            self.pick_marker(pos);
        }
    }

    pub fn pointer_left(&mut self) {
        self.press = None;
        self.presenters.scene.pointer_up();
    }

    pub fn key_escape(&mut self) -> bool {
        self.presenters.modal.handle_escape(&mut self.presenters.scene)
    }

    fn pick_marker(&mut self, pos: Vec2) {
        let Some((camera, viewport)) = &self.last_frame else {
            return;
        };
        self.last_pick = authoring::pick(pos, camera, viewport, self.config.sphere_radius, now_millis());
    }

    pub fn panorama_path(&self) -> std::path::PathBuf {
        self.config.panorama_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakeBackend;
    use crate::audio::PlaybackStatus;
    use crate::modal::ModalContent;
    use std::path::PathBuf;

    const TOUR: &str = r##"{
        "panorama": "video/pasaje.gif",
        "spots": [
            {"id": "s1", "type": "audio", "target": "#clip-a", "spherical": {"lon": -90, "lat": 0}},
            {"id": "foto", "type": "photo", "label": "Foto", "media": "img/foto1.jpg", "spherical": {"lon": 90, "lat": 0}},
            {"id": "g", "type": "gallery", "target": "#galeria-1", "spherical": {"lon": 0, "lat": 0}},
            {"id": "voces", "type": "audio", "audios": [{"title": "Testimonio", "src": "audio/t.mp3"}]}
        ],
        "markers": [
            {"text": "Entrada", "attrs": {"data-type": "photo", "data-lon": "-80", "data-lat": "2"}}
        ],
        "galleries": {"#galeria-1": [{"src": "img/a.jpg", "alt": "A"}, {"src": "img/b.jpg", "alt": "B"}]},
        "audio": {"elements": {"#clip-a": "audio/clip-a.mp3"}},
        "intro": {"title": "Pasaje"}
    }"##;

    fn tour(backend: &FakeBackend) -> Tour {
        let config = TourConfig::from_json_str(TOUR, PathBuf::from("tour")).unwrap();
        let mut t = Tour::new(config, ValidationReport::default(), Box::new(backend.clone())).unwrap();
        t.dismiss_intro();
        t
    }

    fn viewport() -> Viewport {
        Viewport::fullscreen(800.0, 600.0)
    }

    #[test]
    fn audio_spot_toggles_its_target() {
        let backend = FakeBackend::default();
        let mut t = tour(&backend);

        assert!(t.click_spot("s1", Vec2::ZERO));
        t.frame(&viewport());
        let clip = backend.state("tour/audio/clip-a.mp3");
        assert!(clip.playing);
        assert_eq!(clip.current_time, 0.0);
        assert!(t.spots.entries().iter().any(|e| e.spot.id == "s1" && e.active));
        assert!(!t.presenters.modal.is_open());

        t.click_spot("s1", Vec2::ZERO);
        t.frame(&viewport());
        assert!(!backend.state("tour/audio/clip-a.mp3").playing);
        assert!(!t.spots.entries().iter().any(|e| e.active));
    }

    #[test]
    fn photo_spot_opens_modal_and_locks_the_scene() {
        let backend = FakeBackend::default();
        let mut t = tour(&backend);
        t.click_spot("foto", Vec2::ZERO);
        assert_eq!(t.presenters.modal.current().unwrap().spot_id, "foto");
        assert!(t.presenters.scene.is_modal_open());

        t.pointer_pressed(Vec2::new(100.0, 100.0));
        t.pointer_moved(Vec2::new(10.0, 100.0));
        assert_eq!(t.presenters.scene.orientation.lon, 0.0);

        assert!(t.key_escape());
        assert!(!t.key_escape());
        assert!(!t.presenters.scene.is_modal_open());
    }

    #[test]
    fn commands_route_through_the_registry() {
        let backend = FakeBackend::default();
        let mut t = tour(&backend);
        assert!(t.dispatch_attr("--open-spot-modal", Some("g"), Vec2::ZERO));
        match &t.presenters.modal.current().unwrap().content {
            ModalContent::Gallery(c) => assert_eq!(c.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!t.backdrop_click(true));
        assert!(t.dispatch_attr("--close-spot-modal", None, Vec2::ZERO));
        assert!(!t.presenters.modal.is_open());
        assert!(!t.dispatch_attr("--reload", None, Vec2::ZERO));

        assert!(t.dispatch_attr("--toggle-audio", Some("s1"), Vec2::ZERO));
        assert_eq!(t.presenters.audio.status("#clip-a"), PlaybackStatus::Pending);
    }

    #[test]
    fn audio_spot_without_target_lists_tracks() {
        let backend = FakeBackend::default();
        let mut t = tour(&backend);
        t.click_spot("voces", Vec2::ZERO);
        assert!(matches!(
            t.presenters.modal.current().unwrap().content,
            ModalContent::Audio { .. }
        ));
        assert!(t.toggle_track("audio/t.mp3"));
        t.frame(&viewport());
        assert!(t.is_track_active("audio/t.mp3"));
        assert!(t.backdrop_click(false));
        assert!(t.is_track_active("audio/t.mp3"));
    }

    #[test]
    fn disabled_modal_ignores_content_clicks() {
        let backend = FakeBackend::default();
        let mut config = TourConfig::from_json_str(TOUR, PathBuf::new()).unwrap();
        config.enable_modal = false;
        let mut t = Tour::new(config, ValidationReport::default(), Box::new(backend)).unwrap();
        t.click_spot("foto", Vec2::ZERO);
        assert!(!t.presenters.modal.is_open());
    }

    #[test]
    fn markers_join_the_registry() {
        let backend = FakeBackend::default();
        let t = tour(&backend);
        assert_eq!(t.spots.len(), 5);
        assert!(t.spots.spots().any(|s| s.label == "Entrada"));
    }

    #[test]
    fn spots_behind_the_camera_are_hidden() {
        let backend = FakeBackend::default();
        let mut t = tour(&backend);
        t.frame(&viewport());
        let placement = |id: &str| {
            t.spots
                .entries()
                .iter()
                .find(|e| e.spot.id == id)
                .map(|e| e.placement.is_visible())
        };
        assert_eq!(placement("s1"), Some(true));
        assert_eq!(placement("foto"), Some(false));
    }

    #[test]
    fn intro_blocks_dragging_until_dismissed() {
        let backend = FakeBackend::default();
        let config = TourConfig::from_json_str(TOUR, PathBuf::new()).unwrap();
        let mut t = Tour::new(config, ValidationReport::default(), Box::new(backend)).unwrap();
        assert!(t.intro_visible);
        t.pointer_pressed(Vec2::new(100.0, 100.0));
        t.pointer_moved(Vec2::new(60.0, 100.0));
        assert_eq!(t.presenters.scene.orientation.lon, 0.0);

        t.dismiss_intro();
        t.pointer_pressed(Vec2::new(100.0, 100.0));
        t.pointer_moved(Vec2::new(60.0, 100.0));
        assert!((t.presenters.scene.orientation.lon - 4.0).abs() < 1e-5);
    }

    #[test]
    fn marker_mode_turns_a_click_into_a_snippet() {
        let backend = FakeBackend::default();
        let mut t = tour(&backend);
        t.marker_mode = true;
        t.frame(&viewport());
        t.pointer_pressed(Vec2::new(400.0, 300.0));
        t.pointer_released(Vec2::new(401.0, 300.0));
        let pick = t.last_pick.clone().unwrap();
        assert!(pick.id.starts_with("spot-"));

        t.last_pick = None;
        t.pointer_pressed(Vec2::new(400.0, 300.0));
        t.pointer_moved(Vec2::new(300.0, 300.0));
        t.pointer_released(Vec2::new(300.0, 300.0));
        assert!(t.last_pick.is_none());
    }
}
