// modal.rs - content dialog state machine (closed <-> open)

use std::collections::HashMap;

use crate::gallery::Carousel;
use crate::scene::SceneHost;
use crate::spot::{AudioTrack, GalleryItem, Spot, SpotContent};

#[derive(Debug, Clone, PartialEq)]
pub enum ModalContent {
    Photo {
        media: Option<String>,
        caption: Option<String>,
    },
    Gallery(Carousel),
    Audio {
        tracks: Vec<AudioTrack>,
    },
    /// Unrecognised spot type or a gallery target that does not exist.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenModal {
    pub spot_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: ModalContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Backdrop,
    Escape,
    Command,
}

#[derive(Debug, Default)]
pub struct ModalPresenter {
    open: Option<OpenModal>,
    default_title: String,
}

impl ModalPresenter {
    pub fn new(default_title: impl Into<String>) -> Self {
        Self {
            open: None,
            default_title: default_title.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn current(&self) -> Option<&OpenModal> {
        self.open.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut OpenModal> {
        self.open.as_mut()
    }

    /// Opens (or re-targets) the dialog for `spot`. Previous content is dropped
    /// wholesale, so nothing from the last spot survives.
    pub fn open(
        &mut self,
        spot: &Spot,
        galleries: &HashMap<String, Vec<GalleryItem>>,
        scene: &mut SceneHost,
    ) {
        let content = render_content(spot, galleries);
        log::debug!("modal open for {}", spot.id);
        self.open = Some(OpenModal {
            spot_id: spot.id.clone(),
            title: spot.modal_title(&self.default_title).to_string(),
            description: spot.description.clone(),
            content,
        });
        scene.set_modal_open(true);
    }

    /// Returns false when already closed.
    pub fn close(&mut self, scene: &mut SceneHost, reason: CloseReason) -> bool {
        if self.open.take().is_none() {
            return false;
        }
        log::debug!("modal closed ({reason:?})");
        scene.set_modal_open(false);
        true
    }

    pub fn handle_escape(&mut self, scene: &mut SceneHost) -> bool {
        self.close(scene, CloseReason::Escape)
    }

    /// Clicks inside the dialog never close it.
    pub fn handle_backdrop_click(&mut self, inside_dialog: bool, scene: &mut SceneHost) -> bool {
        if inside_dialog {
            return false;
        }
        self.close(scene, CloseReason::Backdrop)
    }
}

fn render_content(spot: &Spot, galleries: &HashMap<String, Vec<GalleryItem>>) -> ModalContent {
    match &spot.content {
        SpotContent::Photo { media, caption } => ModalContent::Photo {
            media: media.clone(),
            caption: caption.clone(),
        },
        SpotContent::Gallery { items, target } => {
            let items = if !items.is_empty() {
                items.clone()
            } else {
                target
                    .as_ref()
                    .and_then(|t| galleries.get(t))
                    .cloned()
                    .unwrap_or_default()
            };
            if items.is_empty() {
                log::warn!("gallery for spot {} has no items", spot.id);
                ModalContent::Placeholder
            } else {
                ModalContent::Gallery(Carousel::new(items))
            }
        }
        SpotContent::Audio { tracks, .. } => ModalContent::Audio {
            tracks: tracks.clone(),
        },
        SpotContent::Unknown { .. } => ModalContent::Placeholder,
    }
}
