// media.rs - photo/gallery images decoded off-thread into egui textures

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use egui::{ColorImage, TextureHandle, TextureOptions};
use image::GenericImageView;

/// Modal images never need more than this on their long edge.
pub const MAX_MEDIA_DIM: u32 = 2048;

pub enum MediaSlot {
    Loading,
    Ready(TextureHandle),
    Failed(String),
}

type Decoded = (PathBuf, Result<ColorImage, String>);

pub struct ImageCache {
    slots: HashMap<PathBuf, MediaSlot>,
    tx: Sender<Decoded>,
    rx: Receiver<Decoded>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            slots: HashMap::new(),
            tx,
            rx,
        }
    }

    /// Returns the slot for `path`, starting a background decode on first use.
    pub fn get(&mut self, path: PathBuf) -> &MediaSlot {
        if !self.slots.contains_key(&path) {
            start_decode(path.clone(), self.tx.clone());
        }
        self.slots.entry(path).or_insert(MediaSlot::Loading)
    }

    /// Moves finished decodes into textures. Call once per frame with the UI context.
    pub fn poll(&mut self, ctx: &egui::Context) {
        while let Ok((path, result)) = self.rx.try_recv() {
            let slot = match result {
                Ok(image) => {
                    let name = path.display().to_string();
                    MediaSlot::Ready(ctx.load_texture(name, image, TextureOptions::LINEAR))
                }
                Err(e) => {
                    log::warn!("{}", crate::i18n::tr_with("error.decode_image", &[("err", e.clone())]));
                    MediaSlot::Failed(e)
                }
            };
            self.slots.insert(path, slot);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

fn start_decode(path: PathBuf, tx: Sender<Decoded>) {
    thread::spawn(move || {
        let result = image::open(&path)
            .map_err(|e| format!("{}: {e}", path.display()))
            .map(|img| {
                let (w, h) = img.dimensions();
                let img = if w.max(h) > MAX_MEDIA_DIM {
                    img.thumbnail(MAX_MEDIA_DIM, MAX_MEDIA_DIM)
                } else {
                    img
                };
                let rgba = img.to_rgba8();
                ColorImage::from_rgba_unmultiplied(
                    [rgba.width() as usize, rgba.height() as usize],
                    rgba.as_raw(),
                )
            });
        let _ = tx.send((path, result));
    });
}
