// panorama.rs - looping panorama clip: decoding, GPU fitting, playback clock

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::codecs::webp::WebPDecoder;
use image::io::Reader as ImageReader;
use image::{AnimationDecoder, DynamicImage, Frame, Rgba, RgbaImage};

use crate::error::TourError;

/// Shortest frame delay honoured; zero-delay GIFs would otherwise spin.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct PanoramaFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct PanoramaClip {
    pub source: PathBuf,
    pub frames: Vec<PanoramaFrame>,
}

impl PanoramaClip {
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn size(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.image.dimensions())
            .unwrap_or((0, 0))
    }
}

/// Downscales to the GPU limit, then pads the top with black so the texture
/// is 2:1 (panoramas shot without the zenith keep the horizon in place).
pub fn fit_for_gpu(img: RgbaImage, max_dim: u32) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    let img = if src_w > max_dim || src_h > max_dim {
        let scale = (max_dim as f32 / src_w.max(src_h) as f32).min(1.0);
        let new_w = ((src_w as f32 * scale) as u32).max(1);
        let new_h = ((src_h as f32 * scale) as u32).max(1);
        log::info!(
            "{}",
            crate::i18n::tr_with(
                "gpu.image_too_large_scaled",
                &[
                    ("src_w", src_w.to_string()),
                    ("src_h", src_h.to_string()),
                    ("max", max_dim.to_string()),
                    ("new_w", new_w.to_string()),
                    ("new_h", new_h.to_string()),
                ]
            )
        );
        DynamicImage::ImageRgba8(img)
            .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
            .to_rgba8()
    } else {
        img
    };

    let (w, h) = img.dimensions();
    let target_h = w / 2;
    if target_h > 0 && h < target_h {
        let mut canvas = RgbaImage::from_pixel(w, target_h, Rgba([0, 0, 0, 255]));
        image::imageops::replace(&mut canvas, &img, 0, i64::from(target_h - h));
        canvas
    } else {
        img
    }
}

fn frame_delay(frame: &Frame) -> Duration {
    let (numer, denom) = frame.delay().numer_denom_ms();
    let ms = if denom == 0 {
        0.0
    } else {
        numer as f64 / denom as f64
    };
    Duration::from_secs_f64(ms / 1000.0).max(MIN_FRAME_DELAY)
}

fn collect<'a>(decoder: impl AnimationDecoder<'a>, max_dim: u32) -> Result<Vec<PanoramaFrame>, TourError> {
    decoder
        .into_frames()
        .map(|frame| {
            let frame = frame?;
            let delay = frame_delay(&frame);
            Ok(PanoramaFrame {
                image: fit_for_gpu(frame.into_buffer(), max_dim),
                delay,
            })
        })
        .collect()
}

/// Decodes every frame of an animated GIF/WebP, or a still image as a
/// single frame.
pub fn decode_panorama(path: &Path, max_dim: u32) -> Result<PanoramaClip, TourError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let open = || File::open(path).map(BufReader::new).map_err(|e| TourError::io(path, e));

    let frames = match ext.as_str() {
        "gif" => collect(GifDecoder::new(open()?)?, max_dim)?,
        "webp" => collect(WebPDecoder::new(open()?)?, max_dim)?,
        _ => {
            let mut reader = ImageReader::new(open()?)
                .with_guessed_format()
                .map_err(|e| TourError::io(path, e))?;
            reader.no_limits();
            let img = reader.decode()?;
            vec![PanoramaFrame {
                image: fit_for_gpu(img.to_rgba8(), max_dim),
                delay: Duration::MAX,
            }]
        }
    };

    if frames.is_empty() {
        return Err(TourError::EmptyPanorama(path.to_path_buf()));
    }
    Ok(PanoramaClip {
        source: path.to_path_buf(),
        frames,
    })
}

/// Decodes off the UI thread; the result arrives on `tx`.
pub fn start_load_panorama(path: PathBuf, max_dim: u32, tx: Sender<Result<PanoramaClip, TourError>>) {
    thread::spawn(move || {
        log::info!(
            "{}",
            crate::i18n::tr_with("log.loading_panorama_bg", &[("path", path.display().to_string())])
        );
        let result = decode_panorama(&path, max_dim);
        if let Ok(clip) = &result {
            let (w, h) = clip.size();
            log::info!(
                "{}",
                crate::i18n::tr_with(
                    "log.panorama_loaded",
                    &[
                        ("w", w.to_string()),
                        ("h", h.to_string()),
                        ("frames", clip.frames.len().to_string()),
                    ]
                )
            );
        }
        if tx.send(result).is_err() {
            log::error!("{}", crate::i18n::tr("error.send_to_main_failed"));
        }
    });
}

/// Autoplaying, muted, looping playback of a clip. `advance` returns the
/// frame to upload when the visible frame changed.
#[derive(Debug)]
pub struct VideoPlayback {
    clip: PanoramaClip,
    index: usize,
    elapsed: Duration,
    uploaded: bool,
    pub looping: bool,
}

impl VideoPlayback {
    pub fn new(clip: PanoramaClip) -> Self {
        Self {
            clip,
            index: 0,
            elapsed: Duration::ZERO,
            uploaded: false,
            looping: true,
        }
    }

    pub fn clip(&self) -> &PanoramaClip {
        &self.clip
    }

    pub fn advance(&mut self, dt: Duration) -> Option<&RgbaImage> {
        let n = self.clip.frames.len();
        if n == 0 {
            return None;
        }
        let before = self.index;
        if self.clip.is_animated() {
            self.elapsed += dt;
            loop {
                let delay = self.clip.frames[self.index].delay;
                if self.elapsed < delay {
                    break;
                }
                if self.index + 1 == n && !self.looping {
                    self.elapsed = delay;
                    break;
                }
                self.elapsed -= delay;
                self.index = (self.index + 1) % n;
            }
        }
        if !self.uploaded || self.index != before {
            self.uploaded = true;
            Some(&self.clip.frames[self.index].image)
        } else {
            None
        }
    }
}
