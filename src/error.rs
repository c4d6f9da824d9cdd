// error.rs - failure taxonomy for the tour

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while loading or wiring a tour.
#[derive(Error, Debug)]
pub enum TourError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tour file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("panorama {0} contains no frames")]
    EmptyPanorama(PathBuf),
    #[error("duplicate spot id: {0}")]
    DuplicateSpot(String),
    #[error("GPU setup failed: {0}")]
    Gpu(String),
    #[error("missing required resources: {}", .0.join(", "))]
    MissingResources(Vec<String>),
}

impl TourError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
