//! Trait for frame producers, plus a directory-of-images implementation.

use std::path::{Path, PathBuf};

use image::RgbImage;

/// Trait for anything that produces camera frames.
///
/// Implement this trait to feed a [`SensorPipeline`](super::SensorPipeline)
/// from a camera, a video decoder or stored images.
///
/// # Example
///
/// ```ignore
/// use angletrack_rs::FrameSource;
/// use image::RgbImage;
///
/// struct MyCamera {
///     // Device handle here
/// }
///
/// impl FrameSource for MyCamera {
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error> {
///         // Grab a frame, or return Ok(None) once the stream ends
///         Ok(None)
///     }
/// }
/// ```
pub trait FrameSource {
    /// Error type for acquisition failures.
    type Error;

    /// Produce the next frame.
    ///
    /// # Returns
    /// `Ok(Some(frame))` for a new frame, `Ok(None)` when the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error>;
}

/// Error type for [`ImageSequence`].
#[derive(thiserror::Error, Debug)]
pub enum ImageSequenceError {
    #[error("failed to read frame directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Frames stored as image files in one directory, replayed in file-name order.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequence {
    /// List the image files in `dir`. Files with other extensions are skipped.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ImageSequenceError> {
        let dir = dir.as_ref();
        let io_err = |source| ImageSequenceError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();

        log::info!("found {} frames in {}", paths.len(), dir.display());
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path of the frame returned by the latest `next_frame` call.
    pub fn current_path(&self) -> Option<&Path> {
        self.cursor.checked_sub(1).map(|i| self.paths[i].as_path())
    }
}

impl FrameSource for ImageSequence {
    type Error = ImageSequenceError;

    fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let frame = image::open(path)
            .map_err(|source| ImageSequenceError::Image {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        self.cursor += 1;
        Ok(Some(frame))
    }
}
