use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

#[derive(Error, Debug)]
pub enum ImageSourceError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {0} has no pixels")]
    Empty(PathBuf),
}

/// A still image served as an unchanging frame source.
pub struct ImageFileSource {
    frame: Frame,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self, ImageSourceError> {
        let img = image::open(path)
            .map_err(|e| ImageSourceError::Open {
                path: path.to_path_buf(),
                source: e,
            })?
            .to_rgb8();
        if img.width() == 0 || img.height() == 0 {
            return Err(ImageSourceError::Empty(path.to_path_buf()));
        }
        log::debug!(
            "Loaded {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        Ok(Self::from_frame(Frame::from_rgb_image(img, 0)))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl FrameSource for ImageFileSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.frame.dimensions())
    }

    fn snapshot(&self) -> Option<Frame> {
        Some(self.frame.clone())
    }
}
