//! Decoding of reference images on demand.

use anyhow::Context;
use image::RgbaImage;
use tracing::debug;

use crate::playback::ImageSource;

/// Decodes image files into RGBA buffers with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageSource;

impl ImageSource for FileImageSource {
    type Image = RgbaImage;

    fn decode(&mut self, path: &str) -> anyhow::Result<RgbaImage> {
        let img = image::ImageReader::open(path)
            .with_context(|| format!("failed to open {path}"))?
            .with_guessed_format()? // sniff based on content, not only extension
            .decode()
            .with_context(|| format!("failed to decode {path}"))?;
        let img = img.to_rgba8();
        debug!(path, width = img.width(), height = img.height(), "decoded image");
        Ok(img)
    }
}
