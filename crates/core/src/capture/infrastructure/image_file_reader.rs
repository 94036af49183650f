use std::path::Path;

use crate::capture::domain::capture_error::DecodeError;
use crate::capture::domain::still_image_reader::StillImageReader;
use crate::shared::frame::Frame;

/// Decodes still images with the `image` crate.
///
/// Any format the crate can sniff is accepted; the result is always packed
/// RGB regardless of the source colour type.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl StillImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, DecodeError> {
        if !path.is_file() {
            return Err(DecodeError::NotFound(path.to_path_buf()));
        }

        let image = image::open(path)
            .map_err(|source| DecodeError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Empty(path.to_path_buf()));
        }
        Ok(Frame::from_rgb_image(image, 0))
    }
}
