use std::path::Path;

use crate::shared::frame::Frame;

use super::capture_error::DecodeError;

/// Decodes a still image file into an RGB [`Frame`].
pub trait StillImageReader: Send {
    fn read(&self, path: &Path) -> Result<Frame, DecodeError>;
}
