use std::path::PathBuf;

use thiserror::Error;

use super::device_id::DeviceId;

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("{device} is unavailable: {reason}")]
    DeviceUnavailable { device: DeviceId, reason: String },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// End of stream, a missed read, a disconnected device or a closed session.
    #[error("no frame available")]
    NoFrame,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{0} has zero width or height")]
    Empty(PathBuf),
}
