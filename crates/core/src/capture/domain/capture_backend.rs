use crate::shared::frame::Frame;

use super::capture_error::OpenError;
use super::device_id::DeviceId;

/// An open device handle. Dropping it releases the device.
pub trait FrameGrabber: Send {
    /// Next frame, or `None` when nothing could be read.
    fn grab(&mut self) -> Option<Frame>;
}

/// Opens capture devices.
///
/// Implementations handle the platform details (capture API, pixel format
/// conversion); sessions only ever see [`FrameGrabber`] handles.
pub trait CaptureBackend: Send {
    fn open(&self, device: &DeviceId) -> Result<Box<dyn FrameGrabber>, OpenError>;
}
