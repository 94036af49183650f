use std::fmt;
use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;

use super::capture_backend::{CaptureBackend, FrameGrabber};
use super::capture_error::{DecodeError, OpenError, ReadError};
use super::device_id::DeviceId;
use super::still_image_reader::StillImageReader;

enum SessionHandle {
    Device(Box<dyn FrameGrabber>),
    Still(Frame),
}

/// Exclusive owner of one open frame source.
///
/// The handle is present iff the session is open. Closing takes the handle
/// out and drops it, so release happens at most once no matter how often
/// `close` runs; dropping the session closes it.
pub struct CaptureSession {
    device: DeviceId,
    handle: Option<SessionHandle>,
    frames_read: usize,
}

impl CaptureSession {
    /// Probes device indices `0..max_index` and returns the ones that open.
    ///
    /// Every probe session is closed before moving on.
    pub fn enumerate(backend: &dyn CaptureBackend, max_index: u32) -> Vec<DeviceId> {
        let mut available = Vec::new();
        for index in 0..max_index {
            let device = DeviceId::Index(index);
            match Self::open(backend, device.clone()) {
                Ok(mut session) => {
                    session.close();
                    available.push(device);
                }
                Err(e) => log::debug!("Probe skipped: {e}"),
            }
        }
        available
    }

    pub fn open(backend: &dyn CaptureBackend, device: DeviceId) -> Result<Self, OpenError> {
        let grabber = backend.open(&device)?;
        log::debug!("Opened {device}");
        Ok(Self {
            device,
            handle: Some(SessionHandle::Device(grabber)),
            frames_read: 0,
        })
    }

    /// Opens a file-backed session that yields the same still image on
    /// every read.
    pub fn open_still(reader: &dyn StillImageReader, path: &Path) -> Result<Self, DecodeError> {
        let frame = reader.read(path)?;
        log::debug!(
            "Loaded still image {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(Self {
            device: DeviceId::Path(PathBuf::from(path)),
            handle: Some(SessionHandle::Still(frame)),
            frames_read: 0,
        })
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_still(&self) -> bool {
        matches!(self.handle, Some(SessionHandle::Still(_)))
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Pulls the next frame. A miss is reported, never retried here; the
    /// caller decides whether it means device loss.
    pub fn read(&mut self) -> Result<Frame, ReadError> {
        let frame = match self.handle.as_mut() {
            Some(SessionHandle::Device(grabber)) => grabber.grab().ok_or(ReadError::NoFrame)?,
            Some(SessionHandle::Still(still)) => still.with_index(self.frames_read),
            None => return Err(ReadError::NoFrame),
        };
        self.frames_read += 1;
        Ok(frame)
    }

    /// Releases the handle. Idempotent.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            log::debug!("Closed {} after {} frames", self.device, self.frames_read);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("is_open", &self.is_open())
            .field("is_still", &self.is_still())
            .field("frames_read", &self.frames_read)
            .finish()
    }
}
