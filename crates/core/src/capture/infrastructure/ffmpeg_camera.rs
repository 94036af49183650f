use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::capture_backend::{CaptureBackend, FrameGrabber};
use crate::capture::domain::capture_error::OpenError;
use crate::capture::domain::device_id::DeviceId;
use crate::shared::constants::{DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_SIZE};
use crate::shared::frame::Frame;

#[cfg(target_os = "linux")]
const DEVICE_FORMAT: Option<&str> = Some("v4l2");
#[cfg(target_os = "macos")]
const DEVICE_FORMAT: Option<&str> = Some("avfoundation");
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
const DEVICE_FORMAT: Option<&str> = None;

/// Opens cameras through libavdevice.
///
/// Numbered devices go through the platform capture format (`v4l2` on
/// Linux, `avfoundation` on macOS). Path devices are handed to libavformat
/// as-is, so a device node, a video file or a stream URL all work.
#[derive(Clone, Debug)]
pub struct FfmpegCameraBackend {
    capture_size: (u32, u32),
    fps: u32,
}

impl FfmpegCameraBackend {
    pub fn new(capture_size: (u32, u32), fps: u32) -> Self {
        Self { capture_size, fps }
    }

    fn device_options(&self) -> ffmpeg_next::Dictionary<'static> {
        let mut options = ffmpeg_next::Dictionary::new();
        let (w, h) = self.capture_size;
        options.set("video_size", &format!("{w}x{h}"));
        options.set("framerate", &self.fps.to_string());
        options
    }

    fn open_input(
        &self,
        device: &DeviceId,
    ) -> Result<ffmpeg_next::format::context::Input, String> {
        ffmpeg_next::init().map_err(|e| e.to_string())?;

        match device {
            DeviceId::Index(index) => {
                let format_name = DEVICE_FORMAT
                    .ok_or("numbered devices are not supported on this platform")?;
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == format_name)
                    .ok_or_else(|| format!("capture format {format_name} is not available"))?;
                let url = device_url(*index);
                ffmpeg_next::format::open_with(&url, &format, self.device_options())
                    .map(|ctx| ctx.input())
                    .map_err(|e| e.to_string())
            }
            DeviceId::Path(path) => open_path(path),
        }
    }
}

impl Default for FfmpegCameraBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_SIZE, DEFAULT_CAPTURE_FPS)
    }
}

impl CaptureBackend for FfmpegCameraBackend {
    fn open(&self, device: &DeviceId) -> Result<Box<dyn FrameGrabber>, OpenError> {
        let unavailable = |reason: String| OpenError::DeviceUnavailable {
            device: device.clone(),
            reason,
        };

        let input = self.open_input(device).map_err(unavailable)?;
        let grabber = FfmpegGrabber::new(input).map_err(unavailable)?;
        log::info!(
            "Opened {device} ({}x{})",
            grabber.decoder.width(),
            grabber.decoder.height()
        );
        Ok(Box::new(grabber))
    }
}

#[cfg(target_os = "macos")]
fn device_url(index: u32) -> String {
    format!("{index}:none")
}

#[cfg(not(target_os = "macos"))]
fn device_url(index: u32) -> String {
    format!("/dev/video{index}")
}

fn open_path(path: &Path) -> Result<ffmpeg_next::format::context::Input, String> {
    ffmpeg_next::format::input(&path).map_err(|e| e.to_string())
}

/// An open libavformat input decoding its best video stream to RGB24.
///
/// Dropping the grabber closes the input and releases the device.
pub struct FfmpegGrabber {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<(scaling::Context, (Pixel, u32, u32))>,
    video_stream_index: usize,
    frame_index: usize,
    eof: bool,
}

// Safety: FfmpegGrabber is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegGrabber {}

impl FfmpegGrabber {
    fn new(input: ffmpeg_next::format::context::Input) -> Result<Self, String> {
        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("no video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| e.to_string())?;
        let decoder = codec_ctx.decoder().video().map_err(|e| e.to_string())?;

        Ok(Self {
            input,
            decoder,
            scaler: None,
            video_stream_index,
            frame_index: 0,
            eof: false,
        })
    }

    fn try_receive(&mut self) -> Option<Frame> {
        let mut decoded = Video::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let (width, height) = (decoded.width(), decoded.height());
        let key = (decoded.format(), width, height);
        let stale = !matches!(&self.scaler, Some((_, current)) if *current == key);
        if stale {
            let scaler = scaling::Context::get(
                key.0,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaling::Flags::BILINEAR,
            )
            .map_err(|e| log::warn!("Cannot convert {:?} frames: {e}", key.0))
            .ok()?;
            self.scaler = Some((scaler, key));
        }
        let (scaler, _) = self.scaler.as_mut()?;

        let mut rgb_frame = Video::empty();
        if let Err(e) = scaler.run(&decoded, &mut rgb_frame) {
            log::warn!("Pixel conversion failed: {e}");
            return None;
        }

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::new(pixels, width, height, 3, self.frame_index);
        self.frame_index += 1;
        Some(frame)
    }
}

impl FrameGrabber for FfmpegGrabber {
    fn grab(&mut self) -> Option<Frame> {
        if let Some(frame) = self.try_receive() {
            return Some(frame);
        }
        if self.eof {
            return None;
        }

        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            if let Err(e) = packet.read(&mut self.input) {
                log::debug!("Capture input ended: {e}");
                self.eof = true;
                let _ = self.decoder.send_eof();
                return self.try_receive();
            }

            if packet.stream() != self.video_stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive() {
                return Some(frame);
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
