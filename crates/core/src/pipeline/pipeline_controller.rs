use std::fmt;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::capture::domain::capture_backend::CaptureBackend;
use crate::capture::domain::capture_error::{DecodeError, OpenError, ReadError};
use crate::capture::domain::capture_session::CaptureSession;
use crate::capture::domain::device_id::DeviceId;
use crate::capture::domain::still_image_reader::StillImageReader;
use crate::detection::domain::detection_error::{ConfigError, LoadError};
use crate::detection::domain::detector_profile::DetectionParams;
use crate::detection::domain::detector_registry::DetectorRegistry;

use super::frame_pipeline::{FramePipeline, TickError};
use super::pipeline_config::ControllerConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Live,
    File,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "idle",
            Mode::Live => "live",
            Mode::File => "file",
        };
        f.write_str(name)
    }
}

/// What a single `tick` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session open; nothing ran.
    Idle,
    /// One output was published carrying this many detections.
    Published(usize),
    /// The tick failed after acquiring a frame; the session stays open.
    Skipped,
    /// The live device stopped delivering frames and was released.
    DeviceLost,
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Idle / Live / File state machine around one capture session.
///
/// A session is open exactly when the mode is Live or File. Every
/// transition goes through `stop`, so switching sources never leaks a
/// device handle. Ticks are driven from outside (see `PollingLoop`).
pub struct PipelineController {
    backend: Box<dyn CaptureBackend>,
    reader: Box<dyn StillImageReader>,
    registry: DetectorRegistry,
    pipeline: FramePipeline,
    session: Option<CaptureSession>,
    mode: Mode,
    poll_interval: Duration,
    max_probed_devices: u32,
    devices: Vec<DeviceId>,
    detection_count: usize,
    last_error: Option<String>,
}

impl PipelineController {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        reader: Box<dyn StillImageReader>,
        registry: DetectorRegistry,
        pipeline: FramePipeline,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            backend,
            reader,
            registry,
            pipeline,
            session: None,
            mode: Mode::Idle,
            poll_interval: config.poll_interval(),
            max_probed_devices: config.max_probed_devices,
            devices: Vec::new(),
            detection_count: 0,
            last_error: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != Mode::Idle
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Detections in the most recently published tick; zero when idle.
    pub fn detection_count(&self) -> usize {
        self.detection_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Devices found by the last enumeration.
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// The source of the open session, if any.
    pub fn source(&self) -> Option<&DeviceId> {
        self.session.as_ref().map(CaptureSession::device)
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn refresh_devices(&mut self) -> &[DeviceId] {
        self.devices = CaptureSession::enumerate(self.backend.as_ref(), self.max_probed_devices);
        log::debug!("{} capture device(s) available", self.devices.len());
        &self.devices
    }

    /// Opens `device` and enters Live mode, stopping any current session
    /// first. On failure the controller is left Idle.
    pub fn start_live(&mut self, device: DeviceId) -> Result<(), ControllerError> {
        self.stop();
        match CaptureSession::open(self.backend.as_ref(), device) {
            Ok(session) => {
                log::info!("Live capture from {}", session.device());
                self.enter(session, Mode::Live);
                Ok(())
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    /// Decodes the image at `path` and enters File mode, stopping any
    /// current session first. On failure the controller is left Idle.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ControllerError> {
        self.stop();
        match CaptureSession::open_still(self.reader.as_ref(), path) {
            Ok(session) => {
                log::info!("Showing still image {}", path.display());
                self.enter(session, Mode::File);
                Ok(())
            }
            Err(e) => Err(self.record(e.into())),
        }
    }

    /// Runs one pipeline pass over the open session.
    ///
    /// A read miss in Live mode is treated as device loss: the session is
    /// released, the controller goes Idle and the device list is refreshed.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };

        match self.pipeline.process_tick(session, &self.registry) {
            Ok(output) => {
                self.detection_count = output.detection_count;
                TickOutcome::Published(output.detection_count)
            }
            Err(TickError::Read(e)) if self.mode == Mode::Live => {
                self.handle_device_loss(e);
                TickOutcome::DeviceLost
            }
            Err(e) => {
                log::warn!("Tick skipped: {e}");
                TickOutcome::Skipped
            }
        }
    }

    /// Releases the session and returns to Idle. Safe to call when idle.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::info!("Stopped {} ({} mode)", session.device(), self.mode);
            session.close();
        }
        self.mode = Mode::Idle;
        self.detection_count = 0;
    }

    /// Activates a profile by id without interrupting the running session.
    pub fn switch_profile(&mut self, name: &str) -> Result<String, ControllerError> {
        self.registry
            .select(name)
            .map_err(|e| self.record(e.into()))
    }

    /// Loads a user cascade into the custom slot. `None` means the user
    /// cancelled the selection.
    pub fn load_custom(&mut self, path: Option<&Path>) -> Result<Option<String>, ControllerError> {
        self.registry
            .load_custom(path)
            .map_err(|e| self.record(e.into()))
    }

    pub fn set_parameters(
        &mut self,
        name: &str,
        scale_factor: f64,
        min_neighbors: i32,
        min_size: (i32, i32),
    ) -> Result<DetectionParams, ControllerError> {
        self.registry
            .set_parameters(name, scale_factor, min_neighbors, min_size)
            .map_err(|e| self.record(e.into()))
    }

    /// Emits the per-stage timing summary of everything run so far.
    pub fn summary(&self) {
        self.pipeline.summary();
    }

    fn enter(&mut self, session: CaptureSession, mode: Mode) {
        self.session = Some(session);
        self.mode = mode;
        self.detection_count = 0;
        self.last_error = None;
    }

    fn handle_device_loss(&mut self, error: ReadError) {
        let device = self
            .source()
            .map(ToString::to_string)
            .unwrap_or_else(|| "device".to_string());
        log::warn!("Lost {device}: {error}");
        self.stop();
        self.last_error = Some(format!("{device} disconnected: {error}"));
        self.refresh_devices();
    }

    fn record(&mut self, error: ControllerError) -> ControllerError {
        log::warn!("{error}");
        self.last_error = Some(error.to_string());
        error
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detector_profile::ProfileId;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::test_support::{
        solid_frame, tag_of, FakeBackend, FakeLoader, FakeStillReader, RecordingSink,
    };
    use std::path::PathBuf;

    struct Harness {
        controller: PipelineController,
        backend: FakeBackend,
        sink: RecordingSink,
    }

    fn harness_with(backend: FakeBackend, reader: FakeStillReader, loader: FakeLoader) -> Harness {
        let sink = RecordingSink::new();
        let pipeline = FramePipeline::new(
            (300, 300),
            Box::new(sink.clone()),
            Box::new(NullPipelineLogger),
        );
        let registry = DetectorRegistry::new(Box::new(loader)).unwrap();
        let controller = PipelineController::new(
            Box::new(backend.clone()),
            Box::new(reader),
            registry,
            pipeline,
            &ControllerConfig::default(),
        );
        Harness {
            controller,
            backend,
            sink,
        }
    }

    fn harness() -> Harness {
        let backend = FakeBackend::with_devices(&[0, 1]).endless(solid_frame(640, 480, 0));
        harness_with(
            backend,
            FakeStillReader::new(solid_frame(320, 240, 0)),
            FakeLoader::new(),
        )
    }

    #[test]
    fn test_starts_idle_and_idle_tick_publishes_nothing() {
        let mut h = harness();
        assert_eq!(h.controller.mode(), Mode::Idle);
        assert!(!h.controller.is_active());
        assert_eq!(h.controller.tick(), TickOutcome::Idle);
        assert_eq!(h.sink.count(), 0);
        assert!(h.controller.source().is_none());
    }

    #[test]
    fn test_live_tick_publishes_scaled_frame() {
        let mut h = harness();
        h.controller.start_live(DeviceId::Index(0)).unwrap();

        assert_eq!(h.controller.mode(), Mode::Live);
        assert!(h.controller.is_active());
        assert_eq!(h.controller.tick(), TickOutcome::Published(1));

        let published = h.sink.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].image.dimensions(), (300, 225));
        assert_eq!(published[0].detections, vec![tag_of(ProfileId::Face)]);
        assert_eq!(h.controller.detection_count(), 1);
    }

    #[test]
    fn test_start_failure_stays_idle() {
        let mut h = harness();
        let err = h.controller.start_live(DeviceId::Index(7)).unwrap_err();

        assert!(matches!(err, ControllerError::Open(_)));
        assert_eq!(h.controller.mode(), Mode::Idle);
        assert!(h.controller.last_error().unwrap().contains("camera 7"));
        assert_eq!(h.backend.open_handles(), 0);
    }

    #[test]
    fn test_device_loss_releases_and_goes_idle() {
        let mut h = harness();
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        assert_eq!(h.controller.tick(), TickOutcome::Published(1));

        h.backend.disconnect(0);
        assert_eq!(h.controller.tick(), TickOutcome::DeviceLost);

        assert_eq!(h.controller.mode(), Mode::Idle);
        assert_eq!(h.controller.detection_count(), 0);
        assert_eq!(h.backend.open_handles(), 0);
        assert!(h.controller.last_error().unwrap().contains("camera 0"));
        assert_eq!(h.controller.devices(), &[DeviceId::Index(1)]);

        assert_eq!(h.controller.tick(), TickOutcome::Idle);
        assert_eq!(h.sink.count(), 1);
    }

    #[test]
    fn test_stop_resets_count_and_halts_publishing() {
        let mut h = harness();
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        h.controller.tick();
        assert_eq!(h.controller.detection_count(), 1);

        h.controller.stop();

        assert_eq!(h.controller.mode(), Mode::Idle);
        assert_eq!(h.controller.detection_count(), 0);
        assert_eq!(h.backend.open_handles(), 0);
        assert_eq!(h.controller.tick(), TickOutcome::Idle);
        assert_eq!(h.sink.count(), 1);

        h.controller.stop();
        assert_eq!(h.backend.releases(), 1);
    }

    #[test]
    fn test_file_mode_repeats_still_image() {
        let mut h = harness();
        h.controller.load_file(Path::new("photo.png")).unwrap();

        assert_eq!(h.controller.mode(), Mode::File);
        for _ in 0..3 {
            assert_eq!(h.controller.tick(), TickOutcome::Published(1));
        }
        let frames: Vec<_> = h.sink.published().iter().map(|o| o.frame_index).collect();
        assert_eq!(frames, vec![0, 1, 2]);
        assert_eq!(
            h.controller.source(),
            Some(&DeviceId::Path(PathBuf::from("photo.png")))
        );
    }

    #[test]
    fn test_file_decode_failure_stays_idle() {
        let backend = FakeBackend::with_devices(&[0]);
        let mut h = harness_with(backend, FakeStillReader::failing(), FakeLoader::new());

        let err = h.controller.load_file(Path::new("missing.png")).unwrap_err();

        assert!(matches!(err, ControllerError::Decode(DecodeError::NotFound(_))));
        assert_eq!(h.controller.mode(), Mode::Idle);
        assert!(h.controller.last_error().is_some());
    }

    #[test]
    fn test_switching_source_closes_previous_session() {
        let mut h = harness();
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        h.controller.load_file(Path::new("photo.png")).unwrap();

        assert_eq!(h.controller.mode(), Mode::File);
        assert_eq!(h.backend.open_handles(), 0);

        h.controller.start_live(DeviceId::Index(1)).unwrap();
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        assert_eq!(h.backend.opens(), 3);
        assert_eq!(h.backend.open_handles(), 1);
    }

    #[test]
    fn test_successful_start_clears_last_error() {
        let mut h = harness();
        let _ = h.controller.start_live(DeviceId::Index(9));
        assert!(h.controller.last_error().is_some());

        h.controller.start_live(DeviceId::Index(0)).unwrap();
        assert!(h.controller.last_error().is_none());
    }

    #[test]
    fn test_switch_profile_keeps_session_running() {
        let mut h = harness();
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        h.controller.tick();

        assert_eq!(h.controller.switch_profile("eye").unwrap(), "Eyes");
        h.controller.tick();

        assert_eq!(h.controller.mode(), Mode::Live);
        let published = h.sink.published();
        assert_eq!(published[1].detections, vec![tag_of(ProfileId::Eye)]);
    }

    #[test]
    fn test_failed_profile_switch_falls_back_to_face() {
        let backend = FakeBackend::with_devices(&[0]).endless(solid_frame(64, 48, 0));
        let mut h = harness_with(
            backend,
            FakeStillReader::failing(),
            FakeLoader::new().unavailable(ProfileId::Smile),
        );
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        h.controller.switch_profile("eye").unwrap();

        let err = h.controller.switch_profile("smile").unwrap_err();

        assert!(matches!(
            err,
            ControllerError::Load(LoadError::FallbackApplied { .. })
        ));
        assert_eq!(h.controller.registry().active(), ProfileId::Face);
        assert_eq!(h.controller.tick(), TickOutcome::Published(1));
        assert_eq!(h.sink.published()[0].detections, vec![tag_of(ProfileId::Face)]);
    }

    #[test]
    fn test_detect_error_skips_tick_and_stays_live() {
        let backend = FakeBackend::with_devices(&[0]).endless(solid_frame(64, 48, 0));
        let mut h = harness_with(
            backend,
            FakeStillReader::failing(),
            FakeLoader::new().broken_at_runtime(ProfileId::Eye),
        );
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        h.controller.switch_profile("eye").unwrap();

        assert_eq!(h.controller.tick(), TickOutcome::Skipped);
        assert_eq!(h.controller.mode(), Mode::Live);
        assert_eq!(h.sink.count(), 0);
        assert_eq!(h.backend.open_handles(), 1);
    }

    #[test]
    fn test_custom_cascade_and_parameters() {
        let mut h = harness();

        assert_eq!(h.controller.load_custom(None).unwrap(), None);
        assert_eq!(
            h.controller
                .load_custom(Some(Path::new("/tmp/cats.xml")))
                .unwrap()
                .as_deref(),
            Some("cats.xml")
        );
        assert_eq!(h.controller.registry().active(), ProfileId::Custom);

        let params = h
            .controller
            .set_parameters("custom", 1.3, 2, (10, 10))
            .unwrap();
        assert_eq!(params.min_neighbors(), 2);

        let err = h
            .controller
            .set_parameters("custom", 0.9, 2, (10, 10))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Config(_)));
        assert_eq!(h.controller.registry().params(ProfileId::Custom), params);
    }

    #[test]
    fn test_refresh_devices_leaves_nothing_open() {
        let mut h = harness();
        assert_eq!(
            h.controller.refresh_devices(),
            &[DeviceId::Index(0), DeviceId::Index(1)]
        );
        assert_eq!(h.backend.open_handles(), 0);
    }

    #[test]
    fn test_drop_releases_session() {
        let mut h = harness();
        h.controller.start_live(DeviceId::Index(0)).unwrap();
        let backend = h.backend.clone();
        drop(h);
        assert_eq!(backend.open_handles(), 0);
    }
}
