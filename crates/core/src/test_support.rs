//! Fakes for the capture, detection and display ports, shared by the
//! unit tests of every context.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::GrayImage;

use crate::capture::domain::capture_backend::{CaptureBackend, FrameGrabber};
use crate::capture::domain::capture_error::{DecodeError, OpenError};
use crate::capture::domain::device_id::DeviceId;
use crate::capture::domain::still_image_reader::StillImageReader;
use crate::detection::domain::detector_profile::{DetectionParams, ProfileId};
use crate::detection::domain::object_classifier::{
    ClassifierError, ClassifierLoader, ObjectClassifier,
};
use crate::pipeline::display_sink::DisplaySink;
use crate::pipeline::frame_pipeline::PipelineOutput;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::model_resolver::ModelResolveError;

pub fn solid_frame(width: u32, height: u32, value: u8) -> Frame {
    Frame::new(
        vec![value; (width * height * 3) as usize],
        width,
        height,
        3,
        0,
    )
}

// ── Capture ──

type FrameQueue = Arc<Mutex<VecDeque<Option<Frame>>>>;

/// Backend whose listed indices open; every grabber shares one frame queue.
#[derive(Clone, Default)]
pub struct FakeBackend {
    devices: Arc<Mutex<HashSet<u32>>>,
    queue: FrameQueue,
    endless: Option<Frame>,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn with_devices(indices: &[u32]) -> Self {
        Self {
            devices: Arc::new(Mutex::new(indices.iter().copied().collect())),
            ..Self::default()
        }
    }

    /// Unplugs `index`: later opens fail and reads on open handles miss.
    pub fn disconnect(&self, index: u32) {
        self.devices.lock().unwrap().remove(&index);
        self.queue.lock().unwrap().clear();
    }

    /// Served after the queue runs dry, instead of a miss.
    pub fn endless(mut self, frame: Frame) -> Self {
        self.endless = Some(frame);
        self
    }

    /// Queues one read result; `None` is a miss.
    pub fn push_frame(&self, frame: Option<Frame>) {
        self.queue.lock().unwrap().push_back(frame);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.opens() - self.releases()
    }
}

impl CaptureBackend for FakeBackend {
    fn open(&self, device: &DeviceId) -> Result<Box<dyn FrameGrabber>, OpenError> {
        match device {
            DeviceId::Index(i) if self.devices.lock().unwrap().contains(i) => {
                self.opens.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeGrabber {
                    index: *i,
                    devices: Arc::clone(&self.devices),
                    queue: Arc::clone(&self.queue),
                    endless: self.endless.clone(),
                    releases: Arc::clone(&self.releases),
                    next_index: 0,
                }))
            }
            _ => Err(OpenError::DeviceUnavailable {
                device: device.clone(),
                reason: "no such device".into(),
            }),
        }
    }
}

struct FakeGrabber {
    index: u32,
    devices: Arc<Mutex<HashSet<u32>>>,
    queue: FrameQueue,
    endless: Option<Frame>,
    releases: Arc<AtomicUsize>,
    next_index: usize,
}

impl FrameGrabber for FakeGrabber {
    fn grab(&mut self) -> Option<Frame> {
        if !self.devices.lock().unwrap().contains(&self.index) {
            return None;
        }
        let next = self.queue.lock().unwrap().pop_front();
        let frame = match next {
            Some(result) => result,
            None => self.endless.clone(),
        }?;
        let frame = frame.with_index(self.next_index);
        self.next_index += 1;
        Some(frame)
    }
}

impl Drop for FakeGrabber {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeStillReader {
    frame: Option<Frame>,
}

impl FakeStillReader {
    pub fn new(frame: Frame) -> Self {
        Self { frame: Some(frame) }
    }

    pub fn failing() -> Self {
        Self { frame: None }
    }
}

impl StillImageReader for FakeStillReader {
    fn read(&self, path: &Path) -> Result<Frame, DecodeError> {
        self.frame
            .clone()
            .ok_or_else(|| DecodeError::NotFound(path.to_path_buf()))
    }
}

// ── Detection ──

/// The single detection a fake classifier for `id` reports.
pub fn tag_of(id: ProfileId) -> Detection {
    Detection::new(id as i32 * 10, 0, 5, 5)
}

struct FakeClassifier {
    output: Result<Vec<Detection>, String>,
    seen_params: Arc<Mutex<Vec<DetectionParams>>>,
}

impl ObjectClassifier for FakeClassifier {
    fn detect_multi_scale(
        &self,
        _gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<Detection>, ClassifierError> {
        self.seen_params.lock().unwrap().push(*params);
        self.output.clone().map_err(ClassifierError::Runtime)
    }
}

/// Loader producing tagged fake classifiers. Files whose name starts with
/// `broken` fail to load.
#[derive(Default)]
pub struct FakeLoader {
    unavailable: HashSet<ProfileId>,
    broken_at_runtime: HashSet<ProfileId>,
    seen_params: Arc<Mutex<Vec<DetectionParams>>>,
    loads: Arc<Mutex<usize>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(mut self, id: ProfileId) -> Self {
        self.unavailable.insert(id);
        self
    }

    pub fn broken_at_runtime(mut self, id: ProfileId) -> Self {
        self.broken_at_runtime.insert(id);
        self
    }

    pub fn seen_params(&self) -> Arc<Mutex<Vec<DetectionParams>>> {
        Arc::clone(&self.seen_params)
    }

    pub fn load_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.loads)
    }

    fn classifier(&self, id: ProfileId) -> Arc<dyn ObjectClassifier> {
        *self.loads.lock().unwrap() += 1;
        let output = if self.broken_at_runtime.contains(&id) {
            Err(format!("{id} classifier is broken"))
        } else {
            Ok(vec![tag_of(id)])
        };
        Arc::new(FakeClassifier {
            output,
            seen_params: Arc::clone(&self.seen_params),
        })
    }
}

impl ClassifierLoader for FakeLoader {
    fn load_builtin(&self, id: ProfileId) -> Result<Arc<dyn ObjectClassifier>, ClassifierError> {
        if self.unavailable.contains(&id) {
            let name = id.resource_name().unwrap_or_default().to_string();
            return Err(ModelResolveError::NotAvailable { name }.into());
        }
        Ok(self.classifier(id))
    }

    fn load_file(&self, path: &Path) -> Result<Arc<dyn ObjectClassifier>, ClassifierError> {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        if name.starts_with("broken") {
            return Err(ClassifierError::Malformed(format!("{name} is broken")));
        }
        Ok(self.classifier(ProfileId::Custom))
    }
}

// ── Display ──

#[derive(Clone, Default)]
pub struct RecordingSink {
    published: Arc<Mutex<Vec<PipelineOutput>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<PipelineOutput> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl DisplaySink for RecordingSink {
    fn publish(&self, output: &PipelineOutput) {
        self.published.lock().unwrap().push(output.clone());
    }
}

