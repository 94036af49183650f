use std::time::Instant;

use image::RgbImage;
use thiserror::Error;

use crate::capture::domain::capture_error::ReadError;
use crate::capture::domain::capture_session::CaptureSession;
use crate::detection::domain::detection_error::DetectError;
use crate::detection::domain::detector_registry::DetectorRegistry;
use crate::shared::detection::Detection;

use super::annotation::annotate;
use super::display_sink::DisplaySink;
use super::pipeline_logger::PipelineLogger;
use super::scale_to_fit::fit_image;

/// What one tick hands to the display.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Annotated frame, scaled to fit the display box.
    pub image: RgbImage,
    /// Boxes in source-frame coordinates. Order carries no meaning.
    pub detections: Vec<Detection>,
    pub detection_count: usize,
    pub frame_index: usize,
    pub source_size: (u32, u32),
}

#[derive(Error, Debug)]
pub enum TickError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Detect(#[from] DetectError),
}

/// Acquire → detect → annotate → scale → publish, once per call.
///
/// A tick either publishes exactly one output or returns an error having
/// published nothing.
pub struct FramePipeline {
    display_box: (u32, u32),
    sink: Box<dyn DisplaySink>,
    logger: Box<dyn PipelineLogger>,
}

impl FramePipeline {
    pub fn new(
        display_box: (u32, u32),
        sink: Box<dyn DisplaySink>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            display_box,
            sink,
            logger,
        }
    }

    pub fn process_tick(
        &mut self,
        session: &mut CaptureSession,
        registry: &DetectorRegistry,
    ) -> Result<PipelineOutput, TickError> {
        let t0 = Instant::now();
        let frame = session.read()?;
        let t1 = Instant::now();

        let detections = registry.detect_active(&frame)?;
        let t2 = Instant::now();

        let mut canvas = frame.to_rgb_image().ok_or(DetectError::MalformedFrame {
            channels: frame.channels(),
        })?;
        annotate(&mut canvas, &detections);
        let t3 = Instant::now();

        let image = fit_image(&canvas, self.display_box);
        let t4 = Instant::now();

        let output = PipelineOutput {
            image,
            detection_count: detections.len(),
            detections,
            frame_index: frame.index(),
            source_size: (frame.width(), frame.height()),
        };
        self.sink.publish(&output);
        let t5 = Instant::now();

        let ms = |a: Instant, b: Instant| b.duration_since(a).as_secs_f64() * 1000.0;
        self.logger.timing("acquire", ms(t0, t1));
        self.logger.timing("detect", ms(t1, t2));
        self.logger.timing("annotate", ms(t2, t3));
        self.logger.timing("scale", ms(t3, t4));
        self.logger.timing("publish", ms(t4, t5));
        self.logger.metric("detections", output.detection_count as f64);
        self.logger.tick(output.frame_index);

        Ok(output)
    }

    pub fn summary(&self) {
        self.logger.summary();
    }
}
