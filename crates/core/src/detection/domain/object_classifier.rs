use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::GrayImage;
use thiserror::Error;

use crate::shared::detection::Detection;
use crate::shared::model_resolver::ModelResolveError;

use super::detector_profile::{DetectionParams, ProfileId};

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cascade XML: {0}")]
    Parse(#[from] quick_xml::DeError),
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("malformed cascade: {0}")]
    Malformed(String),
    #[error(transparent)]
    Resource(#[from] ModelResolveError),
    /// Evaluation failure of a pluggable classifier. The bundled Haar
    /// cascade cannot fail once parsed and never returns this.
    #[error("detection failed: {0}")]
    Runtime(String),
}

/// Opaque multi-scale object detector.
///
/// Takes a grayscale image and the profile tunables and returns bounding
/// boxes in image coordinates. Implementations hold no per-call state, so a
/// shared reference is enough to run one.
pub trait ObjectClassifier: Send + Sync {
    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<Detection>, ClassifierError>;
}

/// Produces classifiers from the bundled resource set or arbitrary files.
pub trait ClassifierLoader: Send {
    fn load_builtin(&self, id: ProfileId) -> Result<Arc<dyn ObjectClassifier>, ClassifierError>;

    fn load_file(&self, path: &Path) -> Result<Arc<dyn ObjectClassifier>, ClassifierError>;
}

