use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::domain::detection_error::ConfigError;
use crate::detection::domain::detector_profile::DetectionParams;
use crate::shared::constants::{
    DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_SIZE, DEFAULT_DISPLAY_BOX, DEFAULT_POLL_INTERVAL_MS,
    MAX_PROBED_DEVICES,
};
use crate::shared::model_resolver::ResourceLocations;

/// Tunables for the custom profile as written in a settings file.
///
/// Signed so that out-of-range values survive parsing and are rejected by
/// [`DetectionParams::new`] with a field-specific error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: (i32, i32),
}

impl CustomParams {
    pub fn validate(&self) -> Result<DetectionParams, ConfigError> {
        DetectionParams::new(self.scale_factor, self.min_neighbors, self.min_size)
    }
}

/// Settings for one controller run. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub poll_interval_ms: u64,
    pub display_box: (u32, u32),
    pub max_probed_devices: u32,
    pub capture_size: (u32, u32),
    pub capture_fps: u32,
    /// Directory holding bundled cascade files.
    pub cascade_dir: Option<PathBuf>,
    /// Overrides the platform cache directory for downloaded cascades.
    pub cache_dir: Option<PathBuf>,
    pub allow_download: bool,
    pub default_profile: String,
    pub custom_params: Option<CustomParams>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            display_box: DEFAULT_DISPLAY_BOX,
            max_probed_devices: MAX_PROBED_DEVICES,
            capture_size: DEFAULT_CAPTURE_SIZE,
            capture_fps: DEFAULT_CAPTURE_FPS,
            cascade_dir: None,
            cache_dir: None,
            allow_download: true,
            default_profile: "face".to_string(),
            custom_params: None,
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn resource_locations(&self) -> ResourceLocations {
        ResourceLocations {
            bundled_dir: self.cascade_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            allow_download: self.allow_download,
        }
    }
}
