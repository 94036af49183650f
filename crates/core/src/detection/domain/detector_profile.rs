use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use super::detection_error::ConfigError;
use super::object_classifier::ObjectClassifier;

/// Closed set of detector profiles: six built-ins plus one user slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileId {
    Face,
    Eye,
    Smile,
    UpperBody,
    FullBody,
    ProfileFace,
    Custom,
}

impl ProfileId {
    pub const BUILTINS: [ProfileId; 6] = [
        ProfileId::Face,
        ProfileId::Eye,
        ProfileId::Smile,
        ProfileId::UpperBody,
        ProfileId::FullBody,
        ProfileId::ProfileFace,
    ];

    pub const ALL: [ProfileId; 7] = [
        ProfileId::Face,
        ProfileId::Eye,
        ProfileId::Smile,
        ProfileId::UpperBody,
        ProfileId::FullBody,
        ProfileId::ProfileFace,
        ProfileId::Custom,
    ];

    /// The profile detection degrades to.
    pub const FALLBACK: ProfileId = ProfileId::Face;

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileId::Face => "face",
            ProfileId::Eye => "eye",
            ProfileId::Smile => "smile",
            ProfileId::UpperBody => "upperbody",
            ProfileId::FullBody => "fullbody",
            ProfileId::ProfileFace => "profileface",
            ProfileId::Custom => "custom",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProfileId::Face => "Face",
            ProfileId::Eye => "Eyes",
            ProfileId::Smile => "Smile",
            ProfileId::UpperBody => "Upper body",
            ProfileId::FullBody => "Full body",
            ProfileId::ProfileFace => "Profile face",
            ProfileId::Custom => "Custom",
        }
    }

    /// Bundled cascade file for built-ins; `None` for the custom slot.
    pub fn resource_name(self) -> Option<&'static str> {
        match self {
            ProfileId::Face => Some("haarcascade_frontalface_default.xml"),
            ProfileId::Eye => Some("haarcascade_eye.xml"),
            ProfileId::Smile => Some("haarcascade_smile.xml"),
            ProfileId::UpperBody => Some("haarcascade_upperbody.xml"),
            ProfileId::FullBody => Some("haarcascade_fullbody.xml"),
            ProfileId::ProfileFace => Some("haarcascade_profileface.xml"),
            ProfileId::Custom => None,
        }
    }

    pub fn is_builtin(self) -> bool {
        self != ProfileId::Custom
    }

    pub fn default_params(self) -> DetectionParams {
        match self {
            ProfileId::Face | ProfileId::ProfileFace | ProfileId::Custom => {
                DetectionParams::preset(1.1, 5, (30, 30))
            }
            ProfileId::Eye => DetectionParams::preset(1.1, 10, (15, 15)),
            ProfileId::Smile => DetectionParams::preset(1.7, 20, (25, 25)),
            ProfileId::UpperBody => DetectionParams::preset(1.05, 3, (50, 100)),
            ProfileId::FullBody => DetectionParams::preset(1.05, 3, (30, 60)),
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown profile: {0}")]
pub struct UnknownProfileId(pub String);

impl FromStr for ProfileId {
    type Err = UnknownProfileId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownProfileId(s.to_string()))
    }
}

/// Tunables handed to the detection primitive.
///
/// Only constructible through [`DetectionParams::new`], so a value in hand
/// always has `scale_factor > 1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    scale_factor: f64,
    min_neighbors: u32,
    min_size: (u32, u32),
}

impl DetectionParams {
    pub fn new(
        scale_factor: f64,
        min_neighbors: i32,
        min_size: (i32, i32),
    ) -> Result<Self, ConfigError> {
        if !scale_factor.is_finite() || scale_factor <= 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "scale_factor",
                value: scale_factor.to_string(),
                expected: "a finite value > 1.0",
            });
        }
        let min_neighbors = u32::try_from(min_neighbors).map_err(|_| ConfigError::OutOfRange {
            field: "min_neighbors",
            value: min_neighbors.to_string(),
            expected: ">= 0",
        })?;
        let (w, h) = min_size;
        let size_err = || ConfigError::OutOfRange {
            field: "min_size",
            value: format!("{w}x{h}"),
            expected: "both dimensions >= 0",
        };
        let min_size = (
            u32::try_from(w).map_err(|_| size_err())?,
            u32::try_from(h).map_err(|_| size_err())?,
        );

        Ok(Self {
            scale_factor,
            min_neighbors,
            min_size,
        })
    }

    const fn preset(scale_factor: f64, min_neighbors: u32, min_size: (u32, u32)) -> Self {
        Self {
            scale_factor,
            min_neighbors,
            min_size,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn min_neighbors(&self) -> u32 {
        self.min_neighbors
    }

    pub fn min_size(&self) -> (u32, u32) {
        self.min_size
    }
}

impl Default for DetectionParams {
    fn default() -> Self {
        ProfileId::FALLBACK.default_params()
    }
}

/// A loaded profile. Reloading swaps in a new `model`; a classifier is
/// never changed in place.
#[derive(Clone)]
pub struct DetectorProfile {
    pub id: ProfileId,
    pub display_name: String,
    pub model: Arc<dyn ObjectClassifier>,
    /// File the model was loaded from, for custom profiles.
    pub source: Option<PathBuf>,
}

impl fmt::Debug for DetectorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorProfile")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
