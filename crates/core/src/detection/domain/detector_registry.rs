use std::collections::BTreeMap;
use std::path::Path;

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::detection_error::{ConfigError, DetectError, LoadError};
use super::detector_profile::{DetectionParams, DetectorProfile, ProfileId};
use super::object_classifier::ClassifierLoader;

/// Owns the loaded detector profiles and decides which one runs.
///
/// The bundled face profile is loaded at construction and never unloaded,
/// so there is always a usable profile: the active one is always loaded,
/// and asking for one that is not resolves to face.
pub struct DetectorRegistry {
    loader: Box<dyn ClassifierLoader>,
    fallback: DetectorProfile,
    profiles: BTreeMap<ProfileId, DetectorProfile>,
    custom_params: DetectionParams,
    active: ProfileId,
}

impl DetectorRegistry {
    pub fn new(loader: Box<dyn ClassifierLoader>) -> Result<Self, LoadError> {
        let model = loader
            .load_builtin(ProfileId::FALLBACK)
            .map_err(LoadError::FallbackUnavailable)?;
        let fallback = DetectorProfile {
            id: ProfileId::FALLBACK,
            display_name: ProfileId::FALLBACK.display_name().to_string(),
            model,
            source: None,
        };
        log::info!("Loaded {} profile", fallback.display_name);

        Ok(Self {
            loader,
            fallback,
            profiles: BTreeMap::new(),
            custom_params: ProfileId::Custom.default_params(),
            active: ProfileId::FALLBACK,
        })
    }

    pub fn active(&self) -> ProfileId {
        self.active
    }

    pub fn active_profile(&self) -> &DetectorProfile {
        self.profile(self.active)
    }

    /// The profile `id` resolves to: itself when loaded, face otherwise.
    pub fn profile(&self, id: ProfileId) -> &DetectorProfile {
        self.profiles.get(&id).unwrap_or(&self.fallback)
    }

    pub fn is_loaded(&self, id: ProfileId) -> bool {
        id == ProfileId::FALLBACK || self.profiles.contains_key(&id)
    }

    pub fn loaded(&self) -> Vec<ProfileId> {
        ProfileId::ALL
            .into_iter()
            .filter(|id| self.is_loaded(*id))
            .collect()
    }

    pub fn params(&self, id: ProfileId) -> DetectionParams {
        match id {
            ProfileId::Custom => self.custom_params,
            builtin => builtin.default_params(),
        }
    }

    pub fn display_name(&self, id: ProfileId) -> Option<&str> {
        self.is_loaded(id)
            .then(|| self.profile(id).display_name.as_str())
    }

    /// Loads (once) and activates a built-in profile.
    ///
    /// An unrecognised id leaves everything untouched. A resource failure
    /// activates face and reports [`LoadError::FallbackApplied`].
    pub fn load_builtin(&mut self, name: &str) -> Result<String, LoadError> {
        let id = name
            .parse::<ProfileId>()
            .ok()
            .filter(|id| id.is_builtin())
            .ok_or_else(|| LoadError::UnknownProfile(name.to_string()))?;

        if !self.is_loaded(id) {
            match self.loader.load_builtin(id) {
                Ok(model) => {
                    self.profiles.insert(
                        id,
                        DetectorProfile {
                            id,
                            display_name: id.display_name().to_string(),
                            model,
                            source: None,
                        },
                    );
                }
                Err(source) => {
                    log::warn!("Failed to load {id} profile, falling back to face: {source}");
                    self.active = ProfileId::FALLBACK;
                    return Err(LoadError::FallbackApplied {
                        requested: name.to_string(),
                        fallback: ProfileId::FALLBACK,
                        source,
                    });
                }
            }
        }

        self.activate(id);
        Ok(self.active_profile().display_name.clone())
    }

    /// Activates any profile by id. The custom slot must already hold a
    /// model; built-ins load on demand.
    pub fn select(&mut self, name: &str) -> Result<String, LoadError> {
        match name.parse::<ProfileId>() {
            Ok(ProfileId::Custom) if self.is_loaded(ProfileId::Custom) => {
                self.activate(ProfileId::Custom);
                Ok(self.active_profile().display_name.clone())
            }
            Ok(ProfileId::Custom) => Err(LoadError::NotLoaded(ProfileId::Custom)),
            Ok(_) => self.load_builtin(name),
            Err(e) => Err(LoadError::UnknownProfile(e.0)),
        }
    }

    /// Loads a user cascade into the custom slot and activates it.
    ///
    /// `None` is a cancelled selection and changes nothing. On failure the
    /// previously active profile stays active.
    pub fn load_custom(&mut self, path: Option<&Path>) -> Result<Option<String>, LoadError> {
        let Some(path) = path else {
            log::debug!("Custom cascade selection cancelled");
            return Ok(None);
        };

        match self.loader.load_file(path) {
            Ok(model) => {
                let display_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.profiles.insert(
                    ProfileId::Custom,
                    DetectorProfile {
                        id: ProfileId::Custom,
                        display_name: display_name.clone(),
                        model,
                        source: Some(path.to_path_buf()),
                    },
                );
                self.activate(ProfileId::Custom);
                Ok(Some(display_name))
            }
            Err(source) => {
                log::warn!(
                    "Failed to load custom cascade {}, keeping {}: {source}",
                    path.display(),
                    self.active
                );
                Err(LoadError::FallbackApplied {
                    requested: path.display().to_string(),
                    fallback: self.active,
                    source,
                })
            }
        }
    }

    /// Replaces the custom profile's tunables without touching its model.
    pub fn set_parameters(
        &mut self,
        name: &str,
        scale_factor: f64,
        min_neighbors: i32,
        min_size: (i32, i32),
    ) -> Result<DetectionParams, ConfigError> {
        let id = name
            .parse::<ProfileId>()
            .map_err(|e| ConfigError::UnknownProfile(e.0))?;
        if id != ProfileId::Custom {
            return Err(ConfigError::NotTunable(id));
        }
        let params = DetectionParams::new(scale_factor, min_neighbors, min_size)?;
        self.custom_params = params;
        log::debug!(
            "Custom parameters: scale {scale_factor}, neighbours {min_neighbors}, min size {min_size:?}"
        );
        Ok(params)
    }

    /// Runs `id` (or face, if `id` is not loaded) on a grayscale copy of
    /// `frame`. A failing classifier stays loaded.
    pub fn detect(&self, frame: &Frame, id: ProfileId) -> Result<Vec<Detection>, DetectError> {
        let profile = self.profile(id);
        let gray = frame
            .to_grayscale()
            .ok_or(DetectError::MalformedFrame {
                channels: frame.channels(),
            })?;
        let params = self.params(profile.id);

        let detections = profile
            .model
            .detect_multi_scale(&gray, &params)
            .map_err(|source| DetectError::ProfileRuntimeError {
                profile: profile.id,
                source,
            })?;
        Ok(detections.into_iter().filter(Detection::is_valid).collect())
    }

    pub fn detect_active(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        self.detect(frame, self.active)
    }

    fn activate(&mut self, id: ProfileId) {
        if self.active != id {
            log::info!("Active profile: {} -> {}", self.active, id);
        }
        self.active = id;
    }
}
