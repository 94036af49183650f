use std::fs;
use std::path::{Path, PathBuf};

use facewatch_core::pipeline::pipeline_config::ControllerConfig;

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("FaceWatch").join("settings.json"))
}

/// Loads controller settings.
///
/// An explicit path must exist and parse. Without one, the per-user
/// settings file is used when present and readable, else defaults.
pub fn load(explicit: Option<&Path>) -> Result<ControllerConfig, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read settings {}: {e}", path.display()))?;
        let config = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid settings {}: {e}", path.display()))?;
        return Ok(config);
    }

    let config = config_path()
        .and_then(|path| fs::read_to_string(path).ok())
        .and_then(|json| match serde_json::from_str(&json) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring unreadable settings file: {e}");
                None
            }
        })
        .unwrap_or_default();
    Ok(config)
}
