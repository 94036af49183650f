use thiserror::Error;

use super::detector_profile::ProfileId;
use super::object_classifier::ClassifierError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
    #[error("profile {0} has not been loaded")]
    NotLoaded(ProfileId),
    /// The requested resource failed to load; `fallback` is active instead.
    #[error("could not load {requested}, using {fallback} instead: {source}")]
    FallbackApplied {
        requested: String,
        fallback: ProfileId,
        #[source]
        source: ClassifierError,
    },
    /// Even the bundled face profile could not be loaded.
    #[error("fallback face profile is unavailable: {0}")]
    FallbackUnavailable(#[source] ClassifierError),
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("{profile} detector failed: {source}")]
    ProfileRuntimeError {
        profile: ProfileId,
        #[source]
        source: ClassifierError,
    },
    #[error("frame has {channels} channels, expected packed RGB")]
    MalformedFrame { channels: u8 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("profile {0} is not tunable")]
    NotTunable(ProfileId),
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
}
