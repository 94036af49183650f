use std::fmt;
use std::path::PathBuf;

/// Identifies a frame source: a numbered capture device, or a path/URL
/// (device node, video file, network stream) opened like one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Index(u32),
    Path(PathBuf),
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Index(i) => write!(f, "camera {i}"),
            DeviceId::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

impl From<u32> for DeviceId {
    fn from(index: u32) -> Self {
        DeviceId::Index(index)
    }
}
